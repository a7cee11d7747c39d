//! Epoch-Version-Release package identifiers
//!
//! An EVR labels a package build, e.g. `1:2.3.4-0.2.beta`. The version half is
//! `[epoch:]major.minor[.patch]`, the release half is `major[.minor][.stage]`
//! where the stage is one of the pre-release labels, a nightly marker, or absent
//! for a general availability (GA) release.

use crate::error::{ParseField, RelengError, Result};
use chrono::{Local, NaiveDateTime};
use regex::{Captures, Regex};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use tracing::debug;

const VERSION_PATTERN: &str =
    r"^(?:(?P<epoch>\d+):)?(?P<major>\d+)\.(?P<minor>\d+)(?:\.(?P<patch>\d+))?$";
const RELEASE_PATTERN: &str =
    r"^(?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<stage>[A-Za-z0-9]+))?$";
const NIGHTLY_PATTERN: &str = r"^n(?P<timestamp>\d{12})git(?P<commit>[0-9A-Za-z]+)$";

/// Release value that requests a generated nightly release string
pub const NIGHTLY_RELEASE: &str = "nightly";

/// Placeholder macro appended to the release in packaging metadata
pub const DIST_MACRO: &str = "%{?dist}";

const NIGHTLY_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";
const SHORT_COMMIT_LEN: usize = 7;

fn captures<'a>(pattern: &str, input: &'a str) -> Option<Captures<'a>> {
    Regex::new(pattern).ok()?.captures(input)
}

fn number(caps: &Captures<'_>, name: &str, field: ParseField, input: &str) -> Result<u32> {
    match caps.name(name) {
        Some(m) => m
            .as_str()
            .parse::<u32>()
            .map_err(|_| RelengError::parse(field, input)),
        None => Ok(0),
    }
}

/// Timestamp and abbreviated commit embedded in a nightly release
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NightlyMarker {
    /// Build time as `YYYYMMDDhhmm`
    pub timestamp: String,
    /// Abbreviated commit hash
    pub commit: String,
}

impl NightlyMarker {
    /// Build a marker for the given build time and commit
    pub fn new(built_at: NaiveDateTime, commit_hash: &str) -> Self {
        NightlyMarker {
            timestamp: built_at.format(NIGHTLY_TIMESTAMP_FORMAT).to_string(),
            commit: commit_hash.chars().take(SHORT_COMMIT_LEN).collect(),
        }
    }
}

impl fmt::Display for NightlyMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}git{}", self.timestamp, self.commit)
    }
}

/// Release stage of an EVR
///
/// Variant order is the sort order used as the final EVR tie-break: nightly
/// snapshots sort below every named stage, and GA sorts above all of them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReleaseStage {
    Nightly(NightlyMarker),
    Alpha,
    Beta,
    Rc,
    /// General availability, no stage label
    Ga,
}

impl ReleaseStage {
    /// The stage that follows this one: nightly/GA -> alpha -> beta -> rc -> GA
    pub fn next(&self) -> ReleaseStage {
        match self {
            ReleaseStage::Nightly(_) | ReleaseStage::Ga => ReleaseStage::Alpha,
            ReleaseStage::Alpha => ReleaseStage::Beta,
            ReleaseStage::Beta => ReleaseStage::Rc,
            ReleaseStage::Rc => ReleaseStage::Ga,
        }
    }

    /// True for alpha, beta and rc
    pub fn is_prerelease(&self) -> bool {
        matches!(
            self,
            ReleaseStage::Alpha | ReleaseStage::Beta | ReleaseStage::Rc
        )
    }

    /// Label written into the release string, `None` for GA
    pub fn label(&self) -> Option<String> {
        match self {
            ReleaseStage::Nightly(marker) => Some(marker.to_string()),
            ReleaseStage::Alpha => Some("alpha".to_string()),
            ReleaseStage::Beta => Some("beta".to_string()),
            ReleaseStage::Rc => Some("rc".to_string()),
            ReleaseStage::Ga => None,
        }
    }
}

impl FromStr for ReleaseStage {
    type Err = RelengError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "alpha" => Ok(ReleaseStage::Alpha),
            "beta" => Ok(ReleaseStage::Beta),
            "rc" => Ok(ReleaseStage::Rc),
            other => {
                let caps = captures(NIGHTLY_PATTERN, other)
                    .ok_or_else(|| RelengError::parse(ParseField::Release, other))?;
                Ok(ReleaseStage::Nightly(NightlyMarker {
                    timestamp: caps["timestamp"].to_string(),
                    commit: caps["commit"].to_string(),
                }))
            }
        }
    }
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{}", label),
            None => write!(f, "GA"),
        }
    }
}

/// A requested EVR increment
///
/// Flags combine the way the `update-version` command uses them: one of the
/// version flags (or `release`/`stage`) plus an optional explicit next stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Increment {
    pub major: bool,
    pub minor: bool,
    pub patch: bool,
    pub release: bool,
    pub stage: bool,
    pub next_stage: Option<ReleaseStage>,
}

impl Increment {
    pub fn major() -> Self {
        Increment {
            major: true,
            ..Default::default()
        }
    }

    pub fn minor() -> Self {
        Increment {
            minor: true,
            ..Default::default()
        }
    }

    pub fn patch() -> Self {
        Increment {
            patch: true,
            ..Default::default()
        }
    }

    pub fn release() -> Self {
        Increment {
            release: true,
            ..Default::default()
        }
    }

    pub fn stage() -> Self {
        Increment {
            stage: true,
            ..Default::default()
        }
    }

    /// Also advance the stage
    pub fn and_stage(mut self) -> Self {
        self.stage = true;
        self
    }

    /// Force the stage the incremented EVR moves to
    pub fn with_next_stage(mut self, stage: ReleaseStage) -> Self {
        self.next_stage = Some(stage);
        self
    }

    fn bumps_version(&self) -> bool {
        self.major || self.minor || self.patch
    }
}

/// Kind of version update requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Major,
    Minor,
    Patch,
    Release,
    Stage,
}

impl From<UpdateKind> for Increment {
    fn from(kind: UpdateKind) -> Self {
        match kind {
            UpdateKind::Major => Increment::major(),
            UpdateKind::Minor => Increment::minor(),
            UpdateKind::Patch => Increment::patch(),
            UpdateKind::Release => Increment::release(),
            UpdateKind::Stage => Increment::stage(),
        }
    }
}

/// Package epoch, version and release
#[derive(Debug, Clone)]
pub struct Evr {
    epoch: u32,
    version_major: u32,
    version_minor: u32,
    version_patch: u32,
    release_major: u32,
    release_minor: u32,
    release_stage: ReleaseStage,
    commit: Option<String>,
}

impl Evr {
    /// Build an EVR from explicit components, checking the stage invariants
    pub fn new(
        epoch: u32,
        version: (u32, u32, u32),
        release_major: u32,
        release_minor: u32,
        release_stage: ReleaseStage,
    ) -> Result<Self> {
        let evr = Evr {
            epoch,
            version_major: version.0,
            version_minor: version.1,
            version_patch: version.2,
            release_major,
            release_minor,
            release_stage,
            commit: None,
        };
        evr.validate()?;
        Ok(evr)
    }

    /// Parse version and release strings
    ///
    /// A release of `"nightly"` is replaced by a generated nightly release
    /// stamped with the current local time, which requires `commit_hash`.
    pub fn parse(version: &str, release: &str, commit_hash: Option<&str>) -> Result<Self> {
        if release.trim() == NIGHTLY_RELEASE {
            let commit = commit_hash.ok_or_else(|| {
                RelengError::configuration("Cannot create nightly EVR without commit hash")
            })?;
            return Self::nightly_at(version, commit, Local::now().naive_local());
        }

        let mut evr = Self::from_parts(version.trim(), release.trim())?;
        evr.commit = commit_hash.map(str::to_string);
        Ok(evr)
    }

    /// Build a nightly EVR for `version` as if built at `built_at`
    pub fn nightly_at(version: &str, commit_hash: &str, built_at: NaiveDateTime) -> Result<Self> {
        let commit_hash = commit_hash.trim();
        if commit_hash.is_empty() {
            return Err(RelengError::configuration(
                "Cannot create nightly EVR without commit hash",
            ));
        }

        let marker = NightlyMarker::new(built_at, commit_hash);
        let mut evr = Self::from_parts(version.trim(), &format!("0.0.{}", marker))?;
        evr.commit = Some(commit_hash.to_string());
        Ok(evr)
    }

    /// The lowest possible EVR, `0.0.0-0`
    ///
    /// This is a comparison sentinel and is not itself a valid release.
    pub fn lowest() -> Self {
        Evr {
            epoch: 0,
            version_major: 0,
            version_minor: 0,
            version_patch: 0,
            release_major: 0,
            release_minor: 0,
            release_stage: ReleaseStage::Ga,
            commit: None,
        }
    }

    fn from_parts(version: &str, release: &str) -> Result<Self> {
        let (epoch, version_major, version_minor, version_patch) = Self::parse_version(version)?;
        let (release_major, release_minor, release_stage) = Self::parse_release(release)?;

        let evr = Evr {
            epoch,
            version_major,
            version_minor,
            version_patch,
            release_major,
            release_minor,
            release_stage,
            commit: None,
        };
        evr.validate()?;
        Ok(evr)
    }

    fn parse_version(version: &str) -> Result<(u32, u32, u32, u32)> {
        let field = ParseField::Version;
        let caps =
            captures(VERSION_PATTERN, version).ok_or_else(|| RelengError::parse(field, version))?;

        Ok((
            number(&caps, "epoch", field, version)?,
            number(&caps, "major", field, version)?,
            number(&caps, "minor", field, version)?,
            number(&caps, "patch", field, version)?,
        ))
    }

    fn parse_release(release: &str) -> Result<(u32, u32, ReleaseStage)> {
        let field = ParseField::Release;
        let caps =
            captures(RELEASE_PATTERN, release).ok_or_else(|| RelengError::parse(field, release))?;

        let stage = match caps.name("stage") {
            Some(m) => m
                .as_str()
                .parse::<ReleaseStage>()
                .map_err(|_| RelengError::parse(field, release))?,
            None => ReleaseStage::Ga,
        };

        Ok((
            number(&caps, "major", field, release)?,
            number(&caps, "minor", field, release)?,
            stage,
        ))
    }

    fn validate(&self) -> Result<()> {
        match &self.release_stage {
            stage if stage.is_prerelease() && self.release_major != 0 => {
                Err(RelengError::validation(format!(
                    "Release major version must be 0 for stage {}, got {}",
                    stage,
                    self.release()
                )))
            }
            ReleaseStage::Ga if self.release_major < 1 => Err(RelengError::validation(format!(
                "Release major version must be at least 1 for a GA release, got {}",
                self.release()
            ))),
            ReleaseStage::Nightly(_) if self.release_major != 0 || self.release_minor != 0 => {
                Err(RelengError::validation(format!(
                    "Nightly release must be 0.0, got {}",
                    self.release()
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn version_major(&self) -> u32 {
        self.version_major
    }

    pub fn version_minor(&self) -> u32 {
        self.version_minor
    }

    pub fn version_patch(&self) -> u32 {
        self.version_patch
    }

    pub fn release_major(&self) -> u32 {
        self.release_major
    }

    pub fn release_minor(&self) -> u32 {
        self.release_minor
    }

    pub fn release_stage(&self) -> &ReleaseStage {
        &self.release_stage
    }

    /// Commit hash supplied at construction, if any
    pub fn commit_hash(&self) -> Option<&str> {
        self.commit.as_deref()
    }

    /// `major.minor.patch` without the epoch
    pub fn bare_version(&self) -> String {
        format!(
            "{}.{}.{}",
            self.version_major, self.version_minor, self.version_patch
        )
    }

    /// Version half, e.g. `1:2.3.4`; a zero epoch is left off
    pub fn version(&self) -> String {
        let version = self.bare_version();
        if self.epoch != 0 {
            format!("{}:{}", self.epoch, version)
        } else {
            version
        }
    }

    /// Release half, e.g. `0.2.beta`, `1` or `2.1`
    pub fn release(&self) -> String {
        match self.release_stage.label() {
            Some(label) => format!("{}.{}.{}", self.release_major, self.release_minor, label),
            None if self.release_minor != 0 => {
                format!("{}.{}", self.release_major, self.release_minor)
            }
            None => self.release_major.to_string(),
        }
    }

    /// Release with the dist macro appended, for spec files
    pub fn dist_release(&self) -> String {
        format!("{}{}", self.release(), DIST_MACRO)
    }

    pub fn is_nightly(&self) -> bool {
        matches!(self.release_stage, ReleaseStage::Nightly(_))
    }

    /// Whether this build should be tagged; nightlies are not
    pub fn is_tagged_release(&self) -> bool {
        !self.is_nightly()
    }

    /// Public version identifier following PEP 440
    ///
    /// - `1:1.2.0-1` -> `1!1.2`
    /// - `1.2.3-0.2.alpha` -> `1.2.3a2`
    /// - `1.2.3-0.0.n201610191230gitabc1234` -> `1.2.3dev201610191230`
    /// - `1.2.3-2` -> `1.2.3.post2`
    pub fn python_version(&self) -> String {
        let mut version = String::new();
        if self.epoch != 0 {
            version.push_str(&format!("{}!", self.epoch));
        }
        version.push_str(&format!("{}.{}", self.version_major, self.version_minor));
        if self.version_patch != 0 {
            version.push_str(&format!(".{}", self.version_patch));
        }

        match &self.release_stage {
            ReleaseStage::Nightly(marker) => version.push_str(&format!("dev{}", marker.timestamp)),
            ReleaseStage::Alpha => version.push_str(&format!("a{}", self.release_minor)),
            ReleaseStage::Beta => version.push_str(&format!("b{}", self.release_minor)),
            ReleaseStage::Rc => version.push_str(&format!("rc{}", self.release_minor)),
            ReleaseStage::Ga if self.release_major > 1 => {
                version.push_str(&format!(".post{}", self.release_major))
            }
            ReleaseStage::Ga => {}
        }
        version
    }

    /// Derive the next EVR; the receiver is left untouched
    ///
    /// Fails if the result would break the stage invariants, would overflow a
    /// counter, or would not sort above `self`, e.g. advancing a GA release to
    /// alpha without a version bump.
    pub fn increment(&self, request: &Increment) -> Result<Evr> {
        let target = match &request.next_stage {
            Some(stage) => stage.clone(),
            None if request.stage => self.release_stage.next(),
            None if request.release => ReleaseStage::Ga,
            None => self.release_stage.clone(),
        };
        let full_release = request.release || target == ReleaseStage::Ga;

        let bump = |value: u32, component: &str| {
            value.checked_add(1).ok_or_else(|| {
                RelengError::validation(format!("Cannot increment {} of {}", component, self))
            })
        };

        let mut next = self.clone();
        next.commit = None;

        if request.major {
            next.version_major = bump(self.version_major, "major version")?;
            next.version_minor = 0;
            next.version_patch = 0;
        } else if request.minor {
            next.version_minor = bump(self.version_minor, "minor version")?;
            next.version_patch = 0;
        } else if request.patch {
            next.version_patch = bump(self.version_patch, "patch version")?;
        }

        let (release_major, release_minor, release_stage) =
            match (request.bumps_version(), full_release) {
                (true, true) => (1, 0, ReleaseStage::Ga),
                (true, false) => (0, 1, target),
                (false, true) => (bump(self.release_major, "release")?, 0, ReleaseStage::Ga),
                (false, false) if request.stage => (0, bump(self.release_minor, "release")?, target),
                (false, false) => (
                    0,
                    bump(self.release_minor, "release")?,
                    self.release_stage.clone(),
                ),
            };
        next.release_major = release_major;
        next.release_minor = release_minor;
        next.release_stage = release_stage;

        next.validate()?;
        if next <= *self {
            return Err(RelengError::validation(format!(
                "Increment of {} would produce {}, which is not newer",
                self, next
            )));
        }

        debug!(from = %self, to = %next, "incremented EVR");
        Ok(next)
    }

    fn numeric_key(&self) -> (u32, u32, u32, u32, u32, u32) {
        (
            self.epoch,
            self.version_major,
            self.version_minor,
            self.version_patch,
            self.release_major,
            self.release_minor,
        )
    }
}

impl Ord for Evr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric_key()
            .cmp(&other.numeric_key())
            .then_with(|| self.release_stage.cmp(&other.release_stage))
    }
}

impl PartialOrd for Evr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Evr {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Evr {}

impl Hash for Evr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numeric_key().hash(state);
        self.release_stage.hash(state);
    }
}

impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version(), self.release())
    }
}

impl FromStr for Evr {
    type Err = RelengError;

    /// Parse `version-release`, splitting on the last `-`
    fn from_str(s: &str) -> Result<Self> {
        let (version, release) = s
            .trim()
            .rsplit_once('-')
            .ok_or_else(|| RelengError::parse(ParseField::Version, s))?;
        Evr::parse(version, release, None)
    }
}
