use crate::error::{ParseField, RelengError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

const BRANCH_PATTERN: &str = r"^(?P<version>\d+\.\d+)-(?P<stream>dev|release)$";

/// Name of the mainline branch, the terminal promotion target
pub const MASTER: &str = "master";

/// Dotted `major.minor` version of a branch, ordered numerically per component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchVersion {
    pub major: u32,
    pub minor: u32,
}

impl BranchVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        BranchVersion { major, minor }
    }
}

impl FromStr for BranchVersion {
    type Err = RelengError;

    /// Parse the dotted `major.minor` form
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RelengError::parse(ParseField::Branch, s);
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        Ok(BranchVersion::new(
            major.parse().map_err(|_| invalid())?,
            minor.parse().map_err(|_| invalid())?,
        ))
    }
}

impl fmt::Display for BranchVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Which line of work a versioned branch carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Dev,
    Release,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Dev => write!(f, "dev"),
            Stream::Release => write!(f, "release"),
        }
    }
}

/// A branch following the `<major>.<minor>-<dev|release>` convention, or `master`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchName {
    Master,
    Versioned {
        version: BranchVersion,
        stream: Stream,
    },
}

impl BranchName {
    /// The `-dev` branch for a version
    pub fn dev(version: BranchVersion) -> Self {
        BranchName::Versioned {
            version,
            stream: Stream::Dev,
        }
    }

    pub fn version(&self) -> Option<BranchVersion> {
        match self {
            BranchName::Master => None,
            BranchName::Versioned { version, .. } => Some(*version),
        }
    }

    pub fn stream(&self) -> Option<Stream> {
        match self {
            BranchName::Master => None,
            BranchName::Versioned { stream, .. } => Some(*stream),
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self, BranchName::Master)
    }
}

impl FromStr for BranchName {
    type Err = RelengError;

    fn from_str(s: &str) -> Result<Self> {
        if s == MASTER {
            return Ok(BranchName::Master);
        }

        let captures = Regex::new(BRANCH_PATTERN)
            .ok()
            .and_then(|re| re.captures(s))
            .ok_or_else(|| RelengError::parse(ParseField::Branch, s))?;

        let version = captures["version"]
            .parse::<BranchVersion>()
            .map_err(|_| RelengError::parse(ParseField::Branch, s))?;
        let stream = match &captures["stream"] {
            "release" => Stream::Release,
            _ => Stream::Dev,
        };

        Ok(BranchName::Versioned { version, stream })
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchName::Master => write!(f, "{}", MASTER),
            BranchName::Versioned { version, stream } => write!(f, "{}-{}", version, stream),
        }
    }
}
