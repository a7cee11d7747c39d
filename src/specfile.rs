//! Reading and writing the version fields of an RPM spec file
//!
//! Only the `Epoch:`, `Version:` and `Release:` header lines are touched;
//! everything else in the file is written back byte for byte.

use crate::domain::Evr;
use crate::error::{RelengError, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

fn field_regex(field: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?i)^({}:\s*)(.+?)\s*$", regex::escape(field)))
        .map_err(|e| RelengError::validation(format!("Invalid spec field '{}': {}", field, e)))
}

/// First value of a header field, e.g. `Version`
pub fn get_spec_field(specfile: &Path, field: &str) -> Result<Option<String>> {
    let content = fs::read_to_string(specfile)?;
    let re = field_regex(field)?;

    Ok(content
        .lines()
        .find_map(|line| re.captures(line).map(|caps| caps[2].to_string())))
}

/// Replace the value of every `field:` line in `content`
///
/// Returns the new content and how many lines changed. Line endings are kept.
fn replace_field(content: &str, field: &str, value: &str) -> Result<(String, usize)> {
    let re = field_regex(field)?;

    let mut replaced = 0;
    let mut updated = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        let (body, ending) = match line.strip_suffix("\r\n") {
            Some(body) => (body, "\r\n"),
            None => match line.strip_suffix('\n') {
                Some(body) => (body, "\n"),
                None => (line, ""),
            },
        };

        match re.captures(body) {
            Some(caps) => {
                updated.push_str(&caps[1]);
                updated.push_str(value);
                updated.push_str(ending);
                replaced += 1;
            }
            None => updated.push_str(line),
        }
    }

    Ok((updated, replaced))
}

/// Replace the value of every `field:` line, returning how many lines changed
pub fn set_spec_field(specfile: &Path, field: &str, value: &str) -> Result<usize> {
    let content = fs::read_to_string(specfile)?;
    let (updated, replaced) = replace_field(&content, field, value)?;

    fs::write(specfile, updated)?;
    info!(field, value, specfile = %specfile.display(), "updated spec field");
    Ok(replaced)
}

/// Release with any trailing macro such as `%{?dist}` removed
fn strip_release_macros(release: &str) -> &str {
    release
        .split("%{")
        .next()
        .unwrap_or(release)
        .trim_end_matches('.')
        .trim()
}

/// Read the EVR declared by a spec file
pub fn read_spec_evr(specfile: &Path) -> Result<Evr> {
    let missing = |field: &str| {
        RelengError::validation(format!(
            "{} has no {} field",
            specfile.display(),
            field
        ))
    };

    let version = get_spec_field(specfile, "Version")?.ok_or_else(|| missing("Version"))?;
    let release = get_spec_field(specfile, "Release")?.ok_or_else(|| missing("Release"))?;
    let version = match get_spec_field(specfile, "Epoch")? {
        Some(epoch) => format!("{}:{}", epoch, version),
        None => version,
    };

    Evr::parse(&version, strip_release_macros(&release), None)
}

/// Write `evr` into the spec file's `Version:`/`Release:` (and `Epoch:`) fields
///
/// The file is only written once every field has been replaced, so a spec
/// missing `Version:` or `Release:` is left untouched. An existing `Epoch:`
/// line is always rewritten, including to `0`.
pub fn write_spec_evr(specfile: &Path, evr: &Evr, append_dist: bool) -> Result<()> {
    let release = if append_dist {
        evr.dist_release()
    } else {
        evr.release()
    };
    let missing = |field: &str| {
        RelengError::validation(format!("{} has no {} field", specfile.display(), field))
    };

    let content = fs::read_to_string(specfile)?;
    let (content, versions) = replace_field(&content, "Version", &evr.bare_version())?;
    if versions == 0 {
        return Err(missing("Version"));
    }
    let (content, releases) = replace_field(&content, "Release", &release)?;
    if releases == 0 {
        return Err(missing("Release"));
    }
    let (content, epochs) = replace_field(&content, "Epoch", &evr.epoch().to_string())?;
    if epochs == 0 && evr.epoch() != 0 {
        warn!(specfile = %specfile.display(), "spec file has no Epoch field, epoch not written");
    }

    fs::write(specfile, content)?;
    info!(evr = %evr, specfile = %specfile.display(), "wrote EVR to spec file");
    Ok(())
}
