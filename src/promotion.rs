//! Branch promotion: which branches a change must be merged forward into
//!
//! Work lands on `x.y-release` or `x.y-dev` branches. A release branch merges
//! into its own dev branch first, then every newer dev branch of the same major
//! version is merged into in ascending order, ending at `master`:
//!
//! ```text
//! 2.5-release -> 2.5-dev -> 2.6-dev -> 2.7-dev -> master
//! ```
//!
//! Chains are computed fresh from the current branch list on every call, and
//! promotion status is recomputed from the repository rather than stored.

use crate::domain::{BranchName, BranchVersion, Stream, MASTER};
use crate::error::{RelengError, Result};
use crate::git::Repository;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Ordered, duplicate-free list of remote-qualified branches to merge through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionChain {
    branches: Vec<String>,
}

impl PromotionChain {
    fn qualified(remote: &str, branches: Vec<String>) -> Self {
        PromotionChain {
            branches: branches
                .into_iter()
                .map(|branch| format!("{}/{}", remote, branch))
                .collect(),
        }
    }

    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Consecutive `(src, dest)` merge obligations: `[a, b, c]` yields `(a, b), (b, c)`
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.branches
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }
}

impl fmt::Display for PromotionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.branches.join(" -> "))
    }
}

impl<'a> IntoIterator for &'a PromotionChain {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.branches.iter()
    }
}

/// How far along its promotion chain a branch has been merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionStatus {
    /// The first hop has not been merged
    NotStarted,
    /// Every hop before pair `at` is merged, pair `at` is not
    PartiallyPromoted { at: usize },
    FullyPromoted,
}

/// A merge performed by [merge_forward]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    pub src: String,
    pub dest: String,
    pub commit: String,
}

/// Trim whitespace and any leading `<remote>/`
fn local_name<'a>(reference: &'a str, remote: &str) -> &'a str {
    let reference = reference.trim();
    reference
        .strip_prefix(remote)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(reference)
}

/// Compute the promotion chain for `start_ref`
///
/// # Arguments
/// * `start_ref` - Branch (or tag, with `parent_branch` set) the chain starts at
/// * `parent_branch` - Branch a tag is merged into before moving forward, e.g. for a hotfix
/// * `skip_master` - Stop before `master`, for lines newer than the mainline's major
/// * `remote` - Remote used to qualify every chain entry
/// * `known_branches` - Branch names present on `remote`, without the remote prefix
///
/// # Errors
/// * `Validation` - the chain origin is not an `x.y-dev`/`x.y-release` branch
/// * `MissingBranch` - a `-dev` branch the chain passes through does not exist
pub fn promotion_chain(
    start_ref: &str,
    parent_branch: Option<&str>,
    skip_master: bool,
    remote: &str,
    known_branches: &[String],
) -> Result<PromotionChain> {
    let start = local_name(start_ref, remote);
    if start == MASTER {
        return Ok(PromotionChain::qualified(remote, vec![MASTER.to_string()]));
    }

    let mut chain = vec![start.to_string()];
    if let Some(parent) = parent_branch.map(|p| local_name(p, remote)) {
        if parent != start {
            chain.push(parent.to_string());
        }
    }

    let origin = chain.last().cloned().unwrap_or_default();
    let (source_version, source_stream) = match origin.parse::<BranchName>() {
        Ok(BranchName::Versioned { version, stream }) => (version, stream),
        Ok(BranchName::Master) | Err(_) => {
            return Err(RelengError::validation(format!(
                "{} is not a valid branch from which to merge forward, \
                 must be an x.y-dev or x.y-release branch",
                origin
            )))
        }
    };

    let known: HashSet<&str> = known_branches
        .iter()
        .map(|branch| local_name(branch, remote))
        .collect();
    let mut required = Vec::new();

    if source_stream == Stream::Release {
        let sibling = BranchName::dev(source_version).to_string();
        chain.push(sibling.clone());
        required.push(sibling);
    }

    // never promote across a major version boundary automatically
    let targets: BTreeSet<BranchVersion> = known
        .iter()
        .filter_map(|branch| branch.parse::<BranchName>().ok())
        .filter_map(|branch| branch.version())
        .filter(|version| *version > source_version && version.major == source_version.major)
        .collect();

    for version in targets {
        let dev = BranchName::dev(version).to_string();
        chain.push(dev.clone());
        required.push(dev);
    }

    let missing: Vec<String> = required
        .into_iter()
        .filter(|branch| !known.contains(branch.as_str()))
        .collect();
    if !missing.is_empty() {
        warn!(?missing, "promotion chain references branches that do not exist");
        return Err(RelengError::MissingBranch { branches: missing });
    }

    if !skip_master {
        chain.push(MASTER.to_string());
    }

    let chain = PromotionChain::qualified(remote, chain);
    debug!(%chain, "computed promotion chain");
    Ok(chain)
}

/// Compute the promotion chain using the branches currently on `remote`
pub fn discover_chain<R: Repository>(
    repo: &R,
    start_ref: &str,
    parent_branch: Option<&str>,
    skip_master: bool,
    remote: &str,
) -> Result<PromotionChain> {
    let known = repo.remote_branches(remote)?;
    promotion_chain(start_ref, parent_branch, skip_master, remote, &known)
}

/// Verify that every hop of `chain` has been merged forward
///
/// Stops at the first `(src, dest)` pair where `src` has commits missing
/// from `dest` and reports it as a `PromotionViolation`.
pub fn check_merge_forward<R: Repository>(repo: &R, chain: &PromotionChain) -> Result<()> {
    for (src, dest) in chain.pairs() {
        info!("checking log comparison of {} -> {}", src, dest);
        let missing = repo.unmerged_commits(src, dest)?;
        if !missing.is_empty() {
            return Err(RelengError::PromotionViolation {
                src: src.to_string(),
                dest: dest.to_string(),
                commits: missing.len(),
            });
        }
    }
    Ok(())
}

/// Recompute how far `chain` has been promoted
pub fn promotion_status<R: Repository>(repo: &R, chain: &PromotionChain) -> Result<PromotionStatus> {
    for (index, (src, dest)) in chain.pairs().enumerate() {
        if !repo.unmerged_commits(src, dest)?.is_empty() {
            return Ok(match index {
                0 => PromotionStatus::NotStarted,
                at => PromotionStatus::PartiallyPromoted { at },
            });
        }
    }
    Ok(PromotionStatus::FullyPromoted)
}

/// Merge every hop of `chain` forward into local branches
///
/// Each destination receives an "ours" merge of its source, so the merge is
/// recorded without changing the destination's content. Once a hop has been
/// merged locally, the next hop uses that local branch as its source.
pub fn merge_forward<R: Repository>(
    repo: &R,
    chain: &PromotionChain,
    remote: &str,
    push: bool,
) -> Result<Vec<MergeRecord>> {
    let mut records = Vec::new();
    let mut merged_locally: Option<&str> = None;

    for (src, dest) in chain.pairs() {
        let local_src = local_name(src, remote);
        let source = match merged_locally {
            Some(previous) if previous == local_src => local_src.to_string(),
            _ => src.to_string(),
        };
        let dest_branch = local_name(dest, remote);

        match repo.merge_ours(&source, dest_branch, remote)? {
            Some(commit) => {
                info!("merged {} into {}", source, dest_branch);
                if push {
                    repo.push_branch(remote, dest_branch)?;
                }
                records.push(MergeRecord {
                    src: source,
                    dest: dest_branch.to_string(),
                    commit,
                });
                merged_locally = Some(dest_branch);
            }
            None => {
                debug!("{} already merged into {}", source, dest_branch);
                merged_locally = None;
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branches(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_master_is_already_promoted() {
        let chain = promotion_chain("master", None, false, "origin", &[]).unwrap();
        assert_eq!(chain.branches(), ["origin/master"]);
        assert_eq!(chain.pairs().count(), 0);
    }

    #[test]
    fn test_local_name_strips_remote() {
        assert_eq!(local_name(" origin/2.6-dev\n", "origin"), "2.6-dev");
        assert_eq!(local_name("2.6-dev", "origin"), "2.6-dev");
        assert_eq!(local_name("originals/2.6-dev", "origin"), "originals/2.6-dev");
    }

    #[test]
    fn test_numeric_sort_of_targets() {
        let known = branches(&["2.9-dev", "2.10-dev", "2.8-dev", "master"]);
        let chain = promotion_chain("2.8-dev", None, false, "origin", &known).unwrap();
        assert_eq!(
            chain.branches(),
            [
                "origin/2.8-dev",
                "origin/2.9-dev",
                "origin/2.10-dev",
                "origin/master"
            ]
        );
    }

    #[test]
    fn test_parent_branch_follows_tag() {
        let known = branches(&["2.5-release", "2.5-dev", "master"]);
        let chain =
            promotion_chain("2.5.3-1", Some("2.5-release"), false, "origin", &known).unwrap();
        assert_eq!(
            chain.branches(),
            [
                "origin/2.5.3-1",
                "origin/2.5-release",
                "origin/2.5-dev",
                "origin/master"
            ]
        );
    }

    #[test]
    fn test_invalid_origin_is_validation_error() {
        let err = promotion_chain("feature-x", None, false, "origin", &[]).unwrap_err();
        assert!(matches!(err, RelengError::Validation(_)));
        assert!(err.to_string().contains("feature-x"));
    }

    #[test]
    fn test_master_parent_branch_is_not_an_origin() {
        let known = branches(&["2.5-dev", "master"]);
        for skip_master in [false, true] {
            let err = promotion_chain("v1.0", Some("master"), skip_master, "origin", &known)
                .unwrap_err();
            assert!(matches!(err, RelengError::Validation(_)));
            assert!(err.to_string().contains("master"));
        }
    }

    #[test]
    fn test_release_sibling_must_exist() {
        let known = branches(&["2.5-release", "master"]);
        match promotion_chain("2.5-release", None, false, "origin", &known) {
            Err(RelengError::MissingBranch { branches }) => assert_eq!(branches, ["2.5-dev"]),
            other => panic!("expected missing branch error, got {:?}", other),
        }
    }

    #[test]
    fn test_pairs() {
        let known = branches(&["2.5-dev", "2.6-dev"]);
        let chain = promotion_chain("2.5-dev", None, false, "origin", &known).unwrap();
        let pairs: Vec<_> = chain.pairs().collect();
        assert_eq!(
            pairs,
            vec![
                ("origin/2.5-dev", "origin/2.6-dev"),
                ("origin/2.6-dev", "origin/master")
            ]
        );
    }

    #[test]
    fn test_display() {
        let known = branches(&["2.5-dev"]);
        let chain = promotion_chain("2.5-dev", None, false, "upstream", &known).unwrap();
        assert_eq!(chain.to_string(), "upstream/2.5-dev -> upstream/master");
    }
}
