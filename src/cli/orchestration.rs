//! Workflow orchestration behind the CLI subcommands
//!
//! Each workflow takes plain argument structs so it can be called
//! programmatically (and tested) without depending on clap.

use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::domain::{Evr, Increment, ReleaseStage, UpdateKind};
use crate::error::Result;
use crate::git::Repository;
use crate::promotion::{self, MergeRecord, PromotionChain};
use crate::specfile;

/// Arguments shared by the chain-based workflows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChainArgs {
    /// Branch (or tag) the chain starts at
    pub branch: String,

    /// Branch a tag merges into before moving forward
    pub parent_branch: Option<String>,

    /// Leave master out of the chain
    pub skip_master: bool,
}

impl ChainArgs {
    fn chain<R: Repository>(&self, repo: &R, config: &Config) -> Result<PromotionChain> {
        promotion::discover_chain(
            repo,
            &self.branch,
            self.parent_branch.as_deref(),
            self.skip_master || config.promotion.skip_master,
            &config.promotion.remote,
        )
    }
}

/// Compute the promotion chain for a branch
pub fn run_promotion_chain<R: Repository>(
    repo: &R,
    args: &ChainArgs,
    config: &Config,
) -> Result<PromotionChain> {
    args.chain(repo, config)
}

/// Check that a branch has been merged forward along its whole chain
///
/// Returns the verified chain, or the first `PromotionViolation` found.
pub fn run_check_promoted<R: Repository>(
    repo: &R,
    args: &ChainArgs,
    config: &Config,
) -> Result<PromotionChain> {
    let chain = args.chain(repo, config)?;
    promotion::check_merge_forward(repo, &chain)?;
    info!(branch = %args.branch, "branch has been merged forward");
    Ok(chain)
}

/// Arguments for the merge-forward workflow
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeForwardArgs {
    pub parent_branch: Option<String>,
    pub skip_master: bool,
    pub push: bool,
}

/// Result of a merge-forward run
#[derive(Debug, Clone, PartialEq)]
pub struct MergeForwardResult {
    pub chain: PromotionChain,
    pub merges: Vec<MergeRecord>,
}

/// Merge the checked-out branch's upstream forward along its chain
pub fn run_merge_forward<R: Repository>(
    repo: &R,
    args: &MergeForwardArgs,
    config: &Config,
) -> Result<MergeForwardResult> {
    let upstream = repo.upstream_branch()?;
    let chain_args = ChainArgs {
        branch: upstream,
        parent_branch: args.parent_branch.clone(),
        skip_master: args.skip_master,
    };
    let chain = chain_args.chain(repo, config)?;
    let merges = promotion::merge_forward(repo, &chain, &config.promotion.remote, args.push)?;

    Ok(MergeForwardResult { chain, merges })
}

/// How the new EVR is determined
#[derive(Debug, Clone, PartialEq)]
pub enum VersionUpdate {
    /// Increment the spec file's current EVR
    Increment {
        kind: UpdateKind,
        next_stage: Option<ReleaseStage>,
    },
    /// Use this `[epoch:]version-release` string as is
    Explicit(String),
}

/// Arguments for the update-version workflow
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateVersionArgs {
    pub specfile: PathBuf,
    pub update: VersionUpdate,
    pub dry_run: bool,
}

/// Result of an update-version run
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateVersionResult {
    pub evr: Evr,
    pub written: bool,
}

/// Compute a new EVR for a spec file and write it unless this is a dry run
pub fn run_update_version(args: &UpdateVersionArgs, config: &Config) -> Result<UpdateVersionResult> {
    let evr = match &args.update {
        VersionUpdate::Explicit(evr) => evr.parse::<Evr>()?,
        VersionUpdate::Increment { kind, next_stage } => {
            let mut request = Increment::from(*kind);
            if let Some(stage) = next_stage {
                request = request.with_next_stage(stage.clone());
            }
            specfile::read_spec_evr(&args.specfile)?.increment(&request)?
        }
    };

    if args.dry_run {
        return Ok(UpdateVersionResult {
            evr,
            written: false,
        });
    }

    specfile::write_spec_evr(&args.specfile, &evr, config.packaging.append_dist)?;
    Ok(UpdateVersionResult { evr, written: true })
}
