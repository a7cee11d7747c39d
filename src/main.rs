use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use releng::cli::orchestration::{
    self, ChainArgs, MergeForwardArgs, UpdateVersionArgs, VersionUpdate,
};
use releng::config;
use releng::domain::{Evr, ReleaseStage, UpdateKind};
use releng::git::Git2Repository;
use releng::{ui, RelengError};

#[derive(Parser)]
#[command(
    name = "releng",
    version,
    about = "Check branch promotion and manage package EVRs for release engineering"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the named branch has been merged forward
    CheckBranchPromoted {
        #[arg(help = "Path to git repository to check")]
        git_directory: PathBuf,

        #[arg(help = "Name of branch to check")]
        branch: String,

        #[arg(long, help = "Branch a tag merges into before moving forward")]
        parent_branch: Option<String>,

        #[arg(long, help = "Leave master out of the branch promotion chain")]
        skip_master: bool,
    },

    /// Print the promotion chain for a branch
    PromotionChain {
        #[arg(help = "Path to git repository")]
        git_directory: PathBuf,

        #[arg(help = "Branch (or tag) the chain starts at")]
        branch: String,

        #[arg(long, help = "Branch a tag merges into before moving forward")]
        parent_branch: Option<String>,

        #[arg(long, help = "Leave master out of the branch promotion chain")]
        skip_master: bool,

        #[arg(long, help = "Also report how far the chain has been merged")]
        status: bool,
    },

    /// Merge the checked-out branch forward along its promotion chain
    MergeForward {
        #[arg(help = "Path to git repository")]
        git_directory: PathBuf,

        #[arg(long, help = "Push each merged branch to the remote")]
        push: bool,

        #[arg(short, long, help = "Skip confirmation prompts")]
        force: bool,

        #[arg(long, help = "Branch a tag merges into before moving forward")]
        parent_branch: Option<String>,

        #[arg(long, help = "Leave master out of the branch promotion chain")]
        skip_master: bool,
    },

    /// Update the Version and Release fields of a spec file
    UpdateVersion {
        #[arg(help = "Path to a spec file to update")]
        specfile: PathBuf,

        #[arg(
            short = 't',
            long,
            value_enum,
            conflicts_with = "evr",
            help = "Type of version update to apply"
        )]
        update_type: Option<UpdateTypeArg>,

        #[arg(short, long, help = "Full EVR ([epoch:]version-release) to write")]
        evr: Option<String>,

        #[arg(
            short,
            long,
            value_enum,
            help = "Next release stage, useful if skipping a stage"
        )]
        stage: Option<StageArg>,

        #[arg(short, long, help = "Print the new EVR without writing it")]
        dry_run: bool,
    },

    /// Show the canonical, dist and public forms of an EVR
    Evr {
        #[arg(help = "Version, [epoch:]major.minor[.patch]")]
        version: String,

        #[arg(help = "Release, major[.minor][.stage] or 'nightly'")]
        release: String,

        #[arg(long, help = "Commit hash, required for nightly releases")]
        commit: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum UpdateTypeArg {
    Major,
    Minor,
    Patch,
    Release,
    Stage,
}

impl From<UpdateTypeArg> for UpdateKind {
    fn from(arg: UpdateTypeArg) -> Self {
        match arg {
            UpdateTypeArg::Major => UpdateKind::Major,
            UpdateTypeArg::Minor => UpdateKind::Minor,
            UpdateTypeArg::Patch => UpdateKind::Patch,
            UpdateTypeArg::Release => UpdateKind::Release,
            UpdateTypeArg::Stage => UpdateKind::Stage,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Alpha,
    Beta,
    Rc,
}

impl From<StageArg> for ReleaseStage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Alpha => ReleaseStage::Alpha,
            StageArg::Beta => ReleaseStage::Beta,
            StageArg::Rc => ReleaseStage::Rc,
        }
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("releng=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::display_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::CheckBranchPromoted {
            git_directory,
            branch,
            parent_branch,
            skip_master,
        } => {
            let repo = Git2Repository::open(&git_directory)?;
            let chain_args = ChainArgs {
                branch: branch.clone(),
                parent_branch,
                skip_master,
            };
            match orchestration::run_check_promoted(&repo, &chain_args, &config) {
                Ok(chain) => {
                    ui::display_chain(&chain);
                    ui::display_success(&format!("{} has been merged forward.", branch));
                    Ok(())
                }
                Err(RelengError::PromotionViolation { src, dest, commits }) => {
                    anyhow::bail!(
                        "in {}: branch {} has not been merged into {} ({} commits missing)",
                        git_directory.display(),
                        src,
                        dest,
                        commits
                    )
                }
                Err(e) => Err(e.into()),
            }
        }

        Command::PromotionChain {
            git_directory,
            branch,
            parent_branch,
            skip_master,
            status,
        } => {
            let repo = Git2Repository::open(&git_directory)?;
            let chain_args = ChainArgs {
                branch,
                parent_branch,
                skip_master,
            };
            let chain = orchestration::run_promotion_chain(&repo, &chain_args, &config)?;
            for branch in &chain {
                println!("{}", branch);
            }
            if status {
                let state = releng::promotion::promotion_status(&repo, &chain)?;
                ui::display_status(&ui::format_status(&chain, state));
            }
            Ok(())
        }

        Command::MergeForward {
            git_directory,
            push,
            force,
            parent_branch,
            skip_master,
        } => {
            if push && !force && !ui::confirm_action("Push merged branches to the remote?")? {
                println!("Operation cancelled by user.");
                return Ok(());
            }

            let repo = Git2Repository::open(&git_directory)?;
            let merge_args = MergeForwardArgs {
                parent_branch,
                skip_master,
                push,
            };
            let result = orchestration::run_merge_forward(&repo, &merge_args, &config)?;
            ui::display_chain(&result.chain);
            ui::display_merges(&result.merges);
            Ok(())
        }

        Command::UpdateVersion {
            specfile,
            update_type,
            evr,
            stage,
            dry_run,
        } => {
            let update = match evr {
                Some(evr) => VersionUpdate::Explicit(evr),
                None => VersionUpdate::Increment {
                    kind: update_type.unwrap_or(UpdateTypeArg::Stage).into(),
                    next_stage: stage.map(ReleaseStage::from),
                },
            };
            let update_args = UpdateVersionArgs {
                specfile: specfile.clone(),
                update,
                dry_run,
            };
            let result = orchestration::run_update_version(&update_args, &config)?;
            if result.written {
                ui::display_success(&format!(
                    "Wrote EVR {} to {}",
                    result.evr,
                    specfile.display()
                ));
            } else {
                println!("Would write EVR {} to {}", result.evr, specfile.display());
            }
            Ok(())
        }

        Command::Evr {
            version,
            release,
            commit,
        } => {
            let evr = Evr::parse(&version, &release, commit.as_deref())?;
            ui::display_evr(&evr);
            Ok(())
        }
    }
}
