use crate::error::{RelengError, Result};
use crate::git::CommitInfo;
use git2::{BranchType, Commit, Oid, Repository as Git2Repo, Signature};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository {
            repo: Mutex::new(repo),
        })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Git2Repo> {
        self.repo
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn resolve_commit<'r>(repo: &'r Git2Repo, refname: &str) -> Result<Commit<'r>> {
    Ok(repo.revparse_single(refname)?.peel_to_commit()?)
}

fn signature(repo: &Git2Repo) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig.to_owned()),
        Err(_) => Ok(Signature::now("releng", "releng@localhost")?),
    }
}

/// Push callbacks: credentials from SSH keys in ~/.ssh, then the SSH agent,
/// then git's default credential helpers; a rejected ref fails the push
fn remote_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        git2::Cred::default()
    });

    // the server reports rejected refs (e.g. protected branches) only here
    callbacks.push_update_reference(push_status);
    callbacks
}

fn push_status(refname: &str, status: Option<&str>) -> std::result::Result<(), git2::Error> {
    match status {
        Some(status) => {
            warn!(refname, status, "remote rejected push");
            Err(git2::Error::from_str(&format!(
                "Push of {} rejected by remote: {}",
                refname, status
            )))
        }
        None => Ok(()),
    }
}

/// Tip of local `dest_branch`, brought up to date with `<remote>/<dest_branch>`
///
/// A missing local branch is created from the remote-tracking ref, and one that
/// is behind it is fast-forwarded. A local branch already containing the remote
/// tip (e.g. an unpushed merge) is used as is. A diverged branch is an error.
fn local_destination<'r>(repo: &'r Git2Repo, dest_branch: &str, remote: &str) -> Result<Commit<'r>> {
    let tracking_name = format!("{}/{}", remote, dest_branch);
    let tracking = resolve_commit(repo, &tracking_name)?;

    let branch = match repo.find_branch(dest_branch, BranchType::Local) {
        Ok(branch) => branch,
        Err(e) if e.code() == git2::ErrorCode::NotFound => {
            debug!(branch = dest_branch, remote, "creating local branch from remote");
            repo.branch(dest_branch, &tracking, false)?;
            return Ok(tracking);
        }
        Err(e) => return Err(e.into()),
    };

    let local = branch.get().peel_to_commit()?;
    if local.id() == tracking.id() || repo.graph_descendant_of(local.id(), tracking.id())? {
        return Ok(local);
    }

    if !repo.graph_descendant_of(tracking.id(), local.id())? {
        return Err(RelengError::validation(format!(
            "Local branch {} has diverged from {}",
            dest_branch, tracking_name
        )));
    }

    debug!(branch = dest_branch, remote, "fast-forwarding local branch to remote");
    let mut reference = branch.into_reference();
    reference.set_target(
        tracking.id(),
        &format!("releng: fast-forward {} to {}", dest_branch, tracking_name),
    )?;
    Ok(tracking)
}

impl super::Repository for Git2Repository {
    fn remote_branches(&self, remote: &str) -> Result<Vec<String>> {
        let repo = self.lock();
        let prefix = format!("{}/", remote);

        let mut names = Vec::new();
        for entry in repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                if let Some(short) = name.strip_prefix(&prefix) {
                    if short != "HEAD" {
                        names.push(short.to_string());
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }

    fn unmerged_commits(&self, src: &str, dest: &str) -> Result<Vec<CommitInfo>> {
        let repo = self.lock();
        let src_oid = resolve_commit(&repo, src)?.id();
        let dest_oid = resolve_commit(&repo, dest)?.id();

        let mut revwalk = repo.revwalk()?;
        revwalk.push(src_oid)?;
        revwalk.hide(dest_oid)?;

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid: Oid = oid_result?;
            let commit = repo.find_commit(oid)?;

            commits.push(CommitInfo {
                hash: oid.to_string(),
                message: commit.message().unwrap_or("(empty message)").to_string(),
                author: commit.author().name().unwrap_or("unknown").to_string(),
            });
        }

        Ok(commits)
    }

    fn current_branch(&self) -> Result<String> {
        let repo = self.lock();
        let head = repo.head()?;
        if !head.is_branch() {
            return Err(RelengError::validation("HEAD is not on a branch"));
        }

        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| RelengError::validation("Current branch name is not valid UTF-8"))
    }

    fn upstream_branch(&self) -> Result<String> {
        let current = self.current_branch()?;
        let repo = self.lock();
        let branch = repo.find_branch(&current, BranchType::Local)?;
        let upstream = branch.upstream()?;

        upstream
            .name()?
            .map(str::to_string)
            .ok_or_else(|| RelengError::validation("Upstream branch name is not valid UTF-8"))
    }

    fn merge_ours(&self, src: &str, dest_branch: &str, remote: &str) -> Result<Option<String>> {
        let repo = self.lock();
        let src_commit = resolve_commit(&repo, src)?;

        let dest_commit = local_destination(&repo, dest_branch, remote)?;

        if src_commit.id() == dest_commit.id()
            || repo.graph_descendant_of(dest_commit.id(), src_commit.id())?
        {
            debug!(src, dest = dest_branch, "already merged");
            return Ok(None);
        }

        let sig = signature(&repo)?;
        let message = format!("Merge {} into {}", src, dest_branch);
        let tree = dest_commit.tree()?;
        let refname = format!("refs/heads/{}", dest_branch);
        let oid = repo.commit(
            Some(&refname),
            &sig,
            &sig,
            &message,
            &tree,
            &[&dest_commit, &src_commit],
        )?;

        info!(src, dest = dest_branch, commit = %oid, "recorded merge");
        Ok(Some(oid.to_string()))
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        let repo = self.lock();
        let mut remote_handle = repo.find_remote(remote)?;

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(remote_callbacks());

        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
        remote_handle.push(&[refspec.as_str()], Some(&mut push_options))?;

        info!(remote, branch, "pushed branch");
        Ok(())
    }
}
