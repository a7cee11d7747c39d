use crate::error::{RelengError, Result};
use crate::git::{CommitInfo, Repository};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// Mock repository for testing without actual git operations
///
/// Branches are registered per remote, and reachability is described by
/// listing the commits a `(src, dest)` pair is missing. Any pair not
/// registered is treated as fully merged.
pub struct MockRepository {
    remote_branches: HashMap<String, BTreeSet<String>>,
    unmerged: HashMap<(String, String), Vec<CommitInfo>>,
    current_branch: Option<String>,
    upstream_branch: Option<String>,
    merges: Mutex<Vec<(String, String)>>,
    pushes: Mutex<Vec<(String, String)>>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockRepository {
            remote_branches: HashMap::new(),
            unmerged: HashMap::new(),
            current_branch: None,
            upstream_branch: None,
            merges: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock whose `remote` holds the given branches
    pub fn with_branches(remote: &str, branches: &[&str]) -> Self {
        let mut repo = Self::new();
        for branch in branches {
            repo.add_remote_branch(remote, *branch);
        }
        repo
    }

    /// Register a branch under a remote
    pub fn add_remote_branch(&mut self, remote: impl Into<String>, branch: impl Into<String>) {
        self.remote_branches
            .entry(remote.into())
            .or_default()
            .insert(branch.into());
    }

    /// Declare that `src` has commits missing from `dest`
    pub fn add_unmerged(
        &mut self,
        src: impl Into<String>,
        dest: impl Into<String>,
        commits: Vec<CommitInfo>,
    ) {
        self.unmerged.insert((src.into(), dest.into()), commits);
    }

    /// Set the checked-out branch and its upstream
    pub fn set_checkout(&mut self, branch: impl Into<String>, upstream: impl Into<String>) {
        self.current_branch = Some(branch.into());
        self.upstream_branch = Some(upstream.into());
    }

    /// Merges recorded through [Repository::merge_ours], as `(src, dest_branch)`
    pub fn recorded_merges(&self) -> Vec<(String, String)> {
        self.merges.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Pushes recorded through [Repository::push_branch], as `(remote, branch)`
    pub fn recorded_pushes(&self) -> Vec<(String, String)> {
        self.pushes.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn remote_branches(&self, remote: &str) -> Result<Vec<String>> {
        Ok(self
            .remote_branches
            .get(remote)
            .map(|branches| branches.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn unmerged_commits(&self, src: &str, dest: &str) -> Result<Vec<CommitInfo>> {
        Ok(self
            .unmerged
            .get(&(src.to_string(), dest.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn current_branch(&self) -> Result<String> {
        self.current_branch
            .clone()
            .ok_or_else(|| RelengError::validation("HEAD is not on a branch"))
    }

    fn upstream_branch(&self) -> Result<String> {
        self.upstream_branch
            .clone()
            .ok_or_else(|| RelengError::validation("Current branch has no upstream"))
    }

    fn merge_ours(&self, src: &str, dest_branch: &str, remote: &str) -> Result<Option<String>> {
        let tracking = format!("{}/{}", remote, dest_branch);
        if self.unmerged_commits(src, &tracking)?.is_empty() {
            return Ok(None);
        }

        let mut merges = self
            .merges
            .lock()
            .map_err(|_| RelengError::validation("mock merge log poisoned"))?;
        merges.push((src.to_string(), dest_branch.to_string()));
        Ok(Some(format!("mock-merge-{}", merges.len())))
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.pushes
            .lock()
            .map_err(|_| RelengError::validation("mock push log poisoned"))?
            .push((remote.to_string(), branch.to_string()));
        Ok(())
    }
}
