//! Git operations abstraction layer
//!
//! The promotion logic never talks to git directly. It asks a [Repository]
//! for the two things it needs (the remote branch list and commit
//! reachability between two refs), plus the write operations used when
//! merging forward.
//!
//! - [repository::Git2Repository]: a real implementation using the `git2` crate
//! - [mock::MockRepository]: an in-memory implementation for testing
//!
//! ```rust
//! # use releng::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> releng::Result<()> {
//! let missing = repo.unmerged_commits("origin/2.5-dev", "origin/2.6-dev")?;
//! if missing.is_empty() {
//!     println!("2.5-dev is merged into 2.6-dev");
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;

/// Commit information reported for unmerged commits
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// The commit hash
    pub hash: String,
    /// The commit message
    pub message: String,
    /// The commit author
    pub author: String,
}

/// Repository queries and updates needed by the promotion workflow
///
/// ## Thread Safety
///
/// All implementors must be `Send + Sync`. Read-only queries may be issued
/// concurrently; callers serialize [Repository::merge_ours] and
/// [Repository::push_branch] per working directory.
///
/// ## Error Handling
///
/// Failures from the underlying repository are returned unchanged (as
/// [crate::error::RelengError::Git] for libgit2), never interpreted.
pub trait Repository: Send + Sync {
    /// Branch names known under `refs/remotes/<remote>/`, without the remote prefix
    ///
    /// The symbolic `HEAD` entry is not included.
    fn remote_branches(&self, remote: &str) -> Result<Vec<String>>;

    /// Commits reachable from `src` that are not reachable from `dest`
    ///
    /// Equivalent to `git log ^dest src`. An empty list means `src` is fully
    /// merged into `dest`.
    fn unmerged_commits(&self, src: &str, dest: &str) -> Result<Vec<CommitInfo>>;

    /// Short name of the checked-out branch
    fn current_branch(&self) -> Result<String>;

    /// Upstream of the checked-out branch, e.g. `origin/2.5-dev`
    fn upstream_branch(&self) -> Result<String>;

    /// Record `src` as merged into local branch `dest_branch` using the "ours" strategy
    ///
    /// The merge commit keeps `dest_branch`'s tree and has `dest_branch` then
    /// `src` as parents. If `dest_branch` does not exist locally it is created
    /// from `<remote>/<dest_branch>` first.
    ///
    /// # Returns
    /// * `Ok(Some(hash))` - The merge commit that was created
    /// * `Ok(None)` - `src` was already contained in `dest_branch`
    fn merge_ours(&self, src: &str, dest_branch: &str, remote: &str) -> Result<Option<String>>;

    /// Push local `branch` to the same name on `remote`
    fn push_branch(&self, remote: &str, branch: &str) -> Result<()>;
}
