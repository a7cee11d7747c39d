//! Domain logic - pure version and branch rules independent of git operations

pub mod branch;
pub mod evr;

pub use branch::{BranchName, BranchVersion, Stream, MASTER};
pub use evr::{Evr, Increment, NightlyMarker, ReleaseStage, UpdateKind};
