pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod promotion;
pub mod specfile;
pub mod ui;

pub use error::{RelengError, Result};
