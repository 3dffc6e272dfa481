//! git blame execution layer
//!
//! This module handles running `git blame --porcelain`, parsing its output
//! into [`crate::model::BlameTable`]s, and coordinating concurrent lookups
//! through a per-file cache.

pub mod constants;
mod blamer;
mod executor;
/// Parser module (public for integration testing)
pub mod parser;

pub use blamer::{Blamer, default_concurrency};
pub use executor::GitExecutor;

use thiserror::Error;

/// Errors that can occur when blaming a file.
///
/// Cloneable so a single fetch result can be handed to every caller
/// waiting on the same file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlameError {
    #[error("git blame failed (exit code {exit_code}): {stderr}")]
    CommandFailed { stderr: String, exit_code: i32 },

    #[error("Failed to parse blame output: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("git is not installed or not in PATH")]
    GitNotFound,

    #[error("Blame lookup cancelled")]
    Cancelled,
}
