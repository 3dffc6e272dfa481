//! lint-blame - filter linter output by git blame
//!
//! Reads linter complaints on stdin, attributes each one to a commit via
//! `git blame --porcelain`, and passes through only the complaints
//! introduced by the configured authors or after a point in time.
//!
//! This library provides:
//! - [`cli`]: Command-line and config-file resolution
//! - [`complaints`]: Linter complaint line parsers
//! - [`filter`]: The pass/drop predicate
//! - [`git`]: git blame execution, parsing and the lookup cache
//! - [`model`]: Domain models
//! - [`pipeline`]: The stdin-to-stdout filtering driver

pub mod cli;
pub mod complaints;
pub mod filter;
pub mod git;
pub mod model;
pub mod pipeline;
