//! git-specific constants
//!
//! Centralized definitions for the git command name, flags, and special
//! values in blame output.

/// git command binary name
pub const GIT_COMMAND: &str = "git";

/// git subcommands
pub mod commands {
    pub const BLAME: &str = "blame";
}

/// git command flags
pub mod flags {
    /// Machine-readable blame output with once-per-commit metadata blocks
    pub const PORCELAIN: &str = "--porcelain";
    /// End of options; everything after is a path
    pub const END_OF_OPTIONS: &str = "--";
}

/// Special values in blame output
pub mod special {
    /// Hash git blame assigns to lines not yet committed (all zeros).
    ///
    /// Lines with this hash have no commit to attribute to; the parser
    /// must never store it in the commit table.
    pub const UNCOMMITTED_SHA1: &str = "0000000000000000000000000000000000000000";

    /// Author name git reports for working-tree lines
    pub const NOT_COMMITTED_AUTHOR: &str = "Not Committed Yet";
}

/// Error detection patterns in git output
pub mod errors {
    /// stderr marker for a path unknown to git ("fatal: no such path ...").
    /// A blame failing with this is an untracked file, not an error.
    pub const NO_SUCH_PATH: &str = "no such path";
}

pub use special::UNCOMMITTED_SHA1;
