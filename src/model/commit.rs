//! Commit metadata from git blame

use chrono::{DateTime, Utc};

/// Metadata for one commit encountered while blaming a file.
///
/// `git blame --porcelain` prints this block once per commit per invocation;
/// every line attributed to the commit shares a single `Arc<CommitInfo>`.
/// Only `sha1` is guaranteed; boundary commits may omit any of the rest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitInfo {
    /// Full 40-hex commit hash
    pub sha1: String,

    /// Author display name
    pub author: Option<String>,

    /// Author email, angle brackets stripped
    pub author_mail: Option<String>,

    /// Author timestamp (porcelain emits epoch seconds)
    pub author_time: Option<DateTime<Utc>>,

    /// Author timezone offset, e.g. "+0900"
    pub author_tz: Option<String>,

    /// Committer display name
    pub committer: Option<String>,

    /// Committer email, angle brackets stripped
    pub committer_mail: Option<String>,

    /// Committer timestamp
    pub committer_time: Option<DateTime<Utc>>,

    /// Committer timezone offset
    pub committer_tz: Option<String>,

    /// First line of the commit message
    pub summary: Option<String>,

    /// Path of the file in this commit
    pub filename: Option<String>,

    /// Hash of the previous commit touching this file
    pub previous_hash: Option<String>,
}

impl CommitInfo {
    /// Create a record carrying only the hash; metadata is filled in
    /// as the parser consumes the commit's header block.
    pub fn new(sha1: impl Into<String>) -> Self {
        Self {
            sha1: sha1.into(),
            ..Self::default()
        }
    }

    /// Short hash for display and logging
    pub fn short_sha1(&self) -> &str {
        if self.sha1.len() >= 8 {
            &self.sha1[..8]
        } else {
            &self.sha1
        }
    }
}
