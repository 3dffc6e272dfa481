//! Complaint filter predicate
//!
//! Decides whether a blamed complaint should be surfaced, given the
//! configured author membership and time window.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::git::constants::special::NOT_COMMITTED_AUTHOR;
use crate::model::CommitInfo;

/// One author the filter applies to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    /// Commit email, without angle brackets
    pub email: String,
    /// Commit display name
    pub name: String,
}

/// Resolved filter configuration.
///
/// An absent component never filters anything out.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Authors whose complaints are surfaced. None = no author restriction.
    pub members: Option<Vec<Member>>,

    /// Complaints blamed on commits at or before this instant are dropped.
    /// None = no time restriction.
    pub since: Option<DateTime<Utc>>,
}

/// Should this attribution be surfaced?
///
/// An uncommitted line (no commit, or git's "Not Committed Yet"
/// placeholder author) cannot be attributed yet and always passes the
/// membership test. Members match by exact email or exact display name.
/// The time test passes when the author timestamp is strictly after
/// `since`, or when the commit carries no timestamp at all.
pub fn passes_filter(commit: Option<&CommitInfo>, options: &FilterOptions) -> bool {
    let members_satisfied = match (&options.members, commit) {
        (None, _) | (Some(_), None) => true,
        (Some(members), Some(commit)) => {
            commit.author.as_deref() == Some(NOT_COMMITTED_AUTHOR)
                || members.iter().any(|member| {
                    commit.author_mail.as_deref() == Some(member.email.as_str())
                        || commit.author.as_deref() == Some(member.name.as_str())
                })
        }
    };

    let since_satisfied = match (options.since, commit.and_then(|c| c.author_time)) {
        (Some(since), Some(author_time)) => author_time > since,
        // A commit that cannot be dated cannot be excluded
        _ => true,
    };

    members_satisfied && since_satisfied
}
