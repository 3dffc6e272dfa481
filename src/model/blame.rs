//! Per-line blame attribution data model

use std::collections::HashMap;
use std::sync::Arc;

use super::CommitInfo;

/// Attribution for a single line of a blamed file.
#[derive(Debug, Clone)]
pub struct LineInfo {
    /// Raw source text of the line (diagnostics only)
    pub code: String,

    /// Line number in the commit the line came from
    pub original_line: u32,

    /// Line number in the working-tree file
    pub final_line: u32,

    /// Size of the contiguous attribution group this line opened,
    /// -1 on continuation headers where porcelain elides it
    pub num_lines: i32,

    /// Commit that last touched this line; None for an uncommitted line
    pub commit: Option<Arc<CommitInfo>>,
}

/// Blame attribution for one file snapshot.
///
/// Maps every final line number 1..=N of the file to its [`LineInfo`].
/// Immutable after parsing; lines of the same commit share one
/// `Arc<CommitInfo>`.
#[derive(Debug, Clone, Default)]
pub struct BlameTable {
    lines: HashMap<u32, LineInfo>,
    commits: HashMap<String, Arc<CommitInfo>>,
}

impl BlameTable {
    pub fn new(lines: HashMap<u32, LineInfo>, commits: HashMap<String, Arc<CommitInfo>>) -> Self {
        Self { lines, commits }
    }

    /// Attribution for a final line number, if the blame covered it
    pub fn line(&self, number: u32) -> Option<&LineInfo> {
        self.lines.get(&number)
    }

    /// Distinct commits referenced by this table, keyed by sha1
    pub fn commits(&self) -> &HashMap<String, Arc<CommitInfo>> {
        &self.commits
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Result of blaming one file.
#[derive(Debug, Clone)]
pub enum BlameOutcome {
    /// The file is tracked; per-line attribution is available
    Blamed(BlameTable),
    /// git does not know the path; no attribution exists yet
    Uncommitted,
}
