//! git blame --porcelain output parser
//!
//! Parses the output of one blame invocation into a [`BlameTable`].
//!
//! The porcelain format is a sequence of blocks, one per source line:
//! a header `<sha1> <orig_line> <final_line> [<group_len>]`, followed by
//! `key value` metadata lines the first time a commit appears in the
//! output, terminated by the source line itself prefixed with a tab.
//! Reference: https://git-scm.com/docs/git-blame#_the_porcelain_format

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::BlameError;
use super::constants::UNCOMMITTED_SHA1;
use crate::model::{BlameTable, CommitInfo, LineInfo};

/// Parser for git blame output
pub struct Parser;

/// Header of one attribution block
struct BlockHeader {
    sha1: String,
    original_line: u32,
    final_line: u32,
    num_lines: i32,
}

/// Line record collected during the first pass, before commit metadata
/// is complete.
struct PendingLine {
    sha1: String,
    original_line: u32,
    final_line: u32,
    num_lines: i32,
    code: String,
}

impl Parser {
    /// Parse a full `git blame --porcelain` invocation for one file.
    ///
    /// Runs in two passes: the first collects commit metadata and line
    /// skeletons, the second freezes each commit into an `Arc` so all
    /// lines of a commit share one fully-populated record.
    pub fn parse_porcelain(output: &str) -> Result<BlameTable, BlameError> {
        let mut commits: HashMap<String, CommitInfo> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending: Vec<PendingLine> = Vec::new();

        // Metadata mode: true between a first-seen header and its code line
        let mut expecting_metadata = false;
        // Commit the metadata applies to; None while consuming the
        // uncommitted sentinel's discarded metadata
        let mut current_sha: Option<String> = None;

        for line in output.lines() {
            if let Some(code) = line.strip_prefix('\t') {
                // The leading tab is added by git; the rest is the source line
                let Some(last) = pending.last_mut() else {
                    return Err(BlameError::ParseError(format!(
                        "Code line without a preceding header: {code:?}"
                    )));
                };
                last.code = code.to_string();
                expecting_metadata = false;
                current_sha = None;
            } else if expecting_metadata {
                let (key, value) = match line.split_once(' ') {
                    Some((key, value)) => (key, value),
                    // Value-less keys exist (e.g. "boundary")
                    None => (line, ""),
                };
                if let Some(commit) = current_sha.as_ref().and_then(|sha| commits.get_mut(sha)) {
                    Self::apply_metadata(commit, key, value);
                }
            } else {
                let header = Self::parse_header(line)?;
                if seen.insert(header.sha1.clone()) {
                    expecting_metadata = true;
                    if header.sha1 == UNCOMMITTED_SHA1 {
                        // Working-tree lines carry placeholder metadata;
                        // consume it without storing a commit
                        current_sha = None;
                    } else {
                        commits.insert(header.sha1.clone(), CommitInfo::new(header.sha1.clone()));
                        current_sha = Some(header.sha1.clone());
                    }
                }
                pending.push(PendingLine {
                    sha1: header.sha1,
                    original_line: header.original_line,
                    final_line: header.final_line,
                    num_lines: header.num_lines,
                    code: String::new(),
                });
            }
        }

        let commits: HashMap<String, Arc<CommitInfo>> = commits
            .into_iter()
            .map(|(sha1, commit)| (sha1, Arc::new(commit)))
            .collect();

        let mut lines = HashMap::with_capacity(pending.len());
        for p in pending {
            let commit = if p.sha1 == UNCOMMITTED_SHA1 {
                None
            } else {
                commits.get(&p.sha1).cloned()
            };
            lines.insert(
                p.final_line,
                LineInfo {
                    code: p.code,
                    original_line: p.original_line,
                    final_line: p.final_line,
                    num_lines: p.num_lines,
                    commit,
                },
            );
        }

        Ok(BlameTable::new(lines, commits))
    }

    /// Parse a block header: `<sha1> <orig_line> <final_line> [<group_len>]`
    ///
    /// The group length appears only on the first header of a contiguous
    /// attribution group; continuation headers get -1.
    fn parse_header(line: &str) -> Result<BlockHeader, BlameError> {
        let mut parts = line.split(' ');

        let sha1 = parts.next().unwrap_or_default();
        if sha1.len() != 40 || !sha1.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BlameError::ParseError(format!(
                "Invalid sha1 in blame header: {line:?}"
            )));
        }

        let original_line = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                BlameError::ParseError(format!("Missing original line in blame header: {line:?}"))
            })?;
        let final_line = parts.next().and_then(|v| v.parse().ok()).ok_or_else(|| {
            BlameError::ParseError(format!("Missing final line in blame header: {line:?}"))
        })?;

        let num_lines = match parts.next() {
            Some(v) => v.parse().map_err(|_| {
                BlameError::ParseError(format!("Invalid group length in blame header: {line:?}"))
            })?,
            None => -1,
        };

        Ok(BlockHeader {
            sha1: sha1.to_string(),
            original_line,
            final_line,
            num_lines,
        })
    }

    /// Apply one `key value` metadata line to a commit record.
    ///
    /// Unrecognized keys are ignored; porcelain grows keys over time.
    fn apply_metadata(commit: &mut CommitInfo, key: &str, value: &str) {
        match key {
            "author" => commit.author = Some(value.to_string()),
            "author-mail" => commit.author_mail = Some(strip_mail_brackets(value)),
            "author-time" => commit.author_time = parse_epoch(value),
            "author-tz" => commit.author_tz = Some(value.to_string()),
            "committer" => commit.committer = Some(value.to_string()),
            "committer-mail" => commit.committer_mail = Some(strip_mail_brackets(value)),
            "committer-time" => commit.committer_time = parse_epoch(value),
            "committer-tz" => commit.committer_tz = Some(value.to_string()),
            "summary" => commit.summary = Some(value.to_string()),
            // "previous <sha1> <filename>"; only the hash is kept
            "previous" => {
                commit.previous_hash = value
                    .split(' ')
                    .next()
                    .map(|hash| hash.to_string());
            }
            "filename" => commit.filename = Some(value.to_string()),
            _ => {}
        }
    }
}

/// Porcelain wraps emails in angle brackets: `<a@x.com>`
fn strip_mail_brackets(value: &str) -> String {
    value
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string()
}

/// Epoch seconds to an absolute instant
fn parse_epoch(value: &str) -> Option<DateTime<Utc>> {
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    /// Two commits, one two-line group, one uncommitted line.
    fn sample_porcelain() -> String {
        format!(
            "{SHA_A} 1 1 2\n\
             author Alice\n\
             author-mail <alice@example.com>\n\
             author-time 1700000000\n\
             author-tz +0000\n\
             committer Alice\n\
             committer-mail <alice@example.com>\n\
             committer-time 1700000000\n\
             committer-tz +0000\n\
             summary Initial commit\n\
             filename src/lib.rs\n\
             \tfn main() {{\n\
             {SHA_A} 2 2\n\
             \t}}\n\
             {SHA_B} 3 3 1\n\
             author Bob\n\
             author-mail <bob@example.com>\n\
             author-time 1700001000\n\
             author-tz +0900\n\
             committer Bob\n\
             committer-mail <bob@example.com>\n\
             committer-time 1700001000\n\
             committer-tz +0900\n\
             summary Add trailing line\n\
             previous {SHA_A} src/lib.rs\n\
             filename src/lib.rs\n\
             \t// trailing\n\
             {} 4 4 1\n\
             author Not Committed Yet\n\
             author-mail <not.committed.yet>\n\
             author-time 1700002000\n\
             author-tz +0000\n\
             committer Not Committed Yet\n\
             committer-mail <not.committed.yet>\n\
             committer-time 1700002000\n\
             committer-tz +0000\n\
             summary Version of src/lib.rs from src/lib.rs\n\
             filename src/lib.rs\n\
             \t// local edit\n",
            UNCOMMITTED_SHA1
        )
    }

    #[test]
    fn test_every_line_present() {
        let table = Parser::parse_porcelain(&sample_porcelain()).unwrap();
        assert_eq!(table.len(), 4);
        for number in 1..=4 {
            assert!(table.line(number).is_some(), "line {number} missing");
        }
    }

    #[test]
    fn test_commit_metadata_populated() {
        let table = Parser::parse_porcelain(&sample_porcelain()).unwrap();
        let commit = table.line(1).unwrap().commit.as_ref().unwrap();
        assert_eq!(commit.sha1, SHA_A);
        assert_eq!(commit.author.as_deref(), Some("Alice"));
        assert_eq!(commit.author_mail.as_deref(), Some("alice@example.com"));
        assert_eq!(commit.summary.as_deref(), Some("Initial commit"));
        assert_eq!(commit.author_tz.as_deref(), Some("+0000"));
        assert_eq!(
            commit.author_time.unwrap(),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap()
        );
    }

    #[test]
    fn test_lines_of_one_commit_share_one_record() {
        let table = Parser::parse_porcelain(&sample_porcelain()).unwrap();
        let first = table.line(1).unwrap().commit.as_ref().unwrap();
        let second = table.line(2).unwrap().commit.as_ref().unwrap();
        assert!(Arc::ptr_eq(first, second));

        // Metadata appears only once in the output but both lines see it
        assert_eq!(second.author.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_group_length_elided_on_continuation() {
        let table = Parser::parse_porcelain(&sample_porcelain()).unwrap();
        assert_eq!(table.line(1).unwrap().num_lines, 2);
        assert_eq!(table.line(2).unwrap().num_lines, -1);
    }

    #[test]
    fn test_uncommitted_line_has_no_commit() {
        let table = Parser::parse_porcelain(&sample_porcelain()).unwrap();
        assert!(table.line(4).unwrap().commit.is_none());
        // The sentinel never enters the commit table
        assert!(!table.commits().contains_key(UNCOMMITTED_SHA1));
        assert_eq!(table.commits().len(), 2);
    }

    #[test]
    fn test_code_lines_stripped_of_tab() {
        let table = Parser::parse_porcelain(&sample_porcelain()).unwrap();
        assert_eq!(table.line(1).unwrap().code, "fn main() {");
        assert_eq!(table.line(3).unwrap().code, "// trailing");
    }

    #[test]
    fn test_previous_keeps_hash_only() {
        let table = Parser::parse_porcelain(&sample_porcelain()).unwrap();
        let commit = table.line(3).unwrap().commit.as_ref().unwrap();
        assert_eq!(commit.previous_hash.as_deref(), Some(SHA_A));
    }

    #[test]
    fn test_empty_input() {
        let table = Parser::parse_porcelain("").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_invalid_sha1_is_parse_error() {
        let err = Parser::parse_porcelain("nothex 1 1 1\n\tcode\n").unwrap_err();
        assert!(matches!(err, BlameError::ParseError(_)));
    }

    #[test]
    fn test_metadata_outside_block_is_parse_error() {
        // "author Alice" where a header is expected
        let err = Parser::parse_porcelain("author Alice\n").unwrap_err();
        assert!(matches!(err, BlameError::ParseError(_)));
    }

    #[test]
    fn test_code_line_without_header_is_parse_error() {
        let err = Parser::parse_porcelain("\tno header\n").unwrap_err();
        let BlameError::ParseError(message) = err else {
            panic!("expected parse error");
        };
        assert!(message.contains("no header"));
    }

    #[test]
    fn test_unrecognized_key_ignored() {
        let input = format!(
            "{SHA_A} 1 1 1\n\
             author Alice\n\
             boundary\n\
             some-future-key value\n\
             \tcode\n"
        );
        let table = Parser::parse_porcelain(&input).unwrap();
        let commit = table.line(1).unwrap().commit.as_ref().unwrap();
        assert_eq!(commit.author.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_missing_line_numbers_is_parse_error() {
        let err = Parser::parse_porcelain(&format!("{SHA_A}\n\tcode\n")).unwrap_err();
        assert!(matches!(err, BlameError::ParseError(_)));
    }
}
