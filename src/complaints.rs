//! Linter complaint line parsers
//!
//! Reduces one line of linter output to `file/line/column`. Three fixed
//! formats are supported; lines that do not match are not complaints
//! (linters print headers, summaries and warnings too) and are skipped
//! by the pipeline.

use std::fmt;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Regex for TSLint 4 complaints
/// Format: `<path>[<line>, <column>]: <message>`
static TSLINT4_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\[(\d+), (\d+)\]:").expect("Invalid tslint4 regex"));

/// Regex for TSLint 5 complaints
/// Format: `ERROR: <path>[<line>, <column>]: <message>`
static TSLINT5_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ERROR: (.+)\[(\d+), (\d+)\]:").expect("Invalid tslint5 regex"));

/// Regex for tsc complaints
/// Format: `<path>(<line>,<column>): <message>`
static TSCONFIG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\((\d+),(\d+)\):").expect("Invalid tsconfig regex"));

/// One linter-reported issue, reduced to its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complaint {
    pub file_path: String,
    /// 1-based line number
    pub line: u32,
    /// 1-based column number
    pub column: u32,
}

/// The complaint line format to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintFormat {
    Tslint4,
    Tslint5,
    Tsconfig,
}

impl fmt::Display for ComplaintFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tslint4 => write!(f, "tslint4"),
            Self::Tslint5 => write!(f, "tslint5"),
            Self::Tsconfig => write!(f, "tsconfig"),
        }
    }
}

/// The line did not match the configured complaint format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Not a {format} complaint: {line}")]
pub struct ComplaintParseError {
    pub format: ComplaintFormat,
    pub line: String,
}

impl ComplaintFormat {
    /// Extract a [`Complaint`] from one line of linter output.
    pub fn parse(self, line: &str) -> Result<Complaint, ComplaintParseError> {
        let regex = match self {
            Self::Tslint4 => &TSLINT4_REGEX,
            Self::Tslint5 => &TSLINT5_REGEX,
            Self::Tsconfig => &TSCONFIG_REGEX,
        };

        let caps = regex.captures(line).ok_or_else(|| ComplaintParseError {
            format: self,
            line: line.to_string(),
        })?;

        let number = |index: usize| {
            caps.get(index)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| ComplaintParseError {
                    format: self,
                    line: line.to_string(),
                })
        };

        Ok(Complaint {
            file_path: caps[1].to_string(),
            line: number(2)?,
            column: number(3)?,
        })
    }
}
