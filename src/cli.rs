//! Command-line and config-file resolution
//!
//! Options come from three layers: command-line flags, `LINT_BLAME_*`
//! environment variables, and a JSON config file (`./lint-blame.json`
//! by default). Flags win over the file; the resolved [`Config`] is
//! what the rest of the program consumes.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::complaints::ComplaintFormat;
use crate::filter::{FilterOptions, Member};
use crate::git::default_concurrency;

/// Default config file looked up next to the invocation
const DEFAULT_CONFIG_PATH: &str = "./lint-blame.json";

#[derive(Parser, Debug)]
#[command(name = "lint-blame")]
#[command(version, about = "Usage: <linter> | lint-blame [options]", long_about = None)]
pub struct Args {
    /// The complaint format to parse
    #[arg(short, long, value_enum, env = "LINT_BLAME_FORMAT")]
    pub format: Option<ComplaintFormat>,

    /// A member that rules apply for, as "Name <email>" (repeatable)
    #[arg(short, long = "member", value_name = "MEMBER", value_parser = parse_member)]
    pub members: Vec<Member>,

    /// A point in time before which rules do not apply
    /// (RFC 3339 or YYYY-MM-DD)
    #[arg(short, long, env = "LINT_BLAME_SINCE", value_parser = parse_since)]
    pub since: Option<DateTime<Utc>>,

    /// Maximum number of concurrent git blame processes
    #[arg(short, long, env = "LINT_BLAME_JOBS")]
    pub jobs: Option<usize>,

    /// Path to the JSON config file [default: ./lint-blame.json]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to run git in (defaults to the current directory)
    #[arg(long)]
    pub repo: Option<PathBuf>,
}

/// Shape of `lint-blame.json`
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub members: Option<Vec<Member>>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub format: Option<ComplaintFormat>,
    #[serde(default)]
    pub jobs: Option<usize>,
}

/// Fully resolved run configuration
#[derive(Debug)]
pub struct Config {
    pub format: ComplaintFormat,
    pub options: FilterOptions,
    pub jobs: usize,
    pub repo: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Invalid {
        path: String,
        source: serde_json::Error,
    },

    #[error("No complaint format given; pass --format or set \"format\" in the config file")]
    MissingFormat,
}

impl Args {
    /// Merge flags, environment and the config file into a [`Config`].
    ///
    /// An explicitly passed `--config` must exist; the default path is
    /// optional and silently skipped when absent.
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let explicit = self.config.is_some();
        let path = self
            .config
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let file = match std::fs::read_to_string(&path) {
            Ok(text) => {
                serde_json::from_str::<ConfigFile>(&text).map_err(|source| ConfigError::Invalid {
                    path: path.display().to_string(),
                    source,
                })?
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound && !explicit => {
                debug!(path = %path.display(), "no config file found");
                ConfigFile::default()
            }
            Err(source) => {
                return Err(ConfigError::ReadFailed {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let members = if self.members.is_empty() {
            file.members
        } else {
            Some(self.members)
        };

        Ok(Config {
            format: self.format.or(file.format).ok_or(ConfigError::MissingFormat)?,
            options: FilterOptions {
                members,
                since: self.since.or(file.since),
            },
            jobs: self
                .jobs
                .or(file.jobs)
                .unwrap_or_else(default_concurrency)
                .max(1),
            repo: self.repo,
        })
    }
}

/// Parse a member flag of the form `Name <email>`
fn parse_member(value: &str) -> Result<Member, String> {
    let parsed = value.split_once('<').and_then(|(name, rest)| {
        let email = rest.strip_suffix('>')?;
        Some(Member {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
        })
    });
    parsed.ok_or_else(|| format!("expected \"Name <email>\", got {value:?}"))
}

/// Parse `--since`: a full RFC 3339 timestamp or a bare date (midnight UTC)
fn parse_since(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    value
        .parse::<NaiveDate>()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| format!("expected an RFC 3339 timestamp or YYYY-MM-DD date, got {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_args() -> Args {
        Args {
            format: None,
            members: Vec::new(),
            since: None,
            jobs: None,
            config: None,
            repo: None,
        }
    }

    #[test]
    fn test_parse_member() {
        let member = parse_member("Alice Cooper <alice@example.com>").unwrap();
        assert_eq!(member.name, "Alice Cooper");
        assert_eq!(member.email, "alice@example.com");
    }

    #[test]
    fn test_parse_member_rejects_bare_name() {
        assert!(parse_member("Alice Cooper").is_err());
        assert!(parse_member("Alice <oops").is_err());
    }

    #[test]
    fn test_parse_since_rfc3339() {
        let instant = parse_since("2024-03-01T12:00:00+09:00").unwrap();
        assert_eq!(instant.timestamp(), 1_709_262_000);
    }

    #[test]
    fn test_parse_since_bare_date() {
        let instant = parse_since("2024-03-01").unwrap();
        assert_eq!(instant, parse_since("2024-03-01T00:00:00Z").unwrap());
    }

    #[test]
    fn test_parse_since_garbage() {
        assert!(parse_since("last tuesday").is_err());
    }

    #[test]
    fn test_resolve_requires_format() {
        let err = bare_args().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingFormat));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = Args {
            format: Some(ComplaintFormat::Tsconfig),
            ..bare_args()
        }
        .resolve()
        .unwrap();
        assert_eq!(config.format, ComplaintFormat::Tsconfig);
        assert!(config.options.members.is_none());
        assert!(config.options.since.is_none());
        assert!(config.jobs >= 1);
    }

    #[test]
    fn test_resolve_reads_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lint-blame.json");
        std::fs::write(
            &path,
            r#"{
                "format": "tslint5",
                "members": [{"email": "a@x.com", "name": "A"}],
                "since": "2024-01-01T00:00:00Z",
                "jobs": 3
            }"#,
        )
        .unwrap();

        let config = Args {
            config: Some(path),
            ..bare_args()
        }
        .resolve()
        .unwrap();
        assert_eq!(config.format, ComplaintFormat::Tslint5);
        assert_eq!(config.jobs, 3);
        assert_eq!(
            config.options.members,
            Some(vec![Member {
                email: "a@x.com".to_string(),
                name: "A".to_string(),
            }])
        );
        assert!(config.options.since.is_some());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lint-blame.json");
        std::fs::write(&path, r#"{"format": "tslint4", "jobs": 3}"#).unwrap();

        let config = Args {
            format: Some(ComplaintFormat::Tsconfig),
            jobs: Some(7),
            config: Some(path),
            ..bare_args()
        }
        .resolve()
        .unwrap();
        assert_eq!(config.format, ComplaintFormat::Tsconfig);
        assert_eq!(config.jobs, 7);
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let err = Args {
            format: Some(ComplaintFormat::Tsconfig),
            config: Some(PathBuf::from("/definitely/not/here.json")),
            ..bare_args()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lint-blame.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Args {
            config: Some(path),
            ..bare_args()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
