//! git command executor
//!
//! Handles running `git blame` for a single file and classifying the
//! result.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::BlameError;
use super::constants::{self, commands, errors, flags};
use super::parser::Parser;
use crate::model::BlameOutcome;

/// Executor for git blame invocations
#[derive(Debug, Clone, Default)]
pub struct GitExecutor {
    /// Path to the repository (None = current directory)
    repo_path: Option<PathBuf>,
}

impl GitExecutor {
    /// Create a new executor for the current directory
    pub fn new() -> Self {
        Self { repo_path: None }
    }

    /// Create a new executor running git inside a specific directory
    pub fn with_repo_path(path: PathBuf) -> Self {
        Self {
            repo_path: Some(path),
        }
    }

    /// Blame one file as of the current working tree.
    ///
    /// Spawns `git blame --porcelain -- <file>` and parses its output.
    /// A non-zero exit whose stderr carries the "no such path" marker is
    /// the normal untracked-file outcome, not an error. Cancelling the
    /// token kills the subprocess and resolves with
    /// [`BlameError::Cancelled`].
    pub async fn blame_file(
        &self,
        file: &Path,
        cancel: &CancellationToken,
    ) -> Result<BlameOutcome, BlameError> {
        if cancel.is_cancelled() {
            return Err(BlameError::Cancelled);
        }

        debug!(file = %file.display(), "blaming");

        let mut cmd = Command::new(constants::GIT_COMMAND);
        if let Some(ref path) = self.repo_path {
            cmd.current_dir(path);
        }
        cmd.arg(commands::BLAME)
            .arg(flags::PORCELAIN)
            .arg(flags::END_OF_OPTIONS)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the in-flight wait future must not orphan the child
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlameError::GitNotFound
            } else {
                BlameError::IoError(e.to_string())
            }
        })?;

        let output = tokio::select! {
            output = child.wait_with_output() => {
                output.map_err(|e| BlameError::IoError(e.to_string()))?
            }
            () = cancel.cancelled() => return Err(BlameError::Cancelled),
        };

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(BlameOutcome::Blamed(Parser::parse_porcelain(&stdout)?))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if stderr.contains(errors::NO_SUCH_PATH) {
                return Ok(BlameOutcome::Uncommitted);
            }
            let exit_code = output.status.code().unwrap_or(-1);
            Err(BlameError::CommandFailed { stderr, exit_code })
        }
    }
}
