//! Filtering pipeline
//!
//! Drives the whole run: reads linter output line by line, attributes
//! each complaint through the [`Blamer`], applies the filter predicate,
//! and passes surviving lines through verbatim. Lines are emitted in
//! completion order; the final tallies are exact.

use std::path::Path;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::complaints::ComplaintFormat;
use crate::filter::{FilterOptions, passes_filter};
use crate::git::{BlameError, Blamer};

/// Errors that can end a run early
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Blame(BlameError),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Lookup task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// End-of-run tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Complaints parsed from the input
    pub total: u64,
    /// Complaints that passed the filter and were emitted
    pub retained: u64,
    /// Complaints dropped by the filter
    pub filtered: u64,
}

pub struct Pipeline {
    blamer: Blamer,
    format: ComplaintFormat,
    options: FilterOptions,
    cancel: CancellationToken,
}

type LookupResult = Result<Option<String>, BlameError>;

impl Pipeline {
    pub fn new(
        blamer: Blamer,
        format: ComplaintFormat,
        options: FilterOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            blamer,
            format,
            options,
            cancel,
        }
    }

    /// Filter `input` into `output`, returning the tallies.
    ///
    /// Non-complaint lines are skipped. Any fatal lookup failure or a
    /// cancellation ends the run; in-flight lookups are dropped, which
    /// detaches them from their fetches and kills now-unwatched
    /// subprocesses.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<Summary, PipelineError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut tasks: JoinSet<LookupResult> = JoinSet::new();
        let mut summary = Summary::default();
        let mut skipped: u64 = 0;

        let mut lines = input.lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                () = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
            };
            let Some(line) = line else {
                break;
            };

            let complaint = match self.format.parse(&line) {
                Ok(complaint) => complaint,
                Err(err) => {
                    // Linters interleave headers and summaries; not fatal
                    trace!(%err, "skipping non-complaint line");
                    skipped += 1;
                    continue;
                }
            };
            summary.total += 1;

            let blamer = self.blamer.clone();
            let options = self.options.clone();
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                let commit = blamer
                    .blame_line(Path::new(&complaint.file_path), complaint.line, &cancel)
                    .await?;
                if passes_filter(commit.as_deref(), &options) {
                    if let Some(commit) = &commit {
                        debug!(
                            file = %complaint.file_path,
                            line = complaint.line,
                            commit = commit.short_sha1(),
                            "complaint retained"
                        );
                    }
                    Ok(Some(line))
                } else {
                    Ok(None)
                }
            });

            // Emit whatever has already resolved so output streams
            while let Some(joined) = tasks.try_join_next() {
                Self::emit(joined, &mut summary, &mut output).await?;
            }
        }

        while let Some(joined) = tasks.join_next().await {
            Self::emit(joined, &mut summary, &mut output).await?;
        }
        output.flush().await?;

        info!(
            total = summary.total,
            retained = summary.retained,
            filtered = summary.filtered,
            skipped,
            files_blamed = self.blamer.files_fetched(),
            "pipeline finished"
        );
        Ok(summary)
    }

    async fn emit<W: AsyncWrite + Unpin>(
        joined: Result<LookupResult, tokio::task::JoinError>,
        summary: &mut Summary,
        output: &mut W,
    ) -> Result<(), PipelineError> {
        match joined.map_err(|err| PipelineError::Task(err.to_string()))? {
            Ok(Some(line)) => {
                summary.retained += 1;
                output.write_all(line.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
            Ok(None) => summary.filtered += 1,
            Err(BlameError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(err) => return Err(PipelineError::Blame(err)),
        }
        Ok(())
    }
}
