//! lint-blame - filter linter output by git blame
//!
//! Binary entry point: wires stdin and stdout to the pipeline and maps
//! the run outcome to an exit code.

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lint_blame::cli::Args;
use lint_blame::git::{Blamer, GitExecutor};
use lint_blame::pipeline::{Pipeline, PipelineError};

/// Exit codes: 0 = nothing retained, 1 = complaints retained,
/// 2 = fatal error, 130 = cancelled by signal.
const EXIT_COMPLAINTS: u8 = 1;
const EXIT_FATAL: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().resolve()?;

    if std::io::stdin().is_terminal() {
        return Err(color_eyre::eyre::eyre!(
            "No input on STDIN; pipe linter output into lint-blame"
        ));
    }

    let executor = match config.repo {
        Some(path) => GitExecutor::with_repo_path(path),
        None => GitExecutor::new(),
    };
    let blamer = Blamer::new(executor, config.jobs);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            info!("shutdown signal received, cancelling outstanding lookups");
            cancel.cancel();
        }
    });

    let pipeline = Pipeline::new(blamer, config.format, config.options, cancel);
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    match pipeline.run(stdin, stdout).await {
        Ok(summary) if summary.retained > 0 => Ok(ExitCode::from(EXIT_COMPLAINTS)),
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(PipelineError::Cancelled) => {
            error!("run cancelled before all complaints were resolved");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Err(err) => {
            error!(%err, "fatal error");
            Ok(ExitCode::from(EXIT_FATAL))
        }
    }
}

/// Resolve when the process is asked to stop (SIGINT, and SIGTERM on unix).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                error!(%err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
