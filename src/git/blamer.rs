//! Memoized, concurrency-limited blame coordinator
//!
//! One [`Blamer`] serves every lookup of the run. Each distinct file is
//! fetched at most once; concurrent callers for the same file share a
//! single subprocess, and at most `concurrency_limit` subprocesses run
//! at any instant across all files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Semaphore, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{BlameError, GitExecutor};
use crate::model::{BlameOutcome, CommitInfo};

type FetchResult = Result<Arc<BlameOutcome>, BlameError>;

/// Default subprocess cap: the work is I/O-bound child processes, not
/// CPU, so run several per core.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 4)
        .unwrap_or(8)
}

/// Per-file cache slot.
///
/// absent -> InFlight -> Ready on success; failures and cancellations
/// remove the slot so the next lookup re-fetches.
enum Slot {
    InFlight(InFlight),
    Ready(Arc<BlameOutcome>),
}

struct InFlight {
    /// Distinguishes this fetch from any later fetch of the same path,
    /// so a detaching waiter never touches a successor's bookkeeping
    id: u64,
    /// Cancels the underlying fetch when the last waiter detaches
    token: CancellationToken,
    /// Callers still interested in this fetch
    waiters: usize,
    /// Broadcasts the fetch result; holds None until completion
    rx: watch::Receiver<Option<FetchResult>>,
}

struct Inner {
    executor: GitExecutor,
    semaphore: Arc<Semaphore>,
    slots: Mutex<HashMap<PathBuf, Slot>>,
    next_fetch_id: AtomicU64,
    files_fetched: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Shared blame cache and subprocess gate. Cheap to clone.
#[derive(Clone)]
pub struct Blamer {
    inner: Arc<Inner>,
}

impl Blamer {
    pub fn new(executor: GitExecutor, concurrency_limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                semaphore: Arc::new(Semaphore::new(concurrency_limit.max(1))),
                slots: Mutex::new(HashMap::new()),
                next_fetch_id: AtomicU64::new(0),
                files_fetched: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Resolve the commit that last touched `line` of `file`.
    ///
    /// `Ok(None)` means no attribution exists: the file is untracked, or
    /// the line is outside the blamed range (linters report errors on the
    /// EOF sentinel line, which git blame cannot attribute).
    pub async fn blame_line(
        &self,
        file: &Path,
        line: u32,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<CommitInfo>>, BlameError> {
        let outcome = self.blame_file(file, cancel).await?;
        match &*outcome {
            BlameOutcome::Uncommitted => Ok(None),
            BlameOutcome::Blamed(table) => {
                Ok(table.line(line).and_then(|info| info.commit.clone()))
            }
        }
    }

    /// Fetch (or reuse) the blame outcome for a whole file.
    ///
    /// The first caller for a path starts the fetch; everyone else joins
    /// it. Slot creation happens under the map lock, so two first-time
    /// callers can never both spawn a subprocess.
    pub async fn blame_file(
        &self,
        file: &Path,
        cancel: &CancellationToken,
    ) -> Result<Arc<BlameOutcome>, BlameError> {
        let (mut rx, fetch_id) = {
            let mut slots = self.inner.slots.lock().expect("blame slot map poisoned");
            match slots.get_mut(file) {
                Some(Slot::Ready(outcome)) => return Ok(outcome.clone()),
                Some(Slot::InFlight(inflight)) => {
                    inflight.waiters += 1;
                    (inflight.rx.clone(), inflight.id)
                }
                None => {
                    let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let token = CancellationToken::new();
                    let (tx, rx) = watch::channel(None);
                    slots.insert(
                        file.to_path_buf(),
                        Slot::InFlight(InFlight {
                            id,
                            token: token.clone(),
                            waiters: 1,
                            rx: rx.clone(),
                        }),
                    );
                    self.spawn_fetch(file.to_path_buf(), token, tx);
                    (rx, id)
                }
            }
        };

        // Detach on every exit path, including caller cancellation
        let _detach = scopeguard::guard((), |_| self.detach_waiter(file, fetch_id));

        tokio::select! {
            changed = rx.wait_for(|result| result.is_some()) => match changed {
                Ok(result) => (*result).clone().unwrap_or(Err(BlameError::Cancelled)),
                // The fetch task is gone without publishing a result
                Err(_) => Err(BlameError::IoError("blame fetch task dropped".to_string())),
            },
            () = cancel.cancelled() => Err(BlameError::Cancelled),
        }
    }

    /// Number of blame subprocesses launched so far
    pub fn files_fetched(&self) -> u64 {
        self.inner.files_fetched.load(Ordering::Relaxed)
    }

    /// Highest number of simultaneously running subprocesses observed
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::Relaxed)
    }

    fn spawn_fetch(
        &self,
        file: PathBuf,
        token: CancellationToken,
        tx: watch::Sender<Option<FetchResult>>,
    ) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let result = Self::fetch(&inner, &file, &token).await;
            {
                let mut slots = inner.slots.lock().expect("blame slot map poisoned");
                match &result {
                    // Only completed outcomes are cached; a hard failure
                    // or cancellation clears the slot for re-fetch
                    Ok(outcome) => {
                        slots.insert(file.clone(), Slot::Ready(outcome.clone()));
                    }
                    Err(error) => {
                        debug!(file = %file.display(), %error, "blame fetch not cached");
                        slots.remove(&file);
                    }
                }
            }
            let _ = tx.send(Some(result));
        });
    }

    async fn fetch(inner: &Inner, file: &Path, token: &CancellationToken) -> FetchResult {
        // Queue for a subprocess slot; the queue is FIFO and the wait is
        // cancellable, so an abandoned fetch never holds a place in line
        let permit = tokio::select! {
            permit = inner.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| BlameError::Cancelled)?
            }
            () = token.cancelled() => return Err(BlameError::Cancelled),
        };
        let _permit = permit;

        let running = inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        inner.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _gauge = scopeguard::guard((), |_| {
            inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        inner.files_fetched.fetch_add(1, Ordering::Relaxed);
        let outcome = inner.executor.blame_file(file, token).await?;
        Ok(Arc::new(outcome))
    }

    /// One caller stopped waiting. When the last interested caller
    /// detaches from a still-running fetch, the fetch itself is cancelled
    /// and its subprocess terminated.
    fn detach_waiter(&self, file: &Path, fetch_id: u64) {
        let mut slots = self.inner.slots.lock().expect("blame slot map poisoned");
        if let Some(Slot::InFlight(inflight)) = slots.get_mut(file)
            && inflight.id == fetch_id
        {
            inflight.waiters -= 1;
            if inflight.waiters == 0 {
                inflight.token.cancel();
            }
        }
    }
}
