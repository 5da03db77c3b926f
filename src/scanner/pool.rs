//! Bounded worker pool for directory scans.
//!
//! # Overview
//!
//! A scan is a tree of [`ScanTask`]s. Each task is executed on a dedicated
//! rayon pool with a fixed number of workers; tasks return the child tasks
//! they discovered, which are spawned into the same scope. The scope only
//! returns once every transitively submitted task has finished, so the
//! scope doubles as the wait group.
//!
//! Failures are contained per task: an error or panic in one subtree is
//! logged and recorded in [`ScanProgress`], and sibling subtrees continue.
//! When the shutdown flag is raised no further tasks are started.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::{Scope, ThreadPool};
use serde::Serialize;

use super::{ScanError, ScanTask};
use crate::progress::ProgressCallback;

/// Default number of scan workers.
pub const DEFAULT_WORKERS: usize = 12;

/// Upper bound on scan workers.
pub const MAX_WORKERS: usize = 64;

/// Most recent failures kept in memory.
const MAX_RECORDED_FAILURES: usize = 200;

/// A task that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    /// Directory being scanned.
    pub path: PathBuf,
    /// Error text.
    pub message: String,
}

/// Point-in-time copy of the scan counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSnapshot {
    /// Tasks queued so far.
    pub submitted: usize,
    /// Tasks finished (successfully or not).
    pub processed: usize,
    /// Tasks that completed without error.
    pub succeeded: usize,
    /// Tasks that failed.
    pub failed: usize,
    /// Tasks dropped because of a shutdown request.
    pub skipped: usize,
}

impl ScanSnapshot {
    /// Tasks queued but not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.submitted.saturating_sub(self.processed)
    }
}

/// Live counters shared by all workers of one scan.
#[derive(Debug, Default)]
pub struct ScanProgress {
    submitted: AtomicUsize,
    processed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    failures: Mutex<Vec<ScanFailure>>,
}

impl ScanProgress {
    /// Fresh counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read all counters.
    #[must_use]
    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            submitted: self.submitted.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }

    /// Recorded failures, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<ScanFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_failure(&self, path: PathBuf, message: String) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        if failures.len() == MAX_RECORDED_FAILURES {
            failures.remove(0);
        }
        failures.push(ScanFailure { path, message });
    }
}

/// Shared state borrowed by every spawned task of a run.
struct RunContext<'a, F> {
    work: &'a F,
    progress: &'a ScanProgress,
    shutdown: Option<&'a AtomicBool>,
    callback: Option<&'a dyn ProgressCallback>,
}

impl<F> RunContext<'_, F> {
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Fixed-size worker pool that runs recursive scan tasks.
#[derive(Debug)]
pub struct ScanPool {
    pool: ThreadPool,
    workers: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl ScanPool {
    /// Create a pool with `workers` threads, clamped to `1..=MAX_WORKERS`.
    pub fn new(workers: usize) -> Result<Self, ScanError> {
        let workers = workers.clamp(1, MAX_WORKERS);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("nascatalog-scan-{i}"))
            .build()
            .map_err(|e| ScanError::Pool(e.to_string()))?;
        log::debug!("Scan pool started with {} workers", workers);
        Ok(Self {
            pool,
            workers,
            shutdown_flag: None,
        })
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// Once the flag is `true`, queued tasks are skipped and no new tasks
    /// are started; tasks already running finish normally.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Run `roots` and every task they transitively produce, blocking until
    /// all of them have finished.
    pub fn run<F>(
        &self,
        roots: Vec<ScanTask>,
        work: &F,
        progress: &ScanProgress,
        callback: Option<&dyn ProgressCallback>,
    ) where
        F: Fn(&ScanTask) -> Result<Vec<ScanTask>, ScanError> + Sync,
    {
        let ctx = RunContext {
            work,
            progress,
            shutdown: self.shutdown_flag.as_deref(),
            callback,
        };
        self.pool.scope(|scope| {
            for task in roots {
                submit(scope, task, &ctx);
            }
        });
    }
}

fn submit<'scope, F>(scope: &Scope<'scope>, task: ScanTask, ctx: &'scope RunContext<'scope, F>)
where
    F: Fn(&ScanTask) -> Result<Vec<ScanTask>, ScanError> + Sync,
{
    if ctx.is_shutdown_requested() {
        ctx.progress.skipped.fetch_add(1, Ordering::SeqCst);
        return;
    }
    ctx.progress.submitted.fetch_add(1, Ordering::SeqCst);

    scope.spawn(move |scope| {
        if ctx.is_shutdown_requested() {
            ctx.progress.skipped.fetch_add(1, Ordering::SeqCst);
            ctx.progress.processed.fetch_add(1, Ordering::SeqCst);
            return;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| (ctx.work)(&task)))
            .unwrap_or_else(|_| Err(ScanError::WorkerPanicked(task.abs_path.clone())));

        match outcome {
            Ok(children) => {
                ctx.progress.succeeded.fetch_add(1, Ordering::SeqCst);
                for child in children {
                    submit(scope, child, ctx);
                }
            }
            Err(e) => {
                log::warn!("Scan of '{}' failed: {}", task.rel_path, e);
                let message = e.to_string();
                if let Some(cb) = ctx.callback {
                    cb.on_task_failed(&task.rel_path, &message);
                }
                ctx.progress.record_failure(task.abs_path.clone(), message);
            }
        }

        ctx.progress.processed.fetch_add(1, Ordering::SeqCst);
        if let Some(cb) = ctx.callback {
            cb.on_task_finished(&ctx.progress.snapshot(), &task.rel_path);
        }
    });
}
