//! Background analysis on a named thread.
//!
//! Each [`AnalysisWorker::submit`] spawns one thread and bumps a shared
//! generation counter. The latest submission wins: an older handle whose
//! result arrives after a newer submission reports
//! [`WorkerError::Superseded`]. Cancellation raises a flag the engine checks
//! between stages, and the partial computation is discarded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::engine::{AnalysisReport, Cancelled, RefreshAnalyzer};
use crate::log_event;
use crate::logging::{event_names, generate_run_id, LogContext, Stage};
use crate::snapshot::EventSnapshot;

/// Ways a background analysis can end without a report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("analysis cancelled")]
    Cancelled,

    #[error("analysis generation {generation} superseded by {latest}")]
    Superseded { generation: u64, latest: u64 },

    #[error("analysis thread exited without a result")]
    Disconnected,

    #[error("failed to spawn analysis thread: {0}")]
    Spawn(String),
}

impl From<Cancelled> for WorkerError {
    fn from(_: Cancelled) -> Self {
        WorkerError::Cancelled
    }
}

impl From<WorkerError> for bw_common::Error {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::Cancelled => bw_common::Error::Cancelled,
            WorkerError::Superseded { .. } => bw_common::Error::Superseded,
            other => bw_common::Error::Worker(other.to_string()),
        }
    }
}

/// Spawns analyses against a shared engine.
#[derive(Debug, Clone)]
pub struct AnalysisWorker {
    analyzer: Arc<RefreshAnalyzer>,
    generation: Arc<AtomicU64>,
}

impl AnalysisWorker {
    pub fn new(analyzer: RefreshAnalyzer) -> Self {
        Self::shared(Arc::new(analyzer))
    }

    pub fn shared(analyzer: Arc<RefreshAnalyzer>) -> Self {
        Self {
            analyzer,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Generation of the most recent submission (0 before any).
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Start analyzing `snapshot` on a background thread.
    pub fn submit(
        &self,
        snapshot: EventSnapshot,
        now: DateTime<Utc>,
    ) -> Result<AnalysisHandle, WorkerError> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let cancel = Arc::new(AtomicBool::new(false));
        let ctx = LogContext::new(generate_run_id()).with_snapshot(snapshot.digest());
        let (tx, rx) = mpsc::channel();

        let analyzer = Arc::clone(&self.analyzer);
        let flag = Arc::clone(&cancel);
        let thread_ctx = ctx.clone();
        let thread = thread::Builder::new()
            .name(format!("bw-analysis-{generation}"))
            .spawn(move || {
                let result = analyzer.analyze_cancellable(&snapshot, now, &flag, &thread_ctx);
                // The handle may already be gone; nobody is left to tell.
                let _ = tx.send(result);
            })
            .map_err(|e| WorkerError::Spawn(e.to_string()))?;

        Ok(AnalysisHandle {
            generation,
            latest: Arc::clone(&self.generation),
            cancel,
            rx,
            thread: Some(thread),
            ctx,
        })
    }
}

/// One in-flight analysis.
#[derive(Debug)]
pub struct AnalysisHandle {
    generation: u64,
    latest: Arc<AtomicU64>,
    cancel: Arc<AtomicBool>,
    rx: mpsc::Receiver<Result<AnalysisReport, Cancelled>>,
    thread: Option<thread::JoinHandle<()>>,
    ctx: LogContext,
}

impl AnalysisHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether no newer submission exists.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::Acquire) == self.generation
    }

    /// Ask the analysis to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Block until the analysis finishes.
    pub fn wait(mut self) -> Result<AnalysisReport, WorkerError> {
        let received = self.rx.recv();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        let report = match received {
            Ok(Ok(report)) => report,
            Ok(Err(Cancelled)) => {
                log_event!(
                    self.ctx,
                    INFO,
                    event_names::WORKER_CANCELLED,
                    Stage::Output,
                    "analysis cancelled",
                    generation = self.generation
                );
                return Err(WorkerError::Cancelled);
            }
            Err(_) => return Err(WorkerError::Disconnected),
        };

        let latest = self.latest.load(Ordering::Acquire);
        if latest != self.generation {
            log_event!(
                self.ctx,
                INFO,
                event_names::WORKER_SUPERSEDED,
                Stage::Output,
                "discarding superseded analysis",
                generation = self.generation,
                latest = latest
            );
            return Err(WorkerError::Superseded {
                generation: self.generation,
                latest,
            });
        }
        Ok(report)
    }
}

impl Drop for AnalysisHandle {
    fn drop(&mut self) {
        // Abandoned handles stop their thread early.
        if self.thread.is_some() {
            self.cancel.store(true, Ordering::Release);
        }
    }
}
