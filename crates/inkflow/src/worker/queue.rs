//! In-process FIFO job queue.
//!
//! At most one pipeline run is active at any time. Ids are run in the
//! order they were admitted; the queue is unbounded and not persisted.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::PipelineError;
use crate::job::{JobId, GENERIC_FAILURE_MESSAGE};
use crate::pipeline::{Orchestrator, RunOutcome};

/// Runs one job to completion. The queue's only view of the pipeline.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run_job(&self, job_id: JobId) -> Result<RunOutcome, PipelineError>;

    /// Records a terminal failure for a run that died without reaching one.
    async fn abandon(&self, job_id: JobId, message: &str) -> Result<(), PipelineError>;
}

#[async_trait]
impl JobRunner for Orchestrator {
    async fn run_job(&self, job_id: JobId) -> Result<RunOutcome, PipelineError> {
        self.run(job_id).await
    }

    async fn abandon(&self, job_id: JobId, message: &str) -> Result<(), PipelineError> {
        Orchestrator::abandon(self, job_id, message).await
    }
}

/// Failure text for a run that panicked. Carries the panic payload when it is a string.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) if !detail.trim().is_empty() => format!("Pipeline crashed: {}", detail),
        _ => GENERIC_FAILURE_MESSAGE.to_string(),
    }
}

/// What to do when an id is enqueued while it is already waiting or running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the existing entry and drop the new one.
    #[default]
    Coalesce,
    /// Append anyway; the job runs once per enqueue.
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The queue was idle and the job started right away.
    Started,
    /// The job waits behind others. `position` is 1-based.
    Queued { position: usize },
    /// The id was already waiting or running and the policy is
    /// [`DuplicatePolicy::Coalesce`].
    AlreadyQueued,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub running: Option<JobId>,
    pub pending: Vec<JobId>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<JobId>,
    running: Option<JobId>,
}

struct QueueInner {
    runner: Arc<dyn JobRunner>,
    policy: DuplicatePolicy,
    state: Mutex<QueueState>,
    idle_tx: watch::Sender<bool>,
}

impl QueueInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job queue lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Strictly sequential scheduler for pipeline runs.
///
/// Cloning is cheap; clones share one queue.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl JobQueue {
    pub fn new(runner: Arc<dyn JobRunner>, policy: DuplicatePolicy) -> Self {
        let (idle_tx, _) = watch::channel(true);
        Self {
            inner: Arc::new(QueueInner {
                runner,
                policy,
                state: Mutex::new(QueueState::default()),
                idle_tx,
            }),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.inner.policy
    }

    /// Admits `job_id`. Never blocks and never reports the run's result;
    /// follow the job through the store or the event broadcaster.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime while the queue is idle.
    pub fn enqueue(&self, job_id: JobId) -> EnqueueOutcome {
        let mut state = self.inner.lock();

        if state.running.is_some() {
            if self.inner.policy == DuplicatePolicy::Coalesce
                && (state.running == Some(job_id) || state.pending.contains(&job_id))
            {
                debug!("Job {} is already queued", job_id);
                return EnqueueOutcome::AlreadyQueued;
            }
            state.pending.push_back(job_id);
            let position = state.pending.len();
            debug!("Job {} queued at position {}", job_id, position);
            return EnqueueOutcome::Queued { position };
        }

        state.running = Some(job_id);
        self.inner.idle_tx.send_replace(false);
        drop(state);

        debug!("Queue idle, starting job {}", job_id);
        tokio::spawn(drain(Arc::clone(&self.inner), job_id));
        EnqueueOutcome::Started
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.inner.lock();
        QueueSnapshot {
            running: state.running,
            pending: state.pending.iter().copied().collect(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.inner.lock().running.is_none()
    }

    /// Resolves once nothing is running and nothing is waiting.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.idle_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|idle| *idle).await;
    }
}

/// Runs `first`, then every waiting id, until the buffer is empty.
async fn drain(inner: Arc<QueueInner>, first: JobId) {
    let mut job_id = first;
    loop {
        run_isolated(&inner, job_id).await;

        let next = {
            let mut state = inner.lock();
            let next = state.pending.pop_front();
            state.running = next;
            if next.is_none() {
                inner.idle_tx.send_replace(true);
            }
            next
        };

        match next {
            Some(next) => job_id = next,
            None => {
                debug!("Queue drained");
                return;
            }
        }
    }
}

/// Runs one job on its own task so a panic cannot take the loop down.
async fn run_isolated(inner: &QueueInner, job_id: JobId) {
    let runner = Arc::clone(&inner.runner);
    let handle = tokio::spawn(async move { runner.run_job(job_id).await });

    match handle.await {
        Ok(Ok(RunOutcome::Completed)) => info!("Job {} completed", job_id),
        Ok(Ok(RunOutcome::Failed { message, .. })) => {
            info!("Job {} failed: {}", job_id, message)
        }
        Ok(Err(e)) => error!("Job {} aborted: {}", job_id, e),
        Err(e) if e.is_panic() => {
            error!("Job {} run panicked", job_id);
            abandon(inner, job_id, panic_message(e.into_panic())).await;
        }
        Err(e) => error!("Job {} run was cancelled: {}", job_id, e),
    }
}

/// Moves a job whose run panicked to `failed` so watchers see it end.
async fn abandon(inner: &QueueInner, job_id: JobId, message: String) {
    let runner = Arc::clone(&inner.runner);
    let handle = tokio::spawn(async move { runner.abandon(job_id, &message).await });

    match handle.await {
        Ok(Ok(())) => info!("Job {} marked failed after a crash", job_id),
        Ok(Err(e)) => error!("Job {} could not be marked failed: {}", job_id, e),
        Err(e) => error!("Job {} failure handling panicked: {}", job_id, e),
    }
}
