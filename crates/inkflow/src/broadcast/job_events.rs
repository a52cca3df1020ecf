//! Per-job event broadcaster for live progress streaming.
//!
//! Subscribers register against a single job id and only ever see events
//! for that id. Delivery is synchronous and in-process: there is no
//! buffering or replay, so a late subscriber only sees what is published
//! after it registers.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::job::{JobId, JobStatus};

/// What a [`JobEvent`] reports about its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    StageStarted,
    StageCompleted,
    Completed,
    Failed,
}

impl JobEventKind {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEventKind::Completed | JobEventKind::Failed)
    }
}

/// A single progress event for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub kind: JobEventKind,
    /// Human-readable description of the transition.
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    /// Creates an event stamped with the current time.
    pub fn new(job_id: JobId, status: JobStatus, kind: JobEventKind, message: &str) -> Self {
        Self {
            job_id,
            status,
            kind,
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn stage_started(job_id: JobId, status: JobStatus, message: &str) -> Self {
        Self::new(job_id, status, JobEventKind::StageStarted, message)
    }

    pub fn stage_completed(job_id: JobId, status: JobStatus, message: &str) -> Self {
        Self::new(job_id, status, JobEventKind::StageCompleted, message)
    }

    pub fn completed(job_id: JobId) -> Self {
        Self::new(
            job_id,
            JobStatus::Completed,
            JobEventKind::Completed,
            "Content generation completed",
        )
    }

    /// Creates a failure event carrying the error message.
    pub fn failed(job_id: JobId, error: &str) -> Self {
        Self::new(job_id, JobStatus::Failed, JobEventKind::Failed, error)
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

type Callback = Arc<dyn Fn(&JobEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    subscribers: Mutex<HashMap<JobId, Vec<(u64, Callback)>>>,
    last_id: AtomicU64,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Vec<(u64, Callback)>>> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job event registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn remove(&self, job_id: JobId, id: u64) {
        let mut subscribers = self.lock();
        if let Some(entries) = subscribers.get_mut(&job_id) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                subscribers.remove(&job_id);
            }
        }
    }
}

/// Fans job events out to the subscribers of each job id.
///
/// Cloning is cheap; clones share the same subscriber registry.
#[derive(Clone, Default)]
pub struct JobEventBroadcaster {
    registry: Arc<Registry>,
}

impl JobEventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every current subscriber of its job id and
    /// returns how many were reached. Zero subscribers is not an error.
    ///
    /// Callbacks run on the caller's task, outside the registry lock, so a
    /// callback may itself subscribe or unsubscribe.
    pub fn publish(&self, event: JobEvent) -> usize {
        let callbacks: Vec<Callback> = match self.registry.lock().get(&event.job_id) {
            Some(entries) => entries.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return 0,
        };

        for callback in &callbacks {
            callback(&event);
        }
        callbacks.len()
    }

    /// Registers `callback` for future events on `job_id`.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, job_id: JobId, callback: F) -> Subscription
    where
        F: Fn(&JobEvent) + Send + Sync + 'static,
    {
        let id = self.registry.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.registry
            .lock()
            .entry(job_id)
            .or_default()
            .push((id, Arc::new(callback)));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            job_id,
            id,
        }
    }

    /// Subscribes to `job_id` as an async stream that ends after the first
    /// `completed` or `failed` event.
    pub fn stream(&self, job_id: JobId) -> JobEventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(job_id, move |event| {
            // Receiver gone means the stream was dropped; nothing to do.
            let _ = tx.send(event.clone());
        });

        JobEventStream {
            rx,
            _subscription: subscription,
            finished: false,
        }
    }

    /// Number of live subscribers for `job_id`.
    pub fn subscriber_count(&self, job_id: JobId) -> usize {
        self.registry.lock().get(&job_id).map_or(0, Vec::len)
    }
}

/// Handle to a registered callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Registry>,
    job_id: JobId,
    id: u64,
}

impl Subscription {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Deregisters the callback.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.job_id, self.id);
        }
    }
}

/// Stream of one job's events, terminated by its terminal event.
pub struct JobEventStream {
    rx: mpsc::UnboundedReceiver<JobEvent>,
    _subscription: Subscription,
    finished: bool,
}

impl Stream for JobEventStream {
    type Item = JobEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    this.finished = true;
                    this.rx.close();
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
