use crate::broadcast::{JobEvent, JobEventBroadcaster};
use crate::job::JobId;

use super::stage::Stage;

/// Publishes one job's transitions to its live subscribers.
pub struct JobProgressTracker {
    job_id: JobId,
    events: JobEventBroadcaster,
}

impl JobProgressTracker {
    pub fn new(job_id: JobId, events: JobEventBroadcaster) -> Self {
        Self { job_id, events }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn stage_started(&self, stage: Stage) {
        self.send(JobEvent::stage_started(
            self.job_id,
            stage.status(),
            stage.start_message(),
        ));
    }

    pub fn stage_completed(&self, stage: Stage) {
        self.send(JobEvent::stage_completed(
            self.job_id,
            stage.status(),
            stage.done_message(),
        ));
    }

    pub fn completed(&self) {
        self.send(JobEvent::completed(self.job_id));
    }

    /// Marks the job as failed with an error message.
    pub fn failed(&self, error: &str) {
        self.send(JobEvent::failed(self.job_id, error));
    }

    fn send(&self, event: JobEvent) {
        let status = event.status;
        let delivered = self.events.publish(event);
        log::trace!(
            "Job {} {} event delivered to {} subscriber(s)",
            self.job_id,
            status,
            delivered
        );
    }
}
