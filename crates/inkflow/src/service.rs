//! Entry points for submitting work.

use std::sync::Arc;

use log::info;

use crate::error::ServiceError;
use crate::job::{JobId, JobRecord, NewJob};
use crate::store::{BrandStore, JobStore};
use crate::worker::{EnqueueOutcome, JobQueue};

/// Creates jobs and hands them to the queue.
#[derive(Clone)]
pub struct JobService {
    jobs: Arc<dyn JobStore>,
    brands: Arc<dyn BrandStore>,
    queue: JobQueue,
}

impl JobService {
    pub fn new(jobs: Arc<dyn JobStore>, brands: Arc<dyn BrandStore>, queue: JobQueue) -> Self {
        Self {
            jobs,
            brands,
            queue,
        }
    }

    /// Stores a new `idle` job for an existing brand and enqueues it.
    pub async fn create_job(&self, job: NewJob) -> Result<(JobId, EnqueueOutcome), ServiceError> {
        if job.topic.trim().is_empty() {
            return Err(ServiceError::EmptyTopic);
        }
        self.brands.find_brand(job.brand_id).await?;

        let job_id = self.jobs.insert(job).await?;
        let outcome = self.queue.enqueue(job_id);
        info!("Created job {} ({:?})", job_id, outcome);
        Ok((job_id, outcome))
    }

    /// Enqueues an existing job again. The run restarts from research
    /// whatever the job's current status.
    pub async fn retrigger(&self, job_id: JobId) -> Result<EnqueueOutcome, ServiceError> {
        let job = self.jobs.find_by_id(job_id).await?;
        let outcome = self.queue.enqueue(job_id);
        info!(
            "Re-triggered job {} from status {} ({:?})",
            job_id, job.status, outcome
        );
        Ok(outcome)
    }

    pub async fn job(&self, job_id: JobId) -> Result<JobRecord, ServiceError> {
        Ok(self.jobs.find_by_id(job_id).await?)
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }
}
