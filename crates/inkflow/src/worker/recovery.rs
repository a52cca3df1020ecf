use log::info;

use crate::error::StoreError;
use crate::job::JobStatus;
use crate::store::JobStore;

use super::queue::JobQueue;

/// Re-enqueues every job that never reached a terminal status, oldest
/// first. The queue lives in memory, so anything admitted before a restart
/// is otherwise lost. Returns the number of jobs re-enqueued.
pub async fn recover_interrupted(
    jobs: &dyn JobStore,
    queue: &JobQueue,
) -> Result<usize, StoreError> {
    let mut statuses = vec![JobStatus::Idle];
    statuses.extend_from_slice(&JobStatus::IN_FLIGHT);

    let interrupted = jobs.list_by_status(&statuses).await?;
    for job in &interrupted {
        info!(
            "Recovering job {} (was {}): {}",
            job.id, job.status, job.topic
        );
        queue.enqueue(job.id);
    }

    Ok(interrupted.len())
}
