pub mod queue;
pub mod recovery;

pub use queue::{DuplicatePolicy, EnqueueOutcome, JobQueue, JobRunner, QueueSnapshot};
pub use recovery::recover_interrupted;
