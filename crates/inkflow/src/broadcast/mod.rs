//! Broadcasting of live job progress.
//!
//! Events are ephemeral: the job store is the source of truth, the
//! broadcaster only lets listeners follow a run without polling.

pub mod job_events;

pub use job_events::{JobEvent, JobEventBroadcaster, JobEventKind, JobEventStream, Subscription};
