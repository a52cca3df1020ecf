//! Job and brand stores: the durable side of the pipeline.
//!
//! The orchestrator only talks to the [`JobStore`] and [`BrandStore`]
//! traits. `sqlite` backs them with the rusqlite database, `memory` keeps
//! everything in a map for tests and embedded use.

use async_trait::async_trait;

use crate::brand::Brand;
use crate::error::StoreError;
use crate::job::{BrandId, JobId, JobRecord, JobStatus, JobUpdate, NewJob};

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryBrandStore, MemoryJobStore};
pub use sqlite::{SqliteBrandStore, SqliteJobStore};

/// Durable record of each job's status and outputs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Creates an `idle` job and returns its id.
    async fn insert(&self, job: NewJob) -> Result<JobId, StoreError>;

    /// Fails with [`StoreError::JobNotFound`] when absent.
    async fn find_by_id(&self, id: JobId) -> Result<JobRecord, StoreError>;

    /// Applies a partial update. Fails with [`StoreError::JobNotFound`] when absent.
    async fn update(&self, id: JobId, update: JobUpdate) -> Result<(), StoreError>;

    /// Jobs whose status is any of `statuses`, ordered by id.
    async fn list_by_status(&self, statuses: &[JobStatus]) -> Result<Vec<JobRecord>, StoreError>;
}

/// Read-only access to brand configuration.
#[async_trait]
pub trait BrandStore: Send + Sync {
    /// Fails with [`StoreError::BrandNotFound`] when absent.
    async fn find_brand(&self, id: BrandId) -> Result<Brand, StoreError>;
}
