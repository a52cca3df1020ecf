//! In-memory stores.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::{BrandStore, JobStore};
use crate::brand::{Brand, NewBrand};
use crate::error::StoreError;
use crate::job::{BrandId, JobId, JobRecord, JobStatus, JobUpdate, NewJob};

/// Job store held entirely in memory. Ids start at 1.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<BTreeMap<JobId, JobRecord>>,
    last_id: AtomicI64,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored job, ordered by id.
    pub fn all(&self) -> Vec<JobRecord> {
        match self.jobs.read() {
            Ok(jobs) => jobs.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: NewJob) -> Result<JobId, StoreError> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = job.into_record(id, Utc::now());
        self.jobs
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(id, record);
        Ok(id)
    }

    async fn find_by_id(&self, id: JobId) -> Result<JobRecord, StoreError> {
        self.jobs
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::JobNotFound(id))
    }

    async fn update(&self, id: JobId, update: JobUpdate) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().map_err(|_| StoreError::LockPoisoned)?;
        let job = jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;
        job.apply(update, Utc::now());
        Ok(())
    }

    async fn list_by_status(&self, statuses: &[JobStatus]) -> Result<Vec<JobRecord>, StoreError> {
        let jobs = self.jobs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(jobs
            .values()
            .filter(|job| statuses.contains(&job.status))
            .cloned()
            .collect())
    }
}

/// Brand store held in memory.
#[derive(Default)]
pub struct MemoryBrandStore {
    brands: RwLock<HashMap<BrandId, Brand>>,
    last_id: AtomicI64,
}

impl MemoryBrandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a brand and returns its id.
    pub fn insert(&self, brand: NewBrand) -> Result<BrandId, StoreError> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let brand = brand.into_brand(id, Utc::now());
        self.brands
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(id, brand);
        Ok(id)
    }
}

#[async_trait]
impl BrandStore for MemoryBrandStore {
    async fn find_brand(&self, id: BrandId) -> Result<Brand, StoreError> {
        self.brands
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::BrandNotFound(id))
    }
}
