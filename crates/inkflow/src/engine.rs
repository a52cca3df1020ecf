//! Wires configuration, storage, stages and the queue into one handle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::broadcast::JobEventBroadcaster;
use crate::config::Config;
use crate::db::{self, Database};
use crate::error::{ConfigError, Result};
use crate::pipeline::Orchestrator;
use crate::secrets::{self, resolve_secret_optional};
use crate::service::JobService;
use crate::stages::{HttpStages, PlannedImageGenerator, Stages};
use crate::store::{BrandStore, JobStore, SqliteBrandStore, SqliteJobStore};
use crate::worker::{recover_interrupted, JobQueue};

/// A fully wired instance: one database, one broadcaster, one queue.
pub struct Engine {
    database: Database,
    jobs: Arc<SqliteJobStore>,
    brands: Arc<SqliteBrandStore>,
    events: JobEventBroadcaster,
    queue: JobQueue,
    service: JobService,
}

impl Engine {
    /// Builds the engine against the HTTP stage service from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let database = Database::open(&database_path(config)?)?;

        let stages_config = &config.stages;
        let api_key = resolve_secret_optional(
            stages_config.api_key.as_deref(),
            stages_config.api_key_file.as_deref(),
            stages_config.api_key_env_var.as_deref(),
        )
        .map_err(ConfigError::from)?;
        let http = Arc::new(HttpStages::new(
            stages_config.base_url.as_str(),
            Duration::from_secs(stages_config.timeout_secs),
            api_key,
        )?);
        let stages = Stages {
            researcher: http.clone(),
            images: Arc::new(PlannedImageGenerator::new(http.clone())),
            writer: http.clone(),
            meta: http.clone(),
            thumbnail: http,
        };

        Ok(Self::with_stages(database, stages, config))
    }

    /// Builds the engine with caller-supplied stage functions.
    pub fn with_stages(database: Database, stages: Stages, config: &Config) -> Self {
        let jobs = Arc::new(SqliteJobStore::new(database.clone()));
        let brands = Arc::new(SqliteBrandStore::new(database.clone()));
        let events = JobEventBroadcaster::new();

        let job_store: Arc<dyn JobStore> = jobs.clone();
        let brand_store: Arc<dyn BrandStore> = brands.clone();
        let orchestrator = Orchestrator::new(
            Arc::clone(&job_store),
            Arc::clone(&brand_store),
            events.clone(),
            stages,
        );
        let queue = JobQueue::new(Arc::new(orchestrator), config.queue.duplicates);
        let service = JobService::new(job_store, brand_store, queue.clone());

        Self {
            database,
            jobs,
            brands,
            events,
            queue,
            service,
        }
    }

    /// Re-enqueues jobs a previous process left unfinished.
    /// Must be called from within a Tokio runtime.
    pub async fn start(&self) -> Result<usize> {
        let recovered = recover_interrupted(self.jobs.as_ref(), &self.queue).await?;
        info!("Engine started, {} interrupted job(s) re-enqueued", recovered);
        Ok(recovered)
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn jobs(&self) -> &SqliteJobStore {
        &self.jobs
    }

    pub fn brands(&self) -> &SqliteBrandStore {
        &self.brands
    }

    pub fn events(&self) -> &JobEventBroadcaster {
        &self.events
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn service(&self) -> &JobService {
        &self.service
    }
}

fn database_path(config: &Config) -> std::result::Result<PathBuf, ConfigError> {
    match &config.database.path {
        Some(path) => Ok(PathBuf::from(secrets::expand_home(path))),
        None => db::default_database_path().ok_or_else(|| ConfigError::Validation {
            message: "No database path configured and no home directory found".to_string(),
        }),
    }
}
