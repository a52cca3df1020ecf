pub mod brand;
pub mod broadcast;
pub mod config;
pub mod content;
pub mod db;
pub mod engine;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod secrets;
pub mod service;
pub mod stages;
pub mod store;
pub mod telemetry;
pub mod worker;

pub use brand::{Brand, NewBrand};
pub use broadcast::{JobEvent, JobEventBroadcaster, JobEventKind, Subscription};
pub use config::{load_config, Config};
pub use content::{ArticleMeta, Brief, Image};
pub use engine::Engine;
pub use error::{
    ConfigError, InkflowError, PipelineError, Result, ServiceError, StageError, StoreError,
};
pub use job::{JobId, JobRecord, JobStatus, JobUpdate, NewJob};
pub use pipeline::{Orchestrator, RunOutcome, Stage};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use service::JobService;
pub use stages::Stages;
pub use store::{BrandStore, JobStore};
pub use worker::{DuplicatePolicy, EnqueueOutcome, JobQueue};
