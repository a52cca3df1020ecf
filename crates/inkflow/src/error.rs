use std::path::PathBuf;
use thiserror::Error;

use crate::job::{BrandId, JobId};

#[derive(Error, Debug)]
pub enum InkflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Request rejected: {0}")]
    Service(#[from] ServiceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Secret resolution failed: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

/// Errors from the job and brand stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    #[error("Brand {0} not found")]
    BrandNotFound(BrandId),

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),

    #[error("Failed to encode '{field}' for job {job_id}: {source}")]
    Encode {
        job_id: JobId,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode '{field}' for record {id}: {source}")]
    Decode {
        id: i64,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown job status '{value}' for job {job_id}")]
    InvalidStatus { job_id: JobId, value: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Errors raised by stage functions. Any of these fails the job.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Request to stage service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Stage service returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Malformed provider output: {0}")]
    Malformed(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

/// Errors that abort a pipeline run before it can record its own outcome.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Job store failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Topic must not be empty")]
    EmptyTopic,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, InkflowError>;
