//! Stores backed by the SQLite database.
//!
//! Statements are synchronous and sub-millisecond, so they run inline on
//! the calling task.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{BrandStore, JobStore};
use crate::brand::{Brand, NewBrand};
use crate::db::brand_repo::{self, BrandRow};
use crate::db::job_repo::{self, JobRow};
use crate::db::Database;
use crate::error::StoreError;
use crate::job::{BrandId, JobId, JobRecord, JobStatus, JobUpdate, NewJob};

// ─── Helpers ────────────────────────────────────────────────────────────────

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn encode<T: Serialize>(
    job_id: JobId,
    field: &'static str,
    value: &T,
) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode {
        job_id,
        field,
        source,
    })
}

fn decode<T: DeserializeOwned>(id: i64, field: &'static str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Decode { id, field, source })
}

fn record_from_row(row: JobRow) -> Result<JobRecord, StoreError> {
    let status = row
        .status
        .parse::<JobStatus>()
        .map_err(|e| StoreError::InvalidStatus {
            job_id: row.id,
            value: e.0,
        })?;
    let research_brief = row
        .research_brief
        .as_deref()
        .map(|raw| decode(row.id, "research_brief", raw))
        .transpose()?;
    let images = row
        .images
        .as_deref()
        .map(|raw| decode(row.id, "images", raw))
        .transpose()?;

    Ok(JobRecord {
        id: row.id,
        brand_id: row.brand_id,
        topic: row.topic,
        keywords: row.keywords,
        status,
        research_brief,
        images,
        article_content: row.article_content,
        meta_title: row.meta_title,
        meta_description: row.meta_description,
        url_slug: row.url_slug,
        thumbnail_url: row.thumbnail_url,
        error_message: row.error_message,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
        completed_at: row.completed_at.as_deref().map(parse_timestamp),
    })
}

fn row_from_record(job: &JobRecord) -> Result<JobRow, StoreError> {
    let research_brief = job
        .research_brief
        .as_ref()
        .map(|brief| encode(job.id, "research_brief", brief))
        .transpose()?;
    let images = job
        .images
        .as_ref()
        .map(|images| encode(job.id, "images", images))
        .transpose()?;

    Ok(JobRow {
        id: job.id,
        brand_id: job.brand_id,
        topic: job.topic.clone(),
        keywords: job.keywords.clone(),
        status: job.status.as_str().to_string(),
        research_brief,
        images,
        article_content: job.article_content.clone(),
        meta_title: job.meta_title.clone(),
        meta_description: job.meta_description.clone(),
        url_slug: job.url_slug.clone(),
        thumbnail_url: job.thumbnail_url.clone(),
        error_message: job.error_message.clone(),
        created_at: format_timestamp(job.created_at),
        updated_at: format_timestamp(job.updated_at),
        completed_at: job.completed_at.map(format_timestamp),
    })
}

fn brand_from_row(row: BrandRow) -> Result<Brand, StoreError> {
    Ok(Brand {
        id: row.id,
        voice: decode(row.id, "voice", &row.voice)?,
        seo: decode(row.id, "seo", &row.seo)?,
        image_defaults: decode(row.id, "image_defaults", &row.image_defaults)?,
        linking: decode(row.id, "linking", &row.linking)?,
        voice_samples: decode(row.id, "voice_samples", &row.voice_samples)?,
        sitemap_pages: decode(row.id, "sitemap_pages", &row.sitemap_pages)?,
        created_at: parse_timestamp(&row.created_at),
        name: row.name,
        domain: row.domain,
    })
}

// ─── SqliteJobStore ─────────────────────────────────────────────────────────

/// Job store persisted in the `jobs` table.
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Number of jobs currently in `status`.
    pub fn count_by_status(&self, status: JobStatus) -> Result<u64, StoreError> {
        let count = self
            .db
            .with_conn(|conn| job_repo::count_by_status(conn, status.as_str()))?;
        Ok(count)
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, job: NewJob) -> Result<JobId, StoreError> {
        let record = job.into_record(0, Utc::now());
        let row = row_from_record(&record)?;
        Ok(self.db.with_conn(|conn| job_repo::insert(conn, &row))?)
    }

    async fn find_by_id(&self, id: JobId) -> Result<JobRecord, StoreError> {
        let row = self.db.with_conn(|conn| job_repo::find_by_id(conn, id))?;
        record_from_row(row.ok_or(StoreError::JobNotFound(id))?)
    }

    async fn update(&self, id: JobId, update: JobUpdate) -> Result<(), StoreError> {
        self.db.transaction(|tx| -> Result<(), StoreError> {
            let current = job_repo::find_by_id(tx, id)?.ok_or(StoreError::JobNotFound(id))?;
            let mut record = record_from_row(current)?;
            record.apply(update, Utc::now());
            job_repo::update(tx, &row_from_record(&record)?)?;
            Ok(())
        })
    }

    async fn list_by_status(&self, statuses: &[JobStatus]) -> Result<Vec<JobRecord>, StoreError> {
        let names: Vec<&str> = statuses.iter().map(JobStatus::as_str).collect();
        self.db
            .with_conn(|conn| job_repo::list_by_status(conn, &names))?
            .into_iter()
            .map(record_from_row)
            .collect()
    }
}

// ─── SqliteBrandStore ───────────────────────────────────────────────────────

/// Brand store persisted in the `brands` table.
#[derive(Clone)]
pub struct SqliteBrandStore {
    db: Database,
}

impl SqliteBrandStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Registers a brand and returns its id.
    pub fn insert(&self, brand: NewBrand) -> Result<BrandId, StoreError> {
        let row = BrandRow {
            id: 0,
            voice: encode(0, "voice", &brand.voice)?,
            seo: encode(0, "seo", &brand.seo)?,
            image_defaults: encode(0, "image_defaults", &brand.image_defaults)?,
            linking: encode(0, "linking", &brand.linking)?,
            voice_samples: encode(0, "voice_samples", &brand.voice_samples)?,
            sitemap_pages: encode(0, "sitemap_pages", &brand.sitemap_pages)?,
            created_at: format_timestamp(Utc::now()),
            name: brand.name,
            domain: brand.domain,
        };
        Ok(self.db.with_conn(|conn| brand_repo::insert(conn, &row))?)
    }
}

#[async_trait]
impl BrandStore for SqliteBrandStore {
    async fn find_brand(&self, id: BrandId) -> Result<Brand, StoreError> {
        let row = self.db.with_conn(|conn| brand_repo::find_by_id(conn, id))?;
        brand_from_row(row.ok_or(StoreError::BrandNotFound(id))?)
    }
}
