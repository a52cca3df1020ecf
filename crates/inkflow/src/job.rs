//! Job records and the partial updates applied to them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{ArticleMeta, Brief, Image};

pub type JobId = i64;
pub type BrandId = i64;

/// Message recorded when a failure carries no text of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "Pipeline failed";

/// Persisted status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Researching,
    GeneratingImages,
    Writing,
    GeneratingMeta,
    GeneratingThumbnail,
    Completed,
    Failed,
}

impl JobStatus {
    /// All statuses a run passes through while in flight.
    pub const IN_FLIGHT: [JobStatus; 5] = [
        JobStatus::Researching,
        JobStatus::GeneratingImages,
        JobStatus::Writing,
        JobStatus::GeneratingMeta,
        JobStatus::GeneratingThumbnail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Researching => "researching",
            JobStatus::GeneratingImages => "generating_images",
            JobStatus::Writing => "writing",
            JobStatus::GeneratingMeta => "generating_meta",
            JobStatus::GeneratingThumbnail => "generating_thumbnail",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(JobStatus::Idle),
            "researching" => Ok(JobStatus::Researching),
            "generating_images" => Ok(JobStatus::GeneratingImages),
            "writing" => Ok(JobStatus::Writing),
            "generating_meta" => Ok(JobStatus::GeneratingMeta),
            "generating_thumbnail" => Ok(JobStatus::GeneratingThumbnail),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A job as held by the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub brand_id: BrandId,
    pub topic: String,
    /// Comma-separated keyword list, as submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_brief: Option<Brief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Splits the comma list into trimmed, non-empty keywords.
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Applies a partial update in place.
    ///
    /// Keeps `error_message` set exactly when the status is `failed`, and
    /// `completed_at` set exactly when the status is terminal.
    pub fn apply(&mut self, update: JobUpdate, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            self.status = status;
            self.completed_at = status.is_terminal().then_some(now);
        }
        if let Some(error_message) = update.error_message {
            self.error_message = error_message;
        }
        if let Some(brief) = update.research_brief {
            self.research_brief = Some(brief);
        }
        if let Some(images) = update.images {
            self.images = Some(images);
        }
        if let Some(article) = update.article_content {
            self.article_content = Some(article);
        }
        if let Some(meta) = update.meta {
            self.meta_title = Some(meta.meta_title);
            self.meta_description = Some(meta.meta_description);
            self.url_slug = Some(meta.url_slug);
        }
        if let Some(url) = update.thumbnail_url {
            self.thumbnail_url = Some(url);
        }

        if self.status == JobStatus::Failed {
            if self.error_message.is_none() {
                self.error_message = Some(GENERIC_FAILURE_MESSAGE.to_string());
            }
        } else {
            self.error_message = None;
        }
        self.updated_at = now;
    }
}

/// Fields for a job about to be created.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub brand_id: BrandId,
    pub topic: String,
    pub keywords: Option<String>,
}

impl NewJob {
    pub fn new(brand_id: BrandId, topic: impl Into<String>) -> Self {
        Self {
            brand_id,
            topic: topic.into(),
            keywords: None,
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Materializes an `idle` job with an assigned id.
    pub fn into_record(self, id: JobId, now: DateTime<Utc>) -> JobRecord {
        JobRecord {
            id,
            brand_id: self.brand_id,
            topic: self.topic,
            keywords: self.keywords,
            status: JobStatus::Idle,
            research_brief: None,
            images: None,
            article_content: None,
            meta_title: None,
            meta_description: None,
            url_slug: None,
            thumbnail_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// A partial update to a job. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    /// `Some(None)` clears the message.
    pub error_message: Option<Option<String>>,
    pub research_brief: Option<Brief>,
    pub images: Option<Vec<Image>>,
    pub article_content: Option<String>,
    pub meta: Option<ArticleMeta>,
    pub thumbnail_url: Option<String>,
}

impl JobUpdate {
    /// Moves the job to a non-failed status and clears any stale error.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            error_message: Some(None),
            ..Default::default()
        }
    }

    /// Marks the job failed with the given message, in one update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error_message: Some(Some(message.into())),
            ..Default::default()
        }
    }

    pub fn research_brief(brief: Brief) -> Self {
        Self {
            research_brief: Some(brief),
            ..Default::default()
        }
    }

    pub fn images(images: Vec<Image>) -> Self {
        Self {
            images: Some(images),
            ..Default::default()
        }
    }

    pub fn article(markdown: String) -> Self {
        Self {
            article_content: Some(markdown),
            ..Default::default()
        }
    }

    pub fn meta(meta: ArticleMeta) -> Self {
        Self {
            meta: Some(meta),
            ..Default::default()
        }
    }

    pub fn thumbnail(url: String) -> Self {
        Self {
            thumbnail_url: Some(url),
            ..Default::default()
        }
    }
}
