//! Artifacts produced by the pipeline stages.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// Structured research output that seeds every later stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brief {
    pub topic: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub outline: Vec<OutlineSection>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub image_suggestions: Vec<ImageSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineSection {
    pub heading: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub title: String,
    pub url: String,
}

/// An image the research stage thinks the article should carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSuggestion {
    /// Where the image goes, e.g. `"hero"` or a section heading.
    pub placement: String,
    pub description: String,
}

/// A rendered image ready to embed in the article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub placement: String,
    pub url: String,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// A single planned image request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    pub placement: String,
    pub prompt: String,
    pub alt: String,
}

/// SEO metadata for a finished article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMeta {
    pub meta_title: String,
    pub meta_description: String,
    pub url_slug: String,
}

static RE_URL_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

impl ArticleMeta {
    /// Rejects metadata a publisher could not use.
    pub fn validate(&self) -> Result<(), StageError> {
        if self.meta_title.trim().is_empty() {
            return Err(StageError::Malformed("meta title is empty".to_string()));
        }
        if self.meta_description.trim().is_empty() {
            return Err(StageError::Malformed(
                "meta description is empty".to_string(),
            ));
        }
        if !RE_URL_SLUG.is_match(&self.url_slug) {
            return Err(StageError::Malformed(format!(
                "invalid url slug '{}'",
                self.url_slug
            )));
        }
        Ok(())
    }
}
