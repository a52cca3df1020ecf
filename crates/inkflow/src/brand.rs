//! Brand (tenant) configuration consumed read-only by the stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::BrandId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub voice: VoiceProfile,
    #[serde(default)]
    pub seo: SeoTargets,
    #[serde(default)]
    pub image_defaults: ImageDefaults,
    #[serde(default)]
    pub linking: LinkingPolicy,
    /// Excerpts of existing copy the writer should imitate.
    #[serde(default)]
    pub voice_samples: Vec<String>,
    /// Pages the writer may link to internally.
    #[serde(default)]
    pub sitemap_pages: Vec<SitemapPage>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    #[serde(default)]
    pub tone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default)]
    pub guidelines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoTargets {
    #[serde(default)]
    pub primary_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_word_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    #[serde(default = "default_true")]
    pub include_hero: bool,
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

fn default_max_images() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            style: None,
            aspect_ratio: default_aspect_ratio(),
            max_images: default_max_images(),
            include_hero: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingPolicy {
    #[serde(default = "default_max_links")]
    pub max_internal_links: u32,
    /// Path prefixes preferred as link targets, e.g. `"/guides/"`.
    #[serde(default)]
    pub preferred_paths: Vec<String>,
}

fn default_max_links() -> u32 {
    5
}

impl Default for LinkingPolicy {
    fn default() -> Self {
        Self {
            max_internal_links: default_max_links(),
            preferred_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapPage {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Fields needed to register a brand.
#[derive(Debug, Clone, Default)]
pub struct NewBrand {
    pub name: String,
    pub domain: Option<String>,
    pub voice: VoiceProfile,
    pub seo: SeoTargets,
    pub image_defaults: ImageDefaults,
    pub linking: LinkingPolicy,
    pub voice_samples: Vec<String>,
    pub sitemap_pages: Vec<SitemapPage>,
}

impl NewBrand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Materializes the brand with an assigned id.
    pub fn into_brand(self, id: BrandId, created_at: DateTime<Utc>) -> Brand {
        Brand {
            id,
            name: self.name,
            domain: self.domain,
            voice: self.voice,
            seo: self.seo,
            image_defaults: self.image_defaults,
            linking: self.linking,
            voice_samples: self.voice_samples,
            sitemap_pages: self.sitemap_pages,
            created_at,
        }
    }
}
