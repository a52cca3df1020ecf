//! Stage functions: one async capability per pipeline step.
//!
//! Each stage wraps a single external service. Stages never retry; any
//! error is returned to the orchestrator, which fails the job.

pub mod http;
pub mod images;

use std::sync::Arc;

use async_trait::async_trait;

use crate::brand::{Brand, ImageDefaults, SitemapPage};
use crate::content::{ArticleMeta, Brief, Image, ImageSpec};
use crate::error::StageError;

pub use http::HttpStages;
pub use images::{plan_images, PlannedImageGenerator};

#[async_trait]
pub trait Researcher: Send + Sync {
    async fn research(&self, topic: &str, keywords: &[String]) -> Result<Brief, StageError>;
}

/// Produces the article's images.
///
/// Implementations tolerate individual image failures and only return an
/// error when nothing could be produced at all.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_images(
        &self,
        brief: &Brief,
        defaults: &ImageDefaults,
    ) -> Result<Vec<Image>, StageError>;
}

/// Renders one planned image. Used by [`PlannedImageGenerator`].
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn render(
        &self,
        spec: &ImageSpec,
        defaults: &ImageDefaults,
    ) -> Result<Image, StageError>;
}

#[async_trait]
pub trait ArticleWriter: Send + Sync {
    /// Returns the article as markdown.
    async fn write_article(
        &self,
        brief: &Brief,
        images: &[Image],
        brand: &Brand,
        pages: &[SitemapPage],
    ) -> Result<String, StageError>;
}

#[async_trait]
pub trait MetaGenerator: Send + Sync {
    async fn generate_meta(&self, article: &str) -> Result<ArticleMeta, StageError>;
}

#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Returns the thumbnail URL.
    async fn generate_thumbnail(
        &self,
        article: &str,
        brand: &Brand,
    ) -> Result<String, StageError>;
}

/// The full set of stage functions a pipeline run needs.
#[derive(Clone)]
pub struct Stages {
    pub researcher: Arc<dyn Researcher>,
    pub images: Arc<dyn ImageGenerator>,
    pub writer: Arc<dyn ArticleWriter>,
    pub meta: Arc<dyn MetaGenerator>,
    pub thumbnail: Arc<dyn ThumbnailGenerator>,
}

impl Stages {
    /// Uses one provider for every stage.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: Researcher
            + ImageGenerator
            + ArticleWriter
            + MetaGenerator
            + ThumbnailGenerator
            + 'static,
    {
        Self {
            researcher: provider.clone(),
            images: provider.clone(),
            writer: provider.clone(),
            meta: provider.clone(),
            thumbnail: provider,
        }
    }
}

#[async_trait]
impl<T: ImageProvider + ?Sized> ImageProvider for Arc<T> {
    async fn render(
        &self,
        spec: &ImageSpec,
        defaults: &ImageDefaults,
    ) -> Result<Image, StageError> {
        (**self).render(spec, defaults).await
    }
}
