//! Stage functions backed by a JSON-over-HTTP generation service.
//!
//! Every stage is a `POST {base_url}/{endpoint}` with a JSON body. Any
//! non-2xx answer or an unparseable body fails the stage.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::brand::{Brand, ImageDefaults, SitemapPage};
use crate::content::{ArticleMeta, Brief, Image, ImageSpec};
use crate::error::StageError;

use super::{ArticleWriter, ImageProvider, MetaGenerator, Researcher, ThumbnailGenerator};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider error bodies are cut to this many characters.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}

#[derive(Serialize)]
struct ResearchRequest<'a> {
    topic: &'a str,
    keywords: &'a [String],
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    spec: &'a ImageSpec,
    defaults: &'a ImageDefaults,
}

#[derive(Serialize)]
struct ArticleRequest<'a> {
    brief: &'a Brief,
    images: &'a [Image],
    brand: &'a Brand,
    pages: &'a [SitemapPage],
}

#[derive(Deserialize)]
struct ArticleResponse {
    markdown: String,
}

#[derive(Serialize)]
struct MetaRequest<'a> {
    article: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailRequest<'a> {
    article: &'a str,
    brand: &'a Brand,
}

#[derive(Deserialize)]
struct ThumbnailResponse {
    url: String,
}

/// HTTP client for the generation service.
pub struct HttpStages {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpStages {
    /// `timeout` bounds each request, including slow generation calls.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        api_key: Option<SecretString>,
    ) -> Result<Self, StageError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, StageError>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StageError::Provider {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| StageError::Malformed(format!("{} response: {}", path, e)))
    }
}

#[async_trait]
impl Researcher for HttpStages {
    async fn research(&self, topic: &str, keywords: &[String]) -> Result<Brief, StageError> {
        self.post("research", &ResearchRequest { topic, keywords })
            .await
    }
}

#[async_trait]
impl ImageProvider for HttpStages {
    async fn render(
        &self,
        spec: &ImageSpec,
        defaults: &ImageDefaults,
    ) -> Result<Image, StageError> {
        self.post("images", &ImageRequest { spec, defaults }).await
    }
}

#[async_trait]
impl ArticleWriter for HttpStages {
    async fn write_article(
        &self,
        brief: &Brief,
        images: &[Image],
        brand: &Brand,
        pages: &[SitemapPage],
    ) -> Result<String, StageError> {
        let response: ArticleResponse = self
            .post(
                "article",
                &ArticleRequest {
                    brief,
                    images,
                    brand,
                    pages,
                },
            )
            .await?;

        if response.markdown.trim().is_empty() {
            return Err(StageError::Malformed("article is empty".to_string()));
        }
        Ok(response.markdown)
    }
}

#[async_trait]
impl MetaGenerator for HttpStages {
    async fn generate_meta(&self, article: &str) -> Result<ArticleMeta, StageError> {
        let meta: ArticleMeta = self.post("meta", &MetaRequest { article }).await?;
        meta.validate()?;
        Ok(meta)
    }
}

#[async_trait]
impl ThumbnailGenerator for HttpStages {
    async fn generate_thumbnail(
        &self,
        article: &str,
        brand: &Brand,
    ) -> Result<String, StageError> {
        let response: ThumbnailResponse = self
            .post("thumbnail", &ThumbnailRequest { article, brand })
            .await?;
        Ok(response.url)
    }
}
