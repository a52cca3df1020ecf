//! Test harness for pipeline and queue tests.
//!
//! `TestHarness` wires the real orchestrator and queue to in-memory
//! stores and `ScriptedStages`, a stage mock that records every call.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use inkflow::brand::{Brand, ImageDefaults, SitemapPage};
use inkflow::broadcast::{JobEvent, JobEventBroadcaster, Subscription};
use inkflow::content::{ArticleMeta, Brief, Image, ImageSpec};
use inkflow::error::{StageError, StoreError};
use inkflow::job::{BrandId, JobId, JobRecord, JobStatus, JobUpdate, NewJob};
use inkflow::pipeline::{Orchestrator, Stage};
use inkflow::stages::{
    ArticleWriter, ImageGenerator, ImageProvider, MetaGenerator, PlannedImageGenerator,
    Researcher, Stages, ThumbnailGenerator,
};
use inkflow::store::{BrandStore, JobStore, MemoryBrandStore, MemoryJobStore};
use inkflow::worker::{DuplicatePolicy, JobQueue};

use super::builders::{brief_for, garden_brand, SECTIONS};

/// One stage invocation, keyed by the job's topic.
#[derive(Debug, Clone)]
pub struct StageCall {
    pub stage: Stage,
    pub topic: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Renders images, failing the placements listed in `failing`.
struct ScriptedRenderer {
    failing: Arc<Mutex<HashSet<String>>>,
    renders: Arc<AtomicUsize>,
}

#[async_trait]
impl ImageProvider for ScriptedRenderer {
    async fn render(
        &self,
        spec: &ImageSpec,
        _defaults: &ImageDefaults,
    ) -> Result<Image, StageError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&spec.placement) {
            return Err(StageError::Unavailable(format!(
                "render failed for {}",
                spec.placement
            )));
        }
        Ok(Image {
            placement: spec.placement.clone(),
            url: format!("https://img.test/{}.png", spec.placement),
            alt: spec.alt.clone(),
            caption: None,
        })
    }
}

/// Stage mock. Articles start with `# {topic}` so later stages can tell
/// which job they belong to.
#[derive(Default)]
pub struct ScriptedStages {
    counts: Mutex<HashMap<Stage, usize>>,
    calls: Mutex<Vec<StageCall>>,
    failures: Mutex<HashMap<Stage, (Option<String>, String)>>,
    panics: Mutex<HashMap<Stage, String>>,
    failing_images: Arc<Mutex<HashSet<String>>>,
    renders: Arc<AtomicUsize>,
    images_seen_by_writer: Mutex<Vec<usize>>,
    delay: Mutex<Duration>,
}

impl ScriptedStages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every stage call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Make `stage` fail for every job.
    pub fn fail(&self, stage: Stage, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(stage, (None, message.to_string()));
    }

    /// Make `stage` fail only for the job with `topic`.
    pub fn fail_for(&self, topic: &str, stage: Stage, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(stage, (Some(topic.to_string()), message.to_string()));
    }

    /// Make `stage` panic for the job with `topic`.
    pub fn panic_for(&self, topic: &str, stage: Stage) {
        self.panics
            .lock()
            .unwrap()
            .insert(stage, topic.to_string());
    }

    pub fn fail_image(&self, placement: &str) {
        self.failing_images
            .lock()
            .unwrap()
            .insert(placement.to_string());
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.counts.lock().unwrap().get(&stage).copied().unwrap_or(0)
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<StageCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of images the writer received, per call.
    pub fn images_seen_by_writer(&self) -> Vec<usize> {
        self.images_seen_by_writer.lock().unwrap().clone()
    }

    pub fn as_stages(self: &Arc<Self>) -> Stages {
        Stages::from_provider(Arc::clone(self))
    }

    async fn run(&self, stage: Stage, topic: &str) -> Result<(), StageError> {
        let started = Instant::now();
        *self.counts.lock().unwrap().entry(stage).or_insert(0) += 1;

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().unwrap().get(&stage).cloned();
        let panics = self.panics.lock().unwrap().get(&stage).cloned();
        self.calls.lock().unwrap().push(StageCall {
            stage,
            topic: topic.to_string(),
            started,
            finished: Instant::now(),
        });

        if panics.as_deref() == Some(topic) {
            panic!("{} stage crashed", stage.name());
        }

        match failure {
            Some((None, message)) => Err(StageError::Other(message)),
            Some((Some(only), message)) if only == topic => Err(StageError::Other(message)),
            _ => Ok(()),
        }
    }
}

fn topic_of(article: &str) -> &str {
    article
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("# ")
}

#[async_trait]
impl Researcher for ScriptedStages {
    async fn research(&self, topic: &str, _keywords: &[String]) -> Result<Brief, StageError> {
        self.run(Stage::Research, topic).await?;
        Ok(brief_for(topic, SECTIONS))
    }
}

#[async_trait]
impl ImageGenerator for ScriptedStages {
    async fn generate_images(
        &self,
        brief: &Brief,
        defaults: &ImageDefaults,
    ) -> Result<Vec<Image>, StageError> {
        self.run(Stage::Images, &brief.topic).await?;
        let generator = PlannedImageGenerator::new(ScriptedRenderer {
            failing: Arc::clone(&self.failing_images),
            renders: Arc::clone(&self.renders),
        });
        generator.generate_images(brief, defaults).await
    }
}

#[async_trait]
impl ArticleWriter for ScriptedStages {
    async fn write_article(
        &self,
        brief: &Brief,
        images: &[Image],
        brand: &Brand,
        pages: &[SitemapPage],
    ) -> Result<String, StageError> {
        self.run(Stage::Writing, &brief.topic).await?;
        self.images_seen_by_writer
            .lock()
            .unwrap()
            .push(images.len());
        Ok(format!(
            "# {}\n\nWritten for {} with {} image(s) and {} linkable page(s).\n",
            brief.topic,
            brand.name,
            images.len(),
            pages.len()
        ))
    }
}

#[async_trait]
impl MetaGenerator for ScriptedStages {
    async fn generate_meta(&self, article: &str) -> Result<ArticleMeta, StageError> {
        let topic = topic_of(article);
        self.run(Stage::Meta, topic).await?;
        Ok(ArticleMeta {
            meta_title: topic.to_string(),
            meta_description: format!("A guide to {}", topic),
            url_slug: topic.to_lowercase().replace(' ', "-"),
        })
    }
}

#[async_trait]
impl ThumbnailGenerator for ScriptedStages {
    async fn generate_thumbnail(
        &self,
        article: &str,
        _brand: &Brand,
    ) -> Result<String, StageError> {
        let topic = topic_of(article);
        self.run(Stage::Thumbnail, topic).await?;
        Ok(format!(
            "https://img.test/thumb/{}.png",
            topic.to_lowercase().replace(' ', "-")
        ))
    }
}

/// Memory store that remembers every status it was asked to persist.
#[derive(Default)]
pub struct RecordingJobStore {
    inner: MemoryJobStore,
    statuses: Mutex<Vec<(JobId, JobStatus)>>,
}

impl RecordingJobStore {
    /// Reads a job without awaiting, for use inside event callbacks.
    pub fn stored(&self, job_id: JobId) -> Option<JobRecord> {
        self.inner.all().into_iter().find(|job| job.id == job_id)
    }

    pub fn statuses_for(&self, job_id: JobId) -> Vec<JobStatus> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, status)| *status)
            .collect()
    }
}

#[async_trait]
impl JobStore for RecordingJobStore {
    async fn insert(&self, job: NewJob) -> Result<JobId, StoreError> {
        self.inner.insert(job).await
    }

    async fn find_by_id(&self, id: JobId) -> Result<JobRecord, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn update(&self, id: JobId, update: JobUpdate) -> Result<(), StoreError> {
        let status = update.status;
        self.inner.update(id, update).await?;
        if let Some(status) = status {
            self.statuses.lock().unwrap().push((id, status));
        }
        Ok(())
    }

    async fn list_by_status(&self, statuses: &[JobStatus]) -> Result<Vec<JobRecord>, StoreError> {
        self.inner.list_by_status(statuses).await
    }
}

/// Events received by one subscription.
pub struct EventLog {
    pub events: Arc<Mutex<Vec<JobEvent>>>,
    _subscription: Subscription,
}

impl EventLog {
    pub fn new(events: Arc<Mutex<Vec<JobEvent>>>, subscription: Subscription) -> Self {
        Self {
            events,
            _subscription: subscription,
        }
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        self.events().iter().map(|e| e.status).collect()
    }
}

/// Fully wired pipeline over in-memory stores.
pub struct TestHarness {
    pub jobs: Arc<RecordingJobStore>,
    pub brands: Arc<MemoryBrandStore>,
    pub events: JobEventBroadcaster,
    pub stages: Arc<ScriptedStages>,
    pub orchestrator: Arc<Orchestrator>,
    pub queue: JobQueue,
    pub brand_id: BrandId,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::Coalesce)
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        let jobs = Arc::new(RecordingJobStore::default());
        let brands = Arc::new(MemoryBrandStore::new());
        let brand_id = brands
            .insert(garden_brand())
            .expect("Failed to insert test brand");
        let events = JobEventBroadcaster::new();
        let stages = Arc::new(ScriptedStages::new());

        let job_store: Arc<dyn JobStore> = jobs.clone();
        let brand_store: Arc<dyn BrandStore> = brands.clone();
        let orchestrator = Arc::new(Orchestrator::new(
            job_store,
            brand_store,
            events.clone(),
            stages.as_stages(),
        ));
        let queue = JobQueue::new(orchestrator.clone(), policy);

        Self {
            jobs,
            brands,
            events,
            stages,
            orchestrator,
            queue,
            brand_id,
        }
    }

    /// Stores an idle job without enqueueing it.
    pub async fn create_job(&self, topic: &str) -> JobId {
        self.jobs
            .insert(NewJob::new(self.brand_id, topic).with_keywords("compost, soil"))
            .await
            .expect("Failed to insert test job")
    }

    pub async fn job(&self, job_id: JobId) -> JobRecord {
        self.jobs
            .find_by_id(job_id)
            .await
            .expect("Job should exist")
    }

    /// Starts recording every event published for `job_id` from now on.
    pub fn watch(&self, job_id: JobId) -> EventLog {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = self
            .events
            .subscribe(job_id, move |event| sink.lock().unwrap().push(event.clone()));
        EventLog::new(events, subscription)
    }
}
