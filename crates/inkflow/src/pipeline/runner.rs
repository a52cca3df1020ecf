use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::brand::Brand;
use crate::broadcast::JobEventBroadcaster;
use crate::error::{PipelineError, StageError, StoreError};
use crate::job::{JobId, JobRecord, JobStatus, JobUpdate, GENERIC_FAILURE_MESSAGE};
use crate::stages::Stages;
use crate::store::{BrandStore, JobStore};

use super::progress::JobProgressTracker;
use super::stage::Stage;

/// How a pipeline run ended. Both variants are persisted before return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// `stage` is `None` when the run failed before any stage began.
    Failed {
        stage: Option<Stage>,
        message: String,
    },
}

/// Why a run stopped early.
enum StepError {
    Stage(Stage, StageError),
    Store(StoreError),
}

impl From<StoreError> for StepError {
    fn from(e: StoreError) -> Self {
        StepError::Store(e)
    }
}

/// Message recorded for a failed stage. Never empty.
fn failure_message(err: &StageError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        message
    }
}

/// Drives one job at a time through research, images, writing, meta and
/// thumbnail generation.
///
/// Every transition is written to the job store before it is published, so
/// a subscriber never sees an event the store does not reflect yet.
pub struct Orchestrator {
    jobs: Arc<dyn JobStore>,
    brands: Arc<dyn BrandStore>,
    events: JobEventBroadcaster,
    stages: Stages,
}

impl Orchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        brands: Arc<dyn BrandStore>,
        events: JobEventBroadcaster,
        stages: Stages,
    ) -> Self {
        Self {
            jobs,
            brands,
            events,
            stages,
        }
    }

    pub fn events(&self) -> &JobEventBroadcaster {
        &self.events
    }

    /// Runs the full pipeline for `job_id`, always starting from research.
    ///
    /// A stage failure is recorded on the job and reported as
    /// [`RunOutcome::Failed`]. `Err` is only returned when the job store
    /// itself fails, in which case the job may be left mid-pipeline.
    pub async fn run(&self, job_id: JobId) -> Result<RunOutcome, PipelineError> {
        self.run_job(job_id)
            .instrument(info_span!("pipeline", job_id = job_id))
            .await
    }

    async fn run_job(&self, job_id: JobId) -> Result<RunOutcome, PipelineError> {
        let job = self.jobs.find_by_id(job_id).await?;
        let progress = JobProgressTracker::new(job_id, self.events.clone());

        if job.status != JobStatus::Idle {
            debug!(previous = %job.status, "Restarting job from the first stage");
        }

        let brand = match self.brands.find_brand(job.brand_id).await {
            Ok(brand) => brand,
            Err(StoreError::BrandNotFound(id)) => {
                let message = format!("Brand {} not found", id);
                return self.fail(&progress, None, message).await;
            }
            Err(e) => return Err(e.into()),
        };

        match self.execute(&job, &brand, &progress).await {
            Ok(()) => {
                self.jobs
                    .update(job_id, JobUpdate::status(JobStatus::Completed))
                    .await?;
                progress.completed();
                info!(topic = %job.topic, "Job completed");
                Ok(RunOutcome::Completed)
            }
            Err(StepError::Stage(stage, e)) => {
                self.fail(&progress, Some(stage), failure_message(&e)).await
            }
            Err(StepError::Store(e)) => {
                error!(error = %e, "Job store failed mid-run");
                // Best effort: the store just failed, so this may fail too.
                let message = e.to_string();
                match self.jobs.update(job_id, JobUpdate::failed(&message)).await {
                    Ok(()) => progress.failed(&message),
                    Err(mark_err) => warn!(error = %mark_err, "Could not mark job as failed"),
                }
                Err(e.into())
            }
        }
    }

    async fn execute(
        &self,
        job: &JobRecord,
        brand: &Brand,
        progress: &JobProgressTracker,
    ) -> Result<(), StepError> {
        let job_id = job.id;

        // Step 1: Research
        self.begin(job_id, Stage::Research, progress).await?;
        let keywords = job.keyword_list();
        let brief = self
            .stages
            .researcher
            .research(&job.topic, &keywords)
            .instrument(info_span!("research"))
            .await
            .map_err(|e| StepError::Stage(Stage::Research, e))?;
        self.finish(
            job_id,
            Stage::Research,
            JobUpdate::research_brief(brief.clone()),
            progress,
        )
        .await?;

        // Step 2: Images
        self.begin(job_id, Stage::Images, progress).await?;
        let images = self
            .stages
            .images
            .generate_images(&brief, &brand.image_defaults)
            .instrument(info_span!("generate_images"))
            .await
            .map_err(|e| StepError::Stage(Stage::Images, e))?;
        debug!(count = images.len(), "Images ready");
        self.finish(
            job_id,
            Stage::Images,
            JobUpdate::images(images.clone()),
            progress,
        )
        .await?;

        // Step 3: Writing
        self.begin(job_id, Stage::Writing, progress).await?;
        let article = self
            .stages
            .writer
            .write_article(&brief, &images, brand, &brand.sitemap_pages)
            .instrument(info_span!("write_article"))
            .await
            .map_err(|e| StepError::Stage(Stage::Writing, e))?;
        self.finish(
            job_id,
            Stage::Writing,
            JobUpdate::article(article.clone()),
            progress,
        )
        .await?;

        // Step 4: Metadata
        self.begin(job_id, Stage::Meta, progress).await?;
        let meta = self
            .stages
            .meta
            .generate_meta(&article)
            .instrument(info_span!("generate_meta"))
            .await
            .map_err(|e| StepError::Stage(Stage::Meta, e))?;
        self.finish(job_id, Stage::Meta, JobUpdate::meta(meta), progress)
            .await?;

        // Step 5: Thumbnail
        self.begin(job_id, Stage::Thumbnail, progress).await?;
        let thumbnail_url = self
            .stages
            .thumbnail
            .generate_thumbnail(&article, brand)
            .instrument(info_span!("generate_thumbnail"))
            .await
            .map_err(|e| StepError::Stage(Stage::Thumbnail, e))?;
        self.finish(
            job_id,
            Stage::Thumbnail,
            JobUpdate::thumbnail(thumbnail_url),
            progress,
        )
        .await?;

        Ok(())
    }

    async fn begin(
        &self,
        job_id: JobId,
        stage: Stage,
        progress: &JobProgressTracker,
    ) -> Result<(), StoreError> {
        self.jobs
            .update(job_id, JobUpdate::status(stage.status()))
            .await?;
        progress.stage_started(stage);
        debug!(stage = %stage, "Stage started");
        Ok(())
    }

    async fn finish(
        &self,
        job_id: JobId,
        stage: Stage,
        outputs: JobUpdate,
        progress: &JobProgressTracker,
    ) -> Result<(), StoreError> {
        self.jobs.update(job_id, outputs).await?;
        progress.stage_completed(stage);
        debug!(stage = %stage, "Stage completed");
        Ok(())
    }

    /// Fails a job whose run ended without reaching a terminal state,
    /// e.g. because a stage panicked.
    pub async fn abandon(&self, job_id: JobId, message: &str) -> Result<(), PipelineError> {
        self.jobs.update(job_id, JobUpdate::failed(message)).await?;
        JobProgressTracker::new(job_id, self.events.clone()).failed(message);
        warn!(job_id = job_id, error = %message, "Job abandoned");
        Ok(())
    }

    /// Records the failure in a single update, then publishes it.
    async fn fail(
        &self,
        progress: &JobProgressTracker,
        stage: Option<Stage>,
        message: String,
    ) -> Result<RunOutcome, PipelineError> {
        warn!(
            stage = stage.map(|s| s.name()).unwrap_or("setup"),
            error = %message,
            "Job failed"
        );
        self.jobs
            .update(progress.job_id(), JobUpdate::failed(&message))
            .await?;
        progress.failed(&message);
        Ok(RunOutcome::Failed { stage, message })
    }
}
