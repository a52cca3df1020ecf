//! Orchestrator behavior: transition order, outputs and failure handling.

mod common;

use std::sync::{Arc, Mutex};

use common::TestHarness;

use inkflow::broadcast::{JobEvent, JobEventKind};
use inkflow::job::{JobStatus, NewJob, GENERIC_FAILURE_MESSAGE};
use inkflow::pipeline::{RunOutcome, Stage};
use inkflow::store::JobStore;

const SUCCESS_ORDER: [JobStatus; 6] = [
    JobStatus::Researching,
    JobStatus::GeneratingImages,
    JobStatus::Writing,
    JobStatus::GeneratingMeta,
    JobStatus::GeneratingThumbnail,
    JobStatus::Completed,
];

#[tokio::test]
async fn test_successful_run_persists_exact_status_order() {
    let harness = TestHarness::new();
    let job_id = harness.create_job("Home composting").await;

    let outcome = harness.orchestrator.run(job_id).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(harness.jobs.statuses_for(job_id), SUCCESS_ORDER.to_vec());
}

#[tokio::test]
async fn test_store_is_updated_before_each_event_is_delivered() {
    let harness = TestHarness::new();
    let job_id = harness.create_job("Home composting").await;

    let jobs = Arc::clone(&harness.jobs);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = harness.events.subscribe(job_id, move |event: &JobEvent| {
        let stored = jobs.stored(event.job_id);
        sink.lock().unwrap().push((event.clone(), stored));
    });

    harness.orchestrator.run(job_id).await.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), Stage::ALL.len() * 2 + 1);
    for (event, stored) in seen {
        let stored = stored.expect("job exists while events are published");
        assert_eq!(stored.status, event.status, "{:?} delivered early", event.kind);
        if event.kind != JobEventKind::StageCompleted {
            continue;
        }
        let persisted = match event.status {
            JobStatus::Researching => stored.research_brief.is_some(),
            JobStatus::GeneratingImages => stored.images.is_some(),
            JobStatus::Writing => stored.article_content.is_some(),
            JobStatus::GeneratingMeta => stored.url_slug.is_some(),
            JobStatus::GeneratingThumbnail => stored.thumbnail_url.is_some(),
            other => panic!("unexpected stage status {}", other),
        };
        assert!(persisted, "{} output not stored before its event", event.status);
    }
}

#[tokio::test]
async fn test_failure_is_stored_before_failed_event() {
    let harness = TestHarness::new();
    harness.stages.fail(Stage::Images, "renderer offline");
    let job_id = harness.create_job("Home composting").await;

    let jobs = Arc::clone(&harness.jobs);
    let stored_on_failure = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&stored_on_failure);
    let _subscription = harness.events.subscribe(job_id, move |event: &JobEvent| {
        if event.kind == JobEventKind::Failed {
            *sink.lock().unwrap() = jobs.stored(event.job_id);
        }
    });

    harness.orchestrator.run(job_id).await.unwrap();

    let stored = stored_on_failure
        .lock()
        .unwrap()
        .take()
        .expect("failed event delivered");
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("renderer offline"));
}

#[tokio::test]
async fn test_subscriber_sees_started_completed_pairs_in_order() {
    let harness = TestHarness::new();
    let job_id = harness.create_job("Home composting").await;
    let log = harness.watch(job_id);

    harness.orchestrator.run(job_id).await.unwrap();

    let events = log.events();
    let kinds: Vec<(JobStatus, JobEventKind)> =
        events.iter().map(|e| (e.status, e.kind)).collect();
    let mut expected = Vec::new();
    for stage in Stage::ALL {
        expected.push((stage.status(), JobEventKind::StageStarted));
        expected.push((stage.status(), JobEventKind::StageCompleted));
    }
    expected.push((JobStatus::Completed, JobEventKind::Completed));
    assert_eq!(kinds, expected);

    // Distinct statuses, in the same order the store saw them.
    let mut distinct = log.statuses();
    distinct.dedup();
    assert_eq!(distinct, SUCCESS_ORDER.to_vec());
    assert!(events.iter().all(|e| e.job_id == job_id));
}

#[tokio::test]
async fn test_outputs_are_persisted() {
    let harness = TestHarness::new();
    let job_id = harness.create_job("Home composting").await;

    harness.orchestrator.run(job_id).await.unwrap();

    let job = harness.job(job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error_message.is_none());
    assert!(job.completed_at.is_some());

    let brief = job.research_brief.expect("brief persisted");
    assert_eq!(brief.topic, "Home composting");
    assert_eq!(job.images.map(|i| i.len()), Some(4));
    let article = job.article_content.expect("article persisted");
    assert!(article.starts_with("# Home composting"));
    assert!(article.contains("Acme Gardens"));
    assert!(article.contains("1 linkable page(s)"));
    assert_eq!(job.meta_title.as_deref(), Some("Home composting"));
    assert_eq!(
        job.meta_description.as_deref(),
        Some("A guide to Home composting")
    );
    assert_eq!(job.url_slug.as_deref(), Some("home-composting"));
    assert_eq!(
        job.thumbnail_url.as_deref(),
        Some("https://img.test/thumb/home-composting.png")
    );
}

#[tokio::test]
async fn test_writing_failure_short_circuits() {
    let harness = TestHarness::new();
    harness.stages.fail(Stage::Writing, "writer quota exceeded");
    let job_id = harness.create_job("Home composting").await;
    let log = harness.watch(job_id);

    let outcome = harness.orchestrator.run(job_id).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Failed {
            stage: Some(Stage::Writing),
            message: "writer quota exceeded".to_string(),
        }
    );

    let job = harness.job(job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("writer quota exceeded"));
    assert!(job.article_content.is_none());

    assert_eq!(harness.stages.count(Stage::Research), 1);
    assert_eq!(harness.stages.count(Stage::Images), 1);
    assert_eq!(harness.stages.count(Stage::Writing), 1);
    assert_eq!(harness.stages.count(Stage::Meta), 0);
    assert_eq!(harness.stages.count(Stage::Thumbnail), 0);

    assert_eq!(
        harness.jobs.statuses_for(job_id),
        vec![
            JobStatus::Researching,
            JobStatus::GeneratingImages,
            JobStatus::Writing,
            JobStatus::Failed,
        ]
    );

    let last = log.events().pop().expect("failed event");
    assert_eq!(last.kind, JobEventKind::Failed);
    assert_eq!(last.message, "writer quota exceeded");
}

#[tokio::test]
async fn test_failure_without_message_uses_generic_text() {
    let harness = TestHarness::new();
    harness.stages.fail(Stage::Research, "");
    let job_id = harness.create_job("Home composting").await;

    harness.orchestrator.run(job_id).await.unwrap();

    let job = harness.job(job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
}

#[tokio::test]
async fn test_partial_image_failure_is_tolerated() {
    let harness = TestHarness::new();
    harness.stages.fail_image("hero");
    harness.stages.fail_image("tools");
    let job_id = harness.create_job("Home composting").await;
    let log = harness.watch(job_id);

    let outcome = harness.orchestrator.run(job_id).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(harness.stages.renders(), 4);
    assert_eq!(harness.stages.images_seen_by_writer(), vec![2]);

    let job = harness.job(job_id).await;
    let placements: Vec<String> = job
        .images
        .unwrap_or_default()
        .into_iter()
        .map(|i| i.placement)
        .collect();
    assert_eq!(placements, vec!["intro", "troubleshooting"]);

    assert!(log.events().iter().any(|e| {
        e.status == JobStatus::GeneratingImages && e.kind == JobEventKind::StageCompleted
    }));
    assert!(log.events().iter().all(|e| e.kind != JobEventKind::Failed));
}

#[tokio::test]
async fn test_total_image_failure_fails_the_job() {
    let harness = TestHarness::new();
    for placement in ["hero", "intro", "tools", "troubleshooting"] {
        harness.stages.fail_image(placement);
    }
    let job_id = harness.create_job("Home composting").await;

    let outcome = harness.orchestrator.run(job_id).await.unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Failed {
            stage: Some(Stage::Images),
            ..
        }
    ));
    assert_eq!(harness.stages.count(Stage::Writing), 0);
    let job = harness.job(job_id).await;
    assert!(job
        .error_message
        .unwrap_or_default()
        .starts_with("Provider unavailable"));
}

#[tokio::test]
async fn test_rerun_restarts_from_first_stage() {
    let harness = TestHarness::new();
    let job_id = harness.create_job("Home composting").await;
    harness.orchestrator.run(job_id).await.unwrap();
    harness.orchestrator.run(job_id).await.unwrap();

    // A completed job run again goes through every stage again.
    assert_eq!(harness.stages.count(Stage::Research), 2);
    let mut twice = SUCCESS_ORDER.to_vec();
    twice.extend(SUCCESS_ORDER);
    assert_eq!(harness.jobs.statuses_for(job_id), twice);
    let job = harness.job(job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error_message.is_none());
}

#[tokio::test]
async fn test_failed_job_rerun_clears_error() {
    let harness = TestHarness::new();
    harness
        .stages
        .fail_for("Flaky topic", Stage::Thumbnail, "thumbnail timeout");
    let job_id = harness.create_job("Flaky topic").await;
    harness.orchestrator.run(job_id).await.unwrap();
    assert_eq!(
        harness.job(job_id).await.error_message.as_deref(),
        Some("thumbnail timeout")
    );

    harness.stages.fail_for("someone else", Stage::Thumbnail, "n/a");
    let log = harness.watch(job_id);
    harness.orchestrator.run(job_id).await.unwrap();

    let job = harness.job(job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error_message.is_none());
    assert_eq!(log.statuses().first(), Some(&JobStatus::Researching));
}

#[tokio::test]
async fn test_missing_brand_fails_before_any_stage() {
    let harness = TestHarness::new();
    let job_id = harness
        .jobs
        .insert(NewJob::new(404, "Orphaned topic"))
        .await
        .unwrap();

    let outcome = harness.orchestrator.run(job_id).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Failed {
            stage: None,
            message: "Brand 404 not found".to_string(),
        }
    );
    assert_eq!(harness.stages.count(Stage::Research), 0);
    assert_eq!(harness.job(job_id).await.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_unknown_job_is_an_error() {
    let harness = TestHarness::new();
    assert!(harness.orchestrator.run(12345).await.is_err());
}
