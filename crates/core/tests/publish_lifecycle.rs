//! Publish lifecycle integration tests.
//!
//! These tests drive a job from submission to a terminal state:
//! pending -> building -> completed | failed

use std::fs::File;
use std::io::Read;
use std::sync::Arc;

use tempfile::TempDir;

use pressroom_core::{
    config::{ProducerConfig, WorkerConfig},
    testing::{MockSiteBuilder, MockTrigger, MockUploader},
    JobProducer, JobStatus, JobStore, MemoryJobStore, ProducerMode, Worker,
};

/// Test helper wiring a producer and a worker around one in-memory store.
struct TestHarness {
    store: Arc<MemoryJobStore>,
    builder: Arc<MockSiteBuilder>,
    uploader: Arc<MockUploader>,
    trigger: Arc<MockTrigger>,
    producer: JobProducer,
    worker: Worker,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(MemoryJobStore::new());
        let builder = Arc::new(MockSiteBuilder::new(temp_dir.path().join("site/build")));
        let uploader = Arc::new(MockUploader::new());
        let trigger = Arc::new(MockTrigger::new());

        let producer = JobProducer::new(
            store.clone(),
            Some(trigger.clone()),
            ProducerConfig {
                mode: ProducerMode::Live,
                ..Default::default()
            },
        );
        let worker = Worker::new(
            store.clone(),
            builder.clone(),
            uploader.clone(),
            &WorkerConfig {
                work_dir: temp_dir.path().join("work"),
                ..Default::default()
            },
        );

        Self {
            store,
            builder,
            uploader,
            trigger,
            producer,
            worker,
            _temp_dir: temp_dir,
        }
    }
}

#[tokio::test]
async fn test_submitted_job_is_immediately_pending() {
    let h = TestHarness::new();

    for content_ref in ["abc123", "def456", "a-b_c.9"] {
        let job = h.producer.submit(content_ref).await.unwrap();
        let stored = h.store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.content_ref, content_ref);
    }
}

#[tokio::test]
async fn test_publish_end_to_end() {
    let h = TestHarness::new();

    let job = h.producer.submit("abc123").await.unwrap();
    let report = h.worker.drain().await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.completed, 1);

    let done = h.store.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    let url = done.download_url.expect("download url set");
    assert!(!url.is_empty());
    assert!(done.completed_at.unwrap() >= done.created_at);
    assert!(done.error.is_none());

    assert_eq!(h.builder.builds().await, vec!["abc123".to_string()]);
    let uploads = h.uploader.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, job.id);
    assert!(h.uploader.sizes().await[0] > 0);
    assert!(!uploads[0].1.exists(), "package removed after upload");

    // Trigger dispatch is fire-and-forget; give the spawned task a moment.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(h.trigger.dispatched().await, vec![job.id]);
}

#[tokio::test]
async fn test_build_failure_is_recorded_and_drain_continues() {
    let h = TestHarness::new();
    h.builder.fail_for("abc123").await;

    let failing = h.producer.submit("abc123").await.unwrap();
    let next = h.producer.submit("def456").await.unwrap();

    let report = h.worker.drain().await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.completed, 1);

    let failed = h.store.get_job(&failing.id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed
        .error
        .as_deref()
        .unwrap()
        .contains("Build folder not found"));
    assert!(failed.download_url.is_none());

    let done = h.store.get_job(&next.id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(h.store.queue_len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_build_command_error_is_recorded() {
    let h = TestHarness::new();
    h.builder.error_for("abc123").await;

    let job = h.producer.submit("abc123").await.unwrap();
    h.worker.drain().await.unwrap();

    let failed = h.store.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error.unwrap().contains("mock build error for abc123"));
    assert!(h.uploader.uploads().await.is_empty());
}

#[tokio::test]
async fn test_drain_twice_finds_nothing_new() {
    let h = TestHarness::new();
    h.producer.submit("abc123").await.unwrap();

    assert_eq!(h.worker.drain().await.unwrap().processed, 1);
    assert_eq!(h.worker.drain().await.unwrap().processed, 0);
    assert_eq!(h.store.dequeue().await.unwrap(), None);
    assert_eq!(h.store.dequeue().await.unwrap(), None);
}

#[tokio::test]
async fn test_uploaded_package_is_relocatable() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryJobStore::new());
    let builder = Arc::new(MockSiteBuilder::new(temp_dir.path().join("build")));
    let artifacts = temp_dir.path().join("artifacts");
    let uploader = pressroom_core::uploader::LocalDirUploader::new(
        pressroom_core::config::LocalUploadConfig {
            directory: artifacts.clone(),
            public_base_url: "http://localhost:8080/artifacts".to_string(),
        },
    );
    let worker = Worker::new(
        store.clone(),
        builder,
        Arc::new(uploader),
        &WorkerConfig {
            work_dir: temp_dir.path().join("work"),
            ..Default::default()
        },
    );

    let job = store.create_job("abc123").await.unwrap();
    store.enqueue(&job.id).await.unwrap();
    worker.drain().await.unwrap();

    let done = store.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(
        done.download_url.as_deref(),
        Some(format!("http://localhost:8080/artifacts/{}.zip", job.id).as_str())
    );

    let zip_path = artifacts.join(format!("{}.zip", job.id));
    let mut archive = zip::ZipArchive::new(File::open(zip_path).unwrap()).unwrap();
    let mut index = String::new();
    archive
        .by_name("index.html")
        .unwrap()
        .read_to_string(&mut index)
        .unwrap();
    assert!(index.contains(r#"src="./_app/immutable/start.js""#));
    assert!(archive.by_name("_app/immutable/start.js").is_ok());
}
