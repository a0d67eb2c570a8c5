//! Shared helpers for scenario tests

use jobline::cache::{CacheEntry, CacheFile, CacheStore, MemoryCacheStore};
use jobline::core::{JobDescription, RunReport, Step, StepOutcome};
use jobline::environment::{LocalProvisioner, NoCheckout};
use jobline::execution::PipelineEngine;
use std::sync::Arc;

/// Engine wired to a local workspace, no checkout, and a shared in-memory
/// cache store the test can inspect.
pub struct TestHarness {
    pub engine: PipelineEngine,
    pub store: Arc<MemoryCacheStore>,
    // keeps the workspace root alive for the duration of the test
    pub workspace_root: tempfile::TempDir,
}

pub fn harness() -> TestHarness {
    harness_with_store(Arc::new(MemoryCacheStore::new()))
}

pub fn harness_with_store(store: Arc<MemoryCacheStore>) -> TestHarness {
    let workspace_root = tempfile::tempdir().expect("tempdir");
    let engine = PipelineEngine::new(
        Arc::new(LocalProvisioner::new(workspace_root.path())),
        Arc::new(NoCheckout),
        store.clone(),
    );
    TestHarness {
        engine,
        store,
        workspace_root,
    }
}

/// Build a job description around the given steps.
pub fn job_with(steps: Vec<Step>) -> JobDescription {
    JobDescription {
        name: "build".to_string(),
        image: "rust:1.77".to_string(),
        repository: None,
        reference: None,
        max_duration_secs: None,
        steps,
    }
}

/// A named run step with a generous timeout.
pub fn run_step(name: &str, command: &str) -> Step {
    Step::Run {
        name: name.to_string(),
        command: command.to_string(),
        timeout_secs: 60,
    }
}

/// Seed the store with an entry containing a single file.
pub async fn seed_cache(store: &MemoryCacheStore, key: &str, relative_path: &str, contents: &[u8]) {
    let entry = CacheEntry {
        key: key.to_string(),
        paths: vec![relative_path.to_string()],
        saved_at: chrono::Utc::now(),
        files: vec![CacheFile {
            relative_path: relative_path.to_string(),
            contents: contents.to_vec(),
        }],
    };
    store.put(&entry).await.expect("seed cache entry");
}

/// Assert the run succeeded with exit code 0.
pub fn assert_succeeded(report: &RunReport) {
    assert!(
        report.succeeded(),
        "expected success, got {:?} with error {:?}",
        report.status,
        report.error
    );
    assert_eq!(report.exit_code(), 0);
}

/// Assert the run failed at the given step index.
pub fn assert_failed_at(report: &RunReport, index: usize) {
    assert!(!report.succeeded(), "expected failure, got success");
    assert_eq!(
        report.failed_step,
        Some(index),
        "expected failure at step {}, got {:?} ({:?})",
        index,
        report.failed_step,
        report.error
    );
    assert!(matches!(
        report.records.last().map(|r| &r.outcome),
        Some(StepOutcome::Failed { .. })
    ));
}

/// Names of the steps that actually produced log records, in order.
pub fn record_names(report: &RunReport) -> Vec<String> {
    report.records.iter().map(|r| r.name.clone()).collect()
}
