//! Test: cache restore/save policy around job runs

use crate::helpers::*;
use jobline::cache::{CacheStore, FsCacheStore, MemoryCacheStore};
use jobline::core::{Step, StepOutcome};
use jobline::environment::{LocalProvisioner, NoCheckout};
use jobline::execution::PipelineEngine;
use std::sync::Arc;

/// Restoring an unknown key is a cold run, not an error.
#[tokio::test]
async fn test_restore_miss_leaves_run_unaffected() {
    let harness = harness();

    let job = job_with(vec![
        Step::RestoreCache {
            key: "missing-key".to_string(),
        },
        run_step("Run tests", "echo all tests passed"),
    ]);

    let report = harness.engine.run(&job).await;

    assert_succeeded(&report);
    assert_eq!(report.records.len(), 2);
    assert!(report.records[0].outcome.is_success());
    assert!(report.records[0].output.contains("cache miss"));
}

/// A restored entry materializes the previously saved paths into the new
/// run's workspace.
#[tokio::test]
async fn test_save_then_restore_roundtrip_across_runs() {
    let store = Arc::new(MemoryCacheStore::new());

    // first run builds an artifact and saves it
    let warm = harness_with_store(store.clone());
    let report = warm
        .engine
        .run(&job_with(vec![
            run_step("Build", "mkdir -p target; echo artifact > target/out"),
            Step::SaveCache {
                key: "project-cache".to_string(),
                paths: vec!["target".to_string()],
            },
        ]))
        .await;
    assert_succeeded(&report);

    // second run sees the artifact before running anything else
    let cold = harness_with_store(store);
    let report = cold
        .engine
        .run(&job_with(vec![
            Step::RestoreCache {
                key: "project-cache".to_string(),
            },
            run_step("Verify artifact", "test -f target/out"),
        ]))
        .await;
    assert_succeeded(&report);
}

/// The filesystem store survives across engine instances.
#[tokio::test]
async fn test_fs_store_roundtrip_between_engines() {
    let cache_root = tempfile::tempdir().unwrap();

    let build_engine = |store: Arc<FsCacheStore>| {
        let workspace_root = tempfile::tempdir().unwrap();
        let engine = PipelineEngine::new(
            Arc::new(LocalProvisioner::new(workspace_root.path())),
            Arc::new(NoCheckout),
            store,
        );
        (engine, workspace_root)
    };

    let (first, _ws1) = build_engine(Arc::new(FsCacheStore::new(cache_root.path())));
    let report = first
        .run(&job_with(vec![
            run_step("Build", "mkdir -p target; echo artifact > target/out"),
            Step::SaveCache {
                key: "project-cache".to_string(),
                paths: vec!["target".to_string()],
            },
        ]))
        .await;
    assert_succeeded(&report);

    let (second, _ws2) = build_engine(Arc::new(FsCacheStore::new(cache_root.path())));
    let report = second
        .run(&job_with(vec![
            Step::RestoreCache {
                key: "project-cache".to_string(),
            },
            run_step("Verify artifact", "test -f target/out"),
        ]))
        .await;
    assert_succeeded(&report);
}

/// A cache-save failure is a warning record, never a failed job.
#[tokio::test]
async fn test_save_failure_never_fails_a_green_job() {
    // a store rooted at a file cannot persist anything
    let cache_root = tempfile::tempdir().unwrap();
    let blocked = cache_root.path().join("store");
    std::fs::write(&blocked, b"not a directory").unwrap();

    let workspace_root = tempfile::tempdir().unwrap();
    let engine = PipelineEngine::new(
        Arc::new(LocalProvisioner::new(workspace_root.path())),
        Arc::new(NoCheckout),
        Arc::new(FsCacheStore::new(&blocked)),
    );

    let report = engine
        .run(&job_with(vec![
            run_step("Build", "mkdir -p target; echo artifact > target/out"),
            Step::SaveCache {
                key: "project-cache".to_string(),
                paths: vec!["target".to_string()],
            },
        ]))
        .await;

    assert_succeeded(&report);
    assert_eq!(report.records.len(), 2);
    assert!(matches!(
        report.records[1].outcome,
        StepOutcome::Warning { .. }
    ));
}

/// Saving twice under the same key keeps only the newest snapshot.
#[tokio::test]
async fn test_last_write_wins_per_key() {
    let store = Arc::new(MemoryCacheStore::new());

    for contents in ["first", "second"] {
        let harness = harness_with_store(store.clone());
        let report = harness
            .engine
            .run(&job_with(vec![
                run_step(
                    "Build",
                    &format!("mkdir -p target; echo {} > target/out", contents),
                ),
                Step::SaveCache {
                    key: "project-cache".to_string(),
                    paths: vec!["target".to_string()],
                },
            ]))
            .await;
        assert_succeeded(&report);
    }

    let entry = store.get("project-cache").await.unwrap().unwrap();
    assert_eq!(entry.files.len(), 1);
    assert_eq!(
        String::from_utf8_lossy(&entry.files[0].contents).trim(),
        "second"
    );
}
