//! Test: fail-fast behavior and failure attribution

use crate::helpers::*;
use jobline::cache::CacheStore;
use jobline::core::{Step, StepOutcome};
use jobline::error::JobError;

/// A failing command stops the run: later steps never execute, never log,
/// and the cache entry from before the run survives untouched.
#[tokio::test]
async fn test_failure_skips_remaining_steps_and_preserves_cache() {
    let harness = harness();
    seed_cache(&harness.store, "project-cache", "target/old", b"previous").await;

    let job = job_with(vec![
        Step::Checkout,
        Step::RestoreCache {
            key: "project-cache".to_string(),
        },
        run_step("Version information", "echo 1.77.0"),
        run_step("Check formatting", "echo Diff in src/main.rs 1>&2; exit 1"),
        run_step("Run tests", "echo all tests passed"),
        Step::SaveCache {
            key: "project-cache".to_string(),
            paths: vec!["target".to_string()],
        },
    ]);

    let report = harness.engine.run(&job).await;

    // failed at the fourth step; steps five and six are absent from the log
    assert_failed_at(&report, 3);
    assert_eq!(report.records.len(), 4);
    assert_eq!(
        record_names(&report),
        vec![
            "checkout",
            "restore_cache (project-cache)",
            "Version information",
            "Check formatting",
        ]
    );

    // the failure carries the command's own exit code and output
    match &report.records[3].outcome {
        StepOutcome::Failed { exit_code, .. } => assert_eq!(*exit_code, 1),
        other => panic!("expected failed outcome, got {:?}", other),
    }
    assert!(report.records[3].output.contains("Diff in src/main.rs"));
    assert!(matches!(
        report.error,
        Some(JobError::Command { exit_code: 1, .. })
    ));
    assert_eq!(report.exit_code(), 1);

    // save_cache never ran, so the seeded entry is unchanged
    let entry = harness.store.get("project-cache").await.unwrap().unwrap();
    assert_eq!(entry.files.len(), 1);
    assert_eq!(entry.files[0].relative_path, "target/old");
    assert_eq!(entry.files[0].contents, b"previous");
}

/// The command's numeric exit status is preserved in the report.
#[tokio::test]
async fn test_exit_status_is_attributed() {
    let harness = harness();

    let job = job_with(vec![run_step("Flaky step", "exit 42")]);
    let report = harness.engine.run(&job).await;

    assert_failed_at(&report, 0);
    match report.error {
        Some(JobError::Command { exit_code, .. }) => assert_eq!(exit_code, 42),
        ref other => panic!("expected command failure, got {:?}", other),
    }
}

/// A step that blows its time budget fails as a timeout, with partial
/// output and its own exit code category.
#[tokio::test]
async fn test_step_timeout_is_distinguished_from_command_failure() {
    let harness = harness();

    let job = job_with(vec![Step::Run {
        name: "Slow step".to_string(),
        command: "echo starting; sleep 30".to_string(),
        timeout_secs: 1,
    }]);

    let report = harness.engine.run(&job).await;

    assert_failed_at(&report, 0);
    match &report.error {
        Some(JobError::Timeout {
            timeout_secs,
            output,
            ..
        }) => {
            assert_eq!(*timeout_secs, 1);
            assert!(output.contains("starting"));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(report.exit_code(), 5);
}

/// A failing checkout is fatal before any command runs.
#[tokio::test]
async fn test_checkout_failure_is_fatal() {
    use jobline::cache::MemoryCacheStore;
    use jobline::environment::{GitCheckout, LocalProvisioner};
    use jobline::execution::PipelineEngine;
    use std::sync::Arc;

    let workspace_root = tempfile::tempdir().unwrap();
    let engine = PipelineEngine::new(
        Arc::new(LocalProvisioner::new(workspace_root.path())),
        Arc::new(GitCheckout::new("file:///nonexistent/repo.git", None)),
        Arc::new(MemoryCacheStore::new()),
    );

    let job = job_with(vec![
        Step::Checkout,
        run_step("Run tests", "echo never reached"),
    ]);
    let report = engine.run(&job).await;

    assert_failed_at(&report, 0);
    assert!(matches!(report.error, Some(JobError::Checkout(_))));
    assert_eq!(report.exit_code(), 4);
    assert_eq!(report.records.len(), 1);
}
