//! Job runner - drives the ordered step list with fail-fast semantics

use crate::cache::CacheManager;
use crate::core::{JobDescription, RunState, Step, StepOutcome, StepRecord};
use crate::environment::{Environment, SourceControl};
use crate::error::JobError;
use crate::execution::engine::ExecutionEvent;
use crate::execution::executor::StepExecutor;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Executes one job's steps strictly in declaration order.
///
/// The first fatal error stops iteration; skipped steps get no record.
/// Cache failures are downgraded to warning records here, so a storage
/// outage never discards an otherwise-successful build.
pub struct JobRunner<'a> {
    executor: &'a StepExecutor,
    cache: &'a CacheManager,
    source_control: &'a dyn SourceControl,
}

impl<'a> JobRunner<'a> {
    pub fn new(
        executor: &'a StepExecutor,
        cache: &'a CacheManager,
        source_control: &'a dyn SourceControl,
    ) -> Self {
        Self {
            executor,
            cache,
            source_control,
        }
    }

    /// Run every step against the environment.
    ///
    /// Returns the ordered log records plus the failing step and its error,
    /// if any.
    pub async fn execute(
        &self,
        job: &JobDescription,
        env: &Environment,
        state: &mut RunState,
        cancel: &CancellationToken,
        emit: &(dyn Fn(ExecutionEvent) + Sync),
    ) -> (Vec<StepRecord>, Option<(usize, JobError)>) {
        let mut records = Vec::new();

        for (index, step) in job.steps.iter().enumerate() {
            let name = step.display_name();
            state.running(index);
            emit(ExecutionEvent::StepStarted {
                index,
                name: name.clone(),
            });

            let started_at = Utc::now();
            let started = std::time::Instant::now();

            let result = self.dispatch(step, &name, env, cancel).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok((outcome, output)) => {
                    if let StepOutcome::Warning { message } = &outcome {
                        warn!("Step {} degraded: {}", name, message);
                    }
                    let record = StepRecord {
                        index,
                        name,
                        started_at,
                        duration_ms,
                        outcome,
                        output,
                    };
                    records.push(record.clone());
                    emit(ExecutionEvent::StepFinished { record });
                }
                Err(error) => {
                    info!("Step {} failed, stopping job: {}", name, error);
                    let exit_code = match &error {
                        JobError::Command { exit_code, .. } => *exit_code,
                        other => other.exit_code(),
                    };
                    let record = StepRecord {
                        index,
                        name,
                        started_at,
                        duration_ms,
                        outcome: StepOutcome::Failed {
                            error: error.to_string(),
                            exit_code,
                        },
                        output: error.captured_output().unwrap_or_default().to_string(),
                    };
                    records.push(record.clone());
                    emit(ExecutionEvent::StepFinished { record });
                    return (records, Some((index, error)));
                }
            }
        }

        (records, None)
    }

    /// Execute one step according to its variant.
    async fn dispatch(
        &self,
        step: &Step,
        name: &str,
        env: &Environment,
        cancel: &CancellationToken,
    ) -> Result<(StepOutcome, String), JobError> {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled {
                step: name.to_string(),
            });
        }

        match step {
            Step::Checkout => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(JobError::Cancelled {
                        step: name.to_string(),
                    }),
                    result = self.source_control.checkout(env) => {
                        result.map(|()| (StepOutcome::Success, String::new()))
                    }
                }
            }
            Step::Run {
                name: step_name,
                command,
                timeout_secs,
            } => {
                let result = self
                    .executor
                    .run(step_name, command, *timeout_secs, env, cancel)
                    .await?;
                Ok((StepOutcome::Success, result.output))
            }
            Step::RestoreCache { key } => match self.cache.restore(key, env).await {
                Ok(Some(entry)) => Ok((
                    StepOutcome::Success,
                    format!("restored {} file(s) for key '{}'", entry.files.len(), key),
                )),
                Ok(None) => Ok((
                    StepOutcome::Success,
                    format!("cache miss for key '{}', continuing cold", key),
                )),
                Err(error) => Ok((
                    StepOutcome::Warning {
                        message: error.to_string(),
                    },
                    String::new(),
                )),
            },
            Step::SaveCache { key, paths } => match self.cache.save(key, paths, env).await {
                Ok(entry) => Ok((
                    StepOutcome::Success,
                    format!("saved {} file(s) under key '{}'", entry.files.len(), key),
                )),
                Err(error) => Ok((
                    StepOutcome::Warning {
                        message: error.to_string(),
                    },
                    String::new(),
                )),
            },
        }
    }
}
