//! Main execution engine - orchestrates the entire job run

use crate::cache::{CacheManager, CacheStore};
use crate::core::{JobDescription, JobStatus, RunReport, RunState, StepRecord};
use crate::environment::{EnvironmentProvisioner, SourceControl};
use crate::error::JobError;
use crate::execution::executor::StepExecutor;
use crate::execution::runner::JobRunner;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Events that occur during a job run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    JobStarted {
        run_id: Uuid,
        job_name: String,
        total_steps: usize,
    },
    StepStarted {
        index: usize,
        name: String,
    },
    StepFinished {
        record: StepRecord,
    },
    JobFinished {
        run_id: Uuid,
        status: JobStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Top-level entry point: validates a job description, provisions its
/// environment, and drives the job runner over the steps.
pub struct PipelineEngine {
    provisioner: Arc<dyn EnvironmentProvisioner>,
    source_control: Arc<dyn SourceControl>,
    cache: CacheManager,
    executor: StepExecutor,
    event_handlers: Mutex<Vec<EventHandler>>,
}

impl PipelineEngine {
    pub fn new(
        provisioner: Arc<dyn EnvironmentProvisioner>,
        source_control: Arc<dyn SourceControl>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            provisioner,
            source_control,
            cache: CacheManager::new(store),
            executor: StepExecutor::new(),
            event_handlers: Mutex::new(Vec::new()),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers
            .lock()
            .expect("event handler lock poisoned")
            .push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        let handlers = self
            .event_handlers
            .lock()
            .expect("event handler lock poisoned");
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Execute the job to completion.
    pub async fn run(&self, job: &JobDescription) -> RunReport {
        self.run_with_cancellation(job, CancellationToken::new())
            .await
    }

    /// Execute the job, aborting the current step if `cancel` fires.
    pub async fn run_with_cancellation(
        &self,
        job: &JobDescription,
        cancel: CancellationToken,
    ) -> RunReport {
        let mut state = RunState::new();

        // an empty description is a config error; nothing is provisioned
        if job.steps.is_empty() {
            let err = JobError::Config(format!("job '{}' has no steps", job.name));
            error!("{}", err);
            state.fail(None);
            return Self::report(job, state, Vec::new(), None, Some(err));
        }

        info!("Starting job run: {} ({})", job.name, state.run_id);
        state.provisioning();
        self.emit_event(ExecutionEvent::JobStarted {
            run_id: state.run_id,
            job_name: job.name.clone(),
            total_steps: job.steps.len(),
        });

        let env = match self.provisioner.provision(&job.image).await {
            Ok(env) => env,
            Err(err) => {
                error!("Provisioning failed for job {}: {}", job.name, err);
                state.fail(None);
                self.emit_event(ExecutionEvent::JobFinished {
                    run_id: state.run_id,
                    status: state.status,
                });
                return Self::report(job, state, Vec::new(), None, Some(err));
            }
        };

        // the job-level time budget rides on the cancellation token
        let deadline_hit = Arc::new(AtomicBool::new(false));
        let watchdog = job.max_duration_secs.map(|secs| {
            let cancel = cancel.clone();
            let deadline_hit = deadline_hit.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                deadline_hit.store(true, Ordering::SeqCst);
                cancel.cancel();
            })
        });

        let runner = JobRunner::new(&self.executor, &self.cache, self.source_control.as_ref());
        let (records, failure) = runner
            .execute(job, &env, &mut state, &cancel, &|event| {
                self.emit_event(event)
            })
            .await;

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let (failed_step, run_error) = match failure {
            None => {
                state.complete();
                (None, None)
            }
            Some((index, err)) => {
                // a cancellation caused by the job budget is a timeout
                let err = match err {
                    JobError::Cancelled { step } if deadline_hit.load(Ordering::SeqCst) => {
                        JobError::Timeout {
                            name: step,
                            timeout_secs: job.max_duration_secs.unwrap_or_default(),
                            output: String::new(),
                        }
                    }
                    other => other,
                };
                state.fail(Some(index));
                (Some(index), Some(err))
            }
        };

        info!("Job run finished: {} - {:?}", job.name, state.status);
        self.emit_event(ExecutionEvent::JobFinished {
            run_id: state.run_id,
            status: state.status,
        });

        Self::report(job, state, records, failed_step, run_error)
    }

    fn report(
        job: &JobDescription,
        state: RunState,
        records: Vec<StepRecord>,
        failed_step: Option<usize>,
        error: Option<JobError>,
    ) -> RunReport {
        RunReport {
            run_id: state.run_id,
            job_name: job.name.clone(),
            status: state.status,
            started_at: state.started_at,
            completed_at: state.completed_at,
            records,
            failed_step,
            error,
        }
    }
}
