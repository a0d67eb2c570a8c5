//! Execution state models

use crate::error::JobError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall job run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Run has not started
    Pending,
    /// Environment is being provisioned
    Provisioning,
    /// Steps are executing
    Running,
    /// All steps succeeded
    Succeeded,
    /// A step failed, or the run was aborted
    Failed,
}

impl JobStatus {
    /// Check if the run reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Outcome of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Step completed successfully
    Success,
    /// Step failed in a non-fatal way; the run continued (cache saves only)
    Warning { message: String },
    /// Step failed and stopped the run
    Failed { error: String, exit_code: i32 },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }
}

/// One entry in the ordered log stream. Steps that never ran have no record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Position in the declared step sequence
    pub index: usize,

    /// Step display name
    pub name: String,

    /// When the step started
    pub started_at: DateTime<Utc>,

    /// How long the step ran
    pub duration_ms: u64,

    /// What happened
    pub outcome: StepOutcome,

    /// Captured combined output (may be empty)
    pub output: String,
}

/// Mutable state for one job run
#[derive(Debug, Clone)]
pub struct RunState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current status
    pub status: JobStatus,

    /// Index of the step currently executing (or the failing step, once failed)
    pub current_step: Option<usize>,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            current_step: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Mark the run as provisioning its environment
    pub fn provisioning(&mut self) {
        self.status = JobStatus::Provisioning;
        self.started_at = Some(Utc::now());
    }

    /// Mark the given step as executing
    pub fn running(&mut self, step_index: usize) {
        self.status = JobStatus::Running;
        self.current_step = Some(step_index);
    }

    /// Mark the run as succeeded
    pub fn complete(&mut self) {
        self.status = JobStatus::Succeeded;
        self.current_step = None;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the run as failed, attributing it to a step if one ran
    pub fn fail(&mut self, step_index: Option<usize>) {
        self.status = JobStatus::Failed;
        self.current_step = step_index;
        self.completed_at = Some(Utc::now());
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Final result of a job run: terminal status plus the ordered log stream.
#[derive(Debug)]
pub struct RunReport {
    /// Unique run ID
    pub run_id: Uuid,

    /// Job name
    pub job_name: String,

    /// Terminal status (Succeeded or Failed)
    pub status: JobStatus,

    /// When the run started (None if it failed validation before starting)
    pub started_at: Option<DateTime<Utc>>,

    /// When the run finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Ordered log stream, one record per executed step
    pub records: Vec<StepRecord>,

    /// Index of the failing step, if the run failed during a step
    pub failed_step: Option<usize>,

    /// The single attributable reason for failure
    pub error: Option<JobError>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    /// Process exit code for this run (0 on success)
    pub fn exit_code(&self) -> i32 {
        match &self.error {
            None => 0,
            Some(err) => err.exit_code(),
        }
    }
}
