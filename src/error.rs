//! Job error taxonomy.

use thiserror::Error;

/// Errors that can occur while executing a job.
///
/// Every variant except [`JobError::Cache`] is fatal: it stops the run at
/// the step that produced it and becomes the job's final outcome. Cache
/// failures are downgraded to warning log records by the job runner.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    /// Malformed or empty job description. No steps run.
    #[error("invalid job description: {0}")]
    Config(String),

    /// Environment provisioning failed. No steps run.
    #[error("environment provisioning failed: {0}")]
    Environment(String),

    /// Source checkout failed.
    #[error("checkout failed: {0}")]
    Checkout(String),

    /// A command exited with a nonzero status.
    #[error("command `{name}` exited with status {exit_code}")]
    Command {
        name: String,
        exit_code: i32,
        output: String,
    },

    /// A step exceeded its time budget.
    #[error("step `{name}` timed out after {timeout_secs}s")]
    Timeout {
        name: String,
        timeout_secs: u64,
        output: String,
    },

    /// The run was cancelled while this step was executing.
    #[error("job cancelled during step `{step}`")]
    Cancelled { step: String },

    /// The cache backing store failed.
    #[error("cache operation failed: {0}")]
    Cache(String),
}

impl JobError {
    /// Process exit code for this error category.
    ///
    /// Distinct nonzero codes per category so callers can script against
    /// the binary's exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            JobError::Command { .. } => 1,
            JobError::Config(_) => 2,
            JobError::Environment(_) => 3,
            JobError::Checkout(_) => 4,
            JobError::Timeout { .. } => 5,
            JobError::Cancelled { .. } => 6,
            JobError::Cache(_) => 7,
        }
    }

    /// Whether this error aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, JobError::Cache(_))
    }

    /// Output captured before the step failed, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            JobError::Command { output, .. } | JobError::Timeout { output, .. } => Some(output),
            _ => None,
        }
    }
}
