//! Step domain model

/// A single step in a job.
///
/// The ordered step list is the whole program: the job runner matches each
/// variant exhaustively and never reorders or parallelizes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Populate the workspace from source control.
    Checkout,

    /// Run a shell command inside the environment.
    Run {
        /// Display name for log records
        name: String,
        /// Command passed to `sh -c`
        command: String,
        /// Time budget for this command
        timeout_secs: u64,
    },

    /// Restore a cache entry into the workspace. A miss is not an error.
    RestoreCache { key: String },

    /// Snapshot workspace paths under a cache key. Last write wins.
    SaveCache { key: String, paths: Vec<String> },
}

impl Step {
    /// Name shown in the log stream for this step.
    pub fn display_name(&self) -> String {
        match self {
            Step::Checkout => "checkout".to_string(),
            Step::Run { name, .. } => name.clone(),
            Step::RestoreCache { key } => format!("restore_cache ({})", key),
            Step::SaveCache { key, .. } => format!("save_cache ({})", key),
        }
    }

}

/// Defaults applied when a step does not override them.
#[derive(Debug, Clone)]
pub struct StepDefaults {
    pub timeout_secs: u64,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: 600, // 10 minutes
        }
    }
}
