//! Job domain model

use crate::core::step::Step;

/// An immutable job description: the unit the pipeline engine runs.
///
/// Built once from configuration (or constructed programmatically) and
/// read-only for the rest of the run.
#[derive(Debug, Clone)]
pub struct JobDescription {
    /// Job name
    pub name: String,

    /// Container image reference for the execution environment
    pub image: String,

    /// Repository URL for checkout steps
    pub repository: Option<String>,

    /// Branch or tag to check out
    pub reference: Option<String>,

    /// Overall time budget for the run, if any
    pub max_duration_secs: Option<u64>,

    /// Ordered steps; declaration order is execution order
    pub steps: Vec<Step>,
}
