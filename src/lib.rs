//! jobline - a minimal CI job execution engine

pub mod cache;
pub mod cli;
pub mod core;
pub mod environment;
pub mod error;
pub mod execution;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheManager, CacheStore, FsCacheStore, MemoryCacheStore};
pub use core::{JobDescription, JobStatus, RunReport, RunState, Step, StepOutcome, StepRecord};
pub use environment::{
    Environment, EnvironmentProvisioner, GitCheckout, LocalProvisioner, NoCheckout, SourceControl,
};
pub use error::JobError;
pub use execution::{ExecutionEvent, PipelineEngine, StepExecutor};
