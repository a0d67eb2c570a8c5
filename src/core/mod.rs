//! Core domain models for jobline
//!
//! This module defines the fundamental data structures that represent
//! jobs, steps, and run state.

pub mod config;
pub mod job;
pub mod state;
pub mod step;

pub use job::*;
pub use state::*;
pub use step::*;
