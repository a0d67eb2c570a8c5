//! Scenario-based tests for jobline

mod cache_behavior;
mod failure_handling;
