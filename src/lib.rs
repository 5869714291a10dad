//! Gyro - live build task dashboard
//!
//! Gyro turns the stream of state changes coming out of a build task
//! manager into a periodically refreshed terminal view: a progress bar,
//! grouped and tagged status lines, run timings and error dumps.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod dashboard;
pub mod runner;
pub mod task;

#[cfg(test)]
pub mod testutil;

// Re-export commonly used types
pub use dashboard::{Dashboard, DashboardConfig, TagPolicy, Throttle};
pub use runner::{LocalTaskManager, RunSummary, TaskGraphConfig};
pub use task::{ErrorData, TaskManager, TaskSnapshot, TaskState, TaskStateChange, TaskStates};
