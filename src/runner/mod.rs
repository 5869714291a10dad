//! Local task execution
//!
//! A small task manager used by the `gyro` binary to drive the dashboard
//! from a `tasks.toml` file.

pub mod config;
pub mod manager;

pub use config::{TaskConfig, TaskGraphConfig};
pub use manager::{run_command, CommandOutput, LocalTaskManager, RunSummary};
