//! Live terminal dashboard
//!
//! Aggregates task manager snapshots into a progress bar, tagged status
//! lines and run timings, and logs each task transition as it happens.

pub mod aggregate;
pub mod config;
pub mod controller;
pub mod errors;
pub mod render;
pub mod style;
pub mod throttle;
pub mod time;
pub mod transition;

pub use aggregate::{aggregate, Aggregate, Counts, Group, TagBucket, TagPolicy};
pub use config::DashboardConfig;
pub use controller::{Dashboard, RunBoundary, RunState, Sink};
pub use errors::render_task_errors;
pub use render::{render_frame, Frame};
pub use throttle::Throttle;
pub use time::format_duration_ms;
pub use transition::render_transition;
