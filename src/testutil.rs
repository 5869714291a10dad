//! Shared test utilities
//!
//! Common helpers used across test modules. Only compiled in test builds.

use crate::task::{TaskSnapshot, TaskState, TaskStates};

/// Create a snapshot in `state` with no dependencies, tags or timings.
#[must_use]
pub const fn snapshot(state: TaskState) -> TaskSnapshot {
    TaskSnapshot::new(state)
}

/// Collect `(name, snapshot)` pairs into a `TaskStates` map.
#[must_use]
pub fn states(entries: Vec<(&str, TaskSnapshot)>) -> TaskStates {
    entries
        .into_iter()
        .map(|(name, snapshot)| (name.to_string(), snapshot))
        .collect()
}

/// Disable ANSI styling so rendered text can be compared literally.
pub fn plain_output() {
    colored::control::set_override(false);
}
