//! Task lifecycle types shared with the task manager
//!
//! These types describe what the task manager exposes: a point-in-time
//! snapshot of every task and a notification per state transition.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single task.
///
/// The numeric codes are the ones the task manager sends in
/// [`TaskStateChange`] notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TaskState {
    /// Known to the task manager but not yet scheduled
    None = 0,
    /// Being set up
    Initializing = 1,
    /// Waiting on dependencies or a free slot
    Pending = 2,
    /// Currently executing
    InProgress = 3,
    /// Executing, and inputs changed underneath it so it will run again
    InProgressMustRerun = 4,
    /// Finished unsuccessfully
    Failed = 5,
    /// Finished successfully
    Succeeded = 6,
}

impl TaskState {
    /// Every state, in code order
    pub const ALL: [Self; 7] = [
        Self::None,
        Self::Initializing,
        Self::Pending,
        Self::InProgress,
        Self::InProgressMustRerun,
        Self::Failed,
        Self::Succeeded,
    ];

    /// Look up a state by its numeric code, `None` when out of range.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Numeric code of this state
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Upper-case name, as used in transition log lines
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Initializing => "INITIALIZING",
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::InProgressMustRerun => "IN_PROGRESS_MUST_RERUN",
            Self::Failed => "FAILED",
            Self::Succeeded => "SUCCEEDED",
        }
    }

    /// Whether this state takes priority when reducing a display group
    #[must_use]
    pub const fn is_active_or_failed(self) -> bool {
        matches!(self, Self::InProgress | Self::InProgressMustRerun | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output captured from a failed task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorData {
    /// Captured standard output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Captured standard error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// Read-only view of one task, as reported by the task manager.
///
/// Camel-case keys (`groupAs`, `lastRunMs`, `errorData`) are accepted as
/// well; any other key is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSnapshot {
    /// Current lifecycle state
    pub state: TaskState,
    /// Names of the tasks this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Labels for cross-cutting status buckets
    #[serde(default)]
    pub tags: Vec<String>,
    /// Display grouping key; the task's own name when absent
    #[serde(default, alias = "groupAs", skip_serializing_if = "Option::is_none")]
    pub group_as: Option<String>,
    /// Duration of the most recent run in milliseconds
    #[serde(default, alias = "lastRunMs", skip_serializing_if = "Option::is_none")]
    pub last_run_ms: Option<i64>,
    /// Captured output, present when the task failed
    #[serde(default, alias = "errorData", skip_serializing_if = "Option::is_none")]
    pub error_data: Option<ErrorData>,
}

impl TaskSnapshot {
    /// Create a snapshot in the given state with every optional field empty.
    #[must_use]
    pub const fn new(state: TaskState) -> Self {
        Self {
            state,
            dependencies: Vec::new(),
            tags: Vec::new(),
            group_as: None,
            last_run_ms: None,
            error_data: None,
        }
    }

    /// Set the display grouping key.
    #[must_use]
    pub fn grouped(mut self, group_as: &str) -> Self {
        self.group_as = Some(group_as.to_string());
        self
    }

    /// Replace the tags.
    #[must_use]
    pub fn tagged(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(ToString::to_string).collect();
        self
    }

    /// Replace the dependency list.
    #[must_use]
    pub fn depends_on(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(ToString::to_string).collect();
        self
    }

    /// Record the duration of the last run.
    #[must_use]
    pub const fn ran_for(mut self, ms: i64) -> Self {
        self.last_run_ms = Some(ms);
        self
    }

    /// Attach captured standard error output.
    #[must_use]
    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.error_data
            .get_or_insert_with(ErrorData::default)
            .stderr = Some(stderr.to_string());
        self
    }

    /// Attach captured standard output.
    #[must_use]
    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.error_data
            .get_or_insert_with(ErrorData::default)
            .stdout = Some(stdout.to_string());
        self
    }
}

/// Full point-in-time state of every task, keyed by task name
pub type TaskStates = BTreeMap<String, TaskSnapshot>;

/// A single task transition, as emitted by the task manager.
///
/// States are carried as raw codes; consumers bounds-check them with
/// [`TaskState::from_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStateChange {
    /// Name of the task that changed
    pub task_name: String,
    /// Code of the state before the transition
    pub old_state: u8,
    /// Code of the state after the transition
    pub new_state: u8,
}

impl TaskStateChange {
    /// Build a notification from two known states.
    #[must_use]
    pub fn new(task_name: &str, old_state: TaskState, new_state: TaskState) -> Self {
        Self {
            task_name: task_name.to_string(),
            old_state: old_state.code(),
            new_state: new_state.code(),
        }
    }
}

/// The query side of a task manager.
///
/// Change notifications arrive separately, through the receiver handed to
/// [`crate::dashboard::Dashboard::run`].
pub trait TaskManager {
    /// Return the current state of every known task.
    fn task_states(&self) -> TaskStates;
}

impl TaskManager for TaskStates {
    fn task_states(&self) -> TaskStates {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_in_range() {
        assert_eq!(TaskState::from_code(0), Some(TaskState::None));
        assert_eq!(TaskState::from_code(3), Some(TaskState::InProgress));
        assert_eq!(TaskState::from_code(6), Some(TaskState::Succeeded));
    }

    #[test]
    fn test_from_code_out_of_range() {
        assert_eq!(TaskState::from_code(7), None);
        assert_eq!(TaskState::from_code(255), None);
    }

    #[test]
    fn test_codes_follow_lifecycle_order() {
        for (i, state) in TaskState::ALL.iter().enumerate() {
            assert_eq!(usize::from(state.code()), i);
        }
        assert!(TaskState::Pending < TaskState::InProgress);
        assert!(TaskState::Failed < TaskState::Succeeded);
    }

    #[test]
    fn test_priority_states() {
        assert!(TaskState::InProgress.is_active_or_failed());
        assert!(TaskState::InProgressMustRerun.is_active_or_failed());
        assert!(TaskState::Failed.is_active_or_failed());
        assert!(!TaskState::Succeeded.is_active_or_failed());
        assert!(!TaskState::Pending.is_active_or_failed());
    }

    #[test]
    fn test_state_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskState::InProgressMustRerun).unwrap(),
            "\"IN_PROGRESS_MUST_RERUN\""
        );
        assert_eq!(TaskState::InProgressMustRerun.to_string(), "IN_PROGRESS_MUST_RERUN");
    }

    #[test]
    fn test_snapshot_deserializes_with_defaults() {
        let json = r#"{"state": "PENDING"}"#;
        let snapshot: TaskSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot, TaskSnapshot::new(TaskState::Pending));
    }

    #[test]
    fn test_snapshot_deserializes_all_fields() {
        let json = r#"{
            "state": "FAILED",
            "dependencies": ["deps"],
            "tags": ["lint"],
            "group_as": "lint",
            "last_run_ms": 420,
            "error_data": {"stderr": "boom"}
        }"#;
        let snapshot: TaskSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.state, TaskState::Failed);
        assert_eq!(snapshot.dependencies, vec!["deps"]);
        assert_eq!(snapshot.group_as.as_deref(), Some("lint"));
        assert_eq!(snapshot.last_run_ms, Some(420));
        let error = snapshot.error_data.unwrap();
        assert_eq!(error.stderr.as_deref(), Some("boom"));
        assert!(error.stdout.is_none());
    }

    #[test]
    fn test_snapshot_accepts_camel_case_keys() {
        let json = r#"{
            "state": "FAILED",
            "groupAs": "compile",
            "lastRunMs": 12,
            "errorData": {"stderr": "boom"}
        }"#;
        let snapshot: TaskSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.group_as.as_deref(), Some("compile"));
        assert_eq!(snapshot.last_run_ms, Some(12));
        assert_eq!(
            snapshot.error_data.unwrap().stderr.as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn test_snapshot_rejects_unknown_keys() {
        let json = r#"{"state": "PENDING", "group": "compile"}"#;
        assert!(serde_json::from_str::<TaskSnapshot>(json).is_err());

        let json = r#"{"state": "FAILED", "errorData": {"stdErr": "boom"}}"#;
        assert!(serde_json::from_str::<TaskSnapshot>(json).is_err());
    }

    #[test]
    fn test_state_change_carries_codes() {
        let change = TaskStateChange::new("build", TaskState::Pending, TaskState::InProgress);
        assert_eq!(change.task_name, "build");
        assert_eq!(change.old_state, 2);
        assert_eq!(change.new_state, 3);
    }
}
