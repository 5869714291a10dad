//! State aggregation
//!
//! Reduces a snapshot of individual tasks into display groups, tag buckets
//! and the four global counters the progress view is built from. Nothing
//! here is cached; every render aggregates the snapshot from scratch.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::task::{TaskSnapshot, TaskState, TaskStates};

/// How a display group picks its tags when members disagree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPolicy {
    /// Union of every member's tags, in first-seen order
    #[default]
    Union,
    /// Tags of the last member visited
    LastMember,
}

/// One display entry: every task sharing a `group_as` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Display key
    pub name: String,
    /// Reduced state of the members
    pub state: TaskState,
    /// Longest last run among the members
    pub last_run_ms: Option<i64>,
    /// Tags the group is listed under
    pub tags: Vec<String>,
}

/// Groups listed under one tag, plus the tag's overall state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBucket {
    /// The tag
    pub tag: String,
    /// Indices into [`Aggregate::groups`], in display order
    pub groups: Vec<usize>,
    /// `Failed` if any group failed, `InProgress` if any group is not
    /// finished, `Succeeded` otherwise
    pub state: TaskState,
}

/// Number of display groups in each coarse phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Not started yet (`None`, `Initializing`, `Pending`)
    pub pending: usize,
    /// Running (`InProgress`, `InProgressMustRerun`)
    pub processing: usize,
    /// Finished unsuccessfully
    pub failed: usize,
    /// Finished successfully
    pub succeeded: usize,
}

impl Counts {
    /// Count one group in the given state.
    pub fn record(&mut self, state: TaskState) {
        match state {
            TaskState::None | TaskState::Initializing | TaskState::Pending => self.pending += 1,
            TaskState::InProgress | TaskState::InProgressMustRerun => self.processing += 1,
            TaskState::Failed => self.failed += 1,
            TaskState::Succeeded => self.succeeded += 1,
        }
    }

    /// Nothing is running and nothing is waiting to run.
    ///
    /// Both counters are checked: for an instant between two tasks a run
    /// can have nothing processing while work is still pending.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.processing == 0 && self.pending == 0
    }

    /// Sum of all four counters
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending + self.processing + self.failed + self.succeeded
    }
}

/// Everything the progress view needs from one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    /// Display groups, in approximate execution order
    pub groups: Vec<Group>,
    /// Tag buckets, in first-seen order
    pub tags: Vec<TagBucket>,
    /// Global counters over `groups`
    pub counts: Counts,
    /// At least one task carries captured error output
    pub has_errors: bool,
}

/// Aggregate a task snapshot.
#[must_use]
pub fn aggregate(states: &TaskStates, tag_policy: TagPolicy) -> Aggregate {
    let ordered = execution_order(states);

    // Bucket members by display key, keeping first-seen group order
    let mut members: Vec<(&str, Vec<&TaskSnapshot>)> = Vec::new();
    for (name, snapshot) in ordered {
        let key = snapshot.group_as.as_deref().unwrap_or(name);
        match members.iter_mut().find(|(k, _)| *k == key) {
            Some((_, list)) => list.push(snapshot),
            None => members.push((key, vec![snapshot])),
        }
    }

    let mut result = Aggregate::default();
    for (key, snapshots) in members {
        let group = reduce_group(key, &snapshots, tag_policy);
        result.has_errors |= snapshots.iter().any(|s| s.error_data.is_some());
        result.counts.record(group.state);

        let index = result.groups.len();
        for tag in &group.tags {
            let bucket = match result.tags.iter().position(|b| &b.tag == tag) {
                Some(pos) => &mut result.tags[pos],
                None => {
                    result.tags.push(TagBucket {
                        tag: tag.clone(),
                        groups: Vec::new(),
                        state: TaskState::Succeeded,
                    });
                    let last = result.tags.len() - 1;
                    &mut result.tags[last]
                }
            };
            bucket.groups.push(index);
            bucket.state = reduce_tag_state(bucket.state, group.state);
        }

        result.groups.push(group);
    }

    result
}

/// Reduce the members of a display group to a single entry.
fn reduce_group(name: &str, members: &[&TaskSnapshot], tag_policy: TagPolicy) -> Group {
    let mut state: Option<TaskState> = None;
    let mut last_run_ms: Option<i64> = None;
    let mut tags: Vec<String> = Vec::new();

    for member in members {
        // A running or failed member pins the group's state
        if !state.is_some_and(TaskState::is_active_or_failed) {
            state = Some(member.state);
        }

        if let Some(ms) = member.last_run_ms {
            last_run_ms = Some(last_run_ms.map_or(ms, |current| current.max(ms)));
        }

        match tag_policy {
            TagPolicy::Union => {
                for tag in &member.tags {
                    if !tags.contains(tag) {
                        tags.push(tag.clone());
                    }
                }
            }
            TagPolicy::LastMember => tags.clone_from(&member.tags),
        }
    }

    Group {
        name: name.to_string(),
        state: state.unwrap_or(TaskState::None),
        last_run_ms,
        tags,
    }
}

/// Fold one group's state into a tag's state. `Failed` is sticky.
const fn reduce_tag_state(current: TaskState, group: TaskState) -> TaskState {
    match (current, group) {
        (TaskState::Failed, _) | (_, TaskState::Failed) => TaskState::Failed,
        (_, TaskState::Succeeded) => current,
        _ => TaskState::InProgress,
    }
}

/// Order tasks roughly the way they would run.
///
/// A task sorts after anything it directly depends on; otherwise tasks with
/// fewer dependencies come first. The comparison only looks at direct
/// dependencies and is not transitive, so an insertion sort is used: it
/// never panics on an inconsistent ordering and leaves ties in key order.
fn execution_order(states: &TaskStates) -> Vec<(&str, &TaskSnapshot)> {
    let mut ordered: Vec<(&str, &TaskSnapshot)> =
        states.iter().map(|(name, s)| (name.as_str(), s)).collect();

    for i in 1..ordered.len() {
        let mut j = i;
        while j > 0 && compare_execution(ordered[j - 1], ordered[j]) == Ordering::Greater {
            ordered.swap(j - 1, j);
            j -= 1;
        }
    }

    ordered
}

fn compare_execution(a: (&str, &TaskSnapshot), b: (&str, &TaskSnapshot)) -> Ordering {
    let (a_name, a_snapshot) = a;
    let (b_name, b_snapshot) = b;

    if a_snapshot.dependencies.iter().any(|d| d == b_name) {
        return Ordering::Greater;
    }
    if b_snapshot.dependencies.iter().any(|d| d == a_name) {
        return Ordering::Less;
    }
    a_snapshot
        .dependencies
        .len()
        .cmp(&b_snapshot.dependencies.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{snapshot, states};

    #[test]
    fn test_one_group_per_task_by_default() {
        let input = states(vec![
            ("a", snapshot(TaskState::Succeeded)),
            ("b", snapshot(TaskState::Pending)),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.counts.succeeded, 1);
        assert_eq!(result.counts.pending, 1);
    }

    #[test]
    fn test_failed_member_wins_regardless_of_order() {
        for (first, second) in [
            (TaskState::Failed, TaskState::Succeeded),
            (TaskState::Succeeded, TaskState::Failed),
        ] {
            let input = states(vec![
                ("compile:a", snapshot(first).grouped("compile")),
                ("compile:b", snapshot(second).grouped("compile")),
                ("lint", snapshot(TaskState::Succeeded).tagged(&["lint"])),
            ]);
            let result = aggregate(&input, TagPolicy::Union);
            let compile = result.groups.iter().find(|g| g.name == "compile").unwrap();
            assert_eq!(compile.state, TaskState::Failed);
            assert_eq!(result.counts.failed, 1);
            assert_eq!(result.counts.succeeded, 1);
            assert_eq!(result.groups.len(), 2);
        }
    }

    #[test]
    fn test_in_progress_member_pins_group() {
        let input = states(vec![
            ("x:1", snapshot(TaskState::InProgress).grouped("x")),
            ("x:2", snapshot(TaskState::Pending).grouped("x")),
            ("x:3", snapshot(TaskState::Succeeded).grouped("x")),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        assert_eq!(result.groups[0].state, TaskState::InProgress);
        assert_eq!(result.counts.processing, 1);
    }

    #[test]
    fn test_non_priority_states_take_last_member() {
        let input = states(vec![
            ("x:1", snapshot(TaskState::Succeeded).grouped("x")),
            ("x:2", snapshot(TaskState::Pending).grouped("x")),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        assert_eq!(result.groups[0].state, TaskState::Pending);
    }

    #[test]
    fn test_last_run_is_member_maximum() {
        let input = states(vec![
            ("x:1", snapshot(TaskState::Succeeded).grouped("x").ran_for(120)),
            ("x:2", snapshot(TaskState::Succeeded).grouped("x")),
            ("x:3", snapshot(TaskState::Succeeded).grouped("x").ran_for(80)),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        assert_eq!(result.groups[0].last_run_ms, Some(120));
    }

    #[test]
    fn test_counters_sum_to_group_count() {
        let input = states(vec![
            ("a", snapshot(TaskState::None)),
            ("b", snapshot(TaskState::Initializing).grouped("g")),
            ("c", snapshot(TaskState::InProgressMustRerun).grouped("g")),
            ("d", snapshot(TaskState::Failed)),
            ("e", snapshot(TaskState::Succeeded).grouped("h")),
            ("f", snapshot(TaskState::Pending).grouped("h")),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        assert_eq!(result.groups.len(), 4);
        assert_eq!(result.counts.total(), 4);
    }

    #[test]
    fn test_union_tags_across_members() {
        let input = states(vec![
            ("x:1", snapshot(TaskState::Succeeded).grouped("x").tagged(&["lint"])),
            ("x:2", snapshot(TaskState::Succeeded).grouped("x").tagged(&["test", "lint"])),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        assert_eq!(result.groups[0].tags, vec!["lint", "test"]);
        assert_eq!(result.tags.len(), 2);
    }

    #[test]
    fn test_last_member_tags() {
        let input = states(vec![
            ("x:1", snapshot(TaskState::Succeeded).grouped("x").tagged(&["lint"])),
            ("x:2", snapshot(TaskState::Succeeded).grouped("x").tagged(&["test"])),
        ]);
        let result = aggregate(&input, TagPolicy::LastMember);
        assert_eq!(result.groups[0].tags, vec!["test"]);
        assert_eq!(result.tags.len(), 1);
        assert_eq!(result.tags[0].tag, "test");
    }

    #[test]
    fn test_untagged_groups_have_no_bucket() {
        let input = states(vec![("a", snapshot(TaskState::Succeeded))]);
        let result = aggregate(&input, TagPolicy::Union);
        assert!(result.tags.is_empty());
    }

    #[test]
    fn test_tag_state_reduction() {
        let input = states(vec![
            ("a", snapshot(TaskState::Succeeded).tagged(&["ok", "mixed", "bad"])),
            ("b", snapshot(TaskState::Pending).tagged(&["mixed", "bad"])),
            ("c", snapshot(TaskState::Failed).tagged(&["bad"])),
            ("d", snapshot(TaskState::Succeeded).tagged(&["bad"])),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        let state_of = |tag: &str| result.tags.iter().find(|b| b.tag == tag).unwrap().state;
        assert_eq!(state_of("ok"), TaskState::Succeeded);
        assert_eq!(state_of("mixed"), TaskState::InProgress);
        assert_eq!(state_of("bad"), TaskState::Failed);
    }

    #[test]
    fn test_tag_bucket_indices_follow_group_order() {
        let input = states(vec![
            ("a", snapshot(TaskState::Succeeded).tagged(&["t"])),
            ("b", snapshot(TaskState::Succeeded)),
            ("c", snapshot(TaskState::Succeeded).tagged(&["t"])),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        assert_eq!(result.tags[0].groups, vec![0, 2]);
    }

    #[test]
    fn test_dependencies_sort_first() {
        let input = states(vec![
            ("app", snapshot(TaskState::Pending).depends_on(&["lib"])),
            ("lib", snapshot(TaskState::Pending).depends_on(&["codegen"])),
            ("codegen", snapshot(TaskState::Pending)),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        let names: Vec<&str> = result.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["codegen", "lib", "app"]);
    }

    #[test]
    fn test_fewer_dependencies_sort_first() {
        let input = states(vec![
            ("a", snapshot(TaskState::Pending).depends_on(&["x", "y"])),
            ("b", snapshot(TaskState::Pending).depends_on(&["x"])),
            ("x", snapshot(TaskState::Pending)),
            ("y", snapshot(TaskState::Pending)),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        let names: Vec<&str> = result.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "b", "a"]);
    }

    #[test]
    fn test_dependency_cycle_does_not_panic() {
        let input = states(vec![
            ("a", snapshot(TaskState::Pending).depends_on(&["b"])),
            ("b", snapshot(TaskState::Pending).depends_on(&["c"])),
            ("c", snapshot(TaskState::Pending).depends_on(&["a"])),
        ]);
        let result = aggregate(&input, TagPolicy::Union);
        assert_eq!(result.groups.len(), 3);
    }

    #[test]
    fn test_has_errors() {
        let input = states(vec![
            ("a", snapshot(TaskState::Succeeded)),
            ("b", snapshot(TaskState::Failed).with_stderr("boom")),
        ]);
        assert!(aggregate(&input, TagPolicy::Union).has_errors);

        let clean = states(vec![("a", snapshot(TaskState::Succeeded))]);
        assert!(!aggregate(&clean, TagPolicy::Union).has_errors);
    }

    #[test]
    fn test_completion_requires_nothing_pending() {
        let counts = |pending, processing, failed, succeeded| Counts {
            pending,
            processing,
            failed,
            succeeded,
        };
        assert!(counts(0, 0, 0, 3).is_complete());
        assert!(counts(0, 0, 2, 1).is_complete());
        assert!(!counts(1, 0, 0, 3).is_complete());
        assert!(!counts(0, 1, 0, 3).is_complete());
        assert!(counts(0, 0, 0, 0).is_complete());
    }
}
