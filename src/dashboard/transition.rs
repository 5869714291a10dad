//! One-line log of individual task transitions

use colored::Colorize;

use crate::task::{TaskState, TaskStateChange};

const RULE_WIDTH: usize = 80;

/// Render the log entry for one transition.
///
/// Returns `None` when either state code is outside the known range.
/// Entering `Succeeded` adds a rule under the entry.
#[must_use]
pub fn render_transition(change: &TaskStateChange) -> Option<String> {
    let old_state = TaskState::from_code(change.old_state)?;
    let new_state = TaskState::from_code(change.new_state)?;

    let message = format!(
        "( [{} ]  {old_state} -> {new_state})",
        change.task_name.replace(':', " : ")
    )
    .to_lowercase();

    if new_state == TaskState::Succeeded {
        let rule = format!("\n{}\n", "=".repeat(RULE_WIDTH));
        Some(format!(
            "\n{}\n{}",
            message.bright_black(),
            rule.bold().green()
        ))
    } else {
        Some(format!("{}\n", message.bright_black()))
    }
}
