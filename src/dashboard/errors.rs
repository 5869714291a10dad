//! Captured failure output dump

use colored::Colorize;

use crate::task::TaskStates;

/// Render the captured output of every task carrying error data.
///
/// Returns `None` when no task has anything to report.
#[must_use]
pub fn render_task_errors(states: &TaskStates) -> Option<String> {
    let mut output = String::new();

    for (name, snapshot) in states {
        let Some(error) = &snapshot.error_data else {
            continue;
        };

        output.push_str(
            &format!("ERROR: {name}\n")
                .on_red()
                .bold()
                .black()
                .to_string(),
        );
        output.push('\n');

        let streams = [(">>> stdout", &error.stdout), (">>> stderr", &error.stderr)];
        for (title, text) in streams {
            if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                output.push_str(&title.on_yellow().bold().black().to_string());
                output.push('\n');
                output.push_str(text);
                output.push('\n');
            }
        }
    }

    if output.is_empty() {
        None
    } else {
        Some(output)
    }
}
