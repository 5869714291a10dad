//! Progress view rendering
//!
//! Pure text building: turns an [`Aggregate`] plus run timing into the
//! block the dashboard writes to its anchor sink.

use colored::Colorize;

use super::aggregate::{Aggregate, Counts, Group, TagBucket};
use super::style::{group_style, tag_style};
use super::time::format_duration_ms;

/// Default progress bar width in columns
pub const DEFAULT_BAR_WIDTH: usize = 80;

/// Inputs for one rendered frame
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Aggregated task snapshot
    pub aggregate: &'a Aggregate,
    /// Formatted durations of every completed run so far
    pub run_times: &'a [String],
    /// Elapsed time of the current run; `None` once the run is complete
    pub elapsed_ms: Option<u64>,
    /// Append each group's last run time to its label
    pub show_time_elapsed_per_task: bool,
    /// Progress bar width in columns
    pub bar_width: usize,
}

/// Render the full dashboard block.
#[must_use]
pub fn render_frame(frame: &Frame<'_>) -> String {
    let aggregate = frame.aggregate;
    let counts = &aggregate.counts;
    let mut output = String::new();

    output.push_str(&progress_bar(counts, frame.bar_width));
    output.push_str("\n\n");

    let labels: Vec<String> = aggregate
        .groups
        .iter()
        .map(|g| {
            group_style(g.state)
                .paint(&group_label(g, frame.show_time_elapsed_per_task))
                .to_string()
        })
        .collect();

    for bucket in &aggregate.tags {
        output.push_str(&tag_section(bucket, &labels));
        output.push_str("\n\n");
    }

    output.push_str(&format!(
        "{}{}\n",
        "BUILD STATUS: ".bold().white().on_black(),
        status_line(counts)
    ));

    if let Some(line) = run_times_line(frame.run_times) {
        output.push_str(&line);
        output.push('\n');
    }

    if let Some(ms) = frame.elapsed_ms {
        output.push_str(&elapsed_line(ms));
        output.push('\n');
    }

    output
}

/// Number of filled columns for the given counters.
///
/// Failed groups are left out of the ratio; the result is always within
/// `0..=width`.
#[must_use]
pub fn filled_units(counts: &Counts, width: usize) -> usize {
    let denominator = (counts.succeeded + counts.processing + counts.pending).max(1);
    width * counts.succeeded / denominator
}

/// Render the progress bar, green once the run is complete.
#[must_use]
pub fn progress_bar(counts: &Counts, width: usize) -> String {
    let filled = filled_units(counts, width);
    let done = "+".repeat(filled);
    let remaining = "-".repeat(width - filled);

    if counts.is_complete() {
        format!("{}{}", done.green().bold(), remaining.green().bold())
    } else {
        format!("{}{}", done.cyan().bold(), remaining.blue().bold())
    }
}

/// Plain label for a display group, e.g. `"[ lint : js ]"`.
#[must_use]
pub fn group_label(group: &Group, show_time_elapsed_per_task: bool) -> String {
    let mut text = group.name.clone();
    if show_time_elapsed_per_task {
        if let Some(ms) = group.last_run_ms.filter(|ms| *ms >= 0) {
            text.push_str(&format!(" ({ms}ms!!)"));
        }
    }
    format!("[ {} ]", text.replace(':', " : "))
}

/// Render one tag's header line and the labels of its groups.
///
/// `labels` holds the styled label of every group, indexed like
/// [`Aggregate::groups`].
#[must_use]
pub fn tag_section(bucket: &TagBucket, labels: &[String]) -> String {
    let header = format!("{} Build Tasks: ", bucket.tag.to_uppercase());
    let members: Vec<&str> = bucket
        .groups
        .iter()
        .filter_map(|&i| labels.get(i).map(String::as_str))
        .collect();

    format!(
        "{}{}{}{}",
        tag_style(bucket.state).paint(&header),
        "\n".on_black(),
        members.join(" "),
        " ".on_black()
    )
}

/// Overall status: failures first, then running, then waiting.
#[must_use]
pub fn status_line(counts: &Counts) -> String {
    if counts.failed > 0 {
        format!("FAILED ({} tasks failed)", counts.failed)
            .bold()
            .red()
            .to_string()
    } else if counts.processing > 0 {
        format!(
            "IN PROCESS ({} tasks processing, {} tasks pending)",
            counts.processing, counts.pending
        )
        .bold()
        .blue()
        .to_string()
    } else if counts.pending > 0 {
        format!("INCOMPLETE ({} tasks pending)", counts.pending)
            .bold()
            .blue()
            .to_string()
    } else {
        format!("SUCCESSFULLY COMPLETE ({} tasks done)", counts.succeeded)
            .bold()
            .green()
            .to_string()
    }
}

/// Durations of every completed run, or `None` before the first finishes.
#[must_use]
pub fn run_times_line(run_times: &[String]) -> Option<String> {
    if run_times.is_empty() {
        return None;
    }
    Some(
        format!("RUN TIMES: {}", run_times.join(", "))
            .bold()
            .white()
            .on_black()
            .to_string(),
    )
}

/// Elapsed time of the run in progress.
#[must_use]
pub fn elapsed_line(elapsed_ms: u64) -> String {
    format!(
        "CURRENT BUILD ELAPSED TIME: {}",
        format_duration_ms(elapsed_ms)
    )
    .bold()
    .white()
    .on_black()
    .to_string()
}
