//! Dashboard controller
//!
//! Owns the run bookkeeping and the two throttles, and turns task manager
//! notifications into renders. Everything runs on the caller's task; the
//! only state carried between renders is in [`RunState`].

use std::time::Instant;

use colored::Colorize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use super::aggregate::aggregate;
use super::config::DashboardConfig;
use super::errors::render_task_errors;
use super::render::{render_frame, Frame};
use super::throttle::Throttle;
use super::time::format_duration_ms;
use super::transition::render_transition;
use crate::task::{TaskManager, TaskStateChange};

/// Destination for rendered text, one block per call
pub type Sink = Box<dyn FnMut(&str) + Send>;

/// What a render observed about the run as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBoundary {
    /// Same phase as the previous render
    Unchanged,
    /// A complete run went back to having work to do
    Restarted,
    /// The run just completed
    Finished,
}

/// Run timing and output bookkeeping carried between renders
#[derive(Debug, Clone)]
pub struct RunState {
    run_start: Instant,
    has_completed: bool,
    run_times: Vec<String>,
    last_output: String,
}

impl RunState {
    /// Start tracking with a run beginning at `now`.
    #[must_use]
    pub const fn new(now: Instant) -> Self {
        Self {
            run_start: now,
            has_completed: false,
            run_times: Vec::new(),
            last_output: String::new(),
        }
    }

    /// Record whether the run is complete as of `now`.
    ///
    /// Finishing appends the run's duration to the history; restarting
    /// moves the start of the run to `now`.
    pub fn observe(&mut self, complete: bool, now: Instant) -> RunBoundary {
        let boundary = match (self.has_completed, complete) {
            (true, false) => {
                self.run_start = now;
                RunBoundary::Restarted
            }
            (false, true) => {
                let elapsed = self.elapsed_ms(now);
                self.run_times.push(format_duration_ms(elapsed));
                RunBoundary::Finished
            }
            _ => RunBoundary::Unchanged,
        };
        self.has_completed = complete;
        boundary
    }

    /// Milliseconds since the current run started
    #[must_use]
    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.run_start);
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether the last render saw a complete run
    #[must_use]
    pub const fn has_completed(&self) -> bool {
        self.has_completed
    }

    /// Formatted durations of every completed run
    #[must_use]
    pub fn run_times(&self) -> &[String] {
        &self.run_times
    }

    /// Remember `output`; returns `false` if it equals the previous one.
    fn replace_output(&mut self, output: String) -> bool {
        if output == self.last_output {
            return false;
        }
        self.last_output = output;
        true
    }
}

/// Live progress dashboard for one task manager
pub struct Dashboard {
    config: DashboardConfig,
    run: RunState,
    render_throttle: Throttle,
    error_throttle: Throttle,
    anchor: Sink,
    console: Sink,
}

impl Dashboard {
    /// Create a dashboard writing to standard output.
    #[must_use]
    pub fn new(config: DashboardConfig) -> Self {
        Self::starting_at(config, Instant::now())
    }

    /// Create a dashboard whose first run is timed from `now`.
    #[must_use]
    pub fn starting_at(config: DashboardConfig, now: Instant) -> Self {
        Self {
            render_throttle: Throttle::new(config.render_interval()),
            error_throttle: Throttle::new(config.error_interval()),
            run: RunState::new(now),
            config,
            anchor: Box::new(|text: &str| println!("{text}")),
            console: Box::new(|text: &str| println!("{text}")),
        }
    }

    /// Send the dashboard block to `anchor` instead of standard output.
    #[must_use]
    pub fn with_anchor(mut self, anchor: impl FnMut(&str) + Send + 'static) -> Self {
        self.anchor = Box::new(anchor);
        self
    }

    /// Send announcements, error dumps and transition lines to `console`.
    #[must_use]
    pub fn with_console(mut self, console: impl FnMut(&str) + Send + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    /// Run bookkeeping, for inspection
    #[must_use]
    pub const fn run_state(&self) -> &RunState {
        &self.run
    }

    /// React to one task transition: request a (throttled) render, then log
    /// the transition.
    pub fn handle_change<M: TaskManager + ?Sized>(
        &mut self,
        manager: &M,
        change: &TaskStateChange,
        now: Instant,
    ) {
        if self.render_throttle.call(now) {
            self.render(manager, now);
        }
        if let Some(line) = render_transition(change) {
            (self.console)(&line);
        }
    }

    /// Earliest time a coalesced render or error dump is due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.render_throttle.deadline(), self.error_throttle.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Perform any trailing render or error dump that is due at `now`.
    pub fn tick<M: TaskManager + ?Sized>(&mut self, manager: &M, now: Instant) {
        if self.render_throttle.poll(now) {
            debug!("trailing dashboard render");
            self.render(manager, now);
        }
        if self.error_throttle.poll(now) {
            debug!("trailing error dump");
            self.dump_errors(manager);
        }
    }

    /// Render the dashboard for the manager's current state, bypassing the
    /// render throttle.
    pub fn render<M: TaskManager + ?Sized>(&mut self, manager: &M, now: Instant) {
        let states = manager.task_states();
        let view = aggregate(&states, self.config.tag_policy);
        let complete = view.counts.is_complete();

        let boundary = self.run.observe(complete, now);
        match boundary {
            RunBoundary::Restarted => debug!("run restarted"),
            RunBoundary::Finished => debug!(
                duration = self.run.run_times().last().map(String::as_str),
                "run finished"
            ),
            RunBoundary::Unchanged => {}
        }

        let frame = Frame {
            aggregate: &view,
            run_times: self.run.run_times(),
            elapsed_ms: (!complete).then(|| self.run.elapsed_ms(now)),
            show_time_elapsed_per_task: self.config.show_time_elapsed_per_task,
            bar_width: self.config.bar_width,
        };
        let output = render_frame(&frame);

        if self.run.replace_output(output) {
            (self.anchor)(&format!("\n{}", self.run.last_output));
        } else {
            debug!("dashboard unchanged, skipping write");
        }

        if boundary == RunBoundary::Finished {
            (self.console)(
                &"\nDone, all tasks finished running.\n"
                    .green()
                    .bold()
                    .to_string(),
            );
        }

        if view.has_errors && complete && self.error_throttle.call(now) {
            self.dump_errors(manager);
        }
    }

    fn dump_errors<M: TaskManager + ?Sized>(&mut self, manager: &M) {
        if let Some(dump) = render_task_errors(&manager.task_states()) {
            (self.console)(&dump);
        }
    }

    /// Drive the dashboard from a change subscription until the sender side
    /// closes, then flush any coalesced work still waiting.
    pub async fn run<M: TaskManager + ?Sized>(
        &mut self,
        manager: &M,
        mut changes: UnboundedReceiver<TaskStateChange>,
    ) {
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                change = changes.recv() => match change {
                    Some(change) => self.handle_change(manager, &change, Instant::now()),
                    None => break,
                },
                () = sleep_until(deadline) => self.tick(manager, Instant::now()),
            }
        }

        while let Some(deadline) = self.next_deadline() {
            tokio::time::sleep_until(deadline.into()).await;
            self.tick(manager, Instant::now());
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
