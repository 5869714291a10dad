//! In-process task manager
//!
//! Runs the tasks of a [`TaskGraphConfig`] one at a time in dependency
//! order, keeping a [`TaskStates`] map current and announcing every
//! transition on a channel.

use std::process::Stdio;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::runner::config::{TaskConfig, TaskGraphConfig};
use crate::task::{ErrorData, TaskManager, TaskSnapshot, TaskState, TaskStateChange, TaskStates};

/// Outcome of one pass over the task graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks that finished successfully
    pub succeeded: usize,
    /// Tasks that failed or were blocked by a failed dependency
    pub failed: usize,
}

impl RunSummary {
    /// Every task succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Captured result of one shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout output
    pub stdout: String,
    /// Captured stderr output
    pub stderr: String,
    /// Process exit code (None if killed by signal)
    pub exit_code: Option<i32>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: i64,
}

/// Task manager executing shell commands on the local machine
pub struct LocalTaskManager {
    graph: TaskGraphConfig,
    states: Mutex<TaskStates>,
    changes: Mutex<Option<UnboundedSender<TaskStateChange>>>,
}

impl LocalTaskManager {
    /// Register every task of `graph` in the `None` state.
    ///
    /// Returns the manager and the subscription that receives its
    /// transitions. The subscription ends once [`Self::close`] is called.
    #[must_use]
    pub fn new(graph: TaskGraphConfig) -> (Self, UnboundedReceiver<TaskStateChange>) {
        let states = graph
            .tasks
            .iter()
            .map(|task| (task.name.clone(), initial_snapshot(task)))
            .collect();
        let (tx, rx) = mpsc::unbounded_channel();

        let manager = Self {
            graph,
            states: Mutex::new(states),
            changes: Mutex::new(Some(tx)),
        };
        (manager, rx)
    }

    /// Move every task back to `Pending` and clear captured output.
    pub fn reset(&self) {
        for task in &self.graph.tasks {
            self.transition(&task.name, TaskState::Pending, |snapshot| {
                snapshot.error_data = None;
            });
        }
    }

    /// Run every task once, after resetting the graph.
    ///
    /// A task whose dependency failed is marked failed without running.
    pub async fn execute(&self) -> Result<RunSummary> {
        self.reset();
        info!(tasks = self.graph.tasks.len(), "starting run");

        let order = self.graph.execution_order()?;
        let mut summary = RunSummary::default();

        for task in order {
            let blocked_by = task
                .after
                .iter()
                .find(|dep| self.state_of(dep) != Some(TaskState::Succeeded));

            let succeeded = if let Some(dep) = blocked_by {
                let note = format!("not run: dependency '{dep}' failed");
                self.transition(&task.name, TaskState::Failed, |snapshot| {
                    snapshot.error_data = Some(ErrorData {
                        stdout: None,
                        stderr: Some(note),
                    });
                });
                false
            } else {
                self.run_task(task).await
            };

            if succeeded {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "run finished"
        );
        Ok(summary)
    }

    /// Stop announcing transitions, ending the subscription.
    pub fn close(&self) {
        lock(&self.changes).take();
    }

    async fn run_task(&self, task: &TaskConfig) -> bool {
        self.transition(&task.name, TaskState::InProgress, |_| {});

        match run_command(&task.command).await {
            Ok(output) => {
                let success = output.exit_code == Some(0);
                let state = if success {
                    TaskState::Succeeded
                } else {
                    TaskState::Failed
                };
                self.transition(&task.name, state, |snapshot| {
                    snapshot.last_run_ms = Some(output.duration_ms);
                    if !success {
                        snapshot.error_data = Some(ErrorData {
                            stdout: Some(output.stdout),
                            stderr: Some(output.stderr),
                        });
                    }
                });
                success
            }
            Err(err) => {
                warn!(task = %task.name, error = %err, "failed to run task");
                self.transition(&task.name, TaskState::Failed, |snapshot| {
                    snapshot.error_data = Some(ErrorData {
                        stdout: None,
                        stderr: Some(format!("{err:#}")),
                    });
                });
                false
            }
        }
    }

    fn state_of(&self, name: &str) -> Option<TaskState> {
        lock(&self.states).get(name).map(|s| s.state)
    }

    /// Apply a state change and announce it.
    fn transition(&self, name: &str, new_state: TaskState, update: impl FnOnce(&mut TaskSnapshot)) {
        let old_state = {
            let mut states = lock(&self.states);
            let Some(snapshot) = states.get_mut(name) else {
                return;
            };
            let old_state = snapshot.state;
            snapshot.state = new_state;
            update(snapshot);
            old_state
        };

        if let Some(tx) = lock(&self.changes).as_ref() {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(TaskStateChange::new(name, old_state, new_state));
        }
    }
}

impl TaskManager for LocalTaskManager {
    fn task_states(&self) -> TaskStates {
        lock(&self.states).clone()
    }
}

fn initial_snapshot(task: &TaskConfig) -> TaskSnapshot {
    TaskSnapshot {
        state: TaskState::None,
        dependencies: task.after.clone(),
        tags: task.tags.clone(),
        group_as: task.group_as.clone(),
        last_run_ms: None,
        error_data: None,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run a shell command, capturing its output.
///
/// Spawns `sh -c <command>` with piped stdout/stderr and reads both
/// concurrently so neither pipe can fill up and stall the child.
pub async fn run_command(command: &str) -> Result<CommandOutput> {
    let start = Instant::now();

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn '{command}'"))?;

    let child_stdout = child.stdout.take().context("Failed to capture stdout")?;
    let child_stderr = child.stderr.take().context("Failed to capture stderr")?;

    let stdout_handle = tokio::spawn(capture_lines(child_stdout));
    let stderr_handle = tokio::spawn(capture_lines(child_stderr));

    let status = child.wait().await.context("Failed waiting for process")?;
    let stdout = stdout_handle.await.context("stdout reader panicked")?;
    let stderr = stderr_handle.await.context("stderr reader panicked")?;

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code: status.code(),
        duration_ms: i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX),
    })
}

/// Read a pipe to the end, one line at a time.
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the read.
async fn capture_lines<R: AsyncRead + Unpin>(reader: R) -> String {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut captured = String::new();
    while matches!(reader.read_until(b'\n', &mut buf).await, Ok(n) if n > 0) {
        let line = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if !captured.is_empty() {
            captured.push('\n');
        }
        captured.push_str(&String::from_utf8_lossy(line));
        buf.clear();
    }
    captured
}
