//! Gyro - live build task dashboard
//!
//! CLI entry point: runs a task graph under the dashboard, or renders a
//! single frame for a saved snapshot.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gyro::dashboard::{
    aggregate, render_frame, render_task_errors, Dashboard, DashboardConfig, Frame,
};
use gyro::runner::{LocalTaskManager, RunSummary, TaskGraphConfig};
use gyro::task::TaskStates;

/// Live terminal dashboard for interdependent build tasks
#[derive(Parser, Debug)]
#[command(name = "gyro", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the tasks of a tasks.toml file under the live dashboard
    Run {
        /// Path to the tasks.toml configuration file
        #[arg(long, default_value = "tasks.toml")]
        config: PathBuf,

        /// Number of times to run the whole graph
        #[arg(long, default_value_t = 1)]
        repeat: u32,

        /// Show each task group's last run time
        #[arg(long)]
        show_time: bool,
    },
    /// Render one dashboard frame for a JSON task snapshot
    Render {
        /// Path to a JSON object mapping task names to snapshots
        #[arg(long)]
        snapshot: PathBuf,

        /// Show each task group's last run time
        #[arg(long)]
        show_time: bool,
    },
}

/// Log to stderr so the dashboard on stdout stays readable.
/// Level is controlled by `RUST_LOG` (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Execute the graph `repeat` times while the dashboard watches.
///
/// Returns the summary of the last run.
async fn run_graph(config: &Path, repeat: u32, show_time: bool) -> Result<RunSummary> {
    let mut graph = TaskGraphConfig::from_path(config)
        .with_context(|| format!("Failed to load config from '{}'", config.display()))?;
    if show_time {
        graph.dashboard.show_time_elapsed_per_task = true;
    }

    let mut dashboard = Dashboard::new(graph.dashboard.clone());
    let (manager, changes) = LocalTaskManager::new(graph);

    let runs = async {
        let result = execute_runs(&manager, repeat).await;
        // Ending the subscription lets the dashboard flush and return
        manager.close();
        result
    };

    let ((), summary) = tokio::join!(dashboard.run(&manager, changes), runs);
    summary
}

async fn execute_runs(manager: &LocalTaskManager, repeat: u32) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for _ in 0..repeat.max(1) {
        summary = manager.execute().await.context("Failed to execute task graph")?;
    }
    Ok(summary)
}

/// Render a single frame for a saved snapshot.
fn render_snapshot(path: &Path, show_time: bool) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let states: TaskStates = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

    print!("{}", snapshot_frame(&states, show_time));
    Ok(())
}

/// Build the frame for a snapshot that was never timed: no run times, no
/// elapsed line. A complete snapshot with failures gets its error dump.
fn snapshot_frame(states: &TaskStates, show_time: bool) -> String {
    let config = DashboardConfig::default();
    let view = aggregate(states, config.tag_policy);
    let mut output = render_frame(&Frame {
        aggregate: &view,
        run_times: &[],
        elapsed_ms: None,
        show_time_elapsed_per_task: show_time,
        bar_width: config.bar_width,
    });
    if view.counts.is_complete() {
        if let Some(dump) = render_task_errors(states) {
            output.push_str(&dump);
        }
    }
    output
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Run {
            config,
            repeat,
            show_time,
        } => {
            let summary = run_graph(&config, repeat, show_time).await?;
            if !summary.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Render {
            snapshot,
            show_time,
        } => render_snapshot(&snapshot, show_time),
    }
}
