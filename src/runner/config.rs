//! Task graph configuration parser
//!
//! Parses `tasks.toml` into task definitions plus dashboard options.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::dashboard::DashboardConfig;

/// A single task definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskConfig {
    /// Unique name for this task
    pub name: String,
    /// Shell command to run
    pub command: String,
    /// Tasks that must succeed before this one runs
    #[serde(default)]
    pub after: Vec<String>,
    /// Status bucket labels
    #[serde(default)]
    pub tags: Vec<String>,
    /// Display group; defaults to the task name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_as: Option<String>,
}

/// Top-level configuration parsed from tasks.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskGraphConfig {
    /// Dashboard options
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Task definitions
    #[serde(rename = "task", default)]
    pub tasks: Vec<TaskConfig>,
}

impl TaskGraphConfig {
    /// Parse a tasks.toml file from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse tasks.toml content from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse tasks.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Find a task by name
    #[must_use]
    pub fn get_task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Tasks ordered so every task comes after its dependencies.
    ///
    /// Ties keep definition order.
    pub fn execution_order(&self) -> Result<Vec<&TaskConfig>> {
        let mut remaining: HashMap<&str, usize> = self
            .tasks
            .iter()
            .map(|t| (t.name.as_str(), t.after.len()))
            .collect();
        let mut ordered: Vec<&TaskConfig> = Vec::with_capacity(self.tasks.len());

        while ordered.len() < self.tasks.len() {
            let next = self
                .tasks
                .iter()
                .find(|t| remaining.get(t.name.as_str()) == Some(&0));

            let Some(task) = next else {
                let mut stuck: Vec<&str> = remaining.keys().copied().collect();
                stuck.sort_unstable();
                bail!("Dependency cycle between tasks: {}", stuck.join(", "));
            };

            remaining.remove(task.name.as_str());
            for other in &self.tasks {
                if let Some(count) = remaining.get_mut(other.name.as_str()) {
                    *count -= other.after.iter().filter(|d| **d == task.name).count();
                }
            }
            ordered.push(task);
        }

        Ok(ordered)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        // Check that task names are non-empty
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                bail!("Task name cannot be empty");
            }
        }

        // Check for duplicate task names
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(&task.name) {
                bail!("Duplicate task name: '{}'", task.name);
            }
        }

        // Check that `after` references exist
        for task in &self.tasks {
            for dep in &task.after {
                if !seen.contains(dep) {
                    bail!(
                        "Task '{}' references unknown task '{}' in 'after'",
                        task.name,
                        dep
                    );
                }
            }
        }

        self.dashboard.validate().context("in [dashboard]")?;
        self.execution_order()?;

        Ok(())
    }
}
