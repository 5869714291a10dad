//! Dashboard options
//!
//! Parsed from the `[dashboard]` table of `tasks.toml`; every key is optional.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::aggregate::TagPolicy;
use super::render::DEFAULT_BAR_WIDTH;

/// Rendering and rate-limiting options for the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    /// Append each group's last run time to its label
    #[serde(default)]
    pub show_time_elapsed_per_task: bool,
    /// How display groups pick their tags
    #[serde(default)]
    pub tag_policy: TagPolicy,
    /// Progress bar width in columns (default: 80)
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
    /// Minimum time between dashboard renders (default: 1000)
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
    /// Minimum time between error dumps (default: 5000)
    #[serde(default = "default_error_interval_ms")]
    pub error_interval_ms: u64,
}

const fn default_bar_width() -> usize {
    DEFAULT_BAR_WIDTH
}

const fn default_render_interval_ms() -> u64 {
    1000
}

const fn default_error_interval_ms() -> u64 {
    5000
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            show_time_elapsed_per_task: false,
            tag_policy: TagPolicy::default(),
            bar_width: default_bar_width(),
            render_interval_ms: default_render_interval_ms(),
            error_interval_ms: default_error_interval_ms(),
        }
    }
}

impl DashboardConfig {
    /// Parse a standalone TOML document holding only dashboard keys.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse dashboard options")?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.bar_width == 0 {
            bail!("bar_width must be greater than zero");
        }
        if self.render_interval_ms == 0 {
            bail!("render_interval_ms must be greater than zero");
        }
        if self.error_interval_ms == 0 {
            bail!("error_interval_ms must be greater than zero");
        }
        Ok(())
    }

    /// Dashboard render throttle window
    #[must_use]
    pub const fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    /// Error dump throttle window
    #[must_use]
    pub const fn error_interval(&self) -> Duration {
        Duration::from_millis(self.error_interval_ms)
    }
}
