//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run_loop: RunLoopSection,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub timers: Vec<TimerConfig>,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Default config file location (`<config dir>/looper/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("looper")
            .join("config.toml")
    }
}

/// `[run_loop]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLoopSection {
    #[serde(default = "default_loop_name")]
    pub name: String,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    #[serde(default)]
    pub trace_phases: bool,
}

impl Default for RunLoopSection {
    fn default() -> Self {
        Self {
            name: default_loop_name(),
            metrics_enabled: true,
            trace_phases: false,
        }
    }
}

fn default_loop_name() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily-rolling log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// A `[[timers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    pub id: String,

    /// Delay before the first firing.
    #[serde(default)]
    pub delay_ms: u64,

    /// Repeat interval; 0 means one-shot.
    #[serde(default)]
    pub interval_ms: u64,
}

impl TimerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// A `[[sources]]` entry: an event source signalled periodically from a
/// helper thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,

    pub signal_every_ms: u64,
}

impl SourceConfig {
    pub fn signal_period(&self) -> Duration {
        Duration::from_millis(self.signal_every_ms)
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
        }
    }
}

impl RunConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

fn default_duration_ms() -> u64 {
    1000
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
