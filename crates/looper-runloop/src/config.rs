//! Configuration for the RunLoop.

use serde::{Deserialize, Serialize};

/// RunLoop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLoopConfig {
    /// Name used in log output. Empty means "use the owning thread's name".
    #[serde(default)]
    pub name: String,

    /// Whether to collect metrics.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Emit a `trace!` event for every phase announcement.
    #[serde(default)]
    pub trace_phases: bool,
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            metrics_enabled: default_metrics_enabled(),
            trace_phases: false,
        }
    }
}

impl RunLoopConfig {
    /// Set the loop name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Resolve the display name for a loop created on the current thread.
    pub(crate) fn resolved_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        let thread = std::thread::current();
        match thread.name() {
            Some(name) => name.to_string(),
            None => format!("{:?}", thread.id()),
        }
    }
}
