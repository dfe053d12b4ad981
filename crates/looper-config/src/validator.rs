//! Configuration validation.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

const KNOWN_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_run_loop(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_ids(config, &mut result);
        Self::validate_sources(config, &mut result);
        Self::validate_run(config, &mut result);

        Ok(result)
    }

    /// Validate and turn the first error into a [`ConfigError::InvalidValue`].
    pub fn ensure_valid(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = Self::validate(config)?;
        if result.errors.is_empty() {
            return Ok(result);
        }
        let first = result.errors.swap_remove(0);
        Err(ConfigError::InvalidValue {
            field: first.path,
            message: first.message,
        })
    }

    fn validate_run_loop(config: &Config, result: &mut ValidationResult) {
        if config.run_loop.name.trim().is_empty() {
            result.add_warning(ValidationWarning::new(
                "run_loop.name",
                "Name is empty, the thread name will be used",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.trim();
        if level.is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        } else if !level.contains('=') && !KNOWN_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!("Unknown log level '{}', valid values: {:?}", level, KNOWN_LEVELS),
            ));
        }

        if let Some(dir) = &config.logging.log_dir {
            if dir.exists() && !dir.is_dir() {
                result.add_error(ValidationError::new(
                    "logging.log_dir",
                    format!("Log path is not a directory: {:?}", dir),
                ));
            }
        }
    }

    fn validate_ids(config: &Config, result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        let ids = config
            .timers
            .iter()
            .enumerate()
            .map(|(i, t)| (format!("timers[{}].id", i), &t.id))
            .chain(
                config
                    .sources
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (format!("sources[{}].id", i), &s.id)),
            );

        for (path, id) in ids {
            if id.trim().is_empty() {
                result.add_error(ValidationError::new(path, "id cannot be empty"));
            } else if !seen.insert(id.as_str()) {
                result.add_error(ValidationError::new(
                    path,
                    format!("Duplicate id '{}'", id),
                ));
            }
        }

        if config.timers.is_empty() && config.sources.is_empty() {
            result.add_warning(ValidationWarning::new(
                "timers",
                "No timers or sources configured, the loop will only wait",
            ));
        }
    }

    fn validate_sources(config: &Config, result: &mut ValidationResult) {
        for (i, source) in config.sources.iter().enumerate() {
            if source.signal_every_ms == 0 {
                result.add_error(ValidationError::new(
                    format!("sources[{}].signal_every_ms", i),
                    "signal_every_ms must be greater than 0",
                ));
            }
        }
    }

    fn validate_run(config: &Config, result: &mut ValidationResult) {
        if config.run.duration_ms == 0 {
            result.add_error(ValidationError::new(
                "run.duration_ms",
                "duration_ms must be greater than 0",
            ));
            return;
        }

        for (i, timer) in config.timers.iter().enumerate() {
            if timer.delay_ms > config.run.duration_ms {
                result.add_warning(ValidationWarning::new(
                    format!("timers[{}].delay_ms", i),
                    format!(
                        "Timer '{}' starts after the run ends ({}ms > {}ms)",
                        timer.id, timer.delay_ms, config.run.duration_ms
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
