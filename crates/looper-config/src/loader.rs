//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: Config = toml::from_str(&expanded)?;
        if let Some(dir) = config.logging.log_dir.take() {
            config.logging.log_dir = Some(PathBuf::from(Self::expand_path(&dir.to_string_lossy())));
        }
        Ok(config)
    }

    /// Load from `path` if given, else from the default location.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Config::default_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.local/state`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.run_loop.name, "main");
        assert_eq!(config.run.duration_ms, 1000);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [run_loop]
            name = "worker"
            metrics_enabled = false
            trace_phases = true

            [logging]
            level = "debug"

            [[timers]]
            id = "heartbeat"
            delay_ms = 10
            interval_ms = 100

            [[timers]]
            id = "once"
            delay_ms = 500

            [[sources]]
            id = "ping"
            signal_every_ms = 25

            [run]
            duration_ms = 2000
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.run_loop.name, "worker");
        assert!(!config.run_loop.metrics_enabled);
        assert!(config.run_loop.trace_phases);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.timers.len(), 2);
        assert_eq!(config.timers[0].interval_ms, 100);
        assert_eq!(config.timers[1].interval_ms, 0);
        assert_eq!(config.sources[0].signal_every_ms, 25);
        assert_eq!(config.run.duration_ms, 2000);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[run]").unwrap();
        writeln!(file, "duration_ms = 5000").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.run.duration_ms, 5000);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_explicit_missing() {
        let result = ConfigLoader::load_or_default(Some(Path::new("/nonexistent/looper.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_log_dir_tilde_expanded() {
        let content = r#"
            [logging]
            log_dir = "~/looper-logs"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        let dir = config.logging.log_dir.unwrap();
        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(dir.ends_with("looper-logs"));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("LOOPER_TEST_LOOP_NAME", "from-env");
        }
        let content = r#"
            [run_loop]
            name = "${LOOPER_TEST_LOOP_NAME}"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.run_loop.name, "from-env");
        unsafe {
            std::env::remove_var("LOOPER_TEST_LOOP_NAME");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_TEST_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }

    #[test]
    fn test_expand_path_no_tilde() {
        let path = "/usr/local/bin";
        assert_eq!(ConfigLoader::expand_path(path), path);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/test");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/test"));
    }
}
