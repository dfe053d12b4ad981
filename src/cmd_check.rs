//! `looper check`: load and validate the configuration.

use looper_config::{Config, ConfigValidator, ValidationResult};

pub(crate) fn handle_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config)?;
    println!("{}", render(config, &result));

    if !result.is_valid() {
        return Err(format!("{} configuration error(s)", result.errors.len()).into());
    }
    Ok(())
}

/// Human-readable summary of a validation pass.
fn render(config: &Config, result: &ValidationResult) -> String {
    let mut out = format!(
        "Run loop '{}': {} timer(s), {} source(s), {}ms run",
        config.run_loop.name,
        config.timers.len(),
        config.sources.len(),
        config.run.duration_ms
    );
    for error in &result.errors {
        out.push_str(&format!("\nerror: {}: {}", error.path, error.message));
    }
    for warning in &result.warnings {
        out.push_str(&format!("\nwarning: {}: {}", warning.path, warning.message));
    }
    if result.is_valid() {
        out.push_str("\nConfiguration OK");
    }
    out
}
