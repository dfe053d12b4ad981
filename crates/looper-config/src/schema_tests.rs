use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.run_loop.name, "main");
    assert!(config.run_loop.metrics_enabled);
    assert!(!config.run_loop.trace_phases);
    assert!(config.timers.is_empty());
    assert!(config.sources.is_empty());
    assert_eq!(config.run.duration_ms, 1000);
}

#[test]
fn test_logging_config_default() {
    let logging = LoggingConfig::default();
    assert_eq!(logging.level, "info");
    assert!(logging.log_dir.is_none());
}

#[test]
fn test_default_path() {
    let path = Config::default_path();
    assert!(path.ends_with("looper/config.toml"));
}

#[test]
fn test_durations() {
    let timer = TimerConfig {
        id: "tick".to_string(),
        delay_ms: 250,
        interval_ms: 100,
    };
    assert_eq!(timer.delay(), Duration::from_millis(250));
    assert_eq!(timer.interval(), Duration::from_millis(100));

    let source = SourceConfig {
        id: "ping".to_string(),
        signal_every_ms: 40,
    };
    assert_eq!(source.signal_period(), Duration::from_millis(40));
    assert_eq!(RunConfig::default().duration(), Duration::from_secs(1));
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"main\""));
    assert!(json.contains("1000"));
    assert!(!json.contains("log_dir"));
}

#[test]
fn test_timer_defaults_from_toml() {
    let config: Config = toml::from_str(
        r#"
            [[timers]]
            id = "once"
        "#,
    )
    .unwrap();
    assert_eq!(config.timers.len(), 1);
    assert_eq!(config.timers[0].delay_ms, 0);
    assert_eq!(config.timers[0].interval_ms, 0);
}

#[test]
fn test_source_requires_period() {
    let result: Result<Config, _> = toml::from_str(
        r#"
            [[sources]]
            id = "ping"
        "#,
    );
    assert!(result.is_err());
}
