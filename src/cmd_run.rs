//! `looper run`: drive the configured timers and sources on the main
//! thread's run loop.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use looper_config::{Config, ConfigValidator};
use looper_runloop::{
    registry, EventSource, LoggingObserver, MetricsObserver, MetricsSnapshot, Observer, RunLoop,
    RunLoopConfig, Timer, TimerBuilder,
};

/// JSON report printed when the run ends.
#[derive(Debug, Serialize)]
pub(crate) struct RunReport {
    pub run_loop: String,
    pub duration_ms: u64,
    pub metrics: MetricsSnapshot,
    pub phases: BTreeMap<String, u64>,
    pub timers: Vec<EntityReport>,
    pub sources: Vec<EntityReport>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EntityReport {
    pub id: String,
    pub fire_count: u64,
}

/// Map the `[run_loop]` section onto the engine config.
pub(crate) fn run_loop_config(config: &Config) -> RunLoopConfig {
    RunLoopConfig {
        name: config.run_loop.name.clone(),
        metrics_enabled: config.run_loop.metrics_enabled,
        trace_phases: config.run_loop.trace_phases,
    }
}

pub(crate) fn handle_run(
    config: &Config,
    duration_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let validation = ConfigValidator::ensure_valid(config)?;
    for warning in &validation.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }

    let duration = Duration::from_millis(duration_ms.unwrap_or(config.run.duration_ms));
    let report = execute(config, duration)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Build the loop, run it for `duration` and collect the report.
pub(crate) fn execute(
    config: &Config,
    duration: Duration,
) -> Result<RunReport, Box<dyn std::error::Error>> {
    registry::set_default_config(run_loop_config(config));
    let run_loop = RunLoop::current();

    let phases = Arc::new(MetricsObserver::new());
    run_loop.add_observer(&Observer::from_handler("phase-counts", phases.clone()))?;
    if config.run_loop.trace_phases {
        let logging = Arc::new(LoggingObserver::new(run_loop.name()));
        run_loop.add_observer(&Observer::from_handler("phase-log", logging))?;
    }

    let mut timers = Vec::with_capacity(config.timers.len());
    for timer_config in &config.timers {
        let timer = TimerBuilder::new()
            .id(timer_config.id.clone())
            .delay(timer_config.delay())
            .interval(timer_config.interval())
            .build(|timer| {
                debug!(timer = %timer.id(), count = timer.fire_count(), "Timer fired");
            });
        run_loop.add_timer(&timer)?;
        timers.push(timer);
    }

    let mut sources = Vec::with_capacity(config.sources.len());
    let mut signalers = Vec::with_capacity(config.sources.len());
    for source_config in &config.sources {
        let source = EventSource::with_id(source_config.id.clone(), |source| {
            debug!(source = %source.id(), count = source.fire_count(), "Source fired");
        });
        run_loop.add_event_source(&source)?;
        signalers.push(spawn_signaler(source.clone(), source_config.signal_period())?);
        sources.push(source);
    }

    let stopper = {
        let run_loop = run_loop.clone();
        thread::Builder::new()
            .name("looper-stopper".to_string())
            .spawn(move || {
                thread::sleep(duration);
                run_loop.stop();
            })?
    };

    info!(
        run_loop = %run_loop.name(),
        timers = timers.len(),
        sources = sources.len(),
        "Running for {:?}",
        duration
    );
    run_loop.run()?;

    for signaler in signalers {
        signaler.stop();
    }
    if stopper.join().is_err() {
        warn!("Stopper thread panicked");
    }
    for timer in &timers {
        run_loop.remove_timer(timer);
    }
    for source in &sources {
        run_loop.remove_event_source(source);
    }

    Ok(RunReport {
        run_loop: run_loop.name().to_string(),
        duration_ms: duration.as_millis() as u64,
        metrics: run_loop.metrics().snapshot(),
        phases: phases
            .counts()
            .into_iter()
            .map(|(phase, count)| (phase.to_string(), count))
            .collect(),
        timers: timers.iter().map(|t| report(t.id(), t.fire_count())).collect(),
        sources: sources.iter().map(|s| report(s.id(), s.fire_count())).collect(),
    })
}

fn report(id: &str, fire_count: u64) -> EntityReport {
    EntityReport {
        id: id.to_string(),
        fire_count,
    }
}

/// Helper thread that signals a source every period until stopped.
struct Signaler {
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

impl Signaler {
    fn stop(self) {
        drop(self.shutdown);
        if self.handle.join().is_err() {
            warn!("Signaler thread panicked");
        }
    }
}

fn spawn_signaler(source: Arc<EventSource>, period: Duration) -> std::io::Result<Signaler> {
    let (shutdown, rx) = mpsc::channel::<()>();
    let handle = thread::Builder::new()
        .name(format!("signal-{}", source.id()))
        .spawn(move || {
            loop {
                match rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => source.signal(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })?;
    Ok(Signaler { shutdown, handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use looper_config::{ConfigLoader, RunLoopSection};

    #[test]
    fn test_run_loop_config_mapping() {
        let mut config = Config::default();
        config.run_loop = RunLoopSection {
            name: "mapped".to_string(),
            metrics_enabled: false,
            trace_phases: true,
        };

        let mapped = run_loop_config(&config);
        assert_eq!(mapped.name, "mapped");
        assert!(!mapped.metrics_enabled);
        assert!(mapped.trace_phases);
    }

    #[test]
    fn test_execute_reports_firings() {
        let config = ConfigLoader::load_str(
            r#"
                [run_loop]
                name = "cli-test"

                [[timers]]
                id = "tick"
                delay_ms = 10
                interval_ms = 20

                [[timers]]
                id = "once"
                delay_ms = 5

                [[sources]]
                id = "ping"
                signal_every_ms = 15
            "#,
        )
        .unwrap();

        let report = execute(&config, Duration::from_millis(200)).unwrap();

        assert_eq!(report.run_loop, "cli-test");
        assert_eq!(report.timers.len(), 2);
        let tick = &report.timers[0];
        assert!(tick.fire_count >= 5, "tick fired {} times", tick.fire_count);
        assert_eq!(report.timers[1].fire_count, 1);
        assert!(report.sources[0].fire_count >= 3);
        assert!(report.metrics.timers_fired >= 6);
        assert_eq!(report.phases.len(), 6);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["timers"][0]["id"], "tick");
    }
}
