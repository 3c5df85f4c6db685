//! `watchtower -t <target>`: run an assessment.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use watchtower_agent::{Orchestrator, build_engines};
use watchtower_config::{AppConfig, CliOverrides};
use watchtower_core::error::ToolError;
use watchtower_core::event::{EventBus, RunEvent};
use watchtower_core::state::RunState;
use watchtower_memory::SqliteStore;
use watchtower_security::check_target;
use watchtower_tools::{AdapterRegistry, default_runner, installed_tools};

pub struct RunArgs {
    pub target: String,
    pub tools: Vec<String>,
    pub skip_ask_tools: bool,
    pub overrides: CliOverrides,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    config.apply_cli_overrides(args.overrides);
    config.validate()?;

    check_target(&args.target)?;

    let registry = AdapterRegistry::builtin();
    let tools = select_tools(&registry, &args.tools, args.skip_ask_tools)?;
    if tools.is_empty() {
        return Err("No tools available. Install some or pass --skip-ask-tools.".into());
    }
    info!(tools = %tools.join(", "), "Permitted tools");

    let store = Arc::new(SqliteStore::new(&config.database_path).await?);
    let engines = build_engines(&config.engine_selection(|k| std::env::var(k).ok()), &config);
    let runner = Arc::new(default_runner(config.run.tool_timeout_secs));
    let event_bus = Arc::new(EventBus::default());
    let reporter = spawn_reporter(&event_bus);

    let state = RunState::new(vec![args.target.clone()], tools, config.auth.clone());
    let orchestrator = Orchestrator::new(
        state,
        engines.decision,
        engines.extraction,
        runner,
        event_bus,
    )
    .with_store(store.clone())
    .with_max_cycles(config.run.max_cycles)
    .with_recent_observations(config.run.recent_observations)
    .with_engine_timeout(Duration::from_secs(config.run.engine_timeout_secs));

    let outcome = orchestrator.run().await;
    if let Err(e) = reporter.await {
        warn!(error = %e, "Progress reporter stopped abnormally");
    }
    store.close().await;

    println!();
    println!("  Assessment of {} complete", args.target);
    println!("  Cycles:        {}{}", outcome.cycles, if outcome.forced_stop { " (ceiling reached)" } else { "" });
    println!("  Observations:  {}", outcome.state.observations().len());
    println!("  Findings:      {}", outcome.state.findings().len());
    println!("  Database:      {}", config.database_path);
    println!();
    println!("  Write a report with: watchtower --report <file>");
    println!();

    Ok(())
}

/// Decide which tools the run may use.
///
/// An explicit list is validated against the registry. `skip_ask` permits
/// every declared tool. Otherwise only tools found on `PATH` are used.
fn select_tools(
    registry: &AdapterRegistry,
    requested: &[String],
    skip_ask: bool,
) -> Result<Vec<String>, ToolError> {
    if !requested.is_empty() {
        registry.validate(requested)?;
        return Ok(requested.to_vec());
    }
    if skip_ask {
        return Ok(registry.names().into_iter().map(String::from).collect());
    }

    let (installed, missing) = installed_tools(registry);
    if !missing.is_empty() {
        warn!(missing = %missing.join(", "), "Skipping tools that are not installed");
    }
    Ok(installed.into_iter().map(String::from).collect())
}

/// Log progress events until the run finishes.
///
/// The orchestrator already logs one `info` line per cycle, so these stay at
/// `debug`.
fn spawn_reporter(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    RunEvent::ToolExecuted { tool_name, output_chars, duration_ms, .. } => {
                        debug!(tool = %tool_name, chars = output_chars, ms = duration_ms, "Tool finished");
                    }
                    RunEvent::FindingsExtracted { tool_name, count, .. } => {
                        debug!(tool = %tool_name, count, "Findings extracted");
                    }
                    RunEvent::CycleCompleted { cycle, next_step, new_observations, new_findings, .. } => {
                        debug!(
                            cycle,
                            next = %next_step,
                            observations = new_observations,
                            findings = new_findings,
                            "State updated"
                        );
                    }
                    RunEvent::RunFinished { .. } => break,
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Progress reporter fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn explicit_tools_are_validated() {
        let registry = AdapterRegistry::builtin();
        let tools = select_tools(&registry, &["nmap".into(), "httpx".into()], false).unwrap();
        assert_eq!(tools, vec!["nmap", "httpx"]);

        let err = select_tools(&registry, &["not-a-tool".into()], true).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn skip_ask_permits_every_declared_tool() {
        let registry = AdapterRegistry::builtin();
        let tools = select_tools(&registry, &[], true).unwrap();
        assert_eq!(tools.len(), registry.names().len());
        assert_eq!(tools[0], registry.names()[0]);
    }

    #[tokio::test]
    async fn reporter_stops_on_run_finished() {
        let bus = EventBus::default();
        let reporter = spawn_reporter(&bus);
        bus.publish(RunEvent::FindingsExtracted {
            tool_name: "nmap".into(),
            count: 1,
            timestamp: Utc::now(),
        });
        bus.publish(RunEvent::RunFinished {
            cycles: 1,
            forced_stop: false,
            total_observations: 1,
            total_findings: 1,
            timestamp: Utc::now(),
        });
        reporter.await.unwrap();
    }

    #[tokio::test]
    async fn invalid_target_is_returned_not_printed() {
        let err = run(RunArgs {
            target: "not a target!!".into(),
            tools: vec!["nmap".into()],
            skip_ask_tools: false,
            overrides: CliOverrides::default(),
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not a target!!"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn reporter_stays_quiet_at_info() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let bus = EventBus::default();
        let reporter = spawn_reporter(&bus);
        bus.publish(RunEvent::ToolExecuted {
            tool_name: "nmap".into(),
            target: "example.com".into(),
            output_chars: 42,
            duration_ms: 7,
            timestamp: Utc::now(),
        });
        bus.publish(RunEvent::CycleCompleted {
            cycle: 1,
            plan: "Scan".into(),
            next_step: "nmap".into(),
            new_observations: 1,
            new_findings: 0,
            timestamp: Utc::now(),
        });
        bus.publish(RunEvent::RunFinished {
            cycles: 1,
            forced_stop: false,
            total_observations: 1,
            total_findings: 0,
            timestamp: Utc::now(),
        });
        reporter.await.unwrap();

        assert!(captured.0.lock().unwrap().is_empty());
    }
}
