//! End-to-end tests of the assessment loop through the public API.
//!
//! These wire the real orchestrator to a durable SQLite store and small
//! in-file doubles for the engines and the tool runner.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use watchtower_agent::{OfflineEngine, Orchestrator};
use watchtower_core::engine::{DecisionEngine, DecisionRequest, ExtractionEngine, Plan};
use watchtower_core::error::EngineError;
use watchtower_core::event::EventBus;
use watchtower_core::memory::FindingStore;
use watchtower_core::state::{AuthMetadata, Finding, NextStep, Observation, RunState, Severity};
use watchtower_core::tool::ToolRunner;
use watchtower_memory::SqliteStore;

/// Replays a list of plans, then keeps returning the last one.
struct Script {
    plans: Vec<Plan>,
    calls: Mutex<usize>,
    seen: Mutex<Vec<DecisionRequest>>,
}

impl Script {
    fn new(plans: Vec<Plan>) -> Self {
        Self {
            plans,
            calls: Mutex::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl DecisionEngine for Script {
    fn name(&self) -> &str {
        "script"
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<Plan, EngineError> {
        self.seen.lock().unwrap().push(request.clone());
        let mut calls = self.calls.lock().unwrap();
        let plan = self.plans[(*calls).min(self.plans.len() - 1)].clone();
        *calls += 1;
        Ok(plan)
    }
}

#[async_trait]
impl ExtractionEngine for Script {
    fn name(&self) -> &str {
        "script"
    }

    async fn extract(&self, observation: &Observation) -> Result<Vec<Finding>, EngineError> {
        if observation.output.contains("23/tcp open") {
            Ok(vec![Finding {
                title: "Telnet service exposed".into(),
                severity: Severity::High,
                description: "Cleartext remote shell reachable".into(),
                evidence: "23/tcp open telnet".into(),
                target: observation.target.clone(),
            }])
        } else {
            Ok(Vec::new())
        }
    }
}

/// Canned tool output keyed by tool name.
struct Canned(Vec<(&'static str, &'static str)>);

#[async_trait]
impl ToolRunner for Canned {
    fn knows(&self, tool: &str) -> bool {
        self.0.iter().any(|(name, _)| *name == tool)
    }

    async fn run(&self, tool: &str, _target: &str, _auth: &AuthMetadata) -> String {
        self.0
            .iter()
            .find(|(name, _)| *name == tool)
            .map(|(_, out)| out.to_string())
            .unwrap_or_default()
    }
}

fn plan(text: &str, next: &[&str], finished: bool) -> Plan {
    Plan {
        current_plan: text.into(),
        next_step: NextStep::from_names(next),
        is_finished: finished,
    }
}

fn run_state(tools: &[&str]) -> RunState {
    RunState::new(
        vec!["example.com".into()],
        tools.iter().map(|t| t.to_string()).collect(),
        AuthMetadata::new(),
    )
}

#[tokio::test]
async fn nmap_then_finish_persists_one_observation() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pentest_memory.db");
    let store = Arc::new(SqliteStore::new(db_path.to_str().unwrap()).await.unwrap());
    let script = Arc::new(Script::new(vec![
        plan("Enumerate open ports", &["nmap"], false),
        plan("Nothing else to test", &["finish"], true),
    ]));
    let runner = Arc::new(Canned(vec![("nmap", "22/tcp open ssh\n80/tcp open http")]));

    let outcome = Orchestrator::new(
        run_state(&["nmap"]),
        script.clone(),
        script.clone(),
        runner,
        Arc::new(EventBus::default()),
    )
    .with_store(store.clone())
    .run()
    .await;

    assert_eq!(outcome.cycles, 2);
    assert!(!outcome.forced_stop);
    assert_eq!(outcome.state.observations().len(), 1);
    assert_eq!(outcome.state.observations()[0].tool, "nmap");

    let stored = store.all_observations().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].tool, "nmap");
    assert_eq!(stored[0].target, "example.com");
    store.close().await;

    let reopened = SqliteStore::new(db_path.to_str().unwrap()).await.unwrap();
    assert_eq!(reopened.all_observations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn never_finishing_engine_stops_at_fifteen_cycles() {
    let script = Arc::new(Script::new(vec![plan("Keep scanning", &["nmap"], false)]));
    let runner = Arc::new(Canned(vec![("nmap", "80/tcp open http")]));

    let outcome = Orchestrator::new(
        run_state(&["nmap"]),
        script.clone(),
        script.clone(),
        runner,
        Arc::new(EventBus::default()),
    )
    .run()
    .await;

    assert_eq!(outcome.cycles, 15);
    assert!(outcome.forced_stop);
    assert!(outcome.state.is_finished());
    assert_eq!(script.calls(), 15);
}

#[tokio::test]
async fn observations_accumulate_across_cycles() {
    let script = Arc::new(Script::new(vec![
        plan("Ports", &["nmap"], false),
        plan("Web", &["httpx", "whatweb"], false),
        plan("Idle", &["finish"], false),
        plan("Ports again", &["nmap"], false),
        plan("Done", &["finish"], true),
    ]));
    let runner = Arc::new(Canned(vec![
        ("nmap", "23/tcp open telnet"),
        ("httpx", "https://example.com [200]"),
        ("whatweb", "nginx/1.18.0"),
    ]));

    let orchestrator = Orchestrator::new(
        run_state(&["nmap", "httpx", "whatweb"]),
        script.clone(),
        script.clone(),
        runner,
        Arc::new(EventBus::default()),
    );
    let outcome = orchestrator.run().await;

    // Per-cycle counts 1, 2, 0, 1; each decision saw the running total.
    let totals: Vec<usize> = script
        .seen
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.recent_observations.len())
        .collect();
    assert_eq!(totals, vec![0, 1, 3, 3, 3]);
    assert_eq!(outcome.state.observations().len(), 4);
    // nmap ran twice and each run yielded a telnet finding.
    assert_eq!(outcome.state.findings().len(), 2);
    assert_eq!(outcome.cycles, 5);
}

#[tokio::test]
async fn proposals_outside_the_permitted_set_never_run() {
    let script = Arc::new(Script::new(vec![
        plan("Go loud", &["sqlmap"], false),
        plan("Done", &["finish"], true),
    ]));
    let runner = Arc::new(Canned(vec![("nmap", "x"), ("sqlmap", "injected!")]));
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());

    let outcome = Orchestrator::new(
        run_state(&["nmap"]),
        script.clone(),
        script,
        runner,
        Arc::new(EventBus::default()),
    )
    .with_store(store.clone())
    .run()
    .await;

    assert_eq!(outcome.cycles, 2);
    assert!(outcome.state.observations().is_empty());
    assert!(store.all_observations().await.unwrap().is_empty());
}

#[tokio::test]
async fn offline_engine_sweeps_every_permitted_tool() {
    let engine = Arc::new(OfflineEngine::new());
    let runner = Arc::new(Canned(vec![
        ("nmap", "a"),
        ("httpx", "b"),
        ("nuclei", "c"),
        ("nikto", "d"),
    ]));

    let outcome = Orchestrator::new(
        run_state(&["nmap", "httpx", "nuclei", "nikto"]),
        engine.clone(),
        engine,
        runner,
        Arc::new(EventBus::default()),
    )
    .run()
    .await;

    let tools: Vec<_> = outcome.state.observations().iter().map(|o| o.tool.as_str()).collect();
    assert_eq!(tools, vec!["nmap", "httpx", "nuclei", "nikto"]);
    assert_eq!(outcome.cycles, 5);
    assert!(!outcome.forced_stop);
    assert!(outcome.state.findings().is_empty());
}
