//! Shared test doubles for the orchestration loop.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use watchtower_core::engine::{DecisionEngine, DecisionRequest, ExtractionEngine, Plan};
use watchtower_core::error::{EngineError, MemoryError};
use watchtower_core::memory::{FindingStore, StoredFinding, StoredObservation};
use watchtower_core::state::{AuthMetadata, Finding, NextStep, Observation, Severity};
use watchtower_core::tool::ToolRunner;

/// Build a plan from tool names (`"finish"` included).
pub fn plan(text: &str, next: &[&str], finished: bool) -> Plan {
    Plan {
        current_plan: text.into(),
        next_step: NextStep::from_names(next),
        is_finished: finished,
    }
}

/// A finding with an empty target (the orchestrator fills it in).
pub fn finding(title: &str, severity: Severity) -> Finding {
    Finding {
        title: title.into(),
        severity,
        description: format!("{title} detected"),
        evidence: "line 1".into(),
        target: String::new(),
    }
}

/// A decision + extraction engine that replays scripted answers.
///
/// Decisions come from a queue; once it is empty the `fallback` plan is
/// returned, or a terminating plan when there is none. Extractions come from
/// their own queue and default to no findings.
pub struct ScriptedEngine {
    decisions: Mutex<VecDeque<Result<Plan, EngineError>>>,
    fallback: Option<Plan>,
    extractions: Mutex<VecDeque<Result<Vec<Finding>, EngineError>>>,
    decide_calls: Mutex<usize>,
    extracted: Mutex<Vec<Observation>>,
}

impl ScriptedEngine {
    pub fn new(decisions: Vec<Result<Plan, EngineError>>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into()),
            fallback: None,
            extractions: Mutex::new(VecDeque::new()),
            decide_calls: Mutex::new(0),
            extracted: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `plan`.
    pub fn endless(plan: Plan) -> Self {
        Self {
            fallback: Some(plan),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_extractions(self, extractions: Vec<Result<Vec<Finding>, EngineError>>) -> Self {
        *self.extractions.lock().unwrap() = extractions.into();
        self
    }

    pub fn decide_calls(&self) -> usize {
        *self.decide_calls.lock().unwrap()
    }

    /// Tool names of every observation sent to `extract`, in order.
    pub fn extracted_tools(&self) -> Vec<String> {
        self.extracted.lock().unwrap().iter().map(|o| o.tool.clone()).collect()
    }
}

#[async_trait]
impl DecisionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, _request: &DecisionRequest) -> Result<Plan, EngineError> {
        *self.decide_calls.lock().unwrap() += 1;
        match self.decisions.lock().unwrap().pop_front() {
            Some(next) => next,
            None => Ok(self
                .fallback
                .clone()
                .unwrap_or_else(|| plan("script exhausted", &["finish"], true))),
        }
    }
}

#[async_trait]
impl ExtractionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, observation: &Observation) -> Result<Vec<Finding>, EngineError> {
        self.extracted.lock().unwrap().push(observation.clone());
        self.extractions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// A tool runner that records calls instead of spawning processes.
pub struct FakeRunner {
    known: Vec<String>,
    delays: HashMap<String, Duration>,
    outputs: HashMap<String, String>,
    calls: Mutex<Vec<(String, String, AuthMetadata)>>,
}

impl FakeRunner {
    pub fn new(known: &[&str]) -> Self {
        Self {
            known: known.iter().map(|t| t.to_string()).collect(),
            delays: HashMap::new(),
            outputs: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `tool` take `delay` before answering.
    pub fn with_delay(mut self, tool: &str, delay: Duration) -> Self {
        self.delays.insert(tool.into(), delay);
        self
    }

    /// Make `tool` answer with `output` instead of the default text.
    pub fn with_output(mut self, tool: &str, output: &str) -> Self {
        self.outputs.insert(tool.into(), output.into());
        self
    }

    /// Tool names in the order runs started.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
    }

    pub fn auth_seen(&self) -> Vec<AuthMetadata> {
        self.calls.lock().unwrap().iter().map(|(_, _, a)| a.clone()).collect()
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    fn knows(&self, tool: &str) -> bool {
        self.known.iter().any(|t| t == tool)
    }

    async fn run(&self, tool: &str, target: &str, auth: &AuthMetadata) -> String {
        self.calls
            .lock()
            .unwrap()
            .push((tool.to_string(), target.to_string(), auth.clone()));
        if let Some(delay) = self.delays.get(tool) {
            tokio::time::sleep(*delay).await;
        }
        match self.outputs.get(tool) {
            Some(output) => output.clone(),
            None => format!("{tool} output for {target}"),
        }
    }
}

/// An engine that never answers within any reasonable timeout.
pub struct HangingEngine;

impl HangingEngine {
    const STALL: Duration = Duration::from_secs(3600);
}

#[async_trait]
impl DecisionEngine for HangingEngine {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn decide(&self, _request: &DecisionRequest) -> Result<Plan, EngineError> {
        tokio::time::sleep(Self::STALL).await;
        Ok(plan("too late", &["nmap"], false))
    }
}

#[async_trait]
impl ExtractionEngine for HangingEngine {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn extract(&self, _observation: &Observation) -> Result<Vec<Finding>, EngineError> {
        tokio::time::sleep(Self::STALL).await;
        Ok(vec![finding("too late", Severity::High)])
    }
}

/// A store whose writes always fail; counts the attempts.
#[derive(Default)]
pub struct BrokenStore {
    attempts: Mutex<usize>,
}

impl BrokenStore {
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    fn fail(&self) -> MemoryError {
        *self.attempts.lock().unwrap() += 1;
        MemoryError::Storage("disk I/O error".into())
    }
}

#[async_trait]
impl FindingStore for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn record_observation(&self, _target: &str, _tool: &str, _output: &str) -> Result<i64, MemoryError> {
        Err(self.fail())
    }

    async fn record_finding(
        &self,
        _target: &str,
        _title: &str,
        _details: &serde_json::Value,
    ) -> Result<i64, MemoryError> {
        Err(self.fail())
    }

    async fn all_observations(&self) -> Result<Vec<StoredObservation>, MemoryError> {
        Ok(Vec::new())
    }

    async fn all_findings(&self) -> Result<Vec<StoredFinding>, MemoryError> {
        Ok(Vec::new())
    }
}
