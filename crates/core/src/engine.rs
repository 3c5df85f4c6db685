//! Decision and extraction engines: the opaque reasoning capability.
//!
//! The orchestrator only sees these two traits. Concrete variants (LLM-backed,
//! offline, scripted for tests) are chosen by configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::state::{Finding, NextStep, Observation, RunState};

/// Read-only view of the run handed to the decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Every finding confirmed so far
    pub findings: Vec<Finding>,

    /// The most recent observations, oldest first
    pub recent_observations: Vec<Observation>,

    /// The permitted tool vocabulary (`finish` is always implied)
    pub available_tools: Vec<String>,
}

impl DecisionRequest {
    /// Snapshot the parts of `state` a decision may depend on.
    pub fn from_state(state: &RunState, recent: usize) -> Self {
        Self {
            findings: state.findings().to_vec(),
            recent_observations: state.recent_observations(recent).to_vec(),
            available_tools: state.available_tools().to_vec(),
        }
    }
}

/// The engine's answer to "what next?".
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub current_plan: String,
    pub next_step: NextStep,
    pub is_finished: bool,
}

impl Plan {
    /// The safe default used whenever a decision cannot be obtained.
    pub fn terminate(reason: impl std::fmt::Display) -> Self {
        Self {
            current_plan: format!("Error: {reason}"),
            next_step: NextStep::Finish,
            is_finished: true,
        }
    }
}

/// Proposes the next action(s) from accumulated state.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    /// A short name for logs (e.g., "llm", "offline").
    fn name(&self) -> &str;

    async fn decide(&self, request: &DecisionRequest) -> std::result::Result<Plan, EngineError>;
}

/// Turns one raw observation into zero or more confirmed findings.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, observation: &Observation) -> std::result::Result<Vec<Finding>, EngineError>;
}
