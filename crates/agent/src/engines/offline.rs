//! Deterministic engine used when no LLM backend is configured.
//!
//! Walks the permitted tools in declaration order, proposing each one that has
//! not been run yet, and finishes once every tool has an observation. It never
//! reports findings.

use std::sync::Mutex;

use async_trait::async_trait;
use watchtower_core::engine::{DecisionEngine, DecisionRequest, ExtractionEngine, Plan};
use watchtower_core::error::EngineError;
use watchtower_core::state::{Finding, NextStep, Observation};

#[derive(Default)]
pub struct OfflineEngine {
    /// Tools already proposed; the request only carries recent observations.
    proposed: Mutex<Vec<String>>,
}

impl OfflineEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DecisionEngine for OfflineEngine {
    fn name(&self) -> &str {
        "offline"
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<Plan, EngineError> {
        let mut proposed = self
            .proposed
            .lock()
            .map_err(|_| EngineError::MalformedResponse("offline engine state poisoned".into()))?;

        for obs in &request.recent_observations {
            if !proposed.contains(&obs.tool) {
                proposed.push(obs.tool.clone());
            }
        }

        let next = request
            .available_tools
            .iter()
            .find(|tool| !proposed.contains(tool))
            .cloned();

        Ok(match next {
            Some(tool) => {
                proposed.push(tool.clone());
                Plan {
                    current_plan: format!("Offline sweep: run {tool}"),
                    next_step: NextStep::Tools(vec![tool]),
                    is_finished: false,
                }
            }
            None => Plan {
                current_plan: "Offline sweep complete: every permitted tool has run".into(),
                next_step: NextStep::Finish,
                is_finished: true,
            },
        })
    }
}

#[async_trait]
impl ExtractionEngine for OfflineEngine {
    fn name(&self) -> &str {
        "offline"
    }

    async fn extract(&self, _observation: &Observation) -> Result<Vec<Finding>, EngineError> {
        Ok(Vec::new())
    }
}
