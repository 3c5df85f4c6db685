//! LLM-backed decision and extraction engine.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use watchtower_core::engine::{DecisionEngine, DecisionRequest, ExtractionEngine, Plan};
use watchtower_core::error::EngineError;
use watchtower_core::message::Message;
use watchtower_core::provider::{Provider, ProviderRequest};
use watchtower_core::state::{Finding, Observation};

use super::parse::{parse_findings, parse_plan};
use super::prompt::{ANALYST_SYSTEM, PLANNER_SYSTEM, decision_prompt, extraction_prompt};

/// Asks a [`Provider`] for plans and findings.
pub struct LlmEngine {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmEngine {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    async fn ask(&self, system: &str, prompt: String) -> Result<String, EngineError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(system), Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                provider = %self.provider.name(),
                model = %response.model,
                tokens = usage.total_tokens,
                "LLM reply received"
            );
        }
        Ok(response.message.content)
    }
}

#[async_trait]
impl DecisionEngine for LlmEngine {
    fn name(&self) -> &str {
        "llm"
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<Plan, EngineError> {
        let reply = self.ask(PLANNER_SYSTEM, decision_prompt(request)).await?;
        parse_plan(&reply)
    }
}

#[async_trait]
impl ExtractionEngine for LlmEngine {
    fn name(&self) -> &str {
        "llm"
    }

    async fn extract(&self, observation: &Observation) -> Result<Vec<Finding>, EngineError> {
        let reply = self.ask(ANALYST_SYSTEM, extraction_prompt(observation)).await?;
        parse_findings(&reply, observation)
    }
}
