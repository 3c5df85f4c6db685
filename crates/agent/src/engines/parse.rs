//! Parsing of LLM replies into plans and findings.
//!
//! Models wrap JSON in prose or Markdown fences more often than not, so the
//! first complete JSON object anywhere in the reply is used. Anything that
//! does not yield the expected shape is a `MalformedResponse`.

use serde::Deserialize;
use serde_json::Value;
use watchtower_core::engine::Plan;
use watchtower_core::error::EngineError;
use watchtower_core::state::{Finding, NextStep, Observation, Severity};

/// The first JSON object embedded in `text`.
pub fn first_json_object(text: &str) -> Option<Value> {
    text.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()
            .and_then(Result::ok)
            .filter(Value::is_object)
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawStep {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    current_plan: String,
    next_step: Option<RawStep>,
    #[serde(default)]
    is_finished: bool,
}

#[derive(Debug, Deserialize)]
struct RawFindings {
    #[serde(default)]
    findings: Vec<RawFinding>,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    title: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    evidence: Value,
}

fn object_in(reply: &str) -> Result<Value, EngineError> {
    first_json_object(reply).ok_or_else(|| {
        EngineError::MalformedResponse(format!("no JSON object in reply: {}", preview(reply)))
    })
}

fn preview(reply: &str) -> String {
    let mut short: String = reply.chars().take(200).collect();
    if reply.chars().count() > 200 {
        short.push_str("...");
    }
    short
}

/// Parse a decision reply: `{current_plan, next_step, is_finished}`.
///
/// `next_step` may be one name or a list of names.
pub fn parse_plan(reply: &str) -> Result<Plan, EngineError> {
    let raw: RawPlan = serde_json::from_value(object_in(reply)?)
        .map_err(|e| EngineError::MalformedResponse(format!("plan: {e}")))?;

    let next_step = match raw.next_step {
        Some(RawStep::One(name)) => NextStep::from_names([name]),
        Some(RawStep::Many(names)) => NextStep::from_names(names),
        None if raw.is_finished => NextStep::Finish,
        None => NextStep::default(),
    };

    Ok(Plan {
        current_plan: raw.current_plan,
        next_step,
        is_finished: raw.is_finished,
    })
}

/// Parse an extraction reply: `{findings: [{title, severity, description, evidence}]}`.
///
/// Findings are attributed to the observation's target. Unknown severities
/// become `Info`.
pub fn parse_findings(reply: &str, observation: &Observation) -> Result<Vec<Finding>, EngineError> {
    let raw: RawFindings = serde_json::from_value(object_in(reply)?)
        .map_err(|e| EngineError::MalformedResponse(format!("findings: {e}")))?;

    Ok(raw
        .findings
        .into_iter()
        .filter(|f| !f.title.trim().is_empty())
        .map(|f| Finding {
            title: f.title.trim().to_string(),
            severity: Severity::parse_lenient(&f.severity),
            description: f.description,
            evidence: match f.evidence {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            },
            target: observation.target.clone(),
        })
        .collect())
}
