//! Run state: the accumulating record of one assessment run.
//!
//! The orchestrator owns exactly one [`RunState`] per run. Stages never mutate
//! it directly: each stage returns a [`StateDelta`] and [`RunState::merge`]
//! applies it with field-specific rules:
//!
//! | Field | Rule |
//! |---|---|
//! | `messages`, `findings`, `observations` | concatenate (never replaced) |
//! | `current_plan`, `next_step` | replace when present in the delta |
//! | `is_finished` | logical OR (monotonic, never reset) |
//! | `scope_targets`, `available_tools`, `auth_metadata` | fixed at construction |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Header/cookie name → value, supplied once at run start.
///
/// Ordered so that injected command-line flags are deterministic.
pub type AuthMetadata = BTreeMap<String, String>;

/// The sentinel tool name a decision engine uses to end the run.
pub const FINISH: &str = "finish";

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Info => "Info",
        }
    }

    /// Parse leniently: case-insensitive, common aliases, anything else is `Info`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Severity::Info)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" | "moderate" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" | "informational" | "information" => Ok(Severity::Info),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (truncated) result of one tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub target: String,
    pub tool: String,
    pub output: String,
}

impl Observation {
    pub fn new(target: impl Into<String>, tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            tool: tool.into(),
            output: output.into(),
        }
    }
}

/// A confirmed, structured security issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub severity: Severity,
    pub description: String,
    pub evidence: String,
    pub target: String,
}

/// What the decision engine wants to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Run these tools (possibly none).
    Tools(Vec<String>),
    /// The `finish` sentinel.
    Finish,
}

impl NextStep {
    /// Build a step from raw proposed names.
    ///
    /// Blank names are ignored and `finish` is stripped from mixed lists;
    /// a list made only of `finish` becomes [`NextStep::Finish`].
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut saw_finish = false;
        let mut tools = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if name.eq_ignore_ascii_case(FINISH) {
                saw_finish = true;
            } else {
                tools.push(name.to_string());
            }
        }
        if tools.is_empty() && saw_finish {
            NextStep::Finish
        } else {
            NextStep::Tools(tools)
        }
    }

    /// Proposed tool names, empty for `Finish`.
    pub fn tools(&self) -> &[String] {
        match self {
            NextStep::Tools(tools) => tools,
            NextStep::Finish => &[],
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, NextStep::Finish)
    }
}

impl Default for NextStep {
    fn default() -> Self {
        NextStep::Tools(Vec::new())
    }
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::Finish => f.write_str(FINISH),
            NextStep::Tools(tools) if tools.is_empty() => f.write_str("(none)"),
            NextStep::Tools(tools) => f.write_str(&tools.join(", ")),
        }
    }
}

/// A partial update produced by one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    pub messages: Vec<String>,
    pub findings: Vec<Finding>,
    pub observations: Vec<Observation>,
    pub current_plan: Option<String>,
    pub next_step: Option<NextStep>,
    pub is_finished: Option<bool>,
}

impl StateDelta {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn with_observations(mut self, observations: Vec<Observation>) -> Self {
        self.observations = observations;
        self
    }

    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &StateDelta::default()
    }
}

/// The mutable state of one run.
#[derive(Debug, Clone)]
pub struct RunState {
    scope_targets: Vec<String>,
    available_tools: Vec<String>,
    auth_metadata: AuthMetadata,
    messages: Vec<String>,
    findings: Vec<Finding>,
    observations: Vec<Observation>,
    current_plan: String,
    next_step: NextStep,
    is_finished: bool,
}

impl RunState {
    /// Start a run. Duplicate tool names are collapsed, first occurrence wins.
    pub fn new(
        scope_targets: Vec<String>,
        available_tools: Vec<String>,
        auth_metadata: AuthMetadata,
    ) -> Self {
        let mut tools: Vec<String> = Vec::with_capacity(available_tools.len());
        for tool in available_tools {
            if !tools.contains(&tool) {
                tools.push(tool);
            }
        }
        Self {
            scope_targets,
            available_tools: tools,
            auth_metadata,
            messages: Vec::new(),
            findings: Vec::new(),
            observations: Vec::new(),
            current_plan: String::new(),
            next_step: NextStep::default(),
            is_finished: false,
        }
    }

    pub fn scope_targets(&self) -> &[String] {
        &self.scope_targets
    }

    /// The single target every adapter runs against (first in scope).
    pub fn primary_target(&self) -> Option<&str> {
        self.scope_targets.first().map(String::as_str)
    }

    pub fn available_tools(&self) -> &[String] {
        &self.available_tools
    }

    pub fn is_permitted(&self, tool: &str) -> bool {
        self.available_tools.iter().any(|t| t == tool)
    }

    pub fn auth_metadata(&self) -> &AuthMetadata {
        &self.auth_metadata
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// The last `n` observations, oldest first.
    pub fn recent_observations(&self, n: usize) -> &[Observation] {
        let start = self.observations.len().saturating_sub(n);
        &self.observations[start..]
    }

    pub fn current_plan(&self) -> &str {
        &self.current_plan
    }

    pub fn next_step(&self) -> &NextStep {
        &self.next_step
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// Apply a stage's delta. This is the only way run state changes.
    pub fn merge(&mut self, delta: StateDelta) {
        self.messages.extend(delta.messages);
        self.findings.extend(delta.findings);
        self.observations.extend(delta.observations);
        if let Some(plan) = delta.current_plan {
            self.current_plan = plan;
        }
        if let Some(step) = delta.next_step {
            self.next_step = step;
        }
        if let Some(finished) = delta.is_finished {
            self.is_finished |= finished;
        }
    }
}
