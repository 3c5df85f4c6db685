//! Prompt text for the LLM-backed engine.

use watchtower_core::engine::DecisionRequest;
use watchtower_core::state::{FINISH, Observation};

pub const PLANNER_SYSTEM: &str = "You are an expert autonomous penetration-testing planner working \
against an authorized target. You choose the next tool(s) to run from a fixed list and reply with a \
single JSON object and nothing else.";

pub const ANALYST_SYSTEM: &str = "You are an expert security analyst. You review raw output from \
automated security tools and report only genuine, confirmed vulnerabilities or misconfigurations \
as a single JSON object and nothing else.";

const PLAN_FORMAT: &str = r#"Reply with exactly this JSON shape:
{"current_plan": "<updated strategy based on the findings>", "next_step": "<tool name>" or ["<tool>", ...] or "finish", "is_finished": <true|false>}"#;

const FINDINGS_FORMAT: &str = r#"Reply with exactly this JSON shape:
{"findings": [{"title": "<concise title>", "severity": "Critical|High|Medium|Low|Info", "description": "<explanation>", "evidence": "<exact snippet from the output>"}]}"#;

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".into())
}

/// The user prompt for one decision.
pub fn decision_prompt(request: &DecisionRequest) -> String {
    let tools: String = request
        .available_tools
        .iter()
        .map(|t| format!("- `{t}`\n"))
        .collect();

    format!(
        "Available tools you can specify in next_step (do NOT use tools outside this list):\n\
         {tools}- `{FINISH}` (if no further testing is needed)\n\n\
         Current findings:\n{findings}\n\n\
         Recent observations:\n{observations}\n\n\
         Decide the next logical step. Do not repeat tools unnecessarily.\n{PLAN_FORMAT}",
        findings = pretty(&request.findings),
        observations = pretty(&request.recent_observations),
    )
}

/// The user prompt for extracting findings from one observation.
pub fn extraction_prompt(observation: &Observation) -> String {
    format!(
        "Tool execution details:\nTarget: {target}\nTool used: {tool}\n\n\
         Raw output:\n{output}\n\n\
         Extract any true findings as structured data. If the output shows only normal behavior, \
         return an empty list. Omit false positives.\n{FINDINGS_FORMAT}",
        target = observation.target,
        tool = observation.tool,
        output = observation.output,
    )
}
