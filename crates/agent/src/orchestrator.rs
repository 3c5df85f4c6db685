//! The bounded assessment loop.
//!
//! ```text
//!   ┌────────┐ finished / ceiling ┌──────┐
//!   │ Decide ├───────────────────►│ Done │
//!   └───┬────┘                    └──────┘
//!       ▼
//!   Execute ──► Extract ──► Analyze ──► Decide
//! ```
//!
//! Every stage produces a [`StateDelta`] that is merged under the state's
//! write lock before the next stage starts, so a concurrent reader never
//! observes a half-applied cycle. Observations and findings are persisted
//! right after their merge. A persistence failure is logged and the run
//! continues with its in-memory state intact.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use watchtower_core::engine::{DecisionEngine, DecisionRequest, ExtractionEngine, Plan};
use watchtower_core::error::EngineError;
use watchtower_core::event::{EventBus, RunEvent};
use watchtower_core::memory::FindingStore;
use watchtower_core::state::{Finding, Observation, RunState, StateDelta};
use watchtower_core::tool::ToolRunner;

use crate::hook::AnalysisHook;

/// Default ceiling on Decide invocations.
pub const DEFAULT_MAX_CYCLES: u32 = 15;

/// Default number of trailing observations shown to the decision engine.
pub const DEFAULT_RECENT_OBSERVATIONS: usize = 3;

/// Default timeout for one decision or extraction call.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(120);

/// Where the state machine is.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    Decide,
    /// Carries the proposed tool names.
    Execute(Vec<String>),
    /// Carries the most recent observation of this cycle, if any.
    Extract(Option<Observation>),
    Analyze,
    Done,
}

/// Per-cycle tallies for the cycle log line and event.
#[derive(Debug, Default)]
struct CycleStats {
    observations: usize,
    findings: usize,
}

/// How a run ended.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Decide invocations performed.
    pub cycles: u32,
    /// True when the ceiling ended the run rather than the engine.
    pub forced_stop: bool,
    /// Final run state.
    pub state: RunState,
}

/// Drives one run from `Decide` to `Done`.
pub struct Orchestrator {
    decision: Arc<dyn DecisionEngine>,
    extraction: Arc<dyn ExtractionEngine>,
    runner: Arc<dyn ToolRunner>,
    store: Option<Arc<dyn FindingStore>>,
    hook: Option<Arc<dyn AnalysisHook>>,
    event_bus: Arc<EventBus>,
    state: Arc<RwLock<RunState>>,
    max_cycles: u32,
    recent_observations: usize,
    engine_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        state: RunState,
        decision: Arc<dyn DecisionEngine>,
        extraction: Arc<dyn ExtractionEngine>,
        runner: Arc<dyn ToolRunner>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            decision,
            extraction,
            runner,
            store: None,
            hook: None,
            event_bus,
            state: Arc::new(RwLock::new(state)),
            max_cycles: DEFAULT_MAX_CYCLES,
            recent_observations: DEFAULT_RECENT_OBSERVATIONS,
            engine_timeout: DEFAULT_ENGINE_TIMEOUT,
        }
    }

    /// Persist observations and findings to `store` as the run progresses.
    pub fn with_store(mut self, store: Arc<dyn FindingStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Install a post-extraction analysis hook.
    pub fn with_hook(mut self, hook: Arc<dyn AnalysisHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Set the ceiling on Decide invocations (at least 1).
    pub fn with_max_cycles(mut self, max: u32) -> Self {
        self.max_cycles = max.max(1);
        self
    }

    pub fn with_recent_observations(mut self, n: usize) -> Self {
        self.recent_observations = n;
        self
    }

    pub fn with_engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }

    /// A consistent copy of the current state.
    pub async fn snapshot(&self) -> RunState {
        self.state.read().await.clone()
    }

    /// Run the loop to completion.
    pub async fn run(&self) -> RunOutcome {
        let mut stage = Stage::Decide;
        let mut cycles: u32 = 0;
        let mut forced_stop = false;
        let mut stats = CycleStats::default();

        {
            let state = self.state.read().await;
            info!(
                target_count = state.scope_targets().len(),
                tools = %state.available_tools().join(", "),
                decision = %self.decision.name(),
                "Starting assessment loop against {}",
                state.primary_target().unwrap_or("(no target)")
            );
        }

        while stage != Stage::Done {
            stage = match stage {
                Stage::Decide => {
                    if self.state.read().await.is_finished() {
                        Stage::Done
                    } else if cycles >= self.max_cycles {
                        warn!(max_cycles = self.max_cycles, "Cycle ceiling reached, forcing termination");
                        forced_stop = true;
                        self.merge(StateDelta {
                            is_finished: Some(true),
                            ..StateDelta::default()
                        }
                        .with_message(format!("Stopped after {} cycles", self.max_cycles)))
                        .await;
                        Stage::Done
                    } else {
                        cycles += 1;
                        stats = CycleStats::default();
                        self.decide_stage(cycles).await
                    }
                }
                Stage::Execute(proposed) => self.execute_stage(&proposed, &mut stats).await,
                Stage::Extract(observation) => self.extract_stage(observation, &mut stats).await,
                Stage::Analyze => {
                    self.analyze_stage(&mut stats).await;
                    self.complete_cycle(cycles, &stats).await;
                    Stage::Decide
                }
                Stage::Done => Stage::Done,
            };
        }

        let state = self.snapshot().await;
        info!(
            cycles,
            forced_stop,
            observations = state.observations().len(),
            findings = state.findings().len(),
            "Assessment loop complete"
        );
        self.event_bus.publish(RunEvent::RunFinished {
            cycles,
            forced_stop,
            total_observations: state.observations().len(),
            total_findings: state.findings().len(),
            timestamp: Utc::now(),
        });

        RunOutcome {
            cycles,
            forced_stop,
            state,
        }
    }

    async fn decide_stage(&self, cycle: u32) -> Stage {
        let request = {
            let state = self.state.read().await;
            DecisionRequest::from_state(&state, self.recent_observations)
        };

        let plan = match tokio::time::timeout(self.engine_timeout, self.decision.decide(&request)).await {
            Ok(Ok(plan)) => plan,
            Ok(Err(e)) => {
                warn!(cycle, error = %e, "Decision failed, terminating run");
                Plan::terminate(e)
            }
            Err(_) => {
                let e = EngineError::Timeout {
                    timeout_ms: self.engine_timeout.as_millis() as u64,
                };
                warn!(cycle, error = %e, "Decision timed out, terminating run");
                Plan::terminate(e)
            }
        };
        debug!(cycle, plan = %plan.current_plan, next_step = %plan.next_step, "Decision received");

        let finished = plan.is_finished;
        let proposed = plan.next_step.tools().to_vec();
        self.merge(
            StateDelta {
                current_plan: Some(plan.current_plan.clone()),
                next_step: Some(plan.next_step.clone()),
                is_finished: Some(plan.is_finished),
                ..StateDelta::default()
            }
            .with_message(format!("Plan: {}", plan.current_plan)),
        )
        .await;

        if finished {
            self.complete_cycle(cycle, &CycleStats::default()).await;
            Stage::Done
        } else {
            Stage::Execute(proposed)
        }
    }

    async fn execute_stage(&self, proposed: &[String], stats: &mut CycleStats) -> Stage {
        let (target, auth, permitted) = {
            let state = self.state.read().await;
            let permitted: Vec<String> = proposed
                .iter()
                .filter(|tool| {
                    let allowed = state.is_permitted(tool) && self.runner.knows(tool);
                    if !allowed {
                        warn!(tool = %tool, "Dropping proposed tool outside the permitted set");
                    }
                    allowed
                })
                .cloned()
                .collect();
            (
                state.primary_target().map(str::to_string),
                state.auth_metadata().clone(),
                permitted,
            )
        };

        let Some(target) = target else {
            warn!("Run has no scope target, nothing to execute");
            return Stage::Extract(None);
        };
        if permitted.is_empty() {
            return Stage::Extract(None);
        }

        let (target, auth) = (&target, &auth);
        let runs = permitted.iter().map(|tool| async move {
            let started = Instant::now();
            let output = self.runner.run(tool, target, auth).await;
            (tool, output, started.elapsed())
        });
        let results = join_all(runs).await;

        let mut observations = Vec::with_capacity(results.len());
        for (tool, output, elapsed) in results {
            self.event_bus.publish(RunEvent::ToolExecuted {
                tool_name: tool.clone(),
                target: target.clone(),
                output_chars: output.chars().count(),
                duration_ms: elapsed.as_millis() as u64,
                timestamp: Utc::now(),
            });
            observations.push(Observation::new(target.as_str(), tool.as_str(), output));
        }

        stats.observations = observations.len();
        let latest = observations.last().cloned();
        self.merge(
            StateDelta::default()
                .with_message(format!("Executed: {}", permitted.join(", ")))
                .with_observations(observations.clone()),
        )
        .await;

        if let Some(store) = &self.store {
            for obs in &observations {
                if let Err(e) = store.record_observation(&obs.target, &obs.tool, &obs.output).await {
                    warn!(tool = %obs.tool, error = %e, "Failed to persist observation");
                }
            }
        }

        Stage::Extract(latest)
    }

    async fn extract_stage(&self, observation: Option<Observation>, stats: &mut CycleStats) -> Stage {
        let Some(observation) = observation else {
            return Stage::Analyze;
        };

        let extracted = match tokio::time::timeout(self.engine_timeout, self.extraction.extract(&observation)).await {
            Ok(Ok(findings)) => findings,
            Ok(Err(e)) => {
                warn!(tool = %observation.tool, error = %e, "Extraction failed, no findings this cycle");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    tool = %observation.tool,
                    timeout_ms = self.engine_timeout.as_millis() as u64,
                    "Extraction timed out, no findings this cycle"
                );
                Vec::new()
            }
        };

        let findings: Vec<Finding> = extracted
            .into_iter()
            .map(|mut f| {
                if f.target.trim().is_empty() {
                    f.target = observation.target.clone();
                }
                f
            })
            .collect();

        stats.findings += findings.len();
        self.event_bus.publish(RunEvent::FindingsExtracted {
            tool_name: observation.tool.clone(),
            count: findings.len(),
            timestamp: Utc::now(),
        });

        self.merge(
            StateDelta::default()
                .with_message(format!(
                    "Extracted {} finding(s) from {}",
                    findings.len(),
                    observation.tool
                ))
                .with_findings(findings.clone()),
        )
        .await;

        self.persist_findings(&findings).await;
        Stage::Analyze
    }

    async fn analyze_stage(&self, stats: &mut CycleStats) {
        let Some(hook) = &self.hook else {
            return;
        };

        let snapshot = self.snapshot().await;
        let delta = hook.analyze(&snapshot).await;
        if delta.is_empty() {
            return;
        }

        debug!(hook = %hook.name(), "Merging analysis delta");
        let findings = delta.findings.clone();
        stats.findings += findings.len();
        stats.observations += delta.observations.len();
        self.merge(delta).await;
        self.persist_findings(&findings).await;
    }

    async fn persist_findings(&self, findings: &[Finding]) {
        let Some(store) = &self.store else {
            return;
        };
        for finding in findings {
            let details = match serde_json::to_value(finding) {
                Ok(details) => details,
                Err(e) => {
                    warn!(title = %finding.title, error = %e, "Failed to encode finding");
                    continue;
                }
            };
            if let Err(e) = store.record_finding(&finding.target, &finding.title, &details).await {
                warn!(title = %finding.title, error = %e, "Failed to persist finding");
            }
        }
    }

    /// The single serialization point for state changes.
    async fn merge(&self, delta: StateDelta) {
        self.state.write().await.merge(delta);
    }

    async fn complete_cycle(&self, cycle: u32, stats: &CycleStats) {
        let (plan, next_step) = {
            let state = self.state.read().await;
            (state.current_plan().to_string(), state.next_step().to_string())
        };

        info!(
            cycle,
            next_step = %next_step,
            new_observations = stats.observations,
            new_findings = stats.findings,
            "Cycle {cycle} complete: {plan}"
        );
        self.event_bus.publish(RunEvent::CycleCompleted {
            cycle,
            plan,
            next_step,
            new_observations: stats.observations,
            new_findings: stats.findings,
            timestamp: Utc::now(),
        });
    }
}
