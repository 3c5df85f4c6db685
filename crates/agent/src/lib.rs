//! The Watchtower assessment loop.
//!
//! An [`Orchestrator`] drives a bounded **Decide → Execute → Extract → Analyze**
//! cycle against one authorized target:
//!
//! 1. **Decide**: the decision engine sees findings, recent observations and
//!    the permitted tools, and returns a plan (or says it is finished)
//! 2. **Execute**: permitted tools from the plan run against the primary target
//! 3. **Extract**: the extraction engine turns the newest observation into findings
//! 4. **Analyze**: an optional hook may add to the state before the next decision
//!
//! The loop stops when the engine finishes or the cycle ceiling is reached.

pub mod engines;
pub mod hook;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use engines::{Engines, LlmEngine, OfflineEngine, build_engines};
pub use hook::AnalysisHook;
pub use orchestrator::{Orchestrator, RunOutcome};
