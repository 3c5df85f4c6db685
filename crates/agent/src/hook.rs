//! Post-extraction analysis hook.
//!
//! After findings are extracted and merged, the orchestrator passes through an
//! `Analyze` stage before the next decision. A hook may inspect the whole run
//! and return a delta (extra findings, a note, or `is_finished`). The delta is
//! merged by the usual accumulation rules. With no hook the stage is a no-op.

use async_trait::async_trait;
use watchtower_core::state::{RunState, StateDelta};

#[async_trait]
pub trait AnalysisHook: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, state: &RunState) -> StateDelta;
}
