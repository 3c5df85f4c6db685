//! Tool runner trait: executes one named tool against one target.
//!
//! The production implementation resolves the name through the static adapter
//! table and runs the external binary. Runners never fail: any problem is
//! reported as text in the returned output so the loop can keep going.

use async_trait::async_trait;

use crate::state::AuthMetadata;

#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Whether `tool` names something this runner can execute.
    fn knows(&self, tool: &str) -> bool;

    /// Run `tool` against `target`, returning (truncated) output text.
    async fn run(&self, tool: &str, target: &str, auth: &AuthMetadata) -> String;
}
