//! The production [`ToolRunner`]: adapter lookup + process execution.

use async_trait::async_trait;
use tracing::warn;
use watchtower_core::state::AuthMetadata;
use watchtower_core::tool::ToolRunner;

use crate::adapters::AdapterRegistry;
use crate::detect::find_executable;
use crate::executor::ProcessExecutor;

/// Resolves a tool name through the adapter table and runs it.
#[derive(Debug, Clone)]
pub struct AdapterRunner {
    registry: AdapterRegistry,
    executor: ProcessExecutor,
}

impl AdapterRunner {
    pub fn new(registry: AdapterRegistry, executor: ProcessExecutor) -> Self {
        Self { registry, executor }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }
}

#[async_trait]
impl ToolRunner for AdapterRunner {
    fn knows(&self, tool: &str) -> bool {
        self.registry.contains(tool)
    }

    async fn run(&self, tool: &str, target: &str, auth: &AuthMetadata) -> String {
        let adapter = match self.registry.get(tool) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(tool = %tool, "Adapter lookup failed");
                return format!("Error: {e}");
            }
        };

        // Prefer whichever executable name is actually installed.
        let executable = adapter
            .executables()
            .find(|name| find_executable(name).is_some())
            .unwrap_or(adapter.program);

        let command = adapter.build_command_with(executable, target, auth);
        self.executor.execute(&command, auth).await
    }
}
