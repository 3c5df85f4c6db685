//! In-memory store: useful for testing and dry runs.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use watchtower_core::error::MemoryError;
use watchtower_core::memory::{FindingStore, StoredFinding, StoredObservation};

#[derive(Default)]
struct Tables {
    observations: Vec<StoredObservation>,
    findings: Vec<StoredFinding>,
}

/// A store that keeps both record sets in Vecs. Ids start at 1 per table.
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FindingStore for InMemoryStore {
    fn name(&self) -> &str { "in_memory" }

    async fn record_observation(&self, target: &str, tool: &str, output: &str) -> Result<i64, MemoryError> {
        let mut tables = self.tables.write().await;
        let id = tables.observations.len() as i64 + 1;
        tables.observations.push(StoredObservation {
            id,
            target: target.into(),
            tool: tool.into(),
            output: output.into(),
        });
        Ok(id)
    }

    async fn record_finding(
        &self,
        target: &str,
        title: &str,
        details: &serde_json::Value,
    ) -> Result<i64, MemoryError> {
        let mut tables = self.tables.write().await;
        let id = tables.findings.len() as i64 + 1;
        tables.findings.push(StoredFinding {
            id,
            target: target.into(),
            vulnerability: title.into(),
            details: details.clone(),
        });
        Ok(id)
    }

    async fn all_observations(&self) -> Result<Vec<StoredObservation>, MemoryError> {
        Ok(self.tables.read().await.observations.clone())
    }

    async fn all_findings(&self) -> Result<Vec<StoredFinding>, MemoryError> {
        Ok(self.tables.read().await.findings.clone())
    }
}
