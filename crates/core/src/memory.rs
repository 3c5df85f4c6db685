//! Finding store trait: append-only durable record of a run.
//!
//! Two record sets, each keyed by an auto-incrementing id:
//! - observations `{target, tool, output}`
//! - findings `{target, vulnerability title, JSON details}`
//!
//! Records are never updated or deleted; writing the same record twice
//! yields two rows.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// A persisted observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObservation {
    pub id: i64,
    pub target: String,
    pub tool: String,
    pub output: String,
}

/// A persisted finding. `details` is the JSON document recorded with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFinding {
    pub id: i64,
    pub target: String,
    pub vulnerability: String,
    pub details: serde_json::Value,
}

impl StoredFinding {
    /// A string field of `details`, if present.
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(|v| v.as_str())
    }
}

/// The core FindingStore trait.
///
/// Implementations: SQLite (durable), in-memory (testing).
#[async_trait]
pub trait FindingStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Append an observation, returning its id.
    async fn record_observation(&self, target: &str, tool: &str, output: &str) -> std::result::Result<i64, MemoryError>;

    /// Append a finding, returning its id.
    async fn record_finding(
        &self,
        target: &str,
        title: &str,
        details: &serde_json::Value,
    ) -> std::result::Result<i64, MemoryError>;

    /// Every observation in insertion order.
    async fn all_observations(&self) -> std::result::Result<Vec<StoredObservation>, MemoryError>;

    /// Every finding in insertion order.
    async fn all_findings(&self) -> std::result::Result<Vec<StoredFinding>, MemoryError>;
}
