//! Run events: progress notifications for anyone watching a run.
//!
//! The orchestrator publishes an event after each merge. Subscribers (the CLI
//! progress reporter, tests) read them without touching the run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    /// A tool finished (successfully or not) and produced an observation
    ToolExecuted {
        tool_name: String,
        target: String,
        output_chars: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The extraction engine returned findings for an observation
    FindingsExtracted {
        tool_name: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// One Decide → Execute → Extract traversal completed
    CycleCompleted {
        cycle: u32,
        plan: String,
        next_step: String,
        new_observations: usize,
        new_findings: usize,
        timestamp: DateTime<Utc>,
    },

    /// The run reached `Done`
    RunFinished {
        cycles: u32,
        forced_stop: bool,
        total_observations: usize,
        total_findings: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for run events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<RunEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: RunEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RunEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
