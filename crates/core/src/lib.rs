//! # Watchtower Core
//!
//! Domain types, traits, and error definitions for the Watchtower assessment
//! loop. This crate has **no framework dependencies**: it defines the model
//! every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the orchestration loop is a trait here:
//! - [`DecisionEngine`] / [`ExtractionEngine`]: the opaque reasoning capability
//! - [`ToolRunner`]: executes one named tool against a target
//! - [`FindingStore`]: append-only durable record of observations and findings
//! - [`Provider`]: an LLM backend used by the reasoning engine
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted doubles without touching the loop.

pub mod engine;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod state;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use engine::{DecisionEngine, DecisionRequest, ExtractionEngine, Plan};
pub use event::{EventBus, RunEvent};
pub use memory::{FindingStore, StoredFinding, StoredObservation};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use state::{AuthMetadata, Finding, NextStep, Observation, RunState, Severity, StateDelta};
pub use tool::ToolRunner;
