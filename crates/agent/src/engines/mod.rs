//! Decision/extraction engine variants and their selection.
//!
//! - [`LlmEngine`]: asks a configured LLM provider
//! - [`OfflineEngine`]: deterministic sweep, no network, no findings

pub mod llm;
pub mod offline;
pub mod parse;
pub mod prompt;

use std::sync::Arc;

use tracing::info;
use watchtower_config::{AppConfig, EngineSelection};
use watchtower_core::engine::{DecisionEngine, ExtractionEngine};

pub use llm::LlmEngine;
pub use offline::OfflineEngine;

/// The engine pair a run uses.
pub struct Engines {
    pub decision: Arc<dyn DecisionEngine>,
    pub extraction: Arc<dyn ExtractionEngine>,
}

/// Build the engines for `selection`, using `config` for sampling settings.
pub fn build_engines(selection: &EngineSelection, config: &AppConfig) -> Engines {
    match selection {
        EngineSelection::Offline => {
            info!("No LLM provider configured, using the offline engine");
            let engine = Arc::new(OfflineEngine::new());
            Engines {
                decision: engine.clone(),
                extraction: engine,
            }
        }
        EngineSelection::Remote(remote) => {
            let provider = watchtower_providers::build_provider(remote);
            let engine = Arc::new(
                LlmEngine::new(provider, &remote.model)
                    .with_temperature(config.temperature)
                    .with_max_tokens(config.max_tokens),
            );
            Engines {
                decision: engine.clone(),
                extraction: engine,
            }
        }
    }
}
