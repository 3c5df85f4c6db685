//! Provider selection: turn a resolved engine configuration into a backend.

use std::sync::Arc;

use tracing::info;
use watchtower_config::{ProviderKind, RemoteEngine};
use watchtower_core::provider::Provider;

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider described by `engine`.
pub fn build_provider(engine: &RemoteEngine) -> Arc<dyn Provider> {
    let provider: Arc<dyn Provider> = match engine.kind {
        ProviderKind::Anthropic => {
            let mut p = AnthropicProvider::new(&engine.api_key);
            if let Some(url) = &engine.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        ProviderKind::OpenAiCompat => {
            let base_url = engine
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(&engine.name));
            Arc::new(OpenAiCompatProvider::new(&engine.name, base_url, &engine.api_key))
        }
    };

    info!(provider = %provider.name(), model = %engine.model, "LLM provider selected");
    provider
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "gemini" | "google" => "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "litellm" => "http://localhost:4000/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "mistral" => "https://api.mistral.ai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://api.{provider_name}.com/v1"),
    }
}
