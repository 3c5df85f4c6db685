//! LLM provider implementations for Watchtower.
//!
//! All providers implement the `watchtower_core::Provider` trait.
//! The router builds the one backend a run uses from its resolved config.

pub mod anthropic;
mod http;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_provider, default_base_url};
