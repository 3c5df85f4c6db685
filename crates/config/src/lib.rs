//! Configuration loading, validation, and engine selection for Watchtower.
//!
//! Loads configuration from `~/.watchtower/config.toml`, then applies
//! environment overrides and finally command-line overrides. The resulting
//! [`AppConfig`] is built once at startup and handed to every component that
//! needs it; nothing reads the environment on its own afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Model used when a provider is named explicitly without a model.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

/// The root configuration structure.
///
/// Maps directly to `~/.watchtower/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Explicit LLM provider: a well-known name, `anthropic`, or a base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Model identifier for the explicit provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Name of the environment variable holding the provider's API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// SQLite file holding observations and findings.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Loop limits and timeouts.
    #[serde(default)]
    pub run: RunConfig,

    /// Per-provider endpoint overrides.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Header/cookie name → value injected into auth-capable tools.
    #[serde(default)]
    pub auth: BTreeMap<String, String>,
}

fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_database_path() -> String {
    "pentest_memory.db".into()
}

fn redact_map(map: &BTreeMap<String, String>) -> BTreeMap<&str, &'static str> {
    map.keys().map(|k| (k.as_str(), "[REDACTED]")).collect()
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key_env", &self.api_key_env)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("database_path", &self.database_path)
            .field("run", &self.run)
            .field("providers", &self.providers)
            .field("auth", &redact_map(&self.auth))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Ceiling on Decide invocations per run.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,

    /// Hard timeout for each external tool.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Timeout for each decision or extraction call.
    #[serde(default = "default_engine_timeout")]
    pub engine_timeout_secs: u64,

    /// How many trailing observations the decision engine sees.
    #[serde(default = "default_recent_observations")]
    pub recent_observations: usize,
}

fn default_max_cycles() -> u32 {
    15
}
fn default_tool_timeout() -> u64 {
    300
}
fn default_engine_timeout() -> u64 {
    120
}
fn default_recent_observations() -> usize {
    3
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
            tool_timeout_secs: default_tool_timeout(),
            engine_timeout_secs: default_engine_timeout(),
            recent_observations: default_recent_observations(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Overrides collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Name of the env var holding the key (not the key itself).
    pub api_key_env: Option<String>,
    pub auth: Vec<(String, String)>,
}

/// Wire protocol spoken by a remote provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAiCompat,
    Anthropic,
}

/// A fully resolved remote engine backend.
#[derive(Clone, PartialEq)]
pub struct RemoteEngine {
    pub kind: ProviderKind,
    /// Provider name, used for logging and base-URL lookup.
    pub name: String,
    /// Explicit endpoint; `None` means the provider's well-known URL.
    pub base_url: Option<String>,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for RemoteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEngine")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "None" } else { "[REDACTED]" })
            .field("model", &self.model)
            .finish()
    }
}

/// Which decision/extraction engine a run uses.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSelection {
    /// Deterministic engine, no network.
    Offline,
    Remote(RemoteEngine),
}

impl AppConfig {
    /// Load configuration from `~/.watchtower/config.toml`, then apply
    /// `WATCHTOWER_PROVIDER`, `WATCHTOWER_MODEL` and `WATCHTOWER_APIKEY_NAME`.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".watchtower")
    }

    /// Apply `WATCHTOWER_*` overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = non_empty(lookup("WATCHTOWER_PROVIDER")) {
            self.provider = Some(provider);
        }
        if let Some(model) = non_empty(lookup("WATCHTOWER_MODEL")) {
            self.model = Some(model);
        }
        if let Some(key_env) = non_empty(lookup("WATCHTOWER_APIKEY_NAME")) {
            self.api_key_env = Some(key_env);
        }
    }

    /// Apply command-line overrides (highest priority).
    pub fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(provider) = overrides.provider {
            self.provider = Some(provider);
        }
        if let Some(model) = overrides.model {
            self.model = Some(model);
        }
        if let Some(key_env) = overrides.api_key_env {
            self.api_key_env = Some(key_env);
        }
        self.auth.extend(overrides.auth);
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.run.max_cycles == 0 {
            return Err(ConfigError::ValidationError("run.max_cycles must be >= 1".into()));
        }
        if self.run.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "run.tool_timeout_secs must be >= 1".into(),
            ));
        }
        if self.run.engine_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "run.engine_timeout_secs must be >= 1".into(),
            ));
        }
        if self.auth.keys().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::ValidationError("auth keys must not be empty".into()));
        }
        Ok(())
    }

    /// Resolve which engine to use.
    ///
    /// An explicit provider wins. Otherwise the first of `OPENROUTER_API_KEY`,
    /// `OPENAI_API_KEY` and `GEMINI_API_KEY` that is set picks the backend,
    /// and with none of them the offline engine is used.
    pub fn engine_selection(&self, lookup: impl Fn(&str) -> Option<String>) -> EngineSelection {
        if let Some(provider) = self.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            let api_key = self
                .api_key_env
                .as_deref()
                .and_then(|name| lookup(name))
                .unwrap_or_default();
            let model = self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
            return EngineSelection::Remote(self.explicit_remote(provider, api_key, model));
        }

        let fallbacks = [
            ("openrouter", "OPENROUTER_API_KEY", "OPENROUTER_MODEL_NAME", "anthropic/claude-3-opus"),
            ("openai", "OPENAI_API_KEY", "OPENAI_MODEL_NAME", "gpt-4-turbo"),
            ("gemini", "GEMINI_API_KEY", "GEMINI_MODEL_NAME", "gemini-1.5-pro"),
        ];
        for (name, key_var, model_var, default_model) in fallbacks {
            if let Some(api_key) = non_empty(lookup(key_var)) {
                let model = non_empty(lookup(model_var)).unwrap_or_else(|| default_model.to_string());
                return EngineSelection::Remote(RemoteEngine {
                    kind: ProviderKind::OpenAiCompat,
                    name: name.to_string(),
                    base_url: self.configured_url(name),
                    api_key,
                    model,
                });
            }
        }

        EngineSelection::Offline
    }

    fn explicit_remote(&self, provider: &str, api_key: String, model: String) -> RemoteEngine {
        let lower = provider.to_lowercase();
        if lower.starts_with("http") {
            return RemoteEngine {
                kind: ProviderKind::OpenAiCompat,
                name: "custom".into(),
                base_url: Some(provider.to_string()),
                api_key,
                model,
            };
        }

        let kind = if lower == "anthropic" {
            ProviderKind::Anthropic
        } else {
            ProviderKind::OpenAiCompat
        };
        RemoteEngine {
            kind,
            base_url: self.configured_url(&lower),
            name: lower,
            api_key,
            model,
        }
    }

    fn configured_url(&self, name: &str) -> Option<String> {
        self.providers.get(name).and_then(|p| p.api_url.clone())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            api_key_env: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            database_path: default_database_path(),
            run: RunConfig::default(),
            providers: HashMap::new(),
            auth: BTreeMap::new(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse one `KEY=VALUE` auth pair as given on the command line.
pub fn parse_auth_pair(raw: &str) -> Result<(String, String), ConfigError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| ConfigError::ValidationError(format!("auth entry '{raw}' must be KEY=VALUE")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::ValidationError(format!("auth entry '{raw}' has an empty key")));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
