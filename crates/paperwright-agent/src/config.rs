//! File-based configuration.
//!
//! A [`PaperwrightConfig`] is read from TOML or JSON (chosen by file
//! extension) and falls back to built-in defaults for anything omitted.
//! Credentials are looked up once, by [`PaperwrightConfig::resolve_backends`],
//! and handed to the provider chain as plain values.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::llm::{Backend, LlmClientConfig, LlmProvider};
use crate::runtime::AgentConfig;

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperwrightConfig {
    #[serde(default)]
    pub agent: AgentSection,

    /// Backends in priority order.
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendEntry>,
}

impl Default for PaperwrightConfig {
    fn default() -> Self {
        Self {
            agent: AgentSection::default(),
            backends: default_backends(),
        }
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// Overrides every task's default step budget.
    pub max_steps: Option<u32>,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    /// Wall-clock limit per run, in seconds.
    pub deadline_secs: Option<u64>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: None,
            temperature: Some(0.3),
            max_tokens: 4096,
            deadline_secs: None,
        }
    }
}

/// One `[[backends]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEntry {
    pub name: String,
    pub provider: LlmProvider,
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Defaults to the provider's public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Literal key; takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl BackendEntry {
    fn new(
        name: &str,
        provider: LlmProvider,
        model: &str,
        api_key_env: &str,
        base_url: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            provider,
            model: model.to_owned(),
            api_key_env: Some(api_key_env.to_owned()),
            base_url: base_url.map(str::to_owned),
            api_key: None,
        }
    }

    /// Human-readable origin of the credential, for error messages.
    fn credential_source(&self) -> String {
        match &self.api_key_env {
            Some(var) => var.clone(),
            None => format!("api_key for backend `{}`", self.name),
        }
    }
}

/// Anthropic, OpenAI, DeepSeek, OpenRouter, in that order.
pub fn default_backends() -> Vec<BackendEntry> {
    vec![
        BackendEntry::new(
            "anthropic",
            LlmProvider::Anthropic,
            "claude-sonnet-4-20250514",
            "ANTHROPIC_API_KEY",
            None,
        ),
        BackendEntry::new("openai", LlmProvider::OpenAI, "gpt-4o", "OPENAI_API_KEY", None),
        BackendEntry::new(
            "deepseek",
            LlmProvider::OpenAI,
            "deepseek-chat",
            "DEEPSEEK_API_KEY",
            Some(DEEPSEEK_BASE_URL),
        ),
        BackendEntry::new(
            "openrouter",
            LlmProvider::OpenAI,
            "anthropic/claude-sonnet-4",
            "OPENROUTER_API_KEY",
            Some(OPENROUTER_BASE_URL),
        ),
    ]
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl PaperwrightConfig {
    /// Load and validate a config file.  `.json` files are parsed as JSON,
    /// anything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AgentError::ConfigError {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let config: Self = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(|e| AgentError::ConfigError {
                reason: format!("invalid JSON in {}: {e}", path.display()),
            })?
        } else {
            toml::from_str(&content).map_err(|e| AgentError::ConfigError {
                reason: format!("invalid TOML in {}: {e}", path.display()),
            })?
        };

        config.validate()?;
        tracing::info!(
            path = %path.display(),
            backends = config.backends.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// [`Self::load`] when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject configurations that cannot produce a usable chain.
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_tokens == 0 {
            return Err(AgentError::ValidationError {
                reason: "agent.max_tokens must be greater than zero".into(),
            });
        }

        let mut seen = HashSet::new();
        for (i, entry) in self.backends.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(AgentError::ValidationError {
                    reason: format!("backends[{i}]: name is empty"),
                });
            }
            if entry.model.trim().is_empty() {
                return Err(AgentError::ValidationError {
                    reason: format!("backend `{}`: model is empty", entry.name),
                });
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(AgentError::ValidationError {
                    reason: format!("duplicate backend name `{}`", entry.name),
                });
            }
        }
        Ok(())
    }

    /// Resolve each entry's credential with `lookup` (an environment
    /// variable reader) and build the backend list for the provider chain.
    /// Entries without a credential keep an empty key.
    pub fn resolve_backends(&self, lookup: impl Fn(&str) -> Option<String>) -> Vec<Backend> {
        self.backends
            .iter()
            .map(|entry| {
                let api_key = entry
                    .api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
                    .or_else(|| entry.api_key_env.as_deref().and_then(&lookup))
                    .map(|k| k.trim().to_owned())
                    .unwrap_or_default();

                Backend {
                    name: entry.name.clone(),
                    credential_source: entry.credential_source(),
                    client: LlmClientConfig {
                        provider: entry.provider,
                        api_key,
                        base_url: entry
                            .base_url
                            .clone()
                            .unwrap_or_else(|| entry.provider.default_base_url().to_owned()),
                        model: entry.model.clone(),
                        max_tokens: self.agent.max_tokens,
                        temperature: self.agent.temperature,
                    },
                }
            })
            .collect()
    }

    /// [`Self::resolve_backends`] against the process environment.
    pub fn resolve_from_env(&self) -> Vec<Backend> {
        self.resolve_backends(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Loop settings derived from the `[agent]` section.
    pub fn agent_config(&self) -> AgentConfig {
        let mut config = AgentConfig::default();
        if let Some(max_steps) = self.agent.max_steps {
            config.max_steps = max_steps;
        }
        config.deadline = self.agent.deadline_secs.map(Duration::from_secs);
        config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
