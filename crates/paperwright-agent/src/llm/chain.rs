//! Ordered provider chain.
//!
//! Holds an explicit, prioritized list of backends injected at construction.
//! A request goes to the first backend that has a credential; when it fails,
//! the next one is tried.  Backends that recently answered with a rate-limit
//! error are moved to the back of the queue for a cooldown period.  The chain
//! never reads process state: credentials are resolved by the configuration
//! layer before the chain is built.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};
use crate::llm::client::{LlmClient, LlmClientConfig};
use crate::llm::gateway::{ModelGateway, TextBackend};
use crate::llm::types::{Completion, Message};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How long a backend stays deprioritized after a rate-limit hit.
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One configured backend: a named client configuration whose API key may be
/// empty when no credential was found.
#[derive(Debug, Clone)]
pub struct Backend {
    /// Backend name reported in completions (e.g. `"anthropic"`).
    pub name: String,

    /// Where the credential was expected to come from, for error messages
    /// (e.g. `"ANTHROPIC_API_KEY"`).
    pub credential_source: String,

    /// Client configuration.  An empty `api_key` marks the backend as
    /// unconfigured.
    pub client: LlmClientConfig,
}

impl Backend {
    /// Whether a credential is present for this backend.
    pub fn is_configured(&self) -> bool {
        !self.client.api_key.is_empty()
    }
}

struct ChainEntry {
    name: String,
    backend: Arc<dyn TextBackend>,
}

/// A [`ModelGateway`] that tries an ordered list of backends.
pub struct ProviderChain {
    entries: Vec<ChainEntry>,
    /// Credential sources of the backends that were skipped for lack of a
    /// key; reported when nothing is usable.
    missing: Vec<String>,
    /// Map of backend name to when its cooldown expires.
    cooldowns: Mutex<HashMap<String, Instant>>,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("backends", &self.backend_names())
            .field("missing", &self.missing)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl ProviderChain {
    /// Build a chain from configured backends, skipping those without a key.
    pub fn new(backends: Vec<Backend>) -> Result<Self> {
        let mut entries = Vec::new();
        let mut missing = Vec::new();

        for backend in backends {
            if !backend.is_configured() {
                debug!(backend = %backend.name, "skipping backend without credential");
                missing.push(backend.credential_source);
                continue;
            }
            let client = LlmClient::new(backend.client)?;
            entries.push(ChainEntry {
                name: backend.name,
                backend: Arc::new(client),
            });
        }

        info!(
            backends = ?entries.iter().map(|e| &e.name).collect::<Vec<_>>(),
            "provider chain ready"
        );

        Ok(Self {
            entries,
            missing,
            cooldowns: Mutex::new(HashMap::new()),
        })
    }

    /// Build a chain from already-constructed backends, in priority order.
    pub fn from_backends(backends: Vec<(String, Arc<dyn TextBackend>)>) -> Self {
        Self {
            entries: backends
                .into_iter()
                .map(|(name, backend)| ChainEntry { name, backend })
                .collect(),
            missing: Vec::new(),
            cooldowns: Mutex::new(HashMap::new()),
        }
    }

    /// Names of the usable backends, in priority order.
    pub fn backend_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Whether at least one backend has a credential.
    pub fn is_configured(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Record that a backend just hit a rate limit.
    fn mark_rate_limited(&self, name: &str) {
        let expires = Instant::now() + RATE_LIMIT_COOLDOWN;
        warn!(
            backend = name,
            cooldown_secs = RATE_LIMIT_COOLDOWN.as_secs(),
            "backend rate-limited, adding cooldown"
        );
        if let Ok(mut cooldowns) = self.cooldowns.lock() {
            cooldowns.insert(name.to_owned(), expires);
        }
    }

    /// Entry indices in attempt order: backends not on cooldown first,
    /// cooling ones last.  Expired cooldowns are dropped.
    fn attempt_order(&self) -> Vec<usize> {
        let now = Instant::now();
        let cooling: Vec<String> = match self.cooldowns.lock() {
            Ok(mut cooldowns) => {
                cooldowns.retain(|_, expires| now < *expires);
                cooldowns.keys().cloned().collect()
            }
            Err(_) => Vec::new(),
        };

        let (ready, deferred): (Vec<usize>, Vec<usize>) = (0..self.entries.len())
            .partition(|&i| !cooling.contains(&self.entries[i].name));
        ready.into_iter().chain(deferred).collect()
    }
}

/// Whether a backend error looks like throttling.
fn is_rate_limit(err: &AgentError) -> bool {
    match err {
        AgentError::LlmRequestFailed { reason } => {
            reason.contains("429 Too Many Requests")
                || reason.to_lowercase().contains("rate limit")
        }
        _ => false,
    }
}

#[async_trait]
impl ModelGateway for ProviderChain {
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<Completion> {
        if self.entries.is_empty() {
            return Err(AgentError::NoBackendConfigured {
                expected: if self.missing.is_empty() {
                    "at least one backend".into()
                } else {
                    self.missing.join(", ")
                },
            });
        }

        let mut attempts = Vec::new();

        for idx in self.attempt_order() {
            let entry = &self.entries[idx];
            match entry.backend.generate(system, messages).await {
                Ok(text) => {
                    debug!(backend = %entry.name, chars = text.len(), "backend answered");
                    return Ok(Completion::new(text, &entry.name, entry.backend.model()));
                }
                Err(e) => {
                    warn!(backend = %entry.name, error = %e, "backend failed, trying next");
                    if is_rate_limit(&e) {
                        self.mark_rate_limited(&entry.name);
                    }
                    attempts.push(format!("{}: {e}", entry.name));
                }
            }
        }

        Err(AgentError::AllBackendsFailed { attempts })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
