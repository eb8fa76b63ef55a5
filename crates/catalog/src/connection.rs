use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Discriminant selecting which listing strategy and model catalog apply
/// to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Ollama,
    /// Any provider tag this build does not recognize. Resolves to zero
    /// models instead of failing the pass.
    #[serde(other)]
    Unknown,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
            Self::Unknown => "Unknown",
        }
    }

    /// Kinds whose supported models are known ahead of time and never
    /// require a network round trip.
    pub fn has_fixed_catalog(&self) -> bool {
        matches!(self, Self::OpenAi | Self::Anthropic)
    }
}

/// Provider-specific configuration payload carried by a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the provider endpoint. Required for self-hosted
    /// (dynamic-catalog) providers, unused by fixed-catalog kinds.
    #[serde(default)]
    pub url: String,
    /// Carried for completeness of the settings shape; model listing
    /// never sends it.
    #[serde(default)]
    pub api_key: String,
}

impl ConnectionConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim().to_string(),
            api_key: String::new(),
        }
    }
}

/// One configured provider integration. Immutable once created; owned by
/// the settings store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub kind: ProviderKind,
    #[serde(default)]
    pub config: ConnectionConfig,
}

impl Connection {
    pub fn new(id: impl Into<String>, kind: ProviderKind, config: ConnectionConfig) -> Self {
        Self {
            id: id.into().trim().to_string(),
            kind,
            config,
        }
    }

    /// Stable per-process fingerprint over the whole value. Two connections
    /// memoize to the same cache entry only if id, kind, and config all
    /// match.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
