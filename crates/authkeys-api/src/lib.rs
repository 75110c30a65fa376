use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type Identity = String;
pub type ProviderName = String;
pub type RawKeyLine = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "ssh-rsa")]
    Rsa,
    #[serde(rename = "ssh-dss")]
    Dss,
    #[serde(rename = "ssh-ed25519")]
    Ed25519,
    #[serde(rename = "ecdsa-sha2-nistp521")]
    EcdsaP521,
    #[serde(rename = "ecdsa-sha2-nistp384")]
    EcdsaP384,
    #[serde(rename = "ecdsa-sha2-nistp256")]
    EcdsaP256,
}

impl KeyType {
    pub const ALL: [KeyType; 6] = [
        KeyType::Rsa,
        KeyType::Dss,
        KeyType::Ed25519,
        KeyType::EcdsaP521,
        KeyType::EcdsaP384,
        KeyType::EcdsaP256,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            KeyType::Rsa => "ssh-rsa",
            KeyType::Dss => "ssh-dss",
            KeyType::Ed25519 => "ssh-ed25519",
            KeyType::EcdsaP521 => "ecdsa-sha2-nistp521",
            KeyType::EcdsaP384 => "ecdsa-sha2-nistp384",
            KeyType::EcdsaP256 => "ecdsa-sha2-nistp256",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = AuthkeysError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AuthkeysError::MalformedKey(format!("unknown key type {s}")))
    }
}

/// One authorized-key line split into its fields.
///
/// `comment` is the last whitespace token of the line, so on a line with no
/// trailing comment it repeats `key_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedKey {
    pub options: String,
    pub key_type: KeyType,
    pub key_data: String,
    pub comment: String,
    pub identity: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub validator: String,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            user_agent: format!("authkeys/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    pub api_url: String,
    /// Name of an environment variable holding a bearer token.
    pub token_env: Option<String>,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token_env: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthkeysError {
    #[error("malformed key: {0}")]
    MalformedKey(String),
    #[error("template error: {0}")]
    Template(String),
    #[error("provider I/O error: {0}")]
    ProviderIo(String),
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("no providers configured")]
    NoProvidersConfigured,
    #[error("configuration error: {0}")]
    Config(String),
}

/// Persistent `key -> (validator, payload)` mapping shared by all providers.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, AuthkeysError>;
    /// Replaces any prior entry for `key` as a single unit.
    fn set(&self, key: &str, validator: &str, payload: &str) -> Result<(), AuthkeysError>;
}

/// Read-only configuration view scoped to one identity.
pub trait ProviderConfig {
    fn value(&self, provider: &str) -> Option<&str>;
    fn template(&self, provider: &str) -> Option<&str>;

    fn is_enabled(&self, provider: &str) -> bool {
        self.value(provider).is_some()
    }
}

pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    /// Returns an empty list when the provider is not configured for `identity`.
    fn fetch(
        &self,
        identity: &str,
        config: &dyn ProviderConfig,
        cache: &dyn CacheStore,
    ) -> Result<Vec<RawKeyLine>, AuthkeysError>;
}
