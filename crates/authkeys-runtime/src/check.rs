use authkeys_api::{AuthkeysError, CacheStore, ProviderConfig};
use authkeys_core::Config;
use serde::Serialize;
use tracing::{info, warn};

use crate::ProviderRegistry;
use crate::pipeline::resolve;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckEntry {
    pub identity: String,
    pub provider: String,
    pub ok: bool,
    /// Lines the provider would have contributed.
    pub keys: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub providers: Vec<String>,
    pub entries: Vec<CheckEntry>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.entries.iter().all(|e| e.ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckEntry> {
        self.entries.iter().filter(|e| !e.ok)
    }
}

/// Self-test: validates the provider list against `registry`, then runs
/// every provider enabled for each `[users.*]` identity. Key material is
/// counted, never returned.
pub struct CheckRunner<'a> {
    registry: &'a ProviderRegistry,
    cache: &'a dyn CacheStore,
}

impl<'a> CheckRunner<'a> {
    pub fn new(registry: &'a ProviderRegistry, cache: &'a dyn CacheStore) -> Self {
        Self { registry, cache }
    }

    pub fn check(&self, config: &Config) -> Result<CheckReport, AuthkeysError> {
        validate_providers(&config.providers, self.registry)?;

        let mut report = CheckReport {
            providers: config.providers.clone(),
            entries: Vec::new(),
        };

        for identity in config.identities() {
            let scoped = config.scoped(identity);
            for name in &config.providers {
                if !scoped.is_enabled(name) {
                    continue;
                }
                let Some(provider) = self.registry.get(name) else {
                    continue;
                };
                let entry = match resolve(provider, identity, &scoped, self.cache) {
                    Ok(lines) => CheckEntry {
                        identity: identity.to_string(),
                        provider: name.clone(),
                        ok: true,
                        keys: lines.len(),
                        error: None,
                    },
                    Err(e) => {
                        warn!(identity, provider = %name, error = %e, "check failed");
                        CheckEntry {
                            identity: identity.to_string(),
                            provider: name.clone(),
                            ok: false,
                            keys: 0,
                            error: Some(e.to_string()),
                        }
                    }
                };
                report.entries.push(entry);
            }
        }

        info!(
            checked = report.entries.len(),
            failed = report.failures().count(),
            "check finished"
        );
        Ok(report)
    }
}

pub fn validate_providers(
    order: &[String],
    registry: &ProviderRegistry,
) -> Result<(), AuthkeysError> {
    if order.is_empty() {
        return Err(AuthkeysError::NoProvidersConfigured);
    }
    if let Some(missing) = order.iter().find(|name| !registry.contains(name)) {
        return Err(AuthkeysError::UnknownProvider(missing.clone()));
    }
    Ok(())
}
