use authkeys_api::{AuthkeysError, CacheStore, Provider, ProviderConfig, RawKeyLine};
use authkeys_core::{Template, parse};
use tracing::{debug, info, warn};

use crate::ProviderRegistry;

/// Resolves the key lines for one identity across every configured provider.
pub struct Pipeline<'a> {
    order: &'a [String],
    registry: &'a ProviderRegistry,
    cache: &'a dyn CacheStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        order: &'a [String],
        registry: &'a ProviderRegistry,
        cache: &'a dyn CacheStore,
    ) -> Self {
        Self {
            order,
            registry,
            cache,
        }
    }

    /// Output lines in provider order. Provider failures, bad templates and
    /// malformed key lines are logged and skipped; this never fails as a
    /// whole.
    pub fn run(&self, identity: &str, config: &dyn ProviderConfig) -> Vec<String> {
        let mut out = Vec::new();
        for name in self.order {
            let Some(provider) = self.registry.get(name) else {
                warn!(provider = %name, "provider is not registered; skipping");
                continue;
            };
            if !config.is_enabled(name) {
                continue;
            }
            match resolve(provider, identity, config, self.cache) {
                Ok(lines) => {
                    debug!(identity, provider = %name, count = lines.len(), "provider resolved");
                    out.extend(lines);
                }
                Err(e) => warn!(identity, provider = %name, error = %e, "provider failed"),
            }
        }
        info!(identity, keys = out.len(), "keys resolved");
        out
    }
}

/// Fetch from one provider and apply its template, if any.
///
/// An invalid template fails the whole provider rather than letting
/// unrewritten lines through.
pub(crate) fn resolve(
    provider: &dyn Provider,
    identity: &str,
    config: &dyn ProviderConfig,
    cache: &dyn CacheStore,
) -> Result<Vec<String>, AuthkeysError> {
    let name = provider.name();
    let template = config.template(name).map(Template::compile).transpose()?;
    let raw = provider.fetch(identity, config, cache)?;

    let Some(template) = template else {
        return Ok(raw);
    };
    Ok(apply_template(&template, name, identity, raw))
}

fn apply_template(
    template: &Template,
    provider: &str,
    identity: &str,
    raw: Vec<RawKeyLine>,
) -> Vec<String> {
    raw.into_iter()
        .filter_map(|line| match parse(&line, identity) {
            Ok(key) => Some(template.render(&key)),
            Err(e) => {
                warn!(identity, provider, error = %e, "dropping key line");
                None
            }
        })
        .collect()
}
