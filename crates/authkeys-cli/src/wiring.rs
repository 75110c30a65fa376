use authkeys_api::CacheStore;
use authkeys_cache::{DisabledCache, SqliteCacheStore};
use authkeys_core::Config;
use authkeys_providers::builtin_providers;
use authkeys_runtime::ProviderRegistry;
use tracing::{debug, warn};

pub fn build_registry(config: &Config) -> anyhow::Result<ProviderRegistry> {
    let providers = builtin_providers(&config.http, &config.github)?;
    Ok(ProviderRegistry::from_providers(providers))
}

/// The configured on-disk cache, or [`DisabledCache`] when none is
/// configured or it cannot be opened. Never fails.
pub fn open_cache(config: &Config) -> Box<dyn CacheStore> {
    let Some(path) = config.cache.path.as_deref() else {
        debug!("no cache configured");
        return Box::new(DisabledCache);
    };
    match SqliteCacheStore::open(path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache unavailable; fetching without it");
            Box::new(DisabledCache)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authkeys_core::parse_config;

    #[test]
    fn registry_holds_builtin_providers() {
        let cfg = parse_config("").unwrap();
        let registry = build_registry(&cfg).unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["filesystem", "github", "website"]
        );
    }

    #[test]
    fn unusable_cache_path_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let cfg = parse_config(&format!(
            "[cache]\npath = \"{}/cache.sqlite3\"\n",
            blocker.display()
        ))
        .unwrap();
        let cache = open_cache(&cfg);
        cache.set("k", "v", "p").unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn configured_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = parse_config(&format!(
            "[cache]\npath = \"{}/cache.sqlite3\"\n",
            dir.path().display()
        ))
        .unwrap();
        open_cache(&cfg).set("k", "v", "p").unwrap();
        assert_eq!(open_cache(&cfg).get("k").unwrap().unwrap().payload, "p");
    }
}
