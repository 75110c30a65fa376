use authkeys_api::{AuthkeysError, CacheEntry, CacheStore};
#[cfg(feature = "memory")]
use dashmap::DashMap;

/// Process-local cache. Nothing survives the process.
#[cfg(feature = "memory")]
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

#[cfg(feature = "memory")]
impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(feature = "memory")]
impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, AuthkeysError> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn set(&self, key: &str, validator: &str, payload: &str) -> Result<(), AuthkeysError> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                validator: validator.to_string(),
                payload: payload.to_string(),
            },
        );
        Ok(())
    }
}

/// Stand-in used when no cache is configured or the cache file cannot be
/// opened: every lookup misses and writes are dropped, so providers always
/// fetch without preconditions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCache;

impl CacheStore for DisabledCache {
    fn get(&self, _key: &str) -> Result<Option<CacheEntry>, AuthkeysError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _validator: &str, _payload: &str) -> Result<(), AuthkeysError> {
        Ok(())
    }
}
