//! authkeys-cache
//!
//! Implementations of [`authkeys_api::CacheStore`]:
//!
//! - **`SqliteCacheStore`** (feature `sqlite`): a single on-disk table shared
//!   by every concurrent invocation. Upserts are atomic, schema creation is
//!   idempotent.
//! - **`MemoryCacheStore`** (feature `memory`): process-local, for tests and
//!   one-shot runs.
//! - **`DisabledCache`**: always misses; the degraded mode used when the
//!   on-disk store is unavailable.

#![forbid(unsafe_code)]

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::DisabledCache;
#[cfg(feature = "memory")]
pub use memory::MemoryCacheStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCacheStore;
