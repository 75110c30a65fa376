use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use authkeys_api::{AuthkeysError, CacheStore, Provider, ProviderConfig, RawKeyLine};
use tracing::{debug, warn};

use crate::{split_lines, substitute_user};

/// Reads authorized-key files from local paths.
///
/// The configured value is one path per line; `{user}` is replaced by the
/// identity. A file whose modification time matches the cached validator is
/// served from the cache without being reopened.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemProvider;

impl FilesystemProvider {
    pub const NAME: &'static str = "filesystem";
}

impl Provider for FilesystemProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn fetch(
        &self,
        identity: &str,
        config: &dyn ProviderConfig,
        cache: &dyn CacheStore,
    ) -> Result<Vec<RawKeyLine>, AuthkeysError> {
        let Some(value) = config.value(Self::NAME) else {
            return Ok(Vec::new());
        };

        let mut lines = Vec::new();
        let mut read_any = false;
        let mut first_err = None;

        for path in value.lines().map(str::trim).filter(|p| !p.is_empty()) {
            let path = substitute_user(path, identity);
            match read_cached(Path::new(&path), cache) {
                Ok(payload) => {
                    read_any = true;
                    lines.extend(split_lines(&payload));
                }
                Err(e) => {
                    warn!(identity, path = %path, error = %e, "skipping key file");
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) if !read_any => Err(e),
            _ => Ok(lines),
        }
    }
}

fn read_cached(path: &Path, cache: &dyn CacheStore) -> Result<String, AuthkeysError> {
    let io_err = |e: std::io::Error| AuthkeysError::ProviderIo(format!("{}: {e}", path.display()));

    let modified = fs::metadata(path).and_then(|m| m.modified()).map_err(io_err)?;
    let validator = mtime_validator(modified);
    let cache_key = format!("filename/{}", path.display());

    match cache.get(&cache_key) {
        Ok(Some(entry)) if entry.validator == validator => {
            debug!(path = %path.display(), "key file unchanged; using cache");
            return Ok(entry.payload);
        }
        Ok(_) => {}
        Err(e) => warn!(cache_key, error = %e, "cache lookup failed; reading file"),
    }

    let payload = fs::read_to_string(path).map_err(io_err)?;
    if let Err(e) = cache.set(&cache_key, &validator, &payload) {
        warn!(cache_key, error = %e, "failed to update cache");
    }
    Ok(payload)
}

/// Modification time as `<secs>.<nanos>` since the epoch.
fn mtime_validator(modified: SystemTime) -> String {
    let since = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:09}", since.as_secs(), since.subsec_nanos())
}
