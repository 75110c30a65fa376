use std::ops::RangeInclusive;
use std::sync::Arc;

use authkeys_api::{AuthkeysError, CacheStore, Provider, ProviderConfig, RawKeyLine};
use tracing::debug;

use crate::http::{HttpTransport, conditional_fetch};
use crate::{split_lines, substitute_user};

const ACCEPTED: RangeInclusive<u16> = 200..=399;

/// Plain-text key list served over HTTP(S), one key per line.
pub struct WebsiteProvider {
    transport: Arc<dyn HttpTransport>,
}

impl WebsiteProvider {
    pub const NAME: &'static str = "website";

    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl Provider for WebsiteProvider {
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
        let url = substitute_user(value.trim(), identity);

        let payload = conditional_fetch(
            self.transport.as_ref(),
            cache,
            &format!("website/{url}"),
            &url,
            &[],
            &ACCEPTED,
        )?;
        let lines = split_lines(&payload);
        debug!(identity, url = %url, count = lines.len(), "website keys resolved");
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::testing::{ScriptedTransport, StaticConfig};
    use authkeys_cache::MemoryCacheStore;

    const BODY: &str = "ssh-ed25519 AAAAC3 a@laptop\r\n\r\nssh-rsa AAAAB3 a@desktop\n";

    fn website(transport: &Arc<ScriptedTransport>) -> WebsiteProvider {
        let transport: Arc<dyn HttpTransport> = transport.clone();
        WebsiteProvider::new(transport)
    }

    #[test]
    fn fetches_and_splits_lines() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::new(200, BODY).with_etag("W/\"7\""));
        let cache = MemoryCacheStore::new();
        let cfg = StaticConfig::new().with_value("website", "https://keys.example.com/{user}.keys");

        let lines = website(&transport).fetch("alice", &cfg, &cache).unwrap();
        assert_eq!(lines, vec!["ssh-ed25519 AAAAC3 a@laptop", "ssh-rsa AAAAB3 a@desktop"]);
        assert_eq!(transport.requests()[0].url, "https://keys.example.com/alice.keys");
        assert!(cache
            .get("website/https://keys.example.com/alice.keys")
            .unwrap()
            .is_some());
    }

    #[test]
    fn last_modified_revalidates_with_if_modified_since() {
        let date = "Wed, 21 Oct 2015 07:28:00 GMT";
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::new(200, BODY).with_last_modified(date));
        transport.push(HttpResponse::new(304, ""));
        let cache = MemoryCacheStore::new();
        let cfg = StaticConfig::new().with_value("website", "https://keys.example.com/a");
        let provider = website(&transport);

        let first = provider.fetch("a", &cfg, &cache).unwrap();
        let second = provider.fetch("a", &cfg, &cache).unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.requests()[1].header("If-Modified-Since"), Some(date));
        assert!(transport.requests()[1].header("If-None-Match").is_none());
    }

    #[test]
    fn redirect_range_is_accepted() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::new(302, "ssh-rsa R r@r\n"));
        let cfg = StaticConfig::new().with_value("website", "https://keys.example.com/r");
        let lines = website(&transport)
            .fetch("r", &cfg, &MemoryCacheStore::new())
            .unwrap();
        assert_eq!(lines, vec!["ssh-rsa R r@r"]);
    }

    #[test]
    fn server_error_is_provider_io() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::new(503, "down"));
        let cfg = StaticConfig::new().with_value("website", "https://keys.example.com/x");
        let err = website(&transport)
            .fetch("x", &cfg, &MemoryCacheStore::new())
            .unwrap_err();
        assert!(matches!(err, AuthkeysError::ProviderIo(_)));
    }
}
