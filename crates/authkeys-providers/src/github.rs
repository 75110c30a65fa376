use std::ops::RangeInclusive;
use std::sync::Arc;

use authkeys_api::{
    AuthkeysError, CacheStore, GithubSettings, Provider, ProviderConfig, RawKeyLine,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::{HttpTransport, conditional_fetch};
use crate::substitute_user;

const ACCEPTED: RangeInclusive<u16> = 200..=299;

#[derive(Debug, Deserialize)]
struct GithubKey {
    key: String,
}

/// Public keys of a GitHub account, from `GET /users/{login}/keys`.
///
/// The configured value is the GitHub login to query; `{user}` in it is
/// replaced by the identity.
pub struct GithubProvider {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    token: Option<String>,
}

impl GithubProvider {
    pub const NAME: &'static str = "github";

    pub fn new(settings: &GithubSettings, transport: Arc<dyn HttpTransport>) -> Self {
        let token = settings.token_env.as_deref().and_then(|var| {
            let token = std::env::var(var).ok().filter(|t| !t.trim().is_empty());
            if token.is_none() {
                warn!(var, "GitHub token variable is unset; using anonymous requests");
            }
            token
        });
        Self {
            transport,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Accept", "application/vnd.github+json".to_string()),
            ("X-GitHub-Api-Version", "2022-11-28".to_string()),
        ];
        if let Some(token) = &self.token {
            headers.push(("Authorization", format!("Bearer {token}")));
        }
        headers
    }
}

impl Provider for GithubProvider {
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
        let login = substitute_user(value.trim(), identity);
        let url = format!("{}/users/{login}/keys", self.api_url);

        let payload = conditional_fetch(
            self.transport.as_ref(),
            cache,
            &format!("github/{login}"),
            &url,
            &self.headers(),
            &ACCEPTED,
        )?;
        let keys = parse_keys(&payload)?;
        debug!(identity, login = %login, count = keys.len(), "github keys resolved");
        Ok(keys)
    }
}

fn parse_keys(payload: &str) -> Result<Vec<RawKeyLine>, AuthkeysError> {
    let records: Vec<GithubKey> = serde_json::from_str(payload)
        .map_err(|e| AuthkeysError::ProviderIo(format!("invalid GitHub key listing: {e}")))?;
    Ok(records
        .into_iter()
        .map(|r| r.key.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect())
}
