//! HTTP transport and the conditional-fetch protocol shared by network providers.

use std::ops::RangeInclusive;
use std::time::Duration;

use authkeys_api::{AuthkeysError, CacheStore, HttpSettings};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            etag: None,
            last_modified: None,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    #[must_use]
    pub fn with_last_modified(mut self, date: impl Into<String>) -> Self {
        self.last_modified = Some(date.into());
        self
    }
}

/// Issues a single GET. Implementations report transport failures (DNS,
/// TLS, timeout) as `ProviderIo`; any HTTP status is a successful `Ok`.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse, AuthkeysError>;
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, AuthkeysError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| AuthkeysError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse, AuthkeysError> {
        use reqwest::header;

        let mut req = self.client.get(url);
        for (name, value) in headers {
            req = req.header(*name, value);
        }
        let resp = req
            .send()
            .map_err(|e| AuthkeysError::ProviderIo(format!("GET {url}: {e}")))?;

        let status = resp.status().as_u16();
        let header_str = |name: header::HeaderName| {
            resp.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(ToString::to_string)
        };
        let etag = header_str(header::ETAG);
        let last_modified = header_str(header::LAST_MODIFIED);

        let body = resp
            .text()
            .map_err(|e| AuthkeysError::ProviderIo(format!("GET {url}: reading body: {e}")))?;

        Ok(HttpResponse {
            status,
            etag,
            last_modified,
            body,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    NotModified,
    Fetched {
        payload: String,
        validator: Option<String>,
    },
    Failed(String),
}

/// Map a response onto a [`FetchOutcome`]. `accepted` is the status range a
/// provider considers a usable payload; 304 is always `NotModified`.
pub fn classify(resp: HttpResponse, accepted: &RangeInclusive<u16>) -> FetchOutcome {
    match resp.status {
        304 => FetchOutcome::NotModified,
        s if accepted.contains(&s) => FetchOutcome::Fetched {
            validator: resp.etag.or(resp.last_modified),
            payload: resp.body,
        },
        s => FetchOutcome::Failed(format!("unexpected status {s}")),
    }
}

/// Entity tags go in `If-None-Match`; validators that came from a
/// `Last-Modified` header go in `If-Modified-Since`.
pub fn precondition(validator: &str) -> (&'static str, String) {
    if httpdate::parse_http_date(validator).is_ok() {
        ("If-Modified-Since", validator.to_string())
    } else {
        ("If-None-Match", validator.to_string())
    }
}

/// Fetch `url`, revalidating against whatever the cache holds for `cache_key`.
///
/// Returns the payload to parse: the cached one on 304, the fresh one
/// otherwise. A failed fetch leaves the cache untouched.
pub fn conditional_fetch(
    transport: &dyn HttpTransport,
    cache: &dyn CacheStore,
    cache_key: &str,
    url: &str,
    headers: &[(&str, String)],
    accepted: &RangeInclusive<u16>,
) -> Result<String, AuthkeysError> {
    let cached = match cache.get(cache_key) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(cache_key, error = %e, "cache lookup failed; fetching unconditionally");
            None
        }
    };

    let mut request_headers = headers.to_vec();
    if let Some(entry) = cached.as_ref().filter(|e| !e.validator.is_empty()) {
        request_headers.push(precondition(&entry.validator));
    }

    let outcome = match transport.get(url, &request_headers) {
        Ok(resp) => classify(resp, accepted),
        Err(e) => FetchOutcome::Failed(e.to_string()),
    };

    match outcome {
        FetchOutcome::NotModified => {
            debug!(cache_key, "not modified; using cached payload");
            cached.map(|e| e.payload).ok_or_else(|| {
                AuthkeysError::ProviderIo(format!("GET {url}: 304 without a cached payload"))
            })
        }
        FetchOutcome::Fetched { payload, validator } => {
            let validator = validator.unwrap_or_default();
            if let Err(e) = cache.set(cache_key, &validator, &payload) {
                warn!(cache_key, error = %e, "failed to update cache");
            }
            debug!(cache_key, validator = %validator, bytes = payload.len(), "fetched");
            Ok(payload)
        }
        FetchOutcome::Failed(reason) => Err(AuthkeysError::ProviderIo(format!("GET {url}: {reason}"))),
    }
}
