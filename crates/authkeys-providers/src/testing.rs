//! Test doubles: an HTTP transport that replays queued responses and records
//! requests, and a fixed per-identity provider configuration.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use authkeys_api::{AuthkeysError, ProviderConfig};

use crate::http::{HttpResponse, HttpTransport};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, AuthkeysError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: HttpResponse) {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(Ok(response));
        }
    }

    pub fn push_error(&self, error: AuthkeysError) {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(Err(error));
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse, AuthkeysError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(RecordedRequest {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            });
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| {
                Err(AuthkeysError::ProviderIo(format!(
                    "no scripted response for {url}"
                )))
            })
    }
}

/// Fixed provider values and templates for a single identity.
#[derive(Debug, Default, Clone)]
pub struct StaticConfig {
    values: BTreeMap<String, String>,
    templates: BTreeMap<String, String>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(mut self, provider: &str, value: impl Into<String>) -> Self {
        self.values.insert(provider.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_template(mut self, provider: &str, template: impl Into<String>) -> Self {
        self.templates.insert(provider.to_string(), template.into());
        self
    }
}

impl ProviderConfig for StaticConfig {
    fn value(&self, provider: &str) -> Option<&str> {
        self.values.get(provider).map(String::as_str)
    }

    fn template(&self, provider: &str) -> Option<&str> {
        self.templates.get(provider).map(String::as_str)
    }
}
