//! authkeys-providers
//!
//! The built-in key sources:
//!
//! - **`filesystem`**: authorized-key files on local disk, revalidated by
//!   modification time.
//! - **`github`**: the public keys of a GitHub account.
//! - **`website`**: a plain-text key list at an arbitrary URL.
//!
//! Both network providers go through [`conditional_fetch`], which sends the
//! cached validator as a precondition and serves the cached payload on 304.

#![forbid(unsafe_code)]

mod filesystem;
mod github;
mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
mod website;

use std::sync::Arc;

use authkeys_api::{AuthkeysError, GithubSettings, HttpSettings, Provider, RawKeyLine};

pub use filesystem::FilesystemProvider;
pub use github::GithubProvider;
pub use http::{
    FetchOutcome, HttpResponse, HttpTransport, ReqwestTransport, classify, conditional_fetch,
    precondition,
};
pub use website::WebsiteProvider;

/// Every built-in provider, sharing one HTTP client.
pub fn builtin_providers(
    http: &HttpSettings,
    github: &GithubSettings,
) -> Result<Vec<Box<dyn Provider>>, AuthkeysError> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(http)?);
    Ok(builtin_providers_with_transport(github, transport))
}

pub fn builtin_providers_with_transport(
    github: &GithubSettings,
    transport: Arc<dyn HttpTransport>,
) -> Vec<Box<dyn Provider>> {
    vec![
        Box::new(FilesystemProvider),
        Box::new(GithubProvider::new(github, Arc::clone(&transport))),
        Box::new(WebsiteProvider::new(transport)),
    ]
}

pub(crate) fn substitute_user(template: &str, identity: &str) -> String {
    template.replace("{user}", identity)
}

/// Non-blank lines of `payload`, with trailing whitespace (including `\r`) removed.
pub(crate) fn split_lines(payload: &str) -> Vec<RawKeyLine> {
    payload
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    #[test]
    fn builtin_names_are_unique() {
        let transport: Arc<dyn HttpTransport> = Arc::new(ScriptedTransport::new());
        let providers = builtin_providers_with_transport(&GithubSettings::default(), transport);
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["filesystem", "github", "website"]);
    }

    #[test]
    fn split_lines_drops_blanks_and_carriage_returns() {
        assert_eq!(
            split_lines("a b c\r\n\r\n   \n  d e\n"),
            vec!["a b c".to_string(), "  d e".to_string()]
        );
    }
}
