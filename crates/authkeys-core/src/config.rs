//! TOML configuration and the per-identity provider view.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use authkeys_api::{AuthkeysError, GithubSettings, HttpSettings, ProviderConfig};
use serde::Deserialize;
use tracing::debug;

/// Provider values and templates for one scope (`[default]` or `[users.<name>]`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub providers: Vec<String>,
    pub cache: CacheSettings,
    pub http: HttpSettings,
    pub github: GithubSettings,
    pub default: Scope,
    pub users: BTreeMap<String, Scope>,
}

impl Config {
    pub fn scoped<'a>(&'a self, identity: &str) -> ScopedConfig<'a> {
        ScopedConfig::new(self.users.get(identity), &self.default)
    }

    /// Identities with their own `[users.<name>]` table, in name order.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }
}

/// Two-level lookup: the identity's scope first, then `[default]`.
///
/// A value set to the empty string in the identity scope disables the
/// provider for that identity even when `[default]` enables it.
#[derive(Debug, Clone, Copy)]
pub struct ScopedConfig<'a> {
    user: Option<&'a Scope>,
    default: &'a Scope,
}

impl<'a> ScopedConfig<'a> {
    pub fn new(user: Option<&'a Scope>, default: &'a Scope) -> Self {
        Self { user, default }
    }
}

impl ProviderConfig for ScopedConfig<'_> {
    fn value(&self, provider: &str) -> Option<&str> {
        self.user
            .and_then(|s| s.values.get(provider))
            .or_else(|| self.default.values.get(provider))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn template(&self, provider: &str) -> Option<&str> {
        self.user
            .and_then(|s| s.templates.get(provider))
            .or_else(|| self.default.templates.get(provider))
            .map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    providers: Vec<String>,
    #[serde(default)]
    cache: CacheSettings,
    #[serde(default)]
    http: HttpSettings,
    #[serde(default)]
    github: GithubSettings,
    #[serde(default)]
    default: Scope,
    #[serde(default)]
    users: BTreeMap<String, Scope>,
}

pub const CONFIG_ENV: &str = "AUTHKEYS_CONFIG";

pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathBuf::from("/etc/authkeys/config.toml"), PathBuf::from)
}

pub fn load_config_from_file(path: &Path) -> Result<Config, AuthkeysError> {
    let content = fs::read_to_string(path)
        .map_err(|e| AuthkeysError::Config(format!("failed to read {}: {e}", path.display())))?;
    let config = parse_config(&content)
        .map_err(|e| AuthkeysError::Config(format!("{}: {e}", path.display())))?;
    debug!(
        path = %path.display(),
        providers = ?config.providers,
        users = config.users.len(),
        "configuration loaded"
    );
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config, AuthkeysError> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|e| AuthkeysError::Config(format!("invalid TOML: {e}")))?;

    if raw.http.timeout_ms == 0 {
        return Err(AuthkeysError::Config(
            "http.timeout_ms must be greater than zero".to_string(),
        ));
    }

    Ok(Config {
        providers: raw.providers,
        cache: raw.cache,
        http: raw.http,
        github: raw.github,
        default: raw.default,
        users: raw.users,
    })
}

pub const EXAMPLE_CONFIG: &str = include_str!("../../../docs/authkeys/config.toml.example");

/// Write the bundled example configuration to `path`, leaving an existing
/// file alone unless `force` is set.
pub fn write_default_config_file(path: &Path, force: bool) -> Result<bool, AuthkeysError> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            AuthkeysError::Config(format!("failed to create {}: {e}", dir.display()))
        })?;
    }
    fs::write(path, EXAMPLE_CONFIG)
        .map_err(|e| AuthkeysError::Config(format!("failed to write {}: {e}", path.display())))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
providers = ["filesystem", "github"]

[cache]
path = "/tmp/authkeys.sqlite3"

[http]
timeout_ms = 2500

[default]
filesystem = "/etc/ssh/keys/{user}"

[default.templates]
filesystem = "{type} {key}"

[users.jimmy]
github = "slizzard"

[users.jimmy.templates]
github = "{type} {key} {comment} (from github for user {user})"

[users.ops]
filesystem = ""
"#;

    #[test]
    fn parses_sample() {
        let cfg = parse_config(SAMPLE).unwrap();
        assert_eq!(cfg.providers, vec!["filesystem", "github"]);
        assert_eq!(cfg.http.timeout_ms, 2500);
        assert!(cfg.http.user_agent.starts_with("authkeys/"));
        assert_eq!(cfg.github.api_url, "https://api.github.com");
        assert_eq!(
            cfg.cache.path.as_deref(),
            Some(Path::new("/tmp/authkeys.sqlite3"))
        );
        assert_eq!(cfg.identities().collect::<Vec<_>>(), vec!["jimmy", "ops"]);
    }

    #[test]
    fn identity_scope_overrides_default() {
        let cfg = parse_config(SAMPLE).unwrap();
        let jimmy = cfg.scoped("jimmy");
        assert_eq!(jimmy.value("github"), Some("slizzard"));
        assert_eq!(jimmy.value("filesystem"), Some("/etc/ssh/keys/{user}"));
        assert_eq!(
            jimmy.template("github"),
            Some("{type} {key} {comment} (from github for user {user})")
        );
        assert_eq!(jimmy.template("filesystem"), Some("{type} {key}"));
    }

    #[test]
    fn unknown_identity_falls_back_to_default() {
        let cfg = parse_config(SAMPLE).unwrap();
        let other = cfg.scoped("nobody");
        assert!(other.is_enabled("filesystem"));
        assert!(!other.is_enabled("github"));
        assert_eq!(other.template("github"), None);
    }

    #[test]
    fn empty_value_disables_provider() {
        let cfg = parse_config(SAMPLE).unwrap();
        assert!(!cfg.scoped("ops").is_enabled("filesystem"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = parse_config("[http]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, AuthkeysError::Config(_)));
    }

    #[test]
    fn empty_file_is_valid() {
        let cfg = parse_config("").unwrap();
        assert!(cfg.providers.is_empty());
        assert!(cfg.users.is_empty());
    }

    #[test]
    fn example_config_parses() {
        let cfg = parse_config(EXAMPLE_CONFIG).unwrap();
        assert!(!cfg.providers.is_empty());
    }

    #[test]
    fn write_default_respects_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc").join("config.toml");
        assert!(write_default_config_file(&path, false).unwrap());
        fs::write(&path, "providers = []\n").unwrap();
        assert!(!write_default_config_file(&path, false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "providers = []\n");
        assert!(write_default_config_file(&path, true).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), EXAMPLE_CONFIG);
    }
}
