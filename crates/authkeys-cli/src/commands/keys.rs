use std::io::{self, Write};

use authkeys_api::CacheStore;
use authkeys_core::Config;
use authkeys_runtime::{Pipeline, ProviderRegistry};

use crate::wiring;

/// `authkeys keys <USER>`: the sshd `AuthorizedKeysCommand` entry point.
/// Zero keys is a successful, empty answer.
pub fn cmd_keys(config: &Config, user: &str) -> anyhow::Result<()> {
    let registry = wiring::build_registry(config)?;
    let cache = wiring::open_cache(config);
    let mut stdout = io::stdout().lock();
    write_keys(config, &registry, cache.as_ref(), user, &mut stdout)
}

fn write_keys(
    config: &Config,
    registry: &ProviderRegistry,
    cache: &dyn CacheStore,
    user: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let lines = Pipeline::new(&config.providers, registry, cache).run(user, &config.scoped(user));
    for line in &lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use authkeys_cache::DisabledCache;
    use authkeys_core::parse_config;

    fn fixture() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("jimmy"),
            "ssh-ed25519 AAAAC3 jimmy@laptop\n\nssh-rsa AAAAB3 jimmy@desktop\n",
        )
        .unwrap();
        let cfg = parse_config(&format!(
            "providers = [\"filesystem\"]\n[default]\nfilesystem = \"{}/{{user}}\"\n[users.jimmy.templates]\nfilesystem = \"{{type}} {{key}} {{comment}} (for {{user}})\"\n",
            dir.path().display()
        ))
        .unwrap();
        (dir, cfg)
    }

    #[test]
    fn writes_one_line_per_key() {
        let (_dir, cfg) = fixture();
        let registry = wiring::build_registry(&cfg).unwrap();
        let mut out = Vec::new();
        write_keys(&cfg, &registry, &DisabledCache, "jimmy", &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ssh-ed25519 AAAAC3 jimmy@laptop (for jimmy)\nssh-rsa AAAAB3 jimmy@desktop (for jimmy)\n"
        );
    }

    #[test]
    fn unknown_user_prints_nothing() {
        let (_dir, cfg) = fixture();
        let registry = wiring::build_registry(&cfg).unwrap();
        let mut out = Vec::new();
        write_keys(&cfg, &registry, &DisabledCache, "nobody", &mut out).unwrap();
        assert!(out.is_empty());
    }
}
