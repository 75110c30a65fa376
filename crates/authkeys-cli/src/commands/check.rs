use std::io::{self, Write};

use anyhow::bail;
use authkeys_api::AuthkeysError;
use authkeys_core::Config;
use authkeys_runtime::{CheckReport, CheckRunner, ProviderRegistry};

use crate::wiring;

/// `authkeys check`: exits non-zero when the provider list is invalid or any
/// provider fails for any configured identity.
pub fn cmd_check(config: &Config, json: bool) -> anyhow::Result<()> {
    let registry = wiring::build_registry(config)?;
    let cache = wiring::open_cache(config);
    let outcome = CheckRunner::new(&registry, cache.as_ref()).check(config);

    let mut stdout = io::stdout().lock();
    let passed = write_report(config, &registry, &outcome, json, &mut stdout)?;
    if !passed {
        bail!("check failed");
    }
    Ok(())
}

fn write_report(
    config: &Config,
    registry: &ProviderRegistry,
    outcome: &Result<CheckReport, AuthkeysError>,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let passed = outcome.as_ref().is_ok_and(CheckReport::passed);

    if json {
        let value = match outcome {
            Ok(report) => serde_json::json!({
                "passed": passed,
                "providers": report.providers,
                "entries": report.entries,
            }),
            Err(e) => serde_json::json!({
                "passed": false,
                "providers": config.providers,
                "error": e.to_string(),
            }),
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        return Ok(passed);
    }

    writeln!(out, "Providers:")?;
    if config.providers.is_empty() {
        writeln!(out, "  ✗ none configured")?;
    }
    for name in &config.providers {
        if registry.contains(name) {
            writeln!(out, "  ✓ {name}")?;
        } else {
            writeln!(out, "  ✗ {name} (unknown provider)")?;
        }
    }

    match outcome {
        Ok(report) => {
            writeln!(out, "\nIdentities:")?;
            if report.entries.is_empty() {
                writeln!(out, "  (no [users] entries to exercise)")?;
            }
            for entry in &report.entries {
                let label = format!("{}/{}", entry.identity, entry.provider);
                match &entry.error {
                    None => {
                        let noun = if entry.keys == 1 { "key" } else { "keys" };
                        writeln!(out, "  ✓ {label} ({} {noun})", entry.keys)?;
                    }
                    Some(err) => writeln!(out, "  ✗ {label}: {err}")?,
                }
            }
        }
        Err(e) => writeln!(out, "\n  ✗ {e}")?,
    }

    writeln!(out)?;
    writeln!(out, "{}", if passed { "OK" } else { "FAILED" })?;
    out.flush()?;
    Ok(passed)
}
