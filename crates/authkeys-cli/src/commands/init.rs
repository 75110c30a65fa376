use std::path::Path;

use authkeys_core::write_default_config_file;

use crate::pout;

pub fn cmd_init(path: &Path, force: bool, json: bool) -> anyhow::Result<()> {
    let written = write_default_config_file(path, force)?;
    let text = if written {
        format!("Wrote example configuration to {}", path.display())
    } else {
        format!("{} already exists; pass --force to overwrite", path.display())
    };
    pout(
        json,
        &serde_json::json!({ "written": written, "path": path }),
        &text,
    )
}
