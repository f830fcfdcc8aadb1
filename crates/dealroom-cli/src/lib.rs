//! # dealroom-cli: Offline Tooling for Deal Rooms
//!
//! Provides the `dealroom` command-line interface for template authors and
//! anyone tuning the compromise engine without running the server.
//!
//! ## Subcommands
//!
//! - `dealroom catalog validate`: Check template YAML files.
//! - `dealroom catalog list`: Show built-in and directory templates.
//! - `dealroom simulate`: Run one compromise round from a selections file.
//!
//! ```bash
//! dealroom catalog validate templates/lease.yaml
//! dealroom catalog list --dir templates/
//! dealroom simulate --template mutual-nda --selections picks.yaml
//! ```

pub mod catalog;
pub mod simulate;

use std::path::Path;

use anyhow::{Context, Result};
use dealroom_catalog::{load_template, ClauseCatalog, ContractTemplate, InMemoryCatalog};

/// Built-in templates plus any found in `dir`.
pub fn open_catalog(dir: Option<&Path>) -> Result<InMemoryCatalog> {
    let mut catalog = InMemoryCatalog::with_builtin().context("built-in templates failed to load")?;
    if let Some(dir) = dir {
        let added = catalog
            .extend_from_dir(dir)
            .with_context(|| format!("failed to load templates from {}", dir.display()))?;
        tracing::debug!(dir = %dir.display(), added, "loaded template directory");
    }
    Ok(catalog)
}

/// Resolve `reference` as a template file when it names an existing path,
/// otherwise as a contract type in the catalog.
pub fn resolve_template(reference: &str, dir: Option<&Path>) -> Result<ContractTemplate> {
    let path = Path::new(reference);
    if path.is_file() {
        return load_template(path)
            .with_context(|| format!("failed to load template {}", path.display()));
    }
    let catalog = open_catalog(dir)?;
    catalog
        .get_template(reference)
        .with_context(|| format!("'{reference}' is neither a template file nor a known contract type"))
}
