//! YAML loading for contract templates.

use std::path::Path;

use crate::error::{CatalogError, CatalogResult};
use crate::template::ContractTemplate;

fn read_file(path: &Path) -> CatalogResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CatalogError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            CatalogError::Io(e)
        }
    })
}

/// Parse a template from YAML text and normalize it.
pub fn parse_template(yaml: &str) -> CatalogResult<ContractTemplate> {
    let template: ContractTemplate = serde_yaml::from_str(yaml)?;
    template.normalize()
}

/// Load and normalize one template file.
pub fn load_template(path: &Path) -> CatalogResult<ContractTemplate> {
    let content = read_file(path)?;
    let template: ContractTemplate =
        serde_yaml::from_str(&content).map_err(|e| CatalogError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })?;
    template.normalize()
}

/// Load every `*.yaml` / `*.yml` file in `dir`, sorted by file name.
///
/// Fails on the first file that does not parse or validate.
pub fn load_dir(dir: &Path) -> CatalogResult<Vec<ContractTemplate>> {
    if !dir.is_dir() {
        return Err(CatalogError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
        })
        .collect();
    paths.sort();

    let mut templates = Vec::with_capacity(paths.len());
    for path in &paths {
        let template = load_template(path)?;
        tracing::debug!(
            path = %path.display(),
            contract_type = %template.contract_type,
            "loaded contract template"
        );
        templates.push(template);
    }
    Ok(templates)
}
