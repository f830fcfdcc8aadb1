//! # Clause Catalog
//!
//! The [`ClauseCatalog`] trait is the read-only seam through which deals
//! obtain their clauses. [`InMemoryCatalog`] is the shipped implementation:
//! it starts from the built-in templates and can be extended with a
//! directory of YAML files at startup.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CatalogError, CatalogResult};
use crate::loader;
use crate::template::{ContractTemplate, TemplateSummary};

/// Read-only source of contract templates.
pub trait ClauseCatalog: Send + Sync {
    /// Fetch the template for a contract type.
    fn get_template(&self, contract_type: &str) -> CatalogResult<ContractTemplate>;

    /// List every available template, sorted by contract type.
    fn list(&self) -> Vec<TemplateSummary>;
}

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("mutual-nda.yaml", include_str!("../templates/mutual-nda.yaml")),
    (
        "service-agreement.yaml",
        include_str!("../templates/service-agreement.yaml"),
    ),
];

/// Parse the templates compiled into the crate.
pub fn builtin_templates() -> CatalogResult<Vec<ContractTemplate>> {
    BUILTIN_TEMPLATES
        .iter()
        .map(|(name, yaml)| {
            loader::parse_template(yaml).map_err(|e| CatalogError::InvalidTemplate {
                contract_type: (*name).to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Template catalog held in memory, keyed by contract type.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    templates: BTreeMap<String, ContractTemplate>,
}

impl InMemoryCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the built-in templates.
    pub fn with_builtin() -> CatalogResult<Self> {
        let mut catalog = Self::new();
        for template in builtin_templates()? {
            catalog.insert(template)?;
        }
        Ok(catalog)
    }

    /// Add or replace a template. The template is validated first.
    pub fn insert(&mut self, template: ContractTemplate) -> CatalogResult<()> {
        template.validate()?;
        if self.templates.contains_key(&template.contract_type) {
            tracing::info!(
                contract_type = %template.contract_type,
                "replacing contract template"
            );
        }
        self.templates
            .insert(template.contract_type.clone(), template);
        Ok(())
    }

    /// Load every YAML template in `dir`, replacing same-named entries.
    /// Returns the number of templates loaded.
    pub fn extend_from_dir(&mut self, dir: &Path) -> CatalogResult<usize> {
        let templates = loader::load_dir(dir)?;
        let count = templates.len();
        for template in templates {
            self.insert(template)?;
        }
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl ClauseCatalog for InMemoryCatalog {
    fn get_template(&self, contract_type: &str) -> CatalogResult<ContractTemplate> {
        self.templates
            .get(contract_type)
            .cloned()
            .ok_or_else(|| CatalogError::TemplateNotFound {
                contract_type: contract_type.to_string(),
            })
    }

    fn list(&self) -> Vec<TemplateSummary> {
        self.templates.values().map(ContractTemplate::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_are_valid() {
        let templates = builtin_templates().unwrap();
        assert_eq!(templates.len(), 2);
        for t in &templates {
            t.validate().unwrap();
        }
    }

    #[test]
    fn builtin_catalog_lists_sorted() {
        let catalog = InMemoryCatalog::with_builtin().unwrap();
        let types: Vec<_> = catalog.list().into_iter().map(|s| s.contract_type).collect();
        assert_eq!(types, vec!["mutual-nda", "service-agreement"]);
    }

    #[test]
    fn get_template_unknown_type() {
        let catalog = InMemoryCatalog::with_builtin().unwrap();
        let err = catalog.get_template("lease").unwrap_err();
        assert!(matches!(err, CatalogError::TemplateNotFound { .. }));
    }

    #[test]
    fn service_agreement_payment_terms_span_five_orders() {
        let catalog = InMemoryCatalog::with_builtin().unwrap();
        let t = catalog.get_template("service-agreement").unwrap();
        let payment = &t.clauses[0];
        assert_eq!(payment.key.as_str(), "payment-terms");
        let orders: Vec<u32> = payment.options.iter().map(|o| o.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn extend_from_dir_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("nda.yaml"),
            r#"
contract_type: mutual-nda
title: Short NDA
version: "3.0"
clauses:
  - key: confidentiality-term
    title: Term
    options:
      - { id: one-year, order: 1, label: 1 year, bias_a: 0.0, bias_b: 0.0 }
      - { id: two-years, order: 2, label: 2 years, bias_a: 0.0, bias_b: 0.0 }
"#,
        )
        .unwrap();

        let mut catalog = InMemoryCatalog::with_builtin().unwrap();
        assert_eq!(catalog.extend_from_dir(dir.path()).unwrap(), 1);
        assert_eq!(catalog.len(), 2);
        let nda = catalog.get_template("mutual-nda").unwrap();
        assert_eq!(nda.version, "3.0");
        assert_eq!(nda.clauses.len(), 1);
    }
}
