//! # Contract Templates
//!
//! A [`ContractTemplate`] is the catalog entry for one contract type: an
//! ordered list of [`ClauseTemplate`]s, each offering 2–5 ordered
//! [`ClauseOption`]s. Option `order` is a rank used by the negotiation
//! algorithms as a distance metric, so it must be unique within a clause.
//!
//! Templates are immutable once handed to a deal: the deal copies the
//! clauses and options it needs at creation time.

use std::collections::HashSet;

use dealroom_core::{Bias, ClauseKey, OptionId};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Fewest options a clause may offer.
pub const MIN_OPTIONS: usize = 2;
/// Most options a clause may offer.
pub const MAX_OPTIONS: usize = 5;

/// One offered choice for a clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseOption {
    /// Key, unique within the clause.
    pub id: OptionId,
    /// Rank within the clause. Distances between options are measured on it.
    pub order: u32,
    /// Short display label.
    pub label: String,
    /// Legal wording inserted into the contract if this option is agreed.
    #[serde(default)]
    pub legal_text: String,
    /// Bias of this option as seen from party A's side.
    pub bias_a: Bias,
    /// Bias of this option as seen from party B's side.
    pub bias_b: Bias,
}

/// A clause as offered by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseTemplate {
    pub key: ClauseKey,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<ClauseOption>,
}

impl ClauseTemplate {
    /// Look up an option by key.
    pub fn option(&self, id: &OptionId) -> Option<&ClauseOption> {
        self.options.iter().find(|o| &o.id == id)
    }
}

/// The catalog entry for one contract type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTemplate {
    /// Key used to request the template, e.g. `"mutual-nda"`.
    pub contract_type: String,
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Governing law proposed when the initiator does not pick one.
    #[serde(default)]
    pub default_governing_law: Option<String>,
    pub clauses: Vec<ClauseTemplate>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl ContractTemplate {
    /// Sort every clause's options by `order` and check structural rules:
    ///
    /// - the contract type is non-empty and at least one clause exists;
    /// - clause keys are unique;
    /// - each clause offers between [`MIN_OPTIONS`] and [`MAX_OPTIONS`]
    ///   options with unique keys and unique orders.
    pub fn normalize(mut self) -> CatalogResult<Self> {
        for clause in &mut self.clauses {
            clause.options.sort_by_key(|o| o.order);
        }
        self.validate()?;
        Ok(self)
    }

    /// Check the structural rules listed on [`ContractTemplate::normalize`],
    /// additionally requiring options to be sorted by `order`.
    pub fn validate(&self) -> CatalogResult<()> {
        let invalid = |reason: String| CatalogError::InvalidTemplate {
            contract_type: self.contract_type.clone(),
            reason,
        };

        if self.contract_type.trim().is_empty() {
            return Err(invalid("contract_type must not be empty".into()));
        }
        if self.clauses.is_empty() {
            return Err(invalid("template must define at least one clause".into()));
        }

        let mut keys = HashSet::new();
        for clause in &self.clauses {
            if !keys.insert(&clause.key) {
                return Err(invalid(format!("duplicate clause key {:?}", clause.key.as_str())));
            }
            let n = clause.options.len();
            if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&n) {
                return Err(invalid(format!(
                    "clause {:?} must offer {MIN_OPTIONS}-{MAX_OPTIONS} options, found {n}",
                    clause.key.as_str()
                )));
            }
            let mut ids = HashSet::new();
            for pair in clause.options.windows(2) {
                if pair[0].order >= pair[1].order {
                    return Err(invalid(format!(
                        "clause {:?} has duplicate or unsorted option order {}",
                        clause.key.as_str(),
                        pair[1].order
                    )));
                }
            }
            for option in &clause.options {
                if !ids.insert(&option.id) {
                    return Err(invalid(format!(
                        "clause {:?} has duplicate option id {:?}",
                        clause.key.as_str(),
                        option.id.as_str()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up a clause by key.
    pub fn clause(&self, key: &ClauseKey) -> Option<&ClauseTemplate> {
        self.clauses.iter().find(|c| &c.key == key)
    }

    /// Compact listing entry.
    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            contract_type: self.contract_type.clone(),
            title: self.title.clone(),
            version: self.version.clone(),
            clause_count: self.clauses.len(),
        }
    }
}

/// One row of a catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub contract_type: String,
    pub title: String,
    pub version: String,
    pub clause_count: usize,
}
