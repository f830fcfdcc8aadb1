//! # dealroom-catalog: Contract Templates
//!
//! The clause catalog supplies each deal with its clauses. A template names
//! a contract type and lists ordered clauses; every clause offers 2–5
//! options ranked by `order`, each carrying a bias score per party.
//!
//! ## Data Format
//!
//! Templates are YAML documents. Two ship with the crate (`mutual-nda`,
//! `service-agreement`); more can be loaded from a directory at startup.
//!
//! ```yaml
//! contract_type: mutual-nda
//! title: Mutual Non-Disclosure Agreement
//! clauses:
//!   - key: confidentiality-term
//!     title: Term of Confidentiality
//!     options:
//!       - { id: one-year, order: 1, label: 1 year, bias_a: -0.6, bias_b: -0.6 }
//!       - { id: two-years, order: 2, label: 2 years, bias_a: -0.2, bias_b: -0.2 }
//! ```

pub mod catalog;
pub mod error;
pub mod loader;
pub mod template;

pub use catalog::{builtin_templates, ClauseCatalog, InMemoryCatalog};
pub use error::{CatalogError, CatalogResult};
pub use loader::{load_dir, load_template, parse_template};
pub use template::{ClauseOption, ClauseTemplate, ContractTemplate, TemplateSummary};
