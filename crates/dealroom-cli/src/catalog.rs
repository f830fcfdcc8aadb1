//! # Catalog Subcommand
//!
//! `dealroom catalog validate <FILE>...` parses each template and applies
//! the same structural checks the server runs at startup. Exit code 1 when
//! any file fails.
//!
//! `dealroom catalog list [--dir DIR]` prints the templates a server started
//! with `DEALROOM_CATALOG_DIR=DIR` would offer.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};
use dealroom_catalog::{load_template, ClauseCatalog, TemplateSummary};

use crate::open_catalog;

/// Catalog subcommand arguments.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Validate one or more template YAML files.
    Validate {
        /// Template files to check.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List available templates.
    List {
        /// Directory of extra templates to load after the built-ins.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

/// Execute the catalog subcommand.
pub fn run_catalog(args: &CatalogArgs) -> Result<u8> {
    match &args.command {
        CatalogCommand::Validate { files } => run_validate(files),
        CatalogCommand::List { dir, json } => run_list(dir.as_deref(), *json),
    }
}

/// Check every file, reporting each one. Returns the number of failures.
pub fn validate_files(files: &[PathBuf]) -> usize {
    let mut failures = 0;
    for file in files {
        match load_template(file) {
            Ok(template) => {
                let options: usize = template.clauses.iter().map(|c| c.options.len()).sum();
                println!(
                    "  OK    {} ({}: {} clauses, {} options)",
                    file.display(),
                    template.contract_type,
                    template.clauses.len(),
                    options
                );
            }
            Err(e) => {
                failures += 1;
                println!("  FAIL  {}: {e}", file.display());
                tracing::warn!(file = %file.display(), error = %e, "template rejected");
            }
        }
    }
    failures
}

fn run_validate(files: &[PathBuf]) -> Result<u8> {
    let failures = validate_files(files);
    println!();
    println!("{} checked, {} failed", files.len(), failures);
    Ok(u8::from(failures > 0))
}

fn run_list(dir: Option<&Path>, json: bool) -> Result<u8> {
    let templates = open_catalog(dir)?.list();
    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(0);
    }
    print_table(&templates);
    Ok(0)
}

fn print_table(templates: &[TemplateSummary]) {
    println!("{:<24} {:<8} {:>7}  TITLE", "CONTRACT TYPE", "VERSION", "CLAUSES");
    for t in templates {
        println!(
            "{:<24} {:<8} {:>7}  {}",
            t.contract_type, t.version, t.clause_count, t.title
        );
    }
    println!();
    println!("Total: {} templates", templates.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONSULTING: &str = r#"
contract_type: consulting
title: Consulting Agreement
clauses:
  - key: fee-basis
    title: Fee Basis
    options:
      - { id: fixed, order: 1, label: Fixed fee, bias_a: 0.4, bias_b: 0.4 }
      - { id: hourly, order: 2, label: Hourly, bias_a: -0.2, bias_b: -0.2 }
"#;

    const ONE_OPTION: &str = r#"
contract_type: thin
title: Thin
clauses:
  - key: only
    title: Only
    options:
      - { id: solo, order: 1, label: Solo }
"#;

    #[test]
    fn validate_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("consulting.yaml");
        let bad = dir.path().join("thin.yaml");
        let missing = dir.path().join("absent.yaml");
        std::fs::write(&good, CONSULTING).unwrap();
        std::fs::write(&bad, ONE_OPTION).unwrap();

        assert_eq!(validate_files(std::slice::from_ref(&good)), 0);
        assert_eq!(validate_files(&[good, bad, missing]), 2);
    }

    #[test]
    fn run_validate_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("thin.yaml");
        std::fs::write(&bad, ONE_OPTION).unwrap();
        let args = CatalogArgs {
            command: CatalogCommand::Validate { files: vec![bad] },
        };
        assert_eq!(run_catalog(&args).unwrap(), 1);
    }

    #[test]
    fn list_includes_directory_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("consulting.yaml"), CONSULTING).unwrap();
        let types: Vec<String> = open_catalog(Some(dir.path()))
            .unwrap()
            .list()
            .into_iter()
            .map(|t| t.contract_type)
            .collect();
        assert_eq!(types, vec!["consulting", "mutual-nda", "service-agreement"]);
    }

    #[test]
    fn list_with_unreadable_dir_fails() {
        let args = CatalogArgs {
            command: CatalogCommand::List {
                dir: Some(PathBuf::from("/nonexistent/dealroom/templates")),
                json: false,
            },
        };
        assert!(run_catalog(&args).is_err());
    }
}
