//! # Simulate Subcommand
//!
//! Runs one compromise round offline: both parties' selections come from a
//! YAML file instead of a live deal, and the suggestions are printed rather
//! than stored. Useful when authoring templates or tuning the fairness pass.
//!
//! ```yaml
//! clauses:
//!   - clause: confidentiality-term
//!     a: { option: five-years, priority: 4, flexibility: 2 }
//!     b: { option: one-year, priority: 4 }
//! ```
//!
//! Priority and flexibility default to 3 when omitted.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use dealroom_catalog::ContractTemplate;
use dealroom_core::{ClauseId, Flexibility, OptionId, Priority};
use dealroom_negotiation::{plan_round, ClauseInput, FairnessRebalancer, PartyChoice, Strategy};

use crate::resolve_template;

/// Simulate subcommand arguments.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Contract type from the catalog, or a path to a template file.
    #[arg(long)]
    pub template: String,

    /// YAML file with both parties' selections.
    #[arg(long)]
    pub selections: PathBuf,

    /// Directory of extra templates to search for the contract type.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Mean-satisfaction gap that triggers rebalancing.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Pull toward the disadvantaged party's original choice.
    #[arg(long)]
    pub pull: Option<f64>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionsFile {
    pub clauses: Vec<ClauseEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClauseEntry {
    /// Clause key from the template.
    pub clause: String,
    pub a: ChoiceEntry,
    pub b: ChoiceEntry,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChoiceEntry {
    pub option: String,
    #[serde(default = "middle")]
    pub priority: i64,
    #[serde(default = "middle")]
    pub flexibility: i64,
}

fn middle() -> i64 {
    3
}

impl ChoiceEntry {
    fn to_choice(&self, clause: &str, party: char) -> Result<PartyChoice> {
        let context = || format!("clause '{clause}', party {party}");
        Ok(PartyChoice {
            option_id: OptionId::new(self.option.clone()).with_context(context)?,
            priority: Priority::new(self.priority).with_context(context)?,
            flexibility: Flexibility::new(self.flexibility).with_context(context)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub contract_type: String,
    pub agreed: Vec<AgreedRow>,
    pub suggestions: Vec<SuggestionRow>,
    pub mean_satisfaction_a: Option<f64>,
    pub mean_satisfaction_b: Option<f64>,
    pub fairness_adjustments: usize,
}

#[derive(Debug, Serialize)]
pub struct AgreedRow {
    pub clause: String,
    pub option: OptionId,
}

#[derive(Debug, Serialize)]
pub struct SuggestionRow {
    pub clause: String,
    pub suggested_option: OptionId,
    pub satisfaction_a: u8,
    pub satisfaction_b: u8,
    pub strategy: Strategy,
    pub fairness_adjusted: bool,
    pub reasoning: String,
}

/// Parse a selections file.
pub fn load_selections(path: &Path) -> Result<SelectionsFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read selections file {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse selections file {}", path.display()))
}

/// Plan one round for `template` with the given selections.
///
/// Every template clause needs an entry; entries for clauses the template
/// does not have are rejected.
pub fn simulate(
    template: &ContractTemplate,
    selections: &SelectionsFile,
    rebalancer: &FairnessRebalancer,
) -> Result<SimulationReport> {
    let known: HashSet<&str> = template.clauses.iter().map(|c| c.key.as_str()).collect();
    let mut entries: HashMap<&str, &ClauseEntry> = HashMap::new();
    for entry in &selections.clauses {
        if !known.contains(entry.clause.as_str()) {
            bail!(
                "template '{}' has no clause '{}'",
                template.contract_type,
                entry.clause
            );
        }
        if entries.insert(entry.clause.as_str(), entry).is_some() {
            bail!("clause '{}' is listed more than once", entry.clause);
        }
    }

    let missing: Vec<&str> = template
        .clauses
        .iter()
        .map(|c| c.key.as_str())
        .filter(|k| !entries.contains_key(k))
        .collect();
    if !missing.is_empty() {
        bail!(
            "missing selections for {} clause(s): {}",
            missing.len(),
            missing.join(", ")
        );
    }

    let mut keys: HashMap<ClauseId, String> = HashMap::new();
    let mut inputs = Vec::with_capacity(template.clauses.len());
    for clause in &template.clauses {
        let key = clause.key.as_str();
        let entry = entries[key];
        let clause_id = ClauseId::new();
        keys.insert(clause_id, key.to_string());
        inputs.push(ClauseInput {
            clause_id,
            title: clause.title.clone(),
            options: clause.options.clone(),
            party_a: entry.a.to_choice(key, 'a')?,
            party_b: entry.b.to_choice(key, 'b')?,
        });
    }

    let plan = plan_round(&inputs, &HashMap::new(), rebalancer)?;
    tracing::debug!(
        agreed = plan.agreed.len(),
        suggested = plan.suggestions.len(),
        adjusted = plan.fairness.adjusted,
        "round planned"
    );

    let key_of = |id: &ClauseId| keys.get(id).cloned().unwrap_or_else(|| id.to_string());
    Ok(SimulationReport {
        contract_type: template.contract_type.clone(),
        agreed: plan
            .agreed
            .iter()
            .map(|(id, option)| AgreedRow {
                clause: key_of(id),
                option: option.clone(),
            })
            .collect(),
        suggestions: plan
            .suggestions
            .iter()
            .map(|s| SuggestionRow {
                clause: key_of(&s.clause_id),
                suggested_option: s.suggested_option_id.clone(),
                satisfaction_a: s.satisfaction_a.value(),
                satisfaction_b: s.satisfaction_b.value(),
                strategy: s.strategy,
                fairness_adjusted: s.fairness_adjusted,
                reasoning: s.reasoning.clone(),
            })
            .collect(),
        mean_satisfaction_a: plan.fairness.mean_satisfaction_a,
        mean_satisfaction_b: plan.fairness.mean_satisfaction_b,
        fairness_adjustments: plan.fairness.adjusted,
    })
}

/// Execute the simulate subcommand.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let template = resolve_template(&args.template, args.dir.as_deref())?;
    let selections = load_selections(&args.selections)?;
    let defaults = FairnessRebalancer::default();
    let rebalancer = FairnessRebalancer {
        threshold: args.threshold.unwrap_or(defaults.threshold),
        pull: args.pull.unwrap_or(defaults.pull),
    };

    let report = simulate(&template, &selections, &rebalancer)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(0)
}

fn strategy_label(strategy: &Strategy) -> String {
    match strategy {
        Strategy::MiddleGround => "middle ground".to_string(),
        Strategy::ExactChoice(role) => format!("exact choice ({role})"),
        Strategy::LeanToward(role) => format!("lean toward {role}"),
        Strategy::CounterProposal(role) => format!("counter-proposal ({role})"),
    }
}

fn print_report(report: &SimulationReport) {
    println!("Round simulation for {}", report.contract_type);
    println!();
    for row in &report.agreed {
        println!("  {:<28} AGREED   {}", row.clause, row.option);
    }
    for row in &report.suggestions {
        println!(
            "  {:<28} SUGGEST  {:<24} A {:>3}  B {:>3}  {}{}",
            row.clause,
            row.suggested_option.as_str(),
            row.satisfaction_a,
            row.satisfaction_b,
            strategy_label(&row.strategy),
            if row.fairness_adjusted { "  [rebalanced]" } else { "" }
        );
        println!("  {:<28} {}", "", row.reasoning);
    }
    println!();
    match (report.mean_satisfaction_a, report.mean_satisfaction_b) {
        (Some(a), Some(b)) => println!("Mean satisfaction: A {a:.1}, B {b:.1}"),
        _ => println!("Mean satisfaction: n/a (no divergent clauses)"),
    }
    println!("Fairness adjustments: {}", report.fairness_adjustments);
}
