use crate::commands::resolve;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quire_editor::{check_story, orphaned_contextualizations, SchemaViolation};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Exported story file
    pub input: PathBuf,

    /// Report format (text or json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// What `validate` found in one file
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValidationReport {
    pub violations: Vec<SchemaViolation>,

    /// Contextualizations whose section is gone; reported but not fatal
    pub orphaned_contextualizations: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

pub(crate) fn check_document(document: &Value) -> ValidationReport {
    match check_story(document.clone()) {
        Ok(story) => ValidationReport {
            violations: Vec::new(),
            orphaned_contextualizations: orphaned_contextualizations(&story)
                .into_iter()
                .map(|c| c.id.clone())
                .collect(),
        },
        Err(violations) => ValidationReport {
            violations,
            ..Default::default()
        },
    }
}

pub fn validate(args: ValidateArgs, cwd: &str) -> Result<()> {
    let path = resolve(cwd, &args.input);
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let document: Value = serde_json::from_str(&source)
        .with_context(|| format!("{} is not JSON", path.display()))?;

    let report = check_document(&document);
    tracing::debug!(
        path = %path.display(),
        violations = report.violations.len(),
        "Validated story"
    );

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => print_report(&path, &report),
        other => anyhow::bail!("Unknown format: {}. Use: text or json", other),
    }

    if report.is_valid() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} has {} violation(s)",
            path.display(),
            report.violations.len()
        )
    }
}

fn print_report(path: &std::path::Path, report: &ValidationReport) {
    if report.is_valid() {
        println!("  {} {}", "✓".green(), path.display());
    } else {
        println!("  {} {}", "✗".red(), path.display());
        for violation in &report.violations {
            println!("      {}", violation.to_string().red());
        }
    }

    for id in &report.orphaned_contextualizations {
        println!(
            "      {} contextualization {} points at a deleted section",
            "⚠️".yellow(),
            id.bright_white()
        );
    }
}
