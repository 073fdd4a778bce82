//! `loadgate audit`: check a JSON/YAML document against the 7±2 rule.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::MAX_CAPACITY;
use crate::services::{AuditReport, Severity, StructureAuditor};

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// JSON or YAML document to audit
    pub file: PathBuf,

    /// Maximum children per object or array
    #[arg(short, long, default_value_t = usize::from(MAX_CAPACITY))]
    pub limit: usize,

    /// Exit with an error when violations are found
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct AuditOutput {
    pub file: String,
    #[serde(flatten)]
    pub report: AuditReport,
}

impl CommandOutput for AuditOutput {
    fn to_human(&self) -> String {
        if self.report.compliant {
            return format!(
                "{} Cognitive Load (7±2 Principle): COMPLIANT ({})",
                style("\u{2713}").green().bold(),
                self.file
            );
        }

        let mut lines = vec![format!(
            "{} Cognitive Load (7±2 Principle): VIOLATIONS FOUND ({})",
            style("\u{2717}").red().bold(),
            self.file
        )];
        for violation in &self.report.violations {
            let severity = match violation.severity {
                Severity::High => style(violation.severity.to_string()).red().bold(),
                Severity::Medium => style(violation.severity.to_string()).yellow(),
            };
            lines.push(format!(
                "  - {}: {} items (limit: {}) [{severity}]",
                violation.location, violation.count, violation.limit
            ));
        }
        lines.push("Suggestions:".to_string());
        for suggestion in &self.report.suggestions {
            lines.push(format!("    \u{2022} {suggestion}"));
        }
        lines.join("\n")
    }
}

pub fn execute(args: AuditArgs, json_mode: bool) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let document = parse_document(&args.file, &text)?;

    let report = StructureAuditor::new(args.limit).audit(&document);
    let violations = report.violations.len();
    let compliant = report.compliant;

    output(
        &AuditOutput {
            file: args.file.display().to_string(),
            report,
        },
        json_mode,
    );

    if args.strict && !compliant {
        anyhow::bail!("structure audit found {violations} violation(s)");
    }
    Ok(())
}

fn parse_document(path: &Path, text: &str) -> Result<serde_json::Value> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(text)
            .with_context(|| format!("Invalid JSON in {}", path.display())),
        _ => serde_yaml::from_str(text)
            .with_context(|| format!("Invalid YAML in {}", path.display())),
    }
}
