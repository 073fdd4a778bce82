//! Structure audit over documents and through the `audit` command.

use std::io::Write;

use loadgate::cli::commands::audit::{execute, AuditArgs};
use loadgate::services::{Severity, ViolationKind};
use loadgate::StructureAuditor;
use serde_json::json;
use tempfile::NamedTempFile;

fn wide(n: usize) -> serde_json::Value {
    serde_json::Value::Object((0..n).map(|i| (format!("k{i}"), json!(i))).collect())
}

#[test]
fn test_twelve_top_level_sections_is_high() {
    let report = StructureAuditor::default().audit(&wide(12));

    assert!(!report.compliant);
    assert_eq!(report.violations.len(), 1);
    let violation = &report.violations[0];
    assert_eq!(violation.kind, ViolationKind::CognitiveOverload);
    assert_eq!(violation.location, "root");
    assert_eq!(violation.count, 12);
    assert_eq!(violation.limit, 9);
    assert_eq!(violation.severity, Severity::High);
    assert!(report.suggestions[0].contains("categorical containers"));
}

#[test]
fn test_nested_overload_is_medium_with_path() {
    let document = json!({
        "agents": { "roles": (0..11).collect::<Vec<_>>() },
        "limits": { "rps": 10 },
    });
    let report = StructureAuditor::default().audit(&document);

    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].location, "agents.roles");
    assert_eq!(report.violations[0].severity, Severity::Medium);
    assert!(report.suggestions[0].contains("progressive disclosure"));
}

#[test]
fn test_boundary_nine_is_compliant() {
    let report = StructureAuditor::default().audit(&wide(9));
    assert!(report.compliant);
    assert!(report.suggestions.is_empty());
}

#[test]
fn test_plan_audit() {
    let auditor = StructureAuditor::new(7);
    let plan = [("fetch", 3), ("transform", 8), ("load", 2)];
    let report = auditor.audit_plan(&plan);

    assert!(!report.compliant);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].location, "transform");
}

#[test]
fn test_report_json_uses_type_field() {
    let report = StructureAuditor::default().audit(&wide(10));
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["violations"][0]["type"], "cognitive_overload");
    assert_eq!(value["violations"][0]["severity"], "high");
}

#[test]
fn test_audit_command_reads_yaml() {
    let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
    writeln!(file, "governor:\n  default_capacity: 7\nbreaker:\n  cooldown_secs: 30").unwrap();

    let args = AuditArgs {
        file: file.path().to_path_buf(),
        limit: 9,
        strict: true,
    };
    assert!(execute(args, true).is_ok());
}

#[test]
fn test_audit_command_strict_fails_on_violation() {
    let mut file = NamedTempFile::with_suffix(".json").unwrap();
    write!(file, "{}", wide(12)).unwrap();

    let args = AuditArgs {
        file: file.path().to_path_buf(),
        limit: 9,
        strict: true,
    };
    let err = execute(args, true).unwrap_err();
    assert!(err.to_string().contains("1 violation"));
}

#[test]
fn test_audit_command_missing_file() {
    let args = AuditArgs {
        file: "/nonexistent/loadgate-audit.yaml".into(),
        limit: 9,
        strict: false,
    };
    assert!(execute(args, true).is_err());
}
