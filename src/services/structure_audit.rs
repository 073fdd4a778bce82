//! 7±2 structure audit.
//!
//! Checks that a configuration document, or a planned decomposition of a
//! workflow into phases, never asks a reader to hold more than `limit`
//! sibling items at once.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::models::MAX_CAPACITY;

/// Nesting below this depth is not inspected.
const MAX_AUDIT_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    CognitiveOverload,
}

/// One container with too many children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    /// `root`, or a dotted path such as `agents.roles` / `steps[2]`.
    pub location: String,
    pub count: usize,
    pub limit: usize,
    pub severity: Severity,
}

impl Violation {
    fn overload(location: impl Into<String>, count: usize, limit: usize, severity: Severity) -> Self {
        Self {
            kind: ViolationKind::CognitiveOverload,
            location: location.into(),
            count,
            limit,
            severity,
        }
    }

    pub fn is_root(&self) -> bool {
        self.location == ROOT
    }

    /// Remediation hint for this violation.
    pub fn suggestion(&self) -> String {
        if self.is_root() {
            "Consider grouping related top-level sections under categorical containers".to_string()
        } else {
            format!(
                "Implement progressive disclosure for '{}' ({} items)",
                self.location, self.count
            )
        }
    }
}

const ROOT: &str = "root";

/// Result of an audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub suggestions: Vec<String>,
}

impl AuditReport {
    fn from_violations(violations: Vec<Violation>) -> Self {
        let suggestions = violations.iter().map(Violation::suggestion).collect();
        Self {
            compliant: violations.is_empty(),
            violations,
            suggestions,
        }
    }
}

/// Auditor for the 7±2 rule.
#[derive(Debug, Clone, Copy)]
pub struct StructureAuditor {
    limit: usize,
}

impl Default for StructureAuditor {
    fn default() -> Self {
        Self::new(usize::from(MAX_CAPACITY))
    }
}

impl StructureAuditor {
    pub fn new(limit: usize) -> Self {
        Self { limit: limit.max(1) }
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Audit a parsed JSON or YAML document.
    ///
    /// A root with too many entries is `high`; any nested object or array
    /// with too many entries is `medium`. Scalars are never violations.
    pub fn audit(&self, document: &Value) -> AuditReport {
        let mut violations = Vec::new();

        let root_count = children(document);
        if root_count > self.limit {
            violations.push(Violation::overload(ROOT, root_count, self.limit, Severity::High));
        }
        self.walk_children(document, "", 1, &mut violations);

        AuditReport::from_violations(violations)
    }

    /// Audit a planned workflow given as `(phase id, unit count)` pairs in
    /// execution order.
    pub fn audit_plan<S: AsRef<str>>(&self, phases: &[(S, usize)]) -> AuditReport {
        let mut violations = Vec::new();
        if phases.len() > self.limit {
            violations.push(Violation::overload(ROOT, phases.len(), self.limit, Severity::High));
        }
        for (phase_id, units) in phases {
            if *units > self.limit {
                violations.push(Violation::overload(
                    phase_id.as_ref(),
                    *units,
                    self.limit,
                    Severity::Medium,
                ));
            }
        }
        AuditReport::from_violations(violations)
    }

    fn walk_children(&self, value: &Value, path: &str, depth: usize, out: &mut Vec<Violation>) {
        if depth > MAX_AUDIT_DEPTH {
            return;
        }
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    self.visit(child, &child_path, depth, out);
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    self.visit(child, &format!("{path}[{index}]"), depth, out);
                }
            }
            _ => {}
        }
    }

    fn visit(&self, value: &Value, path: &str, depth: usize, out: &mut Vec<Violation>) {
        let count = children(value);
        if count > self.limit {
            out.push(Violation::overload(path, count, self.limit, Severity::Medium));
        }
        self.walk_children(value, path, depth + 1, out);
    }
}

fn children(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        _ => 0,
    }
}
