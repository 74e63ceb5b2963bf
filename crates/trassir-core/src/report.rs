use std::fmt;

use serde::{Deserialize, Serialize};

/// Monitoring plugin state. Ordering follows the exit-code contract so that
/// aggregation is a plain `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    pub fn exit_code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Alert level a setting policy raises. UNKNOWN is reserved for faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Ok => Status::Ok,
            Severity::Warning => Status::Warning,
            Severity::Critical => Status::Critical,
        }
    }
}

/// One perfdata token: `label=value;warn;crit;min;max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: i64,
    pub warn: Option<i64>,
    pub crit: Option<i64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: i64) -> Self {
        Self {
            label: label.into(),
            value,
            warn: None,
            crit: None,
            min: None,
            max: None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_default();
        let token = format!(
            "{}={};{};{};{};{}",
            self.label,
            self.value,
            field(self.warn),
            field(self.crit),
            field(self.min),
            field(self.max)
        );
        f.write_str(token.trim_end_matches(';'))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub status: Status,
    pub findings: Vec<String>,
    pub metrics: Vec<Metric>,
}

impl CheckReport {
    pub fn new() -> Self {
        Self {
            status: Status::Ok,
            findings: Vec::new(),
            metrics: Vec::new(),
        }
    }

    pub fn unknown(message: impl fmt::Display) -> Self {
        Self {
            status: Status::Unknown,
            findings: vec![format!("UNKNOWN: {message}")],
            metrics: Vec::new(),
        }
    }

    /// Raises the status; never lowers it.
    pub fn escalate(&mut self, status: Status) {
        self.status = self.status.max(status);
    }

    pub fn push_finding(&mut self, finding: impl Into<String>) {
        self.findings.push(finding.into());
    }

    pub fn push_metric(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }
}

impl Default for CheckReport {
    fn default() -> Self {
        Self::new()
    }
}
