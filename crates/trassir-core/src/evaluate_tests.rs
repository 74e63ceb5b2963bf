use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::evaluate::{evaluate, SettingSource};
use crate::policy::{SettingPolicy, DEFAULT_POLICIES};
use crate::report::{Severity, Status};

struct MapSource {
    values: HashMap<&'static str, f64>,
    fetched: Mutex<Vec<String>>,
}

impl MapSource {
    fn new(values: &[(&'static str, f64)]) -> Self {
        Self {
            values: values.iter().copied().collect(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().expect("fetched lock").clone()
    }
}

#[async_trait]
impl SettingSource for MapSource {
    async fn fetch_setting(&self, name: &str) -> Result<Option<f64>, ApiError> {
        self.fetched.lock().expect("fetched lock").push(name.to_string());
        Ok(self.values.get(name).copied())
    }
}

const DB_CONNECTED: SettingPolicy =
    SettingPolicy::flag("db_connected", "Database disconnected", Severity::Critical).inverted();

#[tokio::test]
async fn disabled_policies_are_never_fetched_or_reported() {
    // Arrange
    let policies = [
        SettingPolicy::flag("plugins_ok", "Plugins have errors", Severity::Warning).disabled(),
        SettingPolicy::gauge("gpu_usage", "GPU load, %", Severity::Warning, Some(85)).disabled(),
    ];
    let source = MapSource::new(&[("plugins_ok", 1.0), ("gpu_usage", 99.0)]);

    // Act
    let report = evaluate(&policies, &source).await.expect("evaluate");

    // Assert
    assert_eq!(report.status, Status::Ok);
    assert!(report.findings.is_empty());
    assert!(report.metrics.is_empty());
    assert!(source.fetched().is_empty());
}

#[tokio::test]
async fn set_boolean_reports_once_at_policy_severity() {
    let policies = [SettingPolicy::flag("db_is_slow", "Databases work slowly", Severity::Warning)];
    let source = MapSource::new(&[("db_is_slow", 1.0)]);

    let report = evaluate(&policies, &source).await.expect("evaluate");

    assert_eq!(report.status, Status::Warning);
    assert_eq!(report.findings, vec!["WARNING: Databases work slowly"]);
    assert!(report.metrics.is_empty());
}

#[tokio::test]
async fn clear_boolean_is_silent() {
    let policies = [SettingPolicy::flag("db_is_slow", "Databases work slowly", Severity::Warning)];
    let source = MapSource::new(&[("db_is_slow", 0.0)]);

    let report = evaluate(&policies, &source).await.expect("evaluate");

    assert_eq!(report.status, Status::Ok);
    assert!(report.findings.is_empty());
}

#[tokio::test]
async fn inverted_boolean_alerts_on_zero_only() {
    // Arrange
    let down = MapSource::new(&[("db_connected", 0.0)]);
    let up = MapSource::new(&[("db_connected", 1.0)]);

    // Act
    let down_report = evaluate(&[DB_CONNECTED], &down).await.expect("evaluate");
    let up_report = evaluate(&[DB_CONNECTED], &up).await.expect("evaluate");

    // Assert
    assert_eq!(down_report.status, Status::Critical);
    assert_eq!(down_report.findings, vec!["CRITICAL: Database disconnected"]);
    assert_eq!(up_report.status, Status::Ok);
    assert!(up_report.findings.is_empty());
}

#[tokio::test]
async fn integer_at_or_above_threshold_is_a_problem_with_metric() {
    // Arrange
    let policies = [SettingPolicy::gauge(
        "disks_error_count",
        "Disks have errors",
        Severity::Critical,
        Some(0),
    )];
    let source = MapSource::new(&[("disks_error_count", 3.0)]);

    // Act
    let report = evaluate(&policies, &source).await.expect("evaluate");

    // Assert
    assert_eq!(report.status, Status::Critical);
    assert_eq!(report.findings, vec!["CRITICAL: Disks have errors = 3.00"]);
    assert_eq!(report.metrics.len(), 1);
    assert_eq!(report.metrics[0].to_string(), "disks_error_count=3;;;;0");
}

#[tokio::test]
async fn integer_below_threshold_is_ok_but_keeps_metric() {
    let policies = [SettingPolicy::gauge("cpu_usage", "CPU load, %", Severity::Warning, Some(85))];
    let source = MapSource::new(&[("cpu_usage", 42.5)]);

    let report = evaluate(&policies, &source).await.expect("evaluate");

    assert_eq!(report.status, Status::Ok);
    assert_eq!(report.findings, vec!["OK: CPU load, % = 42.50"]);
    assert_eq!(report.metrics[0].to_string(), "cpu_usage=42;;;;85");
}

#[tokio::test]
async fn inverted_integer_alerts_below_threshold() {
    // Arrange
    let policies = [SettingPolicy::gauge(
        "disks_stat_main_days",
        "Main stream archive depth, days",
        Severity::Warning,
        Some(30),
    )
    .inverted()];
    let shallow = MapSource::new(&[("disks_stat_main_days", 12.0)]);
    let deep = MapSource::new(&[("disks_stat_main_days", 30.0)]);

    // Act
    let shallow_report = evaluate(&policies, &shallow).await.expect("evaluate");
    let deep_report = evaluate(&policies, &deep).await.expect("evaluate");

    // Assert
    assert_eq!(shallow_report.status, Status::Warning);
    assert_eq!(
        shallow_report.findings,
        vec!["WARNING: Main stream archive depth, days = 12.00"]
    );
    assert_eq!(deep_report.status, Status::Ok);
    assert_eq!(deep_report.findings, vec!["OK: Main stream archive depth, days = 30.00"]);
    assert_eq!(
        shallow_report.metrics[0].to_string(),
        "disks_stat_main_days=12;;;;30"
    );
    assert_eq!(deep_report.metrics[0].to_string(), "disks_stat_main_days=30;;;;30");
}

#[tokio::test]
async fn integer_without_threshold_is_informational() {
    let policies = [SettingPolicy::gauge(
        "disks_stat_main_gb",
        "Main stream archive volume, GB",
        Severity::Critical,
        None,
    )];
    let source = MapSource::new(&[("disks_stat_main_gb", 1234.0)]);

    let report = evaluate(&policies, &source).await.expect("evaluate");

    assert_eq!(report.status, Status::Ok);
    assert_eq!(report.findings, vec!["INFO: Main stream archive volume, GB = 1234.00"]);
    assert!(report.metrics.is_empty());
}

#[tokio::test]
async fn missing_values_are_skipped_without_affecting_status() {
    let policies = [
        SettingPolicy::flag("amerge_error", "Archive sync error", Severity::Warning),
        SettingPolicy::gauge("cpu_usage", "CPU load, %", Severity::Warning, Some(85)),
    ];
    let source = MapSource::new(&[]);

    let report = evaluate(&policies, &source).await.expect("evaluate");

    assert_eq!(report.status, Status::Ok);
    assert!(report.findings.is_empty());
    assert!(report.metrics.is_empty());
    assert_eq!(source.fetched(), vec!["amerge_error", "cpu_usage"]);
}

#[tokio::test]
async fn status_never_drops_after_escalation() {
    // Arrange
    let policies = [
        SettingPolicy::flag("channels_detector_error", "Detector errors", Severity::Critical),
        SettingPolicy::flag("channels_detector_warning", "Detector warnings", Severity::Warning),
        SettingPolicy::gauge("cpu_usage", "CPU load, %", Severity::Warning, Some(85)),
    ];
    let source = MapSource::new(&[
        ("channels_detector_error", 1.0),
        ("channels_detector_warning", 1.0),
        ("cpu_usage", 10.0),
    ]);

    // Act
    let report = evaluate(&policies, &source).await.expect("evaluate");

    // Assert
    assert_eq!(report.status, Status::Critical);
    assert_eq!(
        report.findings,
        vec![
            "CRITICAL: Detector errors",
            "WARNING: Detector warnings",
            "OK: CPU load, % = 10.00"
        ]
    );
}

#[tokio::test]
async fn default_table_fetches_enabled_settings_in_declared_order() {
    let source = MapSource::new(&[("db_connected", 1.0)]);

    let report = evaluate(DEFAULT_POLICIES, &source).await.expect("evaluate");

    let expected: Vec<String> = DEFAULT_POLICIES
        .iter()
        .filter(|p| !p.disabled)
        .map(|p| p.name.to_string())
        .collect();
    assert_eq!(source.fetched(), expected);
    assert!(!expected.iter().any(|n| n == "plugins_ok" || n == "gpu_usage"));
    assert_eq!(report.status, Status::Ok);
}
