use async_trait::async_trait;
use tracing::debug;

use crate::error::ApiError;
use crate::policy::{SettingKind, SettingPolicy};
use crate::report::{CheckReport, Metric, Status};

/// Supplies the live value of one diagnostic setting. `Ok(None)` means the
/// server answered without a usable number.
#[async_trait]
pub trait SettingSource: Send + Sync {
    async fn fetch_setting(&self, name: &str) -> Result<Option<f64>, ApiError>;
}

/// Walks `policies` in order, fetching each enabled setting once.
pub async fn evaluate<S>(policies: &[SettingPolicy], source: &S) -> Result<CheckReport, ApiError>
where
    S: SettingSource + ?Sized,
{
    let mut report = CheckReport::new();

    for policy in policies {
        if policy.disabled {
            continue;
        }

        let Some(value) = source.fetch_setting(policy.name).await? else {
            debug!(setting = policy.name, "invalid or missing value, skipping");
            continue;
        };

        record_observation(&mut report, policy, value);
    }

    if report.findings.is_empty() && report.status > Status::Ok {
        let label = report.status.label();
        report.push_finding(format!("{label}: Inconsistent output."));
    }

    Ok(report)
}

/// Applies one fetched value to the running report.
pub fn record_observation(report: &mut CheckReport, policy: &SettingPolicy, value: f64) {
    let severity = Status::from(policy.severity);

    match policy.kind {
        SettingKind::Boolean => {
            let set = value != 0.0;
            let problem = if policy.invert { !set } else { set };
            if problem {
                report.escalate(severity);
                report.push_finding(format!("{}: {}", severity.label(), policy.description));
            }
        }
        SettingKind::Integer { threshold: Some(threshold) } => {
            let mut metric = Metric::new(policy.name, value.trunc() as i64);
            metric.max = Some(threshold);
            report.push_metric(metric);

            let limit = threshold as f64;
            let problem = if policy.invert {
                value < limit
            } else {
                value >= limit
            };
            let prefix = if problem { severity.label() } else { "OK" };
            report.push_finding(format!("{prefix}: {} = {value:.2}", policy.description));
            if problem {
                report.escalate(severity);
            }
        }
        SettingKind::Integer { threshold: None } => {
            report.push_finding(format!("INFO: {} = {value:.2}", policy.description));
        }
    }
}
