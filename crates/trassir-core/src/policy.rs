//! Declarative rules for the `/settings/health/<name>` diagnostics.

use crate::report::Severity;

/// How a raw diagnostic value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// Non-zero means "set". Only a problem produces output.
    Boolean,
    /// Always reported. A threshold turns the value into an alert and a metric.
    Integer { threshold: Option<i64> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingPolicy {
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    /// Boolean: zero becomes the problem. Integer: alert below the threshold.
    pub invert: bool,
    pub disabled: bool,
    pub kind: SettingKind,
}

impl SettingPolicy {
    pub const fn flag(name: &'static str, description: &'static str, severity: Severity) -> Self {
        Self {
            name,
            description,
            severity,
            invert: false,
            disabled: false,
            kind: SettingKind::Boolean,
        }
    }

    pub const fn gauge(
        name: &'static str,
        description: &'static str,
        severity: Severity,
        threshold: Option<i64>,
    ) -> Self {
        Self {
            name,
            description,
            severity,
            invert: false,
            disabled: false,
            kind: SettingKind::Integer { threshold },
        }
    }

    pub const fn inverted(self) -> Self {
        Self {
            invert: true,
            ..self
        }
    }

    pub const fn disabled(self) -> Self {
        Self {
            disabled: true,
            ..self
        }
    }
}

pub const DEFAULT_POLICIES: &[SettingPolicy] = &[
    SettingPolicy::flag(
        "amerge_error",
        "There is an archive synchronization error on server",
        Severity::Warning,
    ),
    SettingPolicy::flag(
        "channels_bitrate_exceeded",
        "Bitrate exceeded on channel",
        Severity::Critical,
    ),
    SettingPolicy::flag(
        "channels_detector_error",
        "Server has channels with detector errors",
        Severity::Critical,
    ),
    SettingPolicy::flag(
        "channels_detector_warning",
        "Server has channels with detector warnings",
        Severity::Warning,
    ),
    SettingPolicy::flag("db_connected", "Database disconnected", Severity::Critical).inverted(),
    SettingPolicy::flag("db_is_slow", "Databases work slowly", Severity::Warning),
    SettingPolicy::flag("disks_error_count", "Disks have errors", Severity::Critical),
    SettingPolicy::flag("disks_is_slow", "Disks work slowly", Severity::Warning),
    SettingPolicy::flag("plugins_ok", "Plugins have errors", Severity::Warning)
        .inverted()
        .disabled(),
    SettingPolicy::flag("scripts_ok", "Scripts have errors", Severity::Warning)
        .inverted()
        .disabled(),
    SettingPolicy::gauge("cpu_usage", "CPU load, %", Severity::Warning, Some(85)),
    SettingPolicy::gauge("gpu_usage", "GPU load, %", Severity::Warning, Some(85)).disabled(),
    SettingPolicy::gauge(
        "channels_network_online",
        "Network channels online",
        Severity::Ok,
        None,
    ),
    SettingPolicy::gauge(
        "disks_stat_main_days",
        "Main stream archive depth, days",
        Severity::Warning,
        Some(30),
    )
    .inverted(),
    SettingPolicy::gauge(
        "disks_stat_main_gb",
        "Main stream archive volume, GB",
        Severity::Ok,
        None,
    ),
];
