use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::report::{CheckReport, Metric, Status};
use crate::timeline::TimelineEntry;

#[derive(Debug, Clone, Copy)]
pub struct AnalysisWindow {
    pub freshness_hours: u32,
    pub density_hours: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Freshness {
    Fresh,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub last_event_at: NaiveDateTime,
    pub age_seconds: i64,
    pub density: usize,
    pub freshness: Freshness,
}

impl AnalysisResult {
    pub fn age_minutes(&self) -> i64 {
        self.age_seconds.div_euclid(60)
    }
}

/// Measures the recency and density of `entry` against the server-local `now`.
/// Events are trusted to be in chronological order; the last one is the newest.
/// Offsets that land outside the representable calendar make the entry unusable.
pub fn analyze(
    entry: &TimelineEntry,
    now: NaiveDateTime,
    window: &AnalysisWindow,
) -> Option<AnalysisResult> {
    let day_start = entry.day_start_instant();
    let spans = entry
        .events
        .iter()
        .map(|event| Some((offset(day_start, event.begin)?, offset(day_start, event.end)?)))
        .collect::<Option<Vec<_>>>()?;
    let &(_, last_event_at) = spans.last()?;

    let density_start = hours_before(now, window.density_hours);
    // Literal overlap rule: either endpoint at or after the window start.
    let density = spans
        .iter()
        .filter(|(begin, end)| *begin >= density_start || *end >= density_start)
        .count();

    let freshness = if last_event_at >= hours_before(now, window.freshness_hours) {
        Freshness::Fresh
    } else {
        Freshness::Stale
    };

    Some(AnalysisResult {
        last_event_at,
        age_seconds: (now - last_event_at).num_seconds(),
        density,
        freshness,
    })
}

fn offset(day_start: NaiveDateTime, seconds: i64) -> Option<NaiveDateTime> {
    day_start.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

/// Window start; a window reaching past the calendar covers everything.
fn hours_before(now: NaiveDateTime, hours: u32) -> NaiveDateTime {
    TimeDelta::try_hours(i64::from(hours))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(NaiveDateTime::MIN)
}

pub fn channel_report(result: &AnalysisResult, window: &AnalysisWindow) -> CheckReport {
    let mut report = CheckReport::new();

    match result.freshness {
        Freshness::Fresh => report.push_finding(format!(
            "OK: Last timeline event {} minutes ago at {}. Archive Density: {} events in last {} hours.",
            result.age_minutes(),
            result.last_event_at.format("%Y-%m-%d %H:%M:%S"),
            result.density,
            window.density_hours
        )),
        Freshness::Stale => {
            report.escalate(Status::Warning);
            report.push_finding(format!(
                "WARNING: No timeline events found in last {} hours timespan.",
                window.freshness_hours
            ));
        }
    }

    let mut density = Metric::new("archive_density", result.density as i64);
    density.warn = Some(0);
    density.crit = Some(200);
    report.push_metric(density);

    report
}
