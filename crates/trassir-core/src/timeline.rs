use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use tokio::time::sleep;
use tracing::debug;

use crate::archive::StreamToken;
use crate::error::ApiError;

/// The server reports today's entry with this date.
const EPOCH_DAY: &str = "1970-01-01";

/// One recorded interval, in seconds from the entry's day start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimelineEvent {
    #[serde(deserialize_with = "seconds")]
    pub begin: i64,
    #[serde(deserialize_with = "seconds")]
    pub end: i64,
}

/// A timeline entry exactly as `/archive_status?type=timeline` returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTimelineEntry {
    pub token: String,
    pub day_start: String,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub token: String,
    pub day_start: NaiveDate,
    pub events: Vec<TimelineEvent>,
}

impl TimelineEntry {
    pub fn day_start_instant(&self) -> NaiveDateTime {
        self.day_start.and_time(chrono::NaiveTime::MIN)
    }
}

/// Wall clock of the server: UTC shifted by the operator's timezone offset.
#[derive(Debug, Clone, Copy)]
pub struct ServerClock {
    offset: chrono::Duration,
}

impl ServerClock {
    pub fn new(offset: chrono::Duration) -> Self {
        Self { offset }
    }

    pub fn now(&self) -> NaiveDateTime {
        (Utc::now() + self.offset).naive_utc()
    }
}

/// Supplies one full timeline snapshot. `Ok(None)` means the body was not a
/// timeline array.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    async fn fetch_timeline(&self) -> Result<Option<Vec<RawTimelineEntry>>, ApiError>;
}

/// Picks the entry for `token` whose day is nearest to `now`, first one on ties.
pub fn select_entry(
    entries: Vec<RawTimelineEntry>,
    token: &StreamToken,
    now: NaiveDateTime,
) -> Option<TimelineEntry> {
    let mut best: Option<(i64, TimelineEntry)> = None;

    for raw in entries {
        if raw.token != token.as_str() || raw.timeline.is_empty() {
            continue;
        }

        let day_start = if raw.day_start == EPOCH_DAY {
            now.date()
        } else {
            match NaiveDate::parse_from_str(&raw.day_start, "%Y-%m-%d") {
                Ok(day) => day,
                Err(_) => continue,
            }
        };

        let entry = TimelineEntry {
            token: raw.token,
            day_start,
            events: raw.timeline,
        };
        let distance = (now - entry.day_start_instant()).num_seconds().abs();

        if best.as_ref().map_or(true, |(best_distance, _)| distance < *best_distance) {
            best = Some((distance, entry));
        }
    }

    best.map(|(_, entry)| entry)
}

#[derive(Debug, Clone, Copy)]
pub struct TimelinePoller {
    attempts: u32,
    delay: Duration,
}

impl TimelinePoller {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Waits `delay` before every attempt; the server needs that time to build
    /// the index after a seek. Gives up with `Ok(None)` after `attempts`.
    pub async fn poll<S>(
        &self,
        source: &S,
        token: &StreamToken,
        clock: &ServerClock,
    ) -> Result<Option<TimelineEntry>, ApiError>
    where
        S: TimelineSource + ?Sized,
    {
        for attempt in 0..self.attempts {
            sleep(self.delay).await;

            let Some(entries) = source.fetch_timeline().await? else {
                debug!(attempt, "invalid timeline response format");
                continue;
            };

            if let Some(entry) = select_entry(entries, token, clock.now()) {
                debug!(attempt, day_start = %entry.day_start, "valid timeline found");
                return Ok(Some(entry));
            }

            debug!(attempt, "no valid timeline data yet");
        }

        debug!(attempts = self.attempts, "timeline data never appeared");
        Ok(None)
    }
}

fn seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Int(v) => Ok(v),
        Seconds::Float(v) => Ok(v.trunc() as i64),
        Seconds::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid seconds value: {s}"))),
    }
}
