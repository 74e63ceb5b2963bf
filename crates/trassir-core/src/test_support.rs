use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::api::{ChannelRecord, TrassirApi};
use crate::error::ApiError;
use crate::timeline::{RawTimelineEntry, TimelineEvent};

pub(crate) struct FakeStream {
    closed: Arc<AtomicBool>,
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Scriptable in-memory server. Every call is recorded by endpoint name.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub host: String,
    pub valid_sids: Vec<String>,
    pub login_sid: Option<String>,
    pub settings: HashMap<String, f64>,
    pub channels: Option<Vec<ChannelRecord>>,
    pub video_token: Option<String>,
    pub stream_fails: bool,
    pub seek_ok: bool,
    pub timeline: Option<Vec<RawTimelineEntry>>,
    pub stream_opened: Arc<AtomicBool>,
    pub stream_closed: Arc<AtomicBool>,
    calls: Mutex<Vec<String>>,
    seek_at: Mutex<Option<NaiveDateTime>>,
}

impl FakeApi {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            login_sid: Some("sid-fresh".to_string()),
            video_token: Some("tok-1".to_string()),
            seek_ok: true,
            ..Self::default()
        }
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|c| c.as_str() == endpoint)
            .count()
    }

    pub fn fetched_settings(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter_map(|c| c.strip_prefix("setting:").map(str::to_string))
            .collect()
    }

    pub fn seek_at(&self) -> Option<NaiveDateTime> {
        *self.seek_at.lock().expect("seek lock")
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("calls lock").push(call.into());
    }
}

#[async_trait]
impl TrassirApi for FakeApi {
    type Stream = FakeStream;

    fn host(&self) -> &str {
        &self.host
    }

    async fn probe_session(&self, sid: &str) -> Result<bool, ApiError> {
        self.record("probe");
        Ok(self.valid_sids.iter().any(|s| s == sid))
    }

    async fn login(&self, _username: &str, _password: &str) -> Result<Option<String>, ApiError> {
        self.record("login");
        Ok(self.login_sid.clone())
    }

    async fn fetch_setting(&self, _sid: &str, name: &str) -> Result<Option<f64>, ApiError> {
        self.record(format!("setting:{name}"));
        Ok(self.settings.get(name).copied())
    }

    async fn list_channels(&self, _sid: &str) -> Result<Option<Vec<ChannelRecord>>, ApiError> {
        self.record("channels");
        Ok(self.channels.clone())
    }

    async fn request_video_token(
        &self,
        _sid: &str,
        _channel_guid: &str,
    ) -> Result<Option<String>, ApiError> {
        self.record("video_token");
        Ok(self.video_token.clone())
    }

    async fn open_stream(&self, _token: &str) -> Result<Self::Stream, ApiError> {
        self.record("stream");
        if self.stream_fails {
            return Err(ApiError::Timeout("connecting to stream".to_string()));
        }
        self.stream_opened.store(true, Ordering::SeqCst);
        Ok(FakeStream {
            closed: Arc::clone(&self.stream_closed),
        })
    }

    async fn archive_seek(
        &self,
        _sid: &str,
        _token: &str,
        at: NaiveDateTime,
    ) -> Result<bool, ApiError> {
        self.record("seek");
        *self.seek_at.lock().expect("seek lock") = Some(at);
        Ok(self.seek_ok)
    }

    async fn fetch_timeline(&self, _sid: &str) -> Result<Option<Vec<RawTimelineEntry>>, ApiError> {
        self.record("timeline");
        Ok(self.timeline.clone())
    }
}

pub(crate) fn channel(name: &str, guid: &str) -> ChannelRecord {
    ChannelRecord {
        name: name.to_string(),
        guid: guid.to_string(),
    }
}

pub(crate) fn raw_entry(token: &str, day_start: &str, events: &[(i64, i64)]) -> RawTimelineEntry {
    RawTimelineEntry {
        token: token.to_string(),
        day_start: day_start.to_string(),
        timeline: events
            .iter()
            .map(|&(begin, end)| TimelineEvent { begin, end })
            .collect(),
    }
}
