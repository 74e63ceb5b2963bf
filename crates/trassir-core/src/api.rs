use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{CheckConfig, TrassirEndpoint};
use crate::error::ApiError;
use crate::stream::StreamConnection;
use crate::timeline::RawTimelineEntry;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub guid: String,
}

/// The slice of the Trassir SDK the checks rely on. Non-success answers come
/// back as `Ok(None)` / `Ok(false)`; `Err` is reserved for transport faults.
#[async_trait]
pub trait TrassirApi: Send + Sync {
    /// Handle that keeps an archive playback stream open until dropped.
    type Stream: Send;

    fn host(&self) -> &str;
    async fn probe_session(&self, sid: &str) -> Result<bool, ApiError>;
    async fn login(&self, username: &str, password: &str) -> Result<Option<String>, ApiError>;
    async fn fetch_setting(&self, sid: &str, name: &str) -> Result<Option<f64>, ApiError>;
    async fn list_channels(&self, sid: &str) -> Result<Option<Vec<ChannelRecord>>, ApiError>;
    async fn request_video_token(
        &self,
        sid: &str,
        channel_guid: &str,
    ) -> Result<Option<String>, ApiError>;
    async fn open_stream(&self, token: &str) -> Result<Self::Stream, ApiError>;
    async fn archive_seek(
        &self,
        sid: &str,
        token: &str,
        at: NaiveDateTime,
    ) -> Result<bool, ApiError>;
    async fn fetch_timeline(&self, sid: &str) -> Result<Option<Vec<RawTimelineEntry>>, ApiError>;
}

pub struct HttpTrassirApi {
    http: reqwest::Client,
    endpoint: TrassirEndpoint,
    base_url: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpTrassirApi {
    pub fn new(endpoint: TrassirEndpoint, config: &CheckConfig) -> Result<Self, ApiError> {
        // Trassir servers ship self-signed certificates.
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: endpoint.base_url(),
            endpoint,
            connect_timeout: config.connect_timeout,
            read_timeout: config.request_timeout,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<Value>, ApiError> {
        let body = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?
            .text()
            .await?;

        let cleaned = strip_block_comments(&body);
        debug!(path, response = %cleaned, "api response");
        Ok(serde_json::from_str(&cleaned).ok())
    }
}

#[async_trait]
impl TrassirApi for HttpTrassirApi {
    type Stream = StreamConnection;

    fn host(&self) -> &str {
        &self.endpoint.host
    }

    async fn probe_session(&self, sid: &str) -> Result<bool, ApiError> {
        let data = self.get_json("/health", &[("sid", sid)]).await?;
        Ok(data.is_some_and(|v| v.get("cpu_load").is_some()))
    }

    async fn login(&self, username: &str, password: &str) -> Result<Option<String>, ApiError> {
        let data = self
            .get_json("/login", &[("username", username), ("password", password)])
            .await?;
        Ok(data.filter(succeeded).and_then(|v| string_field(&v, "sid")))
    }

    async fn fetch_setting(&self, sid: &str, name: &str) -> Result<Option<f64>, ApiError> {
        let data = self
            .get_json(&format!("/settings/health/{name}"), &[("sid", sid)])
            .await?;
        Ok(data.as_ref().and_then(|v| v.get("value")).and_then(numeric))
    }

    async fn list_channels(&self, sid: &str) -> Result<Option<Vec<ChannelRecord>>, ApiError> {
        let data = self.get_json("/channels", &[("sid", sid)]).await?;
        let channels = data.and_then(|mut v| v.get_mut("channels").map(Value::take));
        let Some(Value::Array(items)) = channels else {
            return Ok(None);
        };

        // Rows without a usable name or guid are skipped, not fatal.
        Ok(Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ))
    }

    async fn request_video_token(
        &self,
        sid: &str,
        channel_guid: &str,
    ) -> Result<Option<String>, ApiError> {
        let data = self
            .get_json(
                "/get_video",
                &[
                    ("channel", channel_guid),
                    ("container", "mjpeg"),
                    ("stream", "archive_main"),
                    ("sid", sid),
                ],
            )
            .await?;
        Ok(data.filter(succeeded).and_then(|v| string_field(&v, "token")))
    }

    async fn open_stream(&self, token: &str) -> Result<Self::Stream, ApiError> {
        StreamConnection::open(
            &self.endpoint.host,
            self.endpoint.stream_port,
            token,
            self.connect_timeout,
            self.read_timeout,
        )
        .await
    }

    async fn archive_seek(
        &self,
        sid: &str,
        token: &str,
        at: NaiveDateTime,
    ) -> Result<bool, ApiError> {
        let timestamp = at.format("%Y%m%dT%H%M%S").to_string();
        let data = self
            .get_json(
                "/archive_command",
                &[
                    ("command", "seek"),
                    ("timestamp", timestamp.as_str()),
                    ("direction", "0"),
                    ("sid", sid),
                    ("token", token),
                ],
            )
            .await?;
        Ok(data.as_ref().is_some_and(succeeded))
    }

    async fn fetch_timeline(&self, sid: &str) -> Result<Option<Vec<RawTimelineEntry>>, ApiError> {
        let data = self
            .get_json("/archive_status", &[("type", "timeline"), ("sid", sid)])
            .await?;
        let Some(Value::Array(items)) = data else {
            return Ok(None);
        };

        // Malformed entries are dropped one by one rather than failing the batch.
        Ok(Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ))
    }
}

/// Trassir prefixes some JSON bodies with `/* ... */` banners.
pub fn strip_block_comments(body: &str) -> String {
    BLOCK_COMMENT.replace_all(body, "").trim().to_string()
}

fn succeeded(data: &Value) -> bool {
    match data.get("success") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    }
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
