use std::path::PathBuf;
use std::time::Duration;

/// Where the Trassir server lives. The SDK API is served over HTTPS on `port`,
/// archive playback streams over plain HTTP on `stream_port`.
#[derive(Debug, Clone)]
pub struct TrassirEndpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub stream_port: u16,
}

impl TrassirEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: "https".to_string(),
            host: host.into(),
            port,
            stream_port: 555,
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub cache_dir: PathBuf,
    pub channel_cache_max_age: Duration,
    pub freshness_hours: u32,
    pub density_hours: u32,
    pub timezone_offset_hours: i32,
    pub timeline_attempts: u32,
    pub poll_delay: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl CheckConfig {
    pub fn timezone_offset(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.timezone_offset_hours))
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("/var/tmp/check_trassir"),
            channel_cache_max_age: Duration::from_secs(12 * 3600),
            freshness_hours: 24,
            density_hours: 1,
            timezone_offset_hours: 0,
            timeline_attempts: 10,
            poll_delay: Duration::from_millis(700),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}
