use thiserror::Error;

use crate::report::Status;

/// Failures talking to the server or the stream port.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timeout: {0}")]
    Timeout(String),
}

/// Everything that stops a check from producing a verdict.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("{0}")]
    Configuration(String),
    #[error("Failed to acquire valid session ID for {host}.")]
    AuthenticationFailure { host: String },
    #[error("Failed to fetch valid channel list from server for {host}.")]
    ChannelListUnavailable { host: String },
    #[error("Channel not found on {host}: {channel}")]
    ChannelNotFound { host: String, channel: String },
    #[error("Failed to get video token.")]
    TokenAcquisitionFailure,
    #[error("Unable to connect to MJPEG stream: {0}")]
    StreamConnectFailure(String),
    #[error("Archive seek command failed.")]
    SeekFailure,
    #[error("No valid timeline data found for channel {channel}.")]
    TimelineUnavailable { channel: String },
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CheckError {
    /// A stale archive is a verdict, not an error, so every fault is UNKNOWN.
    pub fn status(&self) -> Status {
        Status::Unknown
    }
}
