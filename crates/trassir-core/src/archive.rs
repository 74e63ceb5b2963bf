use tracing::debug;

use crate::api::TrassirApi;
use crate::error::CheckError;
use crate::session::{ChannelIdentity, SessionToken};
use crate::timeline::ServerClock;

/// Playback token tying a seek command to the timeline it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamToken(String);

impl StreamToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An archive playback session. Owns the stream connection, which the server
/// needs open while it builds the timeline; dropping the session closes it.
pub struct ArchiveSession<S> {
    pub token: StreamToken,
    stream: S,
}

impl<S> ArchiveSession<S> {
    pub fn close(self) {
        debug!(token = self.token.as_str(), "closing archive session");
        drop(self.stream);
    }
}

/// Token, stream, seek. Each step needs the previous one; any failure drops
/// whatever was opened so far.
pub async fn prepare_archive_session<A>(
    api: &A,
    session: &SessionToken,
    channel: &ChannelIdentity,
    clock: &ServerClock,
) -> Result<ArchiveSession<A::Stream>, CheckError>
where
    A: TrassirApi + ?Sized,
{
    let token = api
        .request_video_token(session.as_str(), &channel.guid)
        .await?
        .map(StreamToken::new)
        .ok_or(CheckError::TokenAcquisitionFailure)?;

    let stream = api
        .open_stream(token.as_str())
        .await
        .map_err(|err| CheckError::StreamConnectFailure(err.to_string()))?;

    let at = clock.now();
    if !api.archive_seek(session.as_str(), token.as_str(), at).await? {
        return Err(CheckError::SeekFailure);
    }
    debug!(channel = %channel.name, %at, "archive seek accepted");

    Ok(ArchiveSession { token, stream })
}
