use std::fmt;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::api::{ChannelRecord, TrassirApi};
use crate::cache::CacheStore;
use crate::error::CheckError;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SID issued by `/login`, required on every other call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentity {
    pub name: String,
    pub guid: String,
}

/// Reuses the cached SID when the server still accepts it, otherwise logs in
/// and caches the new one.
pub async fn resolve_session<A>(
    api: &A,
    cache: &CacheStore,
    credentials: &Credentials,
) -> Result<SessionToken, CheckError>
where
    A: TrassirApi + ?Sized,
{
    let host = api.host();

    let cached = cache.load_session(host).unwrap_or_else(|err| {
        warn!(host, error = %err, "session cache unreadable");
        None
    });
    if let Some(cached) = cached {
        if api.probe_session(&cached.sid).await? {
            debug!(host, "cached SID is valid");
            return Ok(SessionToken::new(cached.sid));
        }
        debug!(host, "cached SID is invalid or expired");
    }

    let sid = api
        .login(&credentials.username, &credentials.password)
        .await?
        .ok_or_else(|| CheckError::AuthenticationFailure {
            host: host.to_string(),
        })?;

    if let Err(err) = cache.save_session(host, &sid, Utc::now().timestamp()) {
        warn!(host, error = %err, "failed to cache SID");
    }
    debug!(host, "new SID acquired");
    Ok(SessionToken::new(sid))
}

/// Finds the first channel whose name contains `name`.
///
/// Matching is a case-sensitive substring test, so "Camera-1" also matches
/// "Camera-12". A fresh cache that lacks the channel is refreshed once.
pub async fn resolve_channel_id<A>(
    api: &A,
    cache: &CacheStore,
    session: &SessionToken,
    name: &str,
    max_age: Duration,
) -> Result<ChannelIdentity, CheckError>
where
    A: TrassirApi + ?Sized,
{
    let host = api.host();
    let not_found = || CheckError::ChannelNotFound {
        host: host.to_string(),
        channel: name.to_string(),
    };
    if name.is_empty() {
        return Err(not_found());
    }

    let now = Utc::now().timestamp();
    let cached = cache.load_channels(host).unwrap_or_else(|err| {
        warn!(host, error = %err, "channel cache unreadable");
        None
    });
    if let Some(file) = cached {
        let age = file.age_seconds(now);
        if age <= max_age.as_secs() as i64 {
            debug!(host, age, "using cached channel list");
            if let Some(identity) = find_channel(&file.channels, name) {
                return Ok(identity);
            }
            debug!(host, channel = name, "channel missing from cache, refreshing");
        }
    }

    let channels = api
        .list_channels(session.as_str())
        .await?
        .ok_or_else(|| CheckError::ChannelListUnavailable {
            host: host.to_string(),
        })?;
    if let Err(err) = cache.save_channels(host, &channels, now) {
        warn!(host, error = %err, "failed to cache channel list");
    }

    find_channel(&channels, name).ok_or_else(not_found)
}

pub fn find_channel(channels: &[ChannelRecord], name: &str) -> Option<ChannelIdentity> {
    channels
        .iter()
        .find(|ch| ch.name.contains(name))
        .filter(|ch| !ch.guid.is_empty())
        .map(|ch| ChannelIdentity {
            name: ch.name.clone(),
            guid: ch.guid.clone(),
        })
}
