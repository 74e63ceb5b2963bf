use async_trait::async_trait;
use tracing::{debug, info};

use crate::analysis::{analyze, channel_report, AnalysisWindow};
use crate::api::TrassirApi;
use crate::archive::prepare_archive_session;
use crate::cache::CacheStore;
use crate::config::CheckConfig;
use crate::error::{ApiError, CheckError};
use crate::evaluate::{evaluate, SettingSource};
use crate::policy::{SettingPolicy, DEFAULT_POLICIES};
use crate::report::CheckReport;
use crate::session::{resolve_channel_id, resolve_session, Credentials, SessionToken};
use crate::timeline::{RawTimelineEntry, ServerClock, TimelinePoller, TimelineSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckMode {
    Server,
    Channel(String),
}

impl CheckMode {
    pub fn from_channel(channel: Option<String>) -> Self {
        match channel.filter(|c| !c.is_empty()) {
            Some(channel) => CheckMode::Channel(channel),
            None => CheckMode::Server,
        }
    }
}

/// Runs one check against one server.
pub struct Checker<A: TrassirApi> {
    api: A,
    config: CheckConfig,
    cache: CacheStore,
    clock: ServerClock,
    policies: &'static [SettingPolicy],
}

impl<A: TrassirApi> Checker<A> {
    pub fn new(api: A, config: CheckConfig) -> Self {
        Self {
            api,
            cache: CacheStore::new(config.cache_dir.clone()),
            clock: ServerClock::new(config.timezone_offset()),
            config,
            policies: DEFAULT_POLICIES,
        }
    }

    pub fn with_policies(mut self, policies: &'static [SettingPolicy]) -> Self {
        self.policies = policies;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn run(
        &self,
        credentials: &Credentials,
        mode: &CheckMode,
    ) -> Result<CheckReport, CheckError> {
        let session = resolve_session(&self.api, &self.cache, credentials).await?;

        match mode {
            CheckMode::Server => {
                debug!("channel not provided, performing server health check");
                self.check_server(&session).await
            }
            CheckMode::Channel(name) => self.check_channel(&session, name).await,
        }
    }

    pub async fn check_server(&self, session: &SessionToken) -> Result<CheckReport, CheckError> {
        let source = SessionScoped {
            api: &self.api,
            session,
        };
        let report = evaluate(self.policies, &source).await?;
        info!(status = %report.status, findings = report.findings.len(), "server check done");
        Ok(report)
    }

    pub async fn check_channel(
        &self,
        session: &SessionToken,
        name: &str,
    ) -> Result<CheckReport, CheckError> {
        let channel = resolve_channel_id(
            &self.api,
            &self.cache,
            session,
            name,
            self.config.channel_cache_max_age,
        )
        .await?;
        debug!(channel = %channel.name, guid = %channel.guid, "channel resolved");

        let archive = prepare_archive_session(&self.api, session, &channel, &self.clock).await?;

        let source = SessionScoped {
            api: &self.api,
            session,
        };
        let poller = TimelinePoller::new(self.config.timeline_attempts, self.config.poll_delay);
        let unavailable = || CheckError::TimelineUnavailable {
            channel: name.to_string(),
        };
        let entry = poller
            .poll(&source, &archive.token, &self.clock)
            .await?
            .ok_or_else(unavailable)?;

        let window = AnalysisWindow {
            freshness_hours: self.config.freshness_hours,
            density_hours: self.config.density_hours,
        };
        let result = analyze(&entry, self.clock.now(), &window).ok_or_else(unavailable)?;
        debug!(
            age_minutes = result.age_minutes(),
            last_event_at = %result.last_event_at,
            density = result.density,
            "timeline analysed"
        );

        archive.close();

        let report = channel_report(&result, &window);
        info!(status = %report.status, channel = %channel.name, "channel check done");
        Ok(report)
    }
}

/// Binds the API to one session so the engines only see the calls they need.
struct SessionScoped<'a, A: ?Sized> {
    api: &'a A,
    session: &'a SessionToken,
}

#[async_trait]
impl<'a, A: TrassirApi + ?Sized> SettingSource for SessionScoped<'a, A> {
    async fn fetch_setting(&self, name: &str) -> Result<Option<f64>, ApiError> {
        self.api.fetch_setting(self.session.as_str(), name).await
    }
}

#[async_trait]
impl<'a, A: TrassirApi + ?Sized> TimelineSource for SessionScoped<'a, A> {
    async fn fetch_timeline(&self) -> Result<Option<Vec<RawTimelineEntry>>, ApiError> {
        self.api.fetch_timeline(self.session.as_str()).await
    }
}
