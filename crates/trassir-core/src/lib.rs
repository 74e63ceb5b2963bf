pub mod analysis;
pub mod api;
pub mod archive;
pub mod cache;
pub mod check;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod policy;
pub mod report;
pub mod session;
pub mod stream;
pub mod timeline;

pub use analysis::{analyze, AnalysisResult, AnalysisWindow, Freshness};
pub use api::{ChannelRecord, HttpTrassirApi, TrassirApi};
pub use archive::{prepare_archive_session, ArchiveSession, StreamToken};
pub use cache::CacheStore;
pub use check::{CheckMode, Checker};
pub use config::{CheckConfig, TrassirEndpoint};
pub use error::{ApiError, CheckError};
pub use evaluate::{evaluate, SettingSource};
pub use policy::{SettingKind, SettingPolicy, DEFAULT_POLICIES};
pub use report::{CheckReport, Metric, Severity, Status};
pub use session::{resolve_channel_id, resolve_session, ChannelIdentity, Credentials, SessionToken};
pub use timeline::{ServerClock, TimelineEntry, TimelineEvent, TimelinePoller, TimelineSource};

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod evaluate_tests;
