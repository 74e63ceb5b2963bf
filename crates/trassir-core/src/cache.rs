//! Per-host on-disk caches for the session id and the channel list.
//!
//! Several checks against the same host run concurrently, so files are only
//! ever replaced through a temp file + rename and readers never trust a
//! cached session id without revalidating it.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ChannelRecord;

pub const CACHE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCacheFile {
    pub schema_version: u32,
    pub sid: String,
    pub saved_at_unix: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCacheFile {
    pub schema_version: u32,
    pub fetched_at_unix: i64,
    pub channels: Vec<ChannelRecord>,
}

impl ChannelCacheFile {
    pub fn age_seconds(&self, now_unix: i64) -> i64 {
        now_unix - self.fetched_at_unix
    }
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn session_path(&self, host: &str) -> PathBuf {
        self.dir.join(format!("{}.sid.json", host_key(host)))
    }

    pub fn channels_path(&self, host: &str) -> PathBuf {
        self.dir.join(format!("{}.channels.json", host_key(host)))
    }

    pub fn load_session(&self, host: &str) -> Result<Option<SessionCacheFile>> {
        let file: Option<SessionCacheFile> = read_json(&self.session_path(host))?;
        Ok(file.filter(|f| current_schema(f.schema_version) && !f.sid.is_empty()))
    }

    pub fn save_session(&self, host: &str, sid: &str, now_unix: i64) -> Result<()> {
        let file = SessionCacheFile {
            schema_version: CACHE_SCHEMA_VERSION,
            sid: sid.to_string(),
            saved_at_unix: now_unix,
        };
        write_json_atomic(&self.session_path(host), &file)
    }

    pub fn load_channels(&self, host: &str) -> Result<Option<ChannelCacheFile>> {
        let file: Option<ChannelCacheFile> = read_json(&self.channels_path(host))?;
        Ok(file.filter(|f| current_schema(f.schema_version)))
    }

    pub fn save_channels(&self, host: &str, channels: &[ChannelRecord], now_unix: i64) -> Result<()> {
        let file = ChannelCacheFile {
            schema_version: CACHE_SCHEMA_VERSION,
            fetched_at_unix: now_unix,
            channels: channels.to_vec(),
        };
        write_json_atomic(&self.channels_path(host), &file)
    }
}

/// Makes a host usable as a file name.
pub fn host_key(host: &str) -> String {
    host.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn current_schema(version: u32) -> bool {
    if version != CACHE_SCHEMA_VERSION {
        debug!(version, "ignoring cache file with unsupported schema");
        return false;
    }
    true
}

/// Missing and unparseable files both read as "no cache".
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "discarding unreadable cache file");
            Ok(None)
        }
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let Some(parent_dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        bail!("cache path '{}' has no parent directory", path.display());
    };
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("failed to create {}", parent_dir.display()))?;

    let content = serde_json::to_vec_pretty(value).context("failed to encode cache file")?;
    let temp_name = format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("cache"),
        std::process::id()
    );
    let temp_path = parent_dir.join(temp_name);
    std::fs::write(&temp_path, content)
        .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}
