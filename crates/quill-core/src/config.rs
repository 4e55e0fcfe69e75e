//! QueueConfig - キューのタイミング設定
//!
//! TOML で読み込みます。すべて秒単位・省略可能で、省略時はデフォルト値を使います。
//!
//! ```toml
//! sweep_interval_secs = 300   # sweep の間隔
//! stuck_after_secs = 60       # Pending のまま放置されたとみなす経過時間
//! retention_secs = 3600       # status に関係なく削除する経過時間
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_STUCK_AFTER: Duration = Duration::from_secs(60);
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub sweep_interval: Duration,
    pub stuck_after: Duration,
    pub retention: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            stuck_after: DEFAULT_STUCK_AFTER,
            retention: DEFAULT_RETENTION,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQueueConfig {
    sweep_interval_secs: Option<u64>,
    stuck_after_secs: Option<u64>,
    retention_secs: Option<u64>,
}

impl QueueConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawQueueConfig = toml::from_str(s)?;
        let defaults = Self::default();
        let config = Self {
            sweep_interval: raw
                .sweep_interval_secs
                .map_or(defaults.sweep_interval, Duration::from_secs),
            stuck_after: raw
                .stuck_after_secs
                .map_or(defaults.stuck_after, Duration::from_secs),
            retention: raw
                .retention_secs
                .map_or(defaults.retention, Duration::from_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("sweep_interval"));
        }
        if self.stuck_after.is_zero() {
            return Err(ConfigError::ZeroDuration("stuck_after"));
        }
        if self.retention.is_zero() {
            return Err(ConfigError::ZeroDuration("retention"));
        }
        Ok(())
    }
}
