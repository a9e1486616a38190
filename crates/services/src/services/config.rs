//! Environment-driven configuration for the sheet import services.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

pub const SERVICE_ACCOUNT_KEY_ENV: &str = "GOOGLE_SERVICE_ACCOUNT_KEY";
pub const SERVICE_ACCOUNT_KEY_PATH_ENV: &str = "GOOGLE_SERVICE_ACCOUNT_KEY_PATH";
pub const SYNC_INTERVAL_ENV: &str = "SHEET_SYNC_INTERVAL_SECS";

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Where the service-account key comes from. Validation of its contents
/// happens in the Sheet Client, so a missing key is not a config error here.
#[derive(Debug, Clone, Default)]
pub struct SheetsConfig {
    pub service_account_json: Option<String>,
}

impl SheetsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Some(json) = non_empty_env(SERVICE_ACCOUNT_KEY_ENV) {
            return Ok(Self {
                service_account_json: Some(json),
            });
        }

        if let Some(path) = non_empty_env(SERVICE_ACCOUNT_KEY_PATH_ENV) {
            let path = PathBuf::from(path);
            let json = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Read { path, source })?;
            return Ok(Self {
                service_account_json: Some(json),
            });
        }

        Ok(Self::default())
    }
}

/// Scheduler cadence. `None` disables the background loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncScheduleConfig {
    pub interval: Option<Duration>,
}

impl Default for SyncScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Some(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS)),
        }
    }
}

impl SyncScheduleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        match non_empty_env(SYNC_INTERVAL_ENV) {
            None => Ok(Self::default()),
            Some(raw) => Self::from_secs_str(&raw),
        }
    }

    fn from_secs_str(raw: &str) -> Result<Self, ConfigError> {
        let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            name: SYNC_INTERVAL_ENV,
            value: raw.to_string(),
        })?;
        Ok(Self {
            interval: (secs > 0).then(|| Duration::from_secs(secs)),
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
