//! Tracker configuration.
//!
//! Environment variables read by [`TrackerConfig::from_env`]:
//! - `RUNLEDGER_STORAGE_DIR`: directory holding the shared ledger database (required)
//! - `RUNLEDGER_CLIENT_NAME`: identity of this scheduler instance (default: `$HOSTNAME`, else `localhost`)
//! - `RUNLEDGER_BUSY_TIMEOUT_MS`: max wait on another writer's lock (default: 5000)
//! - `RUNLEDGER_OPERATION_TIMEOUT_MS`: per-operation deadline (default: none)

#![forbid(unsafe_code)]

use rl_storage::StoreOptions;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_STORAGE_DIR: &str = "RUNLEDGER_STORAGE_DIR";
pub const ENV_CLIENT_NAME: &str = "RUNLEDGER_CLIENT_NAME";
pub const ENV_BUSY_TIMEOUT_MS: &str = "RUNLEDGER_BUSY_TIMEOUT_MS";
pub const ENV_OPERATION_TIMEOUT_MS: &str = "RUNLEDGER_OPERATION_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CLIENT_NAME: &str = "localhost";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("invalid config document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    pub storage_dir: PathBuf,
    pub client_name: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub operation_timeout_ms: Option<u64>,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl TrackerConfig {
    pub fn new(storage_dir: impl Into<PathBuf>, client_name: impl Into<String>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            client_name: client_name.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            operation_timeout_ms: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let storage_dir = non_empty(ENV_STORAGE_DIR)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing(ENV_STORAGE_DIR))?;
        let client_name = non_empty(ENV_CLIENT_NAME)
            .or_else(|| non_empty("HOSTNAME"))
            .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string());
        let busy_timeout_ms = match non_empty(ENV_BUSY_TIMEOUT_MS) {
            Some(raw) => parse_millis(ENV_BUSY_TIMEOUT_MS, &raw)?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };
        let operation_timeout_ms = non_empty(ENV_OPERATION_TIMEOUT_MS)
            .map(|raw| parse_millis(ENV_OPERATION_TIMEOUT_MS, &raw))
            .transpose()?;

        Ok(Self {
            storage_dir,
            client_name,
            busy_timeout_ms,
            operation_timeout_ms,
        })
    }

    /// Parses a JSON document, e.g. a section of the host's own config file.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_defaults_apply() {
        let config = TrackerConfig::from_lookup(lookup(&[
            (ENV_STORAGE_DIR, "/var/lib/runledger"),
            ("HOSTNAME", "sched-7"),
        ]))
        .expect("config");
        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/runledger"));
        assert_eq!(config.client_name, "sched-7");
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert_eq!(config.operation_timeout(), None);
    }

    #[test]
    fn explicit_env_values_win() {
        let config = TrackerConfig::from_lookup(lookup(&[
            (ENV_STORAGE_DIR, "/data"),
            (ENV_CLIENT_NAME, "worker-a"),
            ("HOSTNAME", "ignored"),
            (ENV_BUSY_TIMEOUT_MS, "250"),
            (ENV_OPERATION_TIMEOUT_MS, " 1500 "),
        ]))
        .expect("config");
        assert_eq!(config.client_name, "worker-a");
        assert_eq!(config.store_options().busy_timeout, Duration::from_millis(250));
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(1_500)));
    }

    #[test]
    fn missing_storage_dir_and_bad_numbers_fail() {
        assert!(matches!(
            TrackerConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing(ENV_STORAGE_DIR))
        ));
        let err = TrackerConfig::from_lookup(lookup(&[
            (ENV_STORAGE_DIR, "/data"),
            (ENV_BUSY_TIMEOUT_MS, "soon"),
        ]))
        .expect_err("bad timeout");
        assert!(matches!(err, ConfigError::Invalid { key: ENV_BUSY_TIMEOUT_MS, .. }));
        let err = TrackerConfig::from_lookup(lookup(&[
            (ENV_STORAGE_DIR, "/data"),
            (ENV_OPERATION_TIMEOUT_MS, "0"),
        ]))
        .expect_err("zero timeout");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn json_document_uses_serde_defaults() {
        let config = TrackerConfig::from_json_str(
            r#"{"storage_dir": "/srv/ledger", "client_name": "eu-1"}"#,
        )
        .expect("config");
        assert_eq!(config, TrackerConfig::new("/srv/ledger", "eu-1"));

        assert!(matches!(
            TrackerConfig::from_json_str(r#"{"storage_dir": "/x", "client_name": "a", "extra": 1}"#),
            Err(ConfigError::Json(_))
        ));
    }
}
