// src/config/mod.rs
//! Configuration file: feeds, detectors, listeners and pipeline settings.
//!
//! TOML by default, JSON when the file extension is `.json`. The path comes
//! from the CLI, then `$XPD_CONFIG`, then `xpd.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::ingest::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_QUEUE_CAPACITY};

pub const ENV_CONFIG_PATH: &str = "XPD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "xpd.toml";

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_feed_kind() -> String {
    "rss".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    /// Tried in order; the first one with matches wins.
    #[serde(default)]
    pub detectors: Vec<TypeConfig>,
    /// Console output when empty.
    #[serde(default)]
    pub listeners: Vec<TypeConfig>,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            detectors: Vec::new(),
            listeners: Vec::new(),
            history_capacity: default_history_capacity(),
            poll_interval_secs: default_poll_interval_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub id: String,
    pub url: String,
    /// "rss" | "mbox"
    #[serde(default = "default_feed_kind")]
    pub kind: String,
    /// HTTP fetch timeout for rss feeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl FeedConfig {
    pub fn rss(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            kind: default_feed_kind(),
            timeout_secs: None,
        }
    }
}

/// `{ type, params }` spec for a detector or listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TypeConfig {
    #[serde(rename = "type")]
    pub kind: String,
    /// Scalar values; numbers and booleans are kept in their textual form.
    #[serde(default, deserialize_with = "scalar_params")]
    pub params: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

fn scalar_params<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Scalar::Text(s) => s,
                Scalar::Integer(n) => n.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Bool(b) => b.to_string(),
            };
            (key, text)
        })
        .collect())
}

impl TypeConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn required_param(&self, key: &str) -> Result<&str, ConfigError> {
        self.param(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingParam {
                owner: self.kind.clone(),
                key: key.to_string(),
            })
    }

    /// Finite, non-negative ratio; `default` when the key is absent.
    pub fn ratio_param(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        let Some(raw) = self.param(key) else {
            return Ok(default);
        };
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| ConfigError::InvalidParam {
                owner: self.kind.clone(),
                key: key.to_string(),
                value: raw.to_string(),
            })
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::parse(&content, &ext).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    fn parse(content: &str, hint_ext: &str) -> Result<Self, String> {
        if hint_ext == "json" {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            toml::from_str(content).map_err(|e| e.to_string())
        }
    }

    /// Structural checks that need no construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feeds.is_empty() {
            return Err(ConfigError::NoFeeds);
        }
        if self.detectors.is_empty() {
            return Err(ConfigError::NoDetectors);
        }
        Ok(())
    }
}

/// CLI path, else `$XPD_CONFIG`, else `xpd.toml`.
pub fn resolve_path(cli: Option<PathBuf>) -> PathBuf {
    cli.or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
