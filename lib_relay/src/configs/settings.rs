//! # Relay Settings
//!
//! Serde-typed configuration for the relay, loaded from a JSON file.
//!
//! Files are checked in preference order (`relay.local.json`, then
//! `relay.json`) and the first one found wins; the `RELAY_CONFIG`
//! environment variable replaces the search with an explicit path. The
//! sheet shared secret can be supplied (or overridden) via `SHEET_API_KEY`
//! so it never has to live in the config file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

/// Configuration files checked in preference order.
const CONFIG_FILES: [&str; 2] = ["relay.local.json", "relay.json"];
/// Environment variable naming an explicit config file path.
const CONFIG_ENV: &str = "RELAY_CONFIG";
/// Environment variable overriding the sheet shared secret.
const API_KEY_ENV: &str = "SHEET_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found (looked for relay.local.json, relay.json)")]
    NotFound,

    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Root configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub eddn: EddnSettings,
    pub sheet: SheetSettings,
    #[serde(default)]
    pub events: EventSettings,
    /// Interest volumes, in configured order.
    #[serde(default)]
    pub locations: Vec<LocationSettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Upstream feed connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EddnSettings {
    /// ZeroMQ endpoint of the feed relay.
    #[serde(default = "default_relay")]
    pub relay: String,
    /// Seconds of silence after which the subscription is torn down and
    /// reconnected.
    #[serde(default = "default_eddn_timeout")]
    pub timeout_secs: u64,
}

impl Default for EddnSettings {
    fn default() -> Self {
        Self {
            relay: default_relay(),
            timeout_secs: default_eddn_timeout(),
        }
    }
}

/// Spreadsheet sink settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetSettings {
    /// Endpoint receiving the form-encoded updates.
    pub url: String,
    /// Shared secret; hashed before being attached to each update.
    #[serde(default)]
    pub api_key: String,
    /// Total POST attempts per delivery.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Fixed wait between attempts, in seconds.
    #[serde(default = "default_retry_wait")]
    pub retry_wait_secs: u64,
    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Cap on how much of the response body is read, in bytes.
    #[serde(default = "default_buffer")]
    pub response_buffer: usize,
}

/// Event filtering and record shaping settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    /// Discard events whose date is not the current UTC date.
    #[serde(default = "default_true")]
    pub today_only: bool,
    /// Decimal places for the reported distance; negative disables rounding.
    #[serde(default = "default_no_rounding")]
    pub distance_dp: i32,
    /// Decimal places for the reported position; negative disables rounding.
    #[serde(default = "default_no_rounding")]
    pub location_dp: i32,
    /// Comma-separated faction names that never appear in updates.
    #[serde(default)]
    pub ignore_factions: String,
    /// Comma-separated system names always considered relevant.
    #[serde(default)]
    pub include_systems: String,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            today_only: true,
            distance_dp: -1,
            location_dp: -1,
            ignore_factions: String::new(),
            include_systems: String::new(),
        }
    }
}

/// One spherical interest volume.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationSettings {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Radius in light years.
    pub distance: f64,
}

/// Logging output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// Directory for daily-rolling log files; console-only when absent.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Default tracing filter; `RUST_LOG` still takes precedence.
    #[serde(default)]
    pub filter: Option<String>,
}

impl Settings {
    /// Loads settings from the preferred config file, honoring the
    /// `RELAY_CONFIG` and `SHEET_API_KEY` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::load_from(Path::new(&path));
        }
        for name in CONFIG_FILES {
            let path = Path::new(name);
            if path.is_file() {
                return Self::load_from(path);
            }
        }
        Err(ConfigError::NotFound)
    }

    /// Loads settings from an explicit file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if let Ok(secret) = env::var(API_KEY_ENV) {
            settings.sheet.api_key = secret;
        }
        Ok(settings)
    }
}

/// Splits a comma-separated name list into a trimmed set, dropping empties.
pub fn parse_name_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

fn default_relay() -> String {
    "tcp://eddn.edcd.io:9500".to_owned()
}

fn default_eddn_timeout() -> u64 {
    600
}

fn default_retries() -> u32 {
    3
}

fn default_retry_wait() -> u64 {
    3
}

fn default_timeout() -> u64 {
    10
}

fn default_buffer() -> usize {
    512
}

fn default_true() -> bool {
    true
}

fn default_no_rounding() -> i32 {
    -1
}
