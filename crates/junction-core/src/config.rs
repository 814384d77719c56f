//! Configuration loading and typed config structures for the Junction
//! intersection controller.
//!
//! The canonical configuration lives in `junction-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure and provides a loader. Every field has a default, so a
//! missing file or an empty document yields a fully usable configuration.

use std::path::Path;

use junction_types::Demand;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `junction-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Intersection identity.
    #[serde(default)]
    pub intersection: IntersectionConfig,

    /// Control loop intervals.
    #[serde(default)]
    pub control: ControlConfig,

    /// Demand simulator parameters.
    #[serde(default)]
    pub traffic: TrafficConfig,

    /// Control API server address.
    #[serde(default)]
    pub server: ServerConfig,

    /// State snapshot persistence.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Intersection identity configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntersectionConfig {
    /// Human-readable intersection name.
    #[serde(default = "default_intersection_name")]
    pub name: String,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            name: default_intersection_name(),
        }
    }
}

/// Control loop interval configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControlConfig {
    /// Poll interval while `adaptive_mode` is off, in milliseconds.
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Suspend applied when the loop observes a yellow phase at the top of
    /// an iteration, in milliseconds. Guards against a busy spin after an
    /// external yellow override.
    #[serde(default = "default_yellow_hold_ms")]
    pub yellow_hold_ms: u64,

    /// Back-off after a failed loop iteration, in seconds.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: default_idle_poll_ms(),
            yellow_hold_ms: default_yellow_hold_ms(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

/// Demand simulator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrafficConfig {
    /// Simulator tick interval, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Maximum vehicles retained per approach before clamping.
    #[serde(default = "default_lane_capacity")]
    pub lane_capacity: u32,

    /// Vehicles that clear a green approach per tick.
    #[serde(default = "default_leave_rate")]
    pub leave_rate: u32,

    /// Minimum vehicles arriving at a stopped approach per tick.
    #[serde(default = "default_arrivals_min")]
    pub arrivals_min: u32,

    /// Maximum vehicles arriving at a stopped approach per tick.
    #[serde(default = "default_arrivals_max")]
    pub arrivals_max: u32,

    /// Demand seeded at simulator startup when no demand has been
    /// recorded yet, so the intersection shows traffic from the first
    /// tick rather than filling up from empty.
    #[serde(default = "default_seed_demand")]
    pub seed_demand: Demand,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            lane_capacity: default_lane_capacity(),
            leave_rate: default_leave_rate(),
            arrivals_min: default_arrivals_min(),
            arrivals_max: default_arrivals_max(),
            seed_demand: default_seed_demand(),
        }
    }
}

/// Control API server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// State snapshot persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the JSON snapshot documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Whether snapshots are written at all. When false the store is
    /// purely in-memory and state is lost on restart.
    #[serde(default = "default_true")]
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist: true,
        }
    }
}

fn default_intersection_name() -> String {
    String::from("junction-main")
}

const fn default_idle_poll_ms() -> u64 {
    2000
}

const fn default_yellow_hold_ms() -> u64 {
    500
}

const fn default_error_backoff_secs() -> u64 {
    5
}

const fn default_tick_interval_ms() -> u64 {
    2000
}

const fn default_lane_capacity() -> u32 {
    120
}

const fn default_leave_rate() -> u32 {
    10
}

const fn default_arrivals_min() -> u32 {
    2
}

const fn default_arrivals_max() -> u32 {
    6
}

const fn default_seed_demand() -> Demand {
    Demand::new(30, 25, 40, 35)
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> String {
    String::from("data")
}

const fn default_true() -> bool {
    true
}
