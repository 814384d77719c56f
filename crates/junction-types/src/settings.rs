//! Operator-tunable settings and the partial-update patch.
//!
//! The settings document is read by both loops at the top of every
//! iteration (no caching), so an operator write takes effect within one
//! cycle. Field names are the wire contract.

use serde::{Deserialize, Serialize};

/// The `settings` document.
///
/// Interval fields are in whole seconds. `priority_time`, `demand_buffer`,
/// and the `emergency_mode` / `rush_hour_mode` / `pedestrian_mode` flags
/// are data-only: they are stored, merged, and served to API consumers but
/// not consumed by the control loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Duration of a yellow transition, in seconds.
    #[serde(default = "default_yellow_time")]
    pub yellow_time: u64,

    /// Duration of the all-red clearance between greens, in seconds.
    #[serde(default = "default_all_red_time")]
    pub all_red_time: u64,

    /// Minimum green duration, in seconds. Also the adaptive lower bound.
    #[serde(default = "default_green_time")]
    pub default_green_time: u64,

    /// Extra green granted to a prioritized approach, in seconds (data-only).
    #[serde(default = "default_priority_time")]
    pub priority_time: u64,

    /// Demand hysteresis buffer, in vehicles (data-only).
    #[serde(default = "default_demand_buffer")]
    pub demand_buffer: u64,

    /// Emergency mode flag (data-only).
    #[serde(default)]
    pub emergency_mode: bool,

    /// Whether the controller cycles phases automatically. When false the
    /// control loop idles and only manual overrides change the phase.
    #[serde(default = "default_true")]
    pub adaptive_mode: bool,

    /// Rush-hour mode flag (data-only).
    #[serde(default = "default_true")]
    pub rush_hour_mode: bool,

    /// Pedestrian mode flag (data-only).
    #[serde(default)]
    pub pedestrian_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            yellow_time: default_yellow_time(),
            all_red_time: default_all_red_time(),
            default_green_time: default_green_time(),
            priority_time: default_priority_time(),
            demand_buffer: default_demand_buffer(),
            emergency_mode: false,
            adaptive_mode: true,
            rush_hour_mode: true,
            pedestrian_mode: false,
        }
    }
}

impl Settings {
    /// Apply a partial update, returning the merged settings.
    ///
    /// Fields absent from the patch keep their current value, matching the
    /// merge semantics of `POST /api/settings`.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            yellow_time: patch.yellow_time.unwrap_or(self.yellow_time),
            all_red_time: patch.all_red_time.unwrap_or(self.all_red_time),
            default_green_time: patch.default_green_time.unwrap_or(self.default_green_time),
            priority_time: patch.priority_time.unwrap_or(self.priority_time),
            demand_buffer: patch.demand_buffer.unwrap_or(self.demand_buffer),
            emergency_mode: patch.emergency_mode.unwrap_or(self.emergency_mode),
            adaptive_mode: patch.adaptive_mode.unwrap_or(self.adaptive_mode),
            rush_hour_mode: patch.rush_hour_mode.unwrap_or(self.rush_hour_mode),
            pedestrian_mode: patch.pedestrian_mode.unwrap_or(self.pedestrian_mode),
        }
    }
}

/// Partial update for the settings document.
///
/// Every field is optional; `None` means "keep the stored value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    /// New yellow transition duration, if provided.
    pub yellow_time: Option<u64>,
    /// New all-red clearance duration, if provided.
    pub all_red_time: Option<u64>,
    /// New minimum green duration, if provided.
    pub default_green_time: Option<u64>,
    /// New priority extension, if provided.
    pub priority_time: Option<u64>,
    /// New demand buffer, if provided.
    pub demand_buffer: Option<u64>,
    /// New emergency mode flag, if provided.
    pub emergency_mode: Option<bool>,
    /// New adaptive mode flag, if provided.
    pub adaptive_mode: Option<bool>,
    /// New rush-hour mode flag, if provided.
    pub rush_hour_mode: Option<bool>,
    /// New pedestrian mode flag, if provided.
    pub pedestrian_mode: Option<bool>,
}

const fn default_yellow_time() -> u64 {
    2
}

const fn default_all_red_time() -> u64 {
    1
}

const fn default_green_time() -> u64 {
    5
}

const fn default_priority_time() -> u64 {
    15
}

const fn default_demand_buffer() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}
