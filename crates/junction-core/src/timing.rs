//! Adaptive green-time computation.
//!
//! Pure demand + settings -> durations. No side effects, no store access;
//! the controller calls [`green_split`] once per iteration and the
//! simulator never calls it at all.

use junction_types::{Demand, Settings};

/// Upper bound on an adaptive green, in seconds.
///
/// Demand above `2 * MAX_GREEN_SECS` vehicles on an axis no longer buys
/// additional green time.
pub const MAX_GREEN_SECS: u64 = 30;

/// Green durations for one full cycle, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreenSplit {
    /// Green duration for the north/south axis.
    pub ns_secs: u64,
    /// Green duration for the east/west axis.
    pub ew_secs: u64,
}

/// Compute green durations from current demand and settings.
///
/// Each axis gets `max(default_green_time, min(30, axis_demand / 2))`
/// seconds, where `axis_demand` is the sum of the two opposing approach
/// counts and the division truncates. Both results therefore lie in
/// `[default_green_time, 30]` -- except that a `default_green_time` above
/// 30 always wins, because the lower bound is applied last.
pub fn green_split(demand: &Demand, settings: &Settings) -> GreenSplit {
    GreenSplit {
        ns_secs: axis_green(demand.north_south(), settings.default_green_time),
        ew_secs: axis_green(demand.east_west(), settings.default_green_time),
    }
}

/// Green time for a single axis given its combined demand.
fn axis_green(axis_demand: u32, default_green: u64) -> u64 {
    // Truncating division; counts are non-negative so there is no sign
    // ambiguity.
    let half = u64::from(axis_demand).checked_div(2).unwrap_or(0);
    default_green.max(half.min(MAX_GREEN_SECS))
}
