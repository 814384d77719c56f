//! Signal phases, approaches, and the phase-status document.
//!
//! The phase tag values (`RED`, `NS`, `EW`, `YELLOW_NS`, `YELLOW_EW`) and
//! the `phase-status` field names are the wire contract shared with the
//! Control API and any external tooling that inspects the store.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Approaches
// ---------------------------------------------------------------------------

/// One of the four directions meeting at the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    /// Traffic arriving from the north.
    North,
    /// Traffic arriving from the south.
    South,
    /// Traffic arriving from the east.
    East,
    /// Traffic arriving from the west.
    West,
}

impl Approach {
    /// All four approaches in a fixed order.
    pub const ALL: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// The signal's current right-of-way state.
///
/// The cycle visits `Red -> NsGreen -> YellowNs -> Red -> EwGreen ->
/// YellowEw -> Red -> ...`; the yellow states are transitional and are
/// normally only ever written mid-transition (or by an external override).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// All approaches stopped.
    #[serde(rename = "RED")]
    Red,
    /// North and south have right of way.
    #[serde(rename = "NS")]
    NsGreen,
    /// East and west have right of way.
    #[serde(rename = "EW")]
    EwGreen,
    /// North/south green is ending.
    #[serde(rename = "YELLOW_NS")]
    YellowNs,
    /// East/west green is ending.
    #[serde(rename = "YELLOW_EW")]
    YellowEw,
}

impl Phase {
    /// Parse a wire-format phase tag.
    ///
    /// Returns `None` for anything outside the five valid values. The
    /// match is exact (case-sensitive), matching the wire contract.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "RED" => Some(Self::Red),
            "NS" => Some(Self::NsGreen),
            "EW" => Some(Self::EwGreen),
            "YELLOW_NS" => Some(Self::YellowNs),
            "YELLOW_EW" => Some(Self::YellowEw),
            _ => None,
        }
    }

    /// The wire-format tag for this phase.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::NsGreen => "NS",
            Self::EwGreen => "EW",
            Self::YellowNs => "YELLOW_NS",
            Self::YellowEw => "YELLOW_EW",
        }
    }

    /// Whether this phase grants right of way to the given approach.
    pub const fn grants_right_of_way(self, approach: Approach) -> bool {
        match (self, approach) {
            (Self::NsGreen, Approach::North | Approach::South)
            | (Self::EwGreen, Approach::East | Approach::West) => true,
            _ => false,
        }
    }

    /// Whether this is one of the two transitional yellow states.
    pub const fn is_yellow(self) -> bool {
        matches!(self, Self::YellowNs | Self::YellowEw)
    }
}

// ---------------------------------------------------------------------------
// Phase status document
// ---------------------------------------------------------------------------

/// The `phase-status` document: the active phase plus the wall-clock time
/// of the last change.
///
/// The timestamp is float epoch seconds (wire contract). It is
/// monotonically non-decreasing across writes from a single writer, but a
/// concurrent external override may land out of order -- an accepted race.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseStatus {
    /// The currently active phase.
    pub active_phase: Phase,
    /// Epoch seconds of the last phase change.
    pub timestamp: f64,
}

impl PhaseStatus {
    /// Create a status for `phase` stamped with the current wall-clock time.
    pub fn now(phase: Phase) -> Self {
        Self {
            active_phase: phase,
            timestamp: epoch_secs(),
        }
    }
}

impl Default for PhaseStatus {
    /// The well-known default when no writer has published a phase: all
    /// red, stamped now.
    fn default() -> Self {
        Self::now(Phase::Red)
    }
}

/// Current wall-clock time as float epoch seconds.
///
/// Returns 0.0 if the system clock is before the epoch.
pub fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
