//! Read-only historical observations.

use serde::{Deserialize, Serialize};

use crate::demand::Demand;
use crate::phase::Phase;

/// A single entry of the `history` document: a periodic observation of
/// the intersection.
///
/// The core never produces history; the document is an append-only log
/// owned by external tooling and served verbatim by the Control API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Epoch seconds of the observation.
    pub timestamp: f64,
    /// The phase active at observation time.
    pub active_phase: Phase,
    /// The demand counts at observation time.
    pub demand: Demand,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_json() {
        let record = HistoryRecord {
            timestamp: 1_700_000_000.5,
            active_phase: Phase::EwGreen,
            demand: Demand::new(1, 2, 3, 4),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: HistoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.active_phase, Phase::EwGreen);
        assert_eq!(back.demand, record.demand);
    }
}
