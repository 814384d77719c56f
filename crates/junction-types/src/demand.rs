//! Per-approach queued vehicle counts.

use serde::{Deserialize, Serialize};

use crate::phase::Approach;

/// The `demand` document: queued vehicle counts per approach.
///
/// Counts are a proxy for congestion. They are mutated only by the demand
/// simulator and read by the adaptive timing engine; the short field names
/// are the wire contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demand {
    /// Vehicles queued on the north approach.
    #[serde(default)]
    pub n: u32,
    /// Vehicles queued on the south approach.
    #[serde(default)]
    pub s: u32,
    /// Vehicles queued on the east approach.
    #[serde(default)]
    pub e: u32,
    /// Vehicles queued on the west approach.
    #[serde(default)]
    pub w: u32,
}

impl Demand {
    /// Create a demand document from explicit counts.
    pub const fn new(n: u32, s: u32, e: u32, w: u32) -> Self {
        Self { n, s, e, w }
    }

    /// The count for a single approach.
    pub const fn get(&self, approach: Approach) -> u32 {
        match approach {
            Approach::North => self.n,
            Approach::South => self.s,
            Approach::East => self.e,
            Approach::West => self.w,
        }
    }

    /// Combined north + south demand, saturating at `u32::MAX`.
    pub const fn north_south(&self) -> u32 {
        self.n.saturating_add(self.s)
    }

    /// Combined east + west demand, saturating at `u32::MAX`.
    pub const fn east_west(&self) -> u32 {
        self.e.saturating_add(self.w)
    }

    /// Clamp every approach count to `[0, capacity]`.
    ///
    /// Counts are unsigned so only the upper bound needs enforcing; the
    /// clamp is idempotent.
    pub fn clamped(self, capacity: u32) -> Self {
        Self {
            n: self.n.min(capacity),
            s: self.s.min(capacity),
            e: self.e.min(capacity),
            w: self.w.min(capacity),
        }
    }

    /// Whether every approach count is within `[0, capacity]`.
    pub const fn within_capacity(&self, capacity: u32) -> bool {
        self.n <= capacity && self.s <= capacity && self.e <= capacity && self.w <= capacity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_zero() {
        let demand = Demand::default();
        assert_eq!(demand, Demand::new(0, 0, 0, 0));
    }

    #[test]
    fn wire_field_names_are_single_letters() {
        let demand = Demand::new(30, 25, 40, 35);
        let json = serde_json::to_value(demand).unwrap();
        assert_eq!(json["n"], 30);
        assert_eq!(json["s"], 25);
        assert_eq!(json["e"], 40);
        assert_eq!(json["w"], 35);
    }

    #[test]
    fn missing_fields_deserialize_as_zero() {
        let demand: Demand = serde_json::from_str(r#"{"n": 7}"#).unwrap();
        assert_eq!(demand, Demand::new(7, 0, 0, 0));
    }

    #[test]
    fn axis_sums_saturate() {
        let demand = Demand::new(u32::MAX, 10, u32::MAX, 10);
        assert_eq!(demand.north_south(), u32::MAX);
        assert_eq!(demand.east_west(), u32::MAX);
    }

    #[test]
    fn clamp_is_idempotent() {
        let demand = Demand::new(500, 120, 0, 121);
        let once = demand.clamped(120);
        assert_eq!(once, Demand::new(120, 120, 0, 120));
        assert_eq!(once.clamped(120), once);
        assert!(once.within_capacity(120));
    }

    #[test]
    fn per_approach_access() {
        let demand = Demand::new(1, 2, 3, 4);
        assert_eq!(demand.get(Approach::North), 1);
        assert_eq!(demand.get(Approach::South), 2);
        assert_eq!(demand.get(Approach::East), 3);
        assert_eq!(demand.get(Approach::West), 4);
    }
}
