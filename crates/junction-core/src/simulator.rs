//! The demand simulator: an independent loop that models traffic moving
//! through the intersection.
//!
//! Each tick the simulator reads the phase the controller (or an
//! override) last published and mutates demand accordingly: vehicles
//! clear the green approaches at a fixed rate while a random trickle
//! arrives at the stopped ones. The simulator is the sole writer of the
//! demand document and never calls the timing engine.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use junction_types::{Demand, Phase};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::sync::watch;
use tracing::{info, trace};

use crate::config::TrafficConfig;
use crate::store::StateStore;

/// Errors that can occur when constructing the simulator.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    /// Invalid traffic configuration (e.g. an empty arrival range).
    #[error("invalid traffic configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// The demand simulator loop.
#[derive(Debug)]
pub struct DemandSimulator {
    store: Arc<StateStore>,
    tick_interval: Duration,
    lane_capacity: u32,
    leave_rate: u32,
    arrivals: RangeInclusive<u32>,
    seed: Demand,
}

impl DemandSimulator {
    /// Create a simulator over the given store.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::InvalidConfig`] if `lane_capacity` is
    /// zero or the arrival range is empty.
    pub fn new(store: Arc<StateStore>, config: &TrafficConfig) -> Result<Self, SimulatorError> {
        if config.lane_capacity == 0 {
            return Err(SimulatorError::InvalidConfig {
                reason: "lane_capacity must be at least 1".to_owned(),
            });
        }
        if config.arrivals_min > config.arrivals_max {
            return Err(SimulatorError::InvalidConfig {
                reason: format!(
                    "arrivals_min {} exceeds arrivals_max {}",
                    config.arrivals_min, config.arrivals_max
                ),
            });
        }
        Ok(Self {
            store,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            lane_capacity: config.lane_capacity,
            leave_rate: config.leave_rate,
            arrivals: config.arrivals_min..=config.arrivals_max,
            seed: config.seed_demand,
        })
    }

    /// Seed the demand document when nothing has been recorded yet.
    ///
    /// A fresh store serves all-zero demand; the configured seed gives
    /// the intersection visible traffic from the first tick. Demand
    /// restored from a snapshot or written by an earlier tick is left
    /// alone. Returns the demand now in effect.
    pub async fn seed_demand(&self) -> Demand {
        let current = self.store.demand().await;
        if current != Demand::default() {
            return current;
        }

        let seeded = self.seed.clamped(self.lane_capacity);
        self.store.set_demand(seeded).await;
        seeded
    }

    /// Run the simulator loop until `shutdown` flips to true (or its
    /// sender is dropped).
    ///
    /// On the way out the loop clears the phase-status document so that
    /// downstream readers fall back to the RED default instead of reading
    /// a stale phase with no active producer.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.seed_demand().await;

        let mut rng = SmallRng::from_os_rng();
        let mut ticker = tokio::time::interval(self.tick_interval);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let demand = self.step(&mut rng).await;
                    trace!(
                        n = demand.n,
                        s = demand.s,
                        e = demand.e,
                        w = demand.w,
                        "demand tick complete"
                    );
                }
            }
        }

        info!("demand simulator stopping, clearing phase status");
        self.store.clear_phase().await;
    }

    /// Execute one simulation tick: read the phase, move traffic, write
    /// the updated demand. Returns the demand that was written.
    pub async fn step<R: Rng>(&self, rng: &mut R) -> Demand {
        // Phase reads never fail; an unreadable or absent status is the
        // RED default.
        let phase = self.store.phase_status().await.active_phase;
        let arriving = rng.random_range(self.arrivals.clone());

        let current = self.store.demand().await;
        let next = advance(current, phase, arriving, self.leave_rate, self.lane_capacity);
        self.store.set_demand(next).await;
        next
    }
}

/// Apply one tick of traffic movement to a demand document.
///
/// Green approaches lose `leave_rate` vehicles (floored at zero); stopped
/// approaches gain `arriving`. Under RED or a yellow transition no
/// approach has right of way, so all four gain `arriving`. Every count is
/// clamped to `[0, capacity]`.
pub fn advance(demand: Demand, phase: Phase, arriving: u32, leave_rate: u32, capacity: u32) -> Demand {
    let moved = match phase {
        Phase::NsGreen => Demand {
            n: demand.n.saturating_sub(leave_rate),
            s: demand.s.saturating_sub(leave_rate),
            e: demand.e.saturating_add(arriving),
            w: demand.w.saturating_add(arriving),
        },
        Phase::EwGreen => Demand {
            n: demand.n.saturating_add(arriving),
            s: demand.s.saturating_add(arriving),
            e: demand.e.saturating_sub(leave_rate),
            w: demand.w.saturating_sub(leave_rate),
        },
        Phase::Red | Phase::YellowNs | Phase::YellowEw => Demand {
            n: demand.n.saturating_add(arriving),
            s: demand.s.saturating_add(arriving),
            e: demand.e.saturating_add(arriving),
            w: demand.w.saturating_add(arriving),
        },
    };
    moved.clamped(capacity)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CAPACITY: u32 = 120;
    const LEAVE: u32 = 10;

    #[test]
    fn ns_green_drains_ns_and_fills_ew() {
        let before = Demand::new(30, 25, 40, 35);
        for arriving in 2..=6 {
            let after = advance(before, Phase::NsGreen, arriving, LEAVE, CAPACITY);
            assert_eq!(after.n, 20);
            assert_eq!(after.s, 15);
            assert_eq!(after.e, 40_u32.saturating_add(arriving));
            assert_eq!(after.w, 35_u32.saturating_add(arriving));
        }
    }

    #[test]
    fn ew_green_is_symmetric() {
        let before = Demand::new(30, 25, 40, 35);
        let after = advance(before, Phase::EwGreen, 4, LEAVE, CAPACITY);
        assert_eq!(after.n, 34);
        assert_eq!(after.s, 29);
        assert_eq!(after.e, 30);
        assert_eq!(after.w, 25);
    }

    #[test]
    fn green_drain_floors_at_zero() {
        let before = Demand::new(3, 0, 0, 0);
        let after = advance(before, Phase::NsGreen, 2, LEAVE, CAPACITY);
        assert_eq!(after.n, 0);
        assert_eq!(after.s, 0);
    }

    #[test]
    fn red_fills_all_approaches() {
        let before = Demand::new(1, 2, 3, 4);
        let after = advance(before, Phase::Red, 5, LEAVE, CAPACITY);
        assert_eq!(after, Demand::new(6, 7, 8, 9));
    }

    #[test]
    fn yellow_behaves_like_red() {
        let before = Demand::new(1, 2, 3, 4);
        let red = advance(before, Phase::Red, 3, LEAVE, CAPACITY);
        assert_eq!(advance(before, Phase::YellowNs, 3, LEAVE, CAPACITY), red);
        assert_eq!(advance(before, Phase::YellowEw, 3, LEAVE, CAPACITY), red);
    }

    #[test]
    fn counts_never_leave_bounds_over_many_ticks() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut demand = Demand::new(118, 119, 120, 0);
        for tick in 0_u32..200 {
            let phase = match tick.checked_rem(3).unwrap_or(0) {
                0 => Phase::Red,
                1 => Phase::NsGreen,
                _ => Phase::EwGreen,
            };
            let arriving = rng.random_range(2..=6);
            demand = advance(demand, phase, arriving, LEAVE, CAPACITY);
            assert!(demand.within_capacity(CAPACITY), "tick {tick}: {demand:?}");
        }
    }

    #[tokio::test]
    async fn step_reads_phase_and_writes_demand() {
        let store = Arc::new(StateStore::in_memory());
        store.set_demand(Demand::new(30, 25, 40, 35)).await;
        store.set_phase(Phase::NsGreen).await;

        let sim = DemandSimulator::new(Arc::clone(&store), &TrafficConfig::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let written = sim.step(&mut rng).await;

        assert_eq!(written.n, 20);
        assert_eq!(written.s, 15);
        let gained = written.e.saturating_sub(40);
        assert!((2..=6).contains(&gained));
        assert_eq!(written.w.saturating_sub(35), gained);
        assert_eq!(store.demand().await, written);
    }

    #[tokio::test]
    async fn step_defaults_to_red_when_no_phase_is_published() {
        let store = Arc::new(StateStore::in_memory());
        store.set_demand(Demand::new(10, 10, 10, 10)).await;

        let sim = DemandSimulator::new(Arc::clone(&store), &TrafficConfig::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let written = sim.step(&mut rng).await;

        // All four approaches gained the same arrival count.
        let gained = written.n.saturating_sub(10);
        assert!((2..=6).contains(&gained));
        assert_eq!(written.s.saturating_sub(10), gained);
        assert_eq!(written.e.saturating_sub(10), gained);
        assert_eq!(written.w.saturating_sub(10), gained);
    }

    #[tokio::test]
    async fn fresh_store_is_seeded_with_opening_traffic() {
        let store = Arc::new(StateStore::in_memory());
        let sim = DemandSimulator::new(Arc::clone(&store), &TrafficConfig::default()).unwrap();

        let seeded = sim.seed_demand().await;

        assert_eq!(seeded, Demand::new(30, 25, 40, 35));
        assert_eq!(store.demand().await, seeded);
    }

    #[tokio::test]
    async fn recorded_demand_is_not_reseeded() {
        let store = Arc::new(StateStore::in_memory());
        store.set_demand(Demand::new(0, 0, 0, 1)).await;
        let sim = DemandSimulator::new(Arc::clone(&store), &TrafficConfig::default()).unwrap();

        let kept = sim.seed_demand().await;

        assert_eq!(kept, Demand::new(0, 0, 0, 1));
        assert_eq!(store.demand().await, kept);
    }

    #[tokio::test]
    async fn seed_is_clamped_to_capacity() {
        let store = Arc::new(StateStore::in_memory());
        let config = TrafficConfig {
            lane_capacity: 20,
            seed_demand: Demand::new(500, 500, 500, 500),
            ..TrafficConfig::default()
        };
        let sim = DemandSimulator::new(Arc::clone(&store), &config).unwrap();

        let seeded = sim.seed_demand().await;
        assert_eq!(seeded, Demand::new(20, 20, 20, 20));
    }

    #[tokio::test]
    async fn graceful_stop_clears_phase_status() {
        let store = Arc::new(StateStore::in_memory());
        store.set_phase(Phase::EwGreen).await;

        let config = TrafficConfig {
            tick_interval_ms: 10,
            ..TrafficConfig::default()
        };
        let sim = DemandSimulator::new(Arc::clone(&store), &config).unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(sim.run(rx));
        tx.send(true).unwrap();
        handle.await.unwrap();

        // Downstream readers now see the RED default, not a stale phase.
        assert_eq!(store.phase_status().await.active_phase, Phase::Red);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let store = Arc::new(StateStore::in_memory());
        let config = TrafficConfig {
            lane_capacity: 0,
            ..TrafficConfig::default()
        };
        let result = DemandSimulator::new(store, &config);
        assert!(matches!(
            result,
            Err(SimulatorError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn inverted_arrival_range_is_rejected() {
        let store = Arc::new(StateStore::in_memory());
        let config = TrafficConfig {
            arrivals_min: 6,
            arrivals_max: 2,
            ..TrafficConfig::default()
        };
        let result = DemandSimulator::new(store, &config);
        assert!(matches!(
            result,
            Err(SimulatorError::InvalidConfig { .. })
        ));
    }
}
