//! The phase state machine: one continuously running control loop.
//!
//! The controller re-reads settings and phase status from the store at the
//! top of every iteration rather than keeping phase in local memory. An
//! external override written between the read and the loop's own next
//! write can therefore redirect the next transition, or be clobbered by a
//! scheduled write -- an accepted trade-off favoring simplicity over
//! strict consistency.
//!
//! The loop never terminates on error: a failed iteration is logged and
//! retried after a back-off. The only way to stop it is to abort the task.

use std::sync::Arc;
use std::time::Duration;

use junction_types::{Phase, Settings};
use tracing::{trace, warn};

use crate::config::ControlConfig;
use crate::store::StateStore;
use crate::timing::green_split;

/// Upper bound accepted for any interval setting, in seconds.
///
/// The settings document is merged without validation (any override the
/// API accepts lands in the store), so the controller bounds the values it
/// is about to sleep on. A violation fails the iteration instead of
/// wedging the loop for an operator-supplied arbitrary duration.
const MAX_INTERVAL_SECS: u64 = 600;

/// Errors that can occur during a control loop iteration.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// An interval setting is outside the range the loop will sleep on.
    #[error("invalid settings: {reason}")]
    InvalidSettings {
        /// Explanation of which setting is out of range.
        reason: String,
    },
}

/// What a single control loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// `adaptive_mode` is off; no phase action was taken.
    Idle,
    /// The cycle advanced from the observed phase.
    Advanced {
        /// The phase observed at the top of the iteration.
        from: Phase,
    },
    /// A yellow phase was observed at the top of the iteration; the loop
    /// held briefly without writing (guarded default transition).
    HeldYellow,
}

/// Loop intervals for the controller, resolved to [`Duration`]s.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Suspend between checks while `adaptive_mode` is off.
    pub idle_poll: Duration,
    /// Suspend applied when a yellow phase is observed at the loop top.
    pub yellow_hold: Duration,
    /// Back-off after a failed iteration.
    pub error_backoff: Duration,
}

impl From<&ControlConfig> for ControllerConfig {
    fn from(config: &ControlConfig) -> Self {
        Self {
            idle_poll: Duration::from_millis(config.idle_poll_ms),
            yellow_hold: Duration::from_millis(config.yellow_hold_ms),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&ControlConfig::default())
    }
}

/// The signal controller: owns phase cycling against the shared store.
///
/// Phase-status is this component's document; nothing else writes it
/// except the Control API override channel.
#[derive(Debug)]
pub struct SignalController {
    store: Arc<StateStore>,
    config: ControllerConfig,
}

impl SignalController {
    /// Create a controller over the given store.
    pub const fn new(store: Arc<StateStore>, config: ControllerConfig) -> Self {
        Self { store, config }
    }

    /// Run the control loop indefinitely.
    ///
    /// Iteration errors are logged and followed by the configured
    /// back-off; the loop then resumes from its top-level read.
    pub async fn run(self) {
        loop {
            match self.step().await {
                Ok(outcome) => trace!(?outcome, "control loop iteration complete"),
                Err(e) => {
                    warn!(error = %e, "control loop iteration failed, backing off");
                    tokio::time::sleep(self.config.error_backoff).await;
                }
            }
        }
    }

    /// Execute one control loop iteration.
    ///
    /// Re-reads settings (no caching, so operator changes take effect
    /// within one cycle), then phase status, then executes one row of the
    /// transition table, suspending for the computed durations between
    /// writes.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidSettings`] if an interval setting
    /// exceeds the bound the loop is willing to sleep on.
    pub async fn step(&self) -> Result<StepOutcome, ControllerError> {
        let settings = self.store.settings().await;
        validate_intervals(&settings)?;

        if !settings.adaptive_mode {
            // Frozen: manual overrides still land via the API while the
            // loop just polls for the mode to come back.
            tokio::time::sleep(self.config.idle_poll).await;
            return Ok(StepOutcome::Idle);
        }

        let observed = self.store.phase_status().await.active_phase;
        let demand = self.store.demand().await;
        let split = green_split(&demand, &settings);

        match observed {
            Phase::Red => {
                self.store.set_phase(Phase::NsGreen).await;
                self.sleep_secs(split.ns_secs).await;
            }
            Phase::NsGreen => {
                self.clearance(Phase::EwGreen, &settings).await;
                self.sleep_secs(split.ew_secs).await;
            }
            Phase::EwGreen => {
                // No trailing NS suspend here: the transition table only
                // grants the NS green its duration out of the RED arm.
                self.clearance(Phase::NsGreen, &settings).await;
            }
            Phase::YellowNs | Phase::YellowEw => {
                // Not covered by the transition table. Reached only after
                // an external yellow override; hold briefly and re-read
                // instead of busy-spinning.
                tokio::time::sleep(self.config.yellow_hold).await;
                return Ok(StepOutcome::HeldYellow);
            }
        }

        Ok(StepOutcome::Advanced { from: observed })
    }

    /// Walk the clearance chain out of a green: yellow, all-red, then the
    /// opposing green.
    async fn clearance(&self, next_green: Phase, settings: &Settings) {
        let yellow = if next_green == Phase::EwGreen {
            Phase::YellowNs
        } else {
            Phase::YellowEw
        };
        self.store.set_phase(yellow).await;
        self.sleep_secs(settings.yellow_time).await;

        self.store.set_phase(Phase::Red).await;
        self.sleep_secs(settings.all_red_time).await;

        self.store.set_phase(next_green).await;
    }

    /// Suspend for a whole number of seconds.
    async fn sleep_secs(&self, secs: u64) {
        if secs > 0 {
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
    }
}

/// Bound the interval settings the loop is about to sleep on.
fn validate_intervals(settings: &Settings) -> Result<(), ControllerError> {
    for (name, value) in [
        ("yellow_time", settings.yellow_time),
        ("all_red_time", settings.all_red_time),
        ("default_green_time", settings.default_green_time),
    ] {
        if value > MAX_INTERVAL_SECS {
            return Err(ControllerError::InvalidSettings {
                reason: format!("{name} is {value}s, above the {MAX_INTERVAL_SECS}s bound"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use junction_types::SettingsPatch;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    /// Intervals collapsed to zero so tests run instantly.
    const fn instant_config() -> ControllerConfig {
        ControllerConfig {
            idle_poll: Duration::ZERO,
            yellow_hold: Duration::ZERO,
            error_backoff: Duration::ZERO,
        }
    }

    /// Zero every duration setting so the transition chains are instant.
    async fn zero_intervals(store: &StateStore) {
        store
            .update_settings(&SettingsPatch {
                yellow_time: Some(0),
                all_red_time: Some(0),
                default_green_time: Some(0),
                ..SettingsPatch::default()
            })
            .await;
    }

    fn make_controller(store: &Arc<StateStore>) -> SignalController {
        SignalController::new(Arc::clone(store), instant_config())
    }

    #[tokio::test]
    async fn cycle_visits_the_fixed_sequence() {
        let store = Arc::new(StateStore::in_memory());
        zero_intervals(&store).await;
        let controller = make_controller(&store);
        let mut rx = store.subscribe_phases();

        // Three iterations starting from the RED default walk one full
        // cycle and begin the next.
        for _ in 0..3 {
            controller.step().await.unwrap();
        }

        let mut written = Vec::new();
        while let Ok(status) = rx.try_recv() {
            written.push(status.active_phase);
        }
        assert_eq!(
            written,
            vec![
                Phase::NsGreen,
                Phase::YellowNs,
                Phase::Red,
                Phase::EwGreen,
                Phase::YellowEw,
                Phase::Red,
                Phase::NsGreen,
            ]
        );
    }

    #[tokio::test]
    async fn red_advances_to_ns_green() {
        let store = Arc::new(StateStore::in_memory());
        zero_intervals(&store).await;
        let controller = make_controller(&store);

        let outcome = controller.step().await.unwrap();
        assert_eq!(outcome, StepOutcome::Advanced { from: Phase::Red });
        assert_eq!(store.phase_status().await.active_phase, Phase::NsGreen);
    }

    #[tokio::test]
    async fn adaptive_off_freezes_cycling() {
        let store = Arc::new(StateStore::in_memory());
        zero_intervals(&store).await;
        store
            .update_settings(&SettingsPatch {
                adaptive_mode: Some(false),
                ..SettingsPatch::default()
            })
            .await;
        let controller = make_controller(&store);
        let mut rx = store.subscribe_phases();

        let outcome = controller.step().await.unwrap();
        assert_eq!(outcome, StepOutcome::Idle);
        // No phase writes happened.
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // A manual override still lands while frozen.
        store.set_phase(Phase::EwGreen).await;
        assert_eq!(store.phase_status().await.active_phase, Phase::EwGreen);
    }

    #[tokio::test]
    async fn yellow_at_loop_top_holds_without_writing() {
        let store = Arc::new(StateStore::in_memory());
        zero_intervals(&store).await;
        let controller = make_controller(&store);

        // External override lands a yellow between iterations.
        store.set_phase(Phase::YellowNs).await;
        let mut rx = store.subscribe_phases();

        let outcome = controller.step().await.unwrap();
        assert_eq!(outcome, StepOutcome::HeldYellow);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(store.phase_status().await.active_phase, Phase::YellowNs);
    }

    #[tokio::test]
    async fn override_redirects_the_next_transition() {
        let store = Arc::new(StateStore::in_memory());
        zero_intervals(&store).await;
        let controller = make_controller(&store);

        // Operator jumps straight to EW green; the loop picks the cycle
        // up from there instead of from RED.
        store.set_phase(Phase::EwGreen).await;
        let mut rx = store.subscribe_phases();

        let outcome = controller.step().await.unwrap();
        assert_eq!(outcome, StepOutcome::Advanced { from: Phase::EwGreen });
        assert_eq!(rx.try_recv().unwrap().active_phase, Phase::YellowEw);
    }

    #[tokio::test]
    async fn oversized_interval_setting_fails_the_iteration() {
        let store = Arc::new(StateStore::in_memory());
        store
            .update_settings(&SettingsPatch {
                yellow_time: Some(10_000),
                ..SettingsPatch::default()
            })
            .await;
        let controller = make_controller(&store);
        let mut rx = store.subscribe_phases();

        let result = controller.step().await;
        assert!(matches!(
            result,
            Err(ControllerError::InvalidSettings { .. })
        ));
        // The failed iteration wrote nothing.
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
