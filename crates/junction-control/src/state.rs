//! Shared application state for the Control API server.
//!
//! [`AppState`] wraps the [`StateStore`] the control loop and the demand
//! simulator run against, plus the intersection's display name for the
//! status page. The handlers never keep state of their own; every read
//! and every override goes through the store.

use std::sync::Arc;

use junction_core::store::StateStore;
use junction_types::PhaseStatus;
use tokio::sync::broadcast;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The shared state store both loops run against.
    pub store: Arc<StateStore>,
    /// Human-readable intersection name shown on the status page.
    pub intersection_name: String,
}

impl AppState {
    /// Create application state over the given store.
    pub fn new(store: Arc<StateStore>, intersection_name: impl Into<String>) -> Self {
        Self {
            store,
            intersection_name: intersection_name.into(),
        }
    }

    /// Subscribe to phase changes.
    ///
    /// Returns a receiver that yields a [`PhaseStatus`] for every phase
    /// write, whichever writer performed it.
    pub fn subscribe_phases(&self) -> broadcast::Receiver<PhaseStatus> {
        self.store.subscribe_phases()
    }
}
