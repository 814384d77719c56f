//! The shared state store: one lock per logical document.
//!
//! The store is the only coordination point between the control loop, the
//! demand simulator, and the Control API handlers. Each of the four
//! documents (demand, phase-status, settings, history) sits behind its own
//! [`RwLock`]; writes are last-writer-wins and there are no cross-document
//! transactions. Each document has a single logical writer -- the simulator
//! owns demand, the controller owns phase-status -- while the Control API
//! may write any document as an override channel.
//!
//! # Snapshots
//!
//! A store opened with [`StateStore::open`] mirrors every document to a
//! JSON file in the snapshot directory. Memory is authoritative: snapshot
//! reads happen once at startup (a missing or malformed file silently
//! yields the per-document default) and snapshot writes are best-effort
//! (failures are logged and never propagate to the writing loop).

use std::path::{Path, PathBuf};

use junction_types::{Demand, HistoryRecord, Phase, PhaseStatus, Settings, SettingsPatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

/// Capacity of the phase-change broadcast channel.
///
/// A subscriber that falls behind by more than this many changes receives
/// a `Lagged` error and skips to the newest phase.
const BROADCAST_CAPACITY: usize = 64;

/// Snapshot file for the demand document.
const DEMAND_FILE: &str = "demand.json";
/// Snapshot file for the phase-status document.
const PHASE_FILE: &str = "phase-status.json";
/// Snapshot file for the settings document.
const SETTINGS_FILE: &str = "settings.json";
/// Snapshot file for the history document.
const HISTORY_FILE: &str = "history.json";

/// Errors that can occur when opening a store.
///
/// Note that document reads never fail: corruption is recovered via
/// defaults. Only the snapshot directory itself is load-bearing.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot directory could not be created.
    #[error("failed to create snapshot directory {dir}: {source}")]
    CreateDir {
        /// The directory that could not be created.
        dir: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// The shared state store.
///
/// Wrapped in [`Arc`](std::sync::Arc) and shared between both loops and
/// the Control API handlers. All accessors take `&self`; serialization of
/// concurrent access happens per document inside the locks.
#[derive(Debug)]
pub struct StateStore {
    /// Queued vehicle counts (written by the demand simulator).
    demand: RwLock<Demand>,

    /// The active phase, or `None` when no producer has published one
    /// (readers fall back to the RED default).
    phase: RwLock<Option<PhaseStatus>>,

    /// Operator-tunable settings.
    settings: RwLock<Settings>,

    /// Historical observations, read-only to the core.
    history: RwLock<Vec<HistoryRecord>>,

    /// Broadcast sender for phase changes (feeds the WebSocket stream).
    phase_tx: broadcast::Sender<PhaseStatus>,

    /// Snapshot directory; `None` disables persistence entirely.
    data_dir: Option<PathBuf>,
}

impl StateStore {
    /// Create a purely in-memory store with default documents.
    pub fn in_memory() -> Self {
        let (phase_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            demand: RwLock::new(Demand::default()),
            phase: RwLock::new(None),
            settings: RwLock::new(Settings::default()),
            history: RwLock::new(Vec::new()),
            phase_tx,
            data_dir: None,
        }
    }

    /// Open a store backed by JSON snapshots in `dir`.
    ///
    /// Each document is seeded from its snapshot file. A missing file
    /// yields the default silently; a malformed file (expected
    /// occasionally when an earlier process died mid-write) is logged at
    /// debug level and also yields the default. Neither case is an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CreateDir`] if the snapshot directory cannot
    /// be created.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
            dir: dir.to_path_buf(),
            source,
        })?;

        let (phase_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Ok(Self {
            demand: RwLock::new(load_or_default(dir, DEMAND_FILE).unwrap_or_default()),
            phase: RwLock::new(load_or_default(dir, PHASE_FILE)),
            settings: RwLock::new(load_or_default(dir, SETTINGS_FILE).unwrap_or_default()),
            history: RwLock::new(load_or_default(dir, HISTORY_FILE).unwrap_or_default()),
            phase_tx,
            data_dir: Some(dir.to_path_buf()),
        })
    }

    // -----------------------------------------------------------------------
    // Demand
    // -----------------------------------------------------------------------

    /// Read the current demand document.
    pub async fn demand(&self) -> Demand {
        *self.demand.read().await
    }

    /// Replace the demand document.
    pub async fn set_demand(&self, demand: Demand) {
        {
            let mut guard = self.demand.write().await;
            *guard = demand;
        }
        self.persist(DEMAND_FILE, &demand).await;
    }

    // -----------------------------------------------------------------------
    // Phase status
    // -----------------------------------------------------------------------

    /// Read the current phase status, falling back to the RED default when
    /// no producer has published a phase.
    pub async fn phase_status(&self) -> PhaseStatus {
        let guard = self.phase.read().await;
        guard.unwrap_or_default()
    }

    /// Overwrite the phase status with `phase` stamped at the current time.
    ///
    /// The change is published to all phase subscribers. Returns the
    /// status that was written.
    pub async fn set_phase(&self, phase: Phase) -> PhaseStatus {
        let status = PhaseStatus::now(phase);
        {
            let mut guard = self.phase.write().await;
            *guard = Some(status);
        }
        self.persist(PHASE_FILE, &status).await;
        // send fails only when no subscriber is connected, which is normal.
        let _ = self.phase_tx.send(status);
        status
    }

    /// Clear the phase status so downstream readers fall back to the RED
    /// default. Called by the demand simulator on graceful shutdown.
    pub async fn clear_phase(&self) {
        {
            let mut guard = self.phase.write().await;
            *guard = None;
        }
        if let Some(dir) = &self.data_dir {
            let path = dir.join(PHASE_FILE);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove phase snapshot"),
            }
        }
    }

    /// Subscribe to phase changes.
    pub fn subscribe_phases(&self) -> broadcast::Receiver<PhaseStatus> {
        self.phase_tx.subscribe()
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Read the current settings document.
    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Merge a partial update into the settings document.
    ///
    /// Fields absent from the patch keep their stored value. Returns the
    /// merged settings.
    pub async fn update_settings(&self, patch: &SettingsPatch) -> Settings {
        let merged = {
            let mut guard = self.settings.write().await;
            let merged = guard.merged(patch);
            *guard = merged.clone();
            merged
        };
        self.persist(SETTINGS_FILE, &merged).await;
        merged
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Read the history document. The core never appends to it.
    pub async fn history(&self) -> Vec<HistoryRecord> {
        self.history.read().await.clone()
    }

    // -----------------------------------------------------------------------
    // Snapshot persistence
    // -----------------------------------------------------------------------

    /// Mirror a document to its snapshot file, best-effort.
    ///
    /// Write failures are logged and swallowed: the in-memory document is
    /// authoritative and a lost snapshot must not stall the writing loop.
    async fn persist<T: Serialize>(&self, file: &str, value: &T) {
        let Some(dir) = &self.data_dir else {
            return;
        };
        let path = dir.join(file);
        match serde_json::to_vec_pretty(value) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    warn!(path = %path.display(), error = %e, "failed to write snapshot");
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to serialize snapshot");
            }
        }
    }
}

/// Load a document from its snapshot file, tolerating absence and
/// corruption.
///
/// Returns `None` when the file is missing or unreadable as the target
/// type; the caller substitutes the per-document default. Corruption is
/// expected occasionally (a process killed mid-write) and is logged at
/// debug level only.
fn load_or_default<T: DeserializeOwned>(dir: &Path, file: &str) -> Option<T> {
    let path = dir.join(file);
    let contents = match std::fs::read(&path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %path.display(), error = %e, "snapshot unreadable, using default");
            }
            return None;
        }
    };
    match serde_json::from_slice(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "snapshot malformed, using default");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use junction_types::Phase;

    use super::*;

    #[tokio::test]
    async fn fresh_store_serves_defaults() {
        let store = StateStore::in_memory();
        assert_eq!(store.demand().await, Demand::default());
        assert_eq!(store.phase_status().await.active_phase, Phase::Red);
        assert_eq!(store.settings().await, Settings::default());
        assert!(store.history().await.is_empty());
    }

    #[tokio::test]
    async fn demand_round_trips() {
        let store = StateStore::in_memory();
        let demand = Demand::new(30, 25, 40, 35);
        store.set_demand(demand).await;
        assert_eq!(store.demand().await, demand);
    }

    #[tokio::test]
    async fn set_phase_stamps_and_stores() {
        let store = StateStore::in_memory();
        let written = store.set_phase(Phase::NsGreen).await;
        assert_eq!(written.active_phase, Phase::NsGreen);
        assert!(written.timestamp > 0.0);

        let read = store.phase_status().await;
        assert_eq!(read.active_phase, Phase::NsGreen);
    }

    #[tokio::test]
    async fn clear_phase_restores_red_default() {
        let store = StateStore::in_memory();
        store.set_phase(Phase::EwGreen).await;
        store.clear_phase().await;
        assert_eq!(store.phase_status().await.active_phase, Phase::Red);
    }

    #[tokio::test]
    async fn phase_changes_are_broadcast() {
        let store = StateStore::in_memory();
        let mut rx = store.subscribe_phases();

        store.set_phase(Phase::YellowNs).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.active_phase, Phase::YellowNs);
    }

    #[tokio::test]
    async fn settings_merge_persists_in_memory() {
        let store = StateStore::in_memory();
        let patch = SettingsPatch {
            default_green_time: Some(9),
            ..SettingsPatch::default()
        };

        let merged = store.update_settings(&patch).await;
        assert_eq!(merged.default_green_time, 9);
        assert_eq!(merged.yellow_time, 2);
        assert_eq!(store.settings().await, merged);
    }

    #[tokio::test]
    async fn corrupt_demand_snapshot_yields_zeroes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEMAND_FILE), b"{not json").unwrap();

        let store = StateStore::open(dir.path()).unwrap();
        assert_eq!(store.demand().await, Demand::new(0, 0, 0, 0));
    }

    #[tokio::test]
    async fn empty_snapshot_dir_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        assert_eq!(store.demand().await, Demand::default());
        assert_eq!(store.phase_status().await.active_phase, Phase::Red);
        assert_eq!(store.settings().await, Settings::default());
    }

    #[tokio::test]
    async fn reopened_store_restores_documents() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = StateStore::open(dir.path()).unwrap();
            store.set_demand(Demand::new(5, 6, 7, 8)).await;
            store
                .update_settings(&SettingsPatch {
                    yellow_time: Some(3),
                    ..SettingsPatch::default()
                })
                .await;
            store.set_phase(Phase::NsGreen).await;
        }

        let store = StateStore::open(dir.path()).unwrap();
        assert_eq!(store.demand().await, Demand::new(5, 6, 7, 8));
        assert_eq!(store.settings().await.yellow_time, 3);
        assert_eq!(store.phase_status().await.active_phase, Phase::NsGreen);
    }

    #[tokio::test]
    async fn clear_phase_removes_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        store.set_phase(Phase::EwGreen).await;
        assert!(dir.path().join(PHASE_FILE).exists());

        store.clear_phase().await;
        assert!(!dir.path().join(PHASE_FILE).exists());
        assert_eq!(store.phase_status().await.active_phase, Phase::Red);
    }

    #[tokio::test]
    async fn history_snapshot_is_served_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![junction_types::HistoryRecord {
            timestamp: 1_700_000_000.0,
            active_phase: Phase::Red,
            demand: Demand::new(1, 1, 1, 1),
        }];
        std::fs::write(
            dir.path().join(HISTORY_FILE),
            serde_json::to_vec(&records).unwrap(),
        )
        .unwrap();

        let store = StateStore::open(dir.path()).unwrap();
        let history = store.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().unwrap().demand, Demand::new(1, 1, 1, 1));
    }
}
