//! Shared type definitions for the Junction intersection controller.
//!
//! This crate is the single source of truth for the documents that flow
//! between the control loop, the demand simulator, and the Control API.
//! Serde field and variant names are part of the wire contract and must
//! not change without coordinating with API consumers.
//!
//! # Modules
//!
//! - [`phase`] -- Signal phases, approaches, and the phase-status document
//! - [`demand`] -- Per-approach queued vehicle counts
//! - [`settings`] -- Operator-tunable settings and the partial-update patch
//! - [`history`] -- Read-only historical observations

pub mod demand;
pub mod history;
pub mod phase;
pub mod settings;

// Re-export all public types at crate root for convenience.
pub use demand::Demand;
pub use history::HistoryRecord;
pub use phase::{Approach, Phase, PhaseStatus};
pub use settings::{Settings, SettingsPatch};
