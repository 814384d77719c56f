//! State store, phase state machine, adaptive timing, and demand simulator
//! for the Junction intersection controller.
//!
//! This crate owns the two continuously running loops and the shared state
//! they coordinate through:
//!
//! - [`store`] -- The [`StateStore`]: one lock per logical document,
//!   last-writer-wins, no cross-document transactions.
//! - [`timing`] -- Pure green-split computation from demand and settings.
//! - [`controller`] -- The [`SignalController`] phase cycling loop.
//! - [`simulator`] -- The [`DemandSimulator`] traffic feed loop.
//! - [`config`] -- Configuration loading from `junction-config.yaml`.
//!
//! [`StateStore`]: store::StateStore
//! [`SignalController`]: controller::SignalController
//! [`DemandSimulator`]: simulator::DemandSimulator

pub mod config;
pub mod controller;
pub mod simulator;
pub mod store;
pub mod timing;
