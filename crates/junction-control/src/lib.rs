//! Control API server for the Junction intersection controller.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for reading intersection state (demand, phase
//!   status, settings, history)
//! - **Override endpoints** for forcing a phase or granting an emergency
//!   corridor, bypassing the control loop's own writes
//! - **`WebSocket` endpoint** (`/ws/phases`) streaming every phase change
//!   via [`tokio::sync::broadcast`]
//! - **Minimal HTML status page** (`GET /`) showing the active phase,
//!   queue counts, and links to the API endpoints
//!
//! # Architecture
//!
//! All handlers go through the shared
//! [`StateStore`](junction_core::store::StateStore). Reads are cheap lock
//! reads; override writes land in the same store the control loop and the
//! demand simulator poll, so they interleave with loop writes under the
//! store's last-writer-wins semantics.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
