//! Axum router construction for the Control API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Control server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/phases` -- `WebSocket` phase change stream
/// - `GET /api/traffic` -- current demand counts
/// - `GET /api/status` -- current phase status
/// - `POST /api/set_phase` -- manual phase override
/// - `POST /api/emergency` -- emergency corridor
/// - `GET/POST /api/settings` -- read / merge settings
/// - `GET /api/history` -- recorded history
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/phases", get(ws::ws_phases))
        // REST API
        .route("/api/traffic", get(handlers::get_traffic))
        .route("/api/status", get(handlers::get_status))
        .route("/api/set_phase", post(handlers::set_phase))
        .route("/api/emergency", post(handlers::emergency))
        .route(
            "/api/settings",
            get(handlers::get_settings).post(handlers::update_settings),
        )
        .route("/api/history", get(handlers::get_history))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
