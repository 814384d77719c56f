//! REST API endpoint handlers for the Control server.
//!
//! All handlers read and write through the shared
//! [`StateStore`](junction_core::store::StateStore) via [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/traffic` | Current demand counts |
//! | `GET` | `/api/status` | Current phase status |
//! | `POST` | `/api/set_phase` | Force a phase manually |
//! | `POST` | `/api/emergency` | Grant an emergency corridor |
//! | `GET`/`POST` | `/api/settings` | Read / merge settings |
//! | `GET` | `/api/history` | Recorded history |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use junction_types::Phase;
use tracing::info;

use crate::error::ControlError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request body structs
// ---------------------------------------------------------------------------

/// Request body for `POST /api/set_phase`.
#[derive(Debug, serde::Deserialize)]
pub struct SetPhaseRequest {
    /// The wire-format phase tag to force. Defaults to `RED`.
    #[serde(default = "default_phase_tag")]
    pub phase: String,
}

/// Request body for `POST /api/emergency`.
#[derive(Debug, serde::Deserialize)]
pub struct EmergencyRequest {
    /// The approach the emergency vehicle arrives from (`N`, `S`, `E`,
    /// `W`). Any other value stops all traffic.
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_phase_tag() -> String {
    String::from("RED")
}

fn default_direction() -> String {
    String::from("NS")
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the intersection state and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let name = state.intersection_name.clone();
    let status = state.store.phase_status().await;
    let demand = state.store.demand().await;
    let phase = status.active_phase.as_str();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Junction Control</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .phase {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Junction Control</h1>
    <p class="subtitle">{name}</p>

    <p>Active phase: <span class="phase">{phase}</span></p>

    <div>
        <div class="metric">
            <div class="label">North</div>
            <div class="value">{n}</div>
        </div>
        <div class="metric">
            <div class="label">South</div>
            <div class="value">{s}</div>
        </div>
        <div class="metric">
            <div class="label">East</div>
            <div class="value">{e}</div>
        </div>
        <div class="metric">
            <div class="label">West</div>
            <div class="value">{w}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/traffic">/api/traffic</a> -- Current demand counts</li>
        <li>GET <a href="/api/status">/api/status</a> -- Current phase status</li>
        <li>POST /api/set_phase -- Force a phase manually</li>
        <li>POST /api/emergency -- Grant an emergency corridor</li>
        <li>GET/POST <a href="/api/settings">/api/settings</a> -- Read / merge settings</li>
        <li>GET <a href="/api/history">/api/history</a> -- Recorded history</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/phases</code> -- Live phase change stream</li>
    </ul>
</body>
</html>"#,
        n = demand.n,
        s = demand.s,
        e = demand.e,
        w = demand.w,
    ))
}

// ---------------------------------------------------------------------------
// GET /api/traffic -- current demand
// ---------------------------------------------------------------------------

/// Return the current demand counts per approach.
pub async fn get_traffic(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.demand().await)
}

// ---------------------------------------------------------------------------
// GET /api/status -- current phase status
// ---------------------------------------------------------------------------

/// Return the current phase status (RED default when no writer has
/// published a phase).
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.phase_status().await)
}

// ---------------------------------------------------------------------------
// POST /api/set_phase -- manual phase override
// ---------------------------------------------------------------------------

/// Force a phase manually.
///
/// Validates the tag against the five wire values; an unknown tag is
/// rejected with `400` and no write is performed. A valid tag overwrites
/// the phase-status document directly, interleaving with the control
/// loop's own writes.
pub async fn set_phase(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetPhaseRequest>,
) -> Result<impl IntoResponse, ControlError> {
    let phase = Phase::parse(&request.phase)
        .ok_or_else(|| ControlError::InvalidPhase(request.phase.clone()))?;

    state.store.set_phase(phase).await;
    info!(phase = phase.as_str(), "manual phase override applied");

    Ok(Json(serde_json::json!({
        "success": true,
        "phase": phase,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/emergency -- emergency corridor
// ---------------------------------------------------------------------------

/// Grant an emergency corridor for the given approach.
///
/// `N`/`S` jump straight to the north/south green, `E`/`W` to the
/// east/west green; anything else stops all traffic. No yellow transition
/// is inserted, this is a direct jump.
pub async fn emergency(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmergencyRequest>,
) -> impl IntoResponse {
    let phase = match request.direction.as_str() {
        "N" | "S" => Phase::NsGreen,
        "E" | "W" => Phase::EwGreen,
        _ => Phase::Red,
    };

    state.store.set_phase(phase).await;
    info!(
        direction = %request.direction,
        phase = phase.as_str(),
        "emergency corridor granted"
    );

    Json(serde_json::json!({
        "success": true,
        "emergency": request.direction,
    }))
}

// ---------------------------------------------------------------------------
// GET/POST /api/settings -- read / merge settings
// ---------------------------------------------------------------------------

/// Return the full settings document.
pub async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.settings().await)
}

/// Merge a partial update into the settings document.
///
/// Fields absent from the body keep their stored value. The merged result
/// is returned and takes effect within one loop iteration (both loops
/// re-read settings at the top of every cycle).
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<junction_types::SettingsPatch>,
) -> impl IntoResponse {
    let merged = state.store.update_settings(&patch).await;
    info!("settings updated");

    Json(serde_json::json!({
        "success": true,
        "settings": merged,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/history -- recorded history
// ---------------------------------------------------------------------------

/// Return the recorded history, oldest first.
pub async fn get_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.history().await)
}
