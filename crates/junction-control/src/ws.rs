//! `WebSocket` handler for real-time phase streaming.
//!
//! Clients connect to `GET /ws/phases` and immediately receive the
//! current [`PhaseStatus`](junction_types::PhaseStatus) as a JSON text
//! frame, followed by one frame per phase write, whichever writer
//! performed it. The stream replaces the polling a dashboard would
//! otherwise do against `GET /api/status`.
//!
//! A client that falls behind the broadcast channel is resynchronized
//! from the store: the skipped intermediate transitions are dropped and
//! the freshest status is sent instead.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use junction_types::PhaseStatus;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::error::ControlError;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming phase changes.
///
/// # Route
///
/// `GET /ws/phases`
pub async fn ws_phases(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_phases(socket, state))
}

/// Drive one client connection: seed it with the current status, then
/// forward every phase change until either side disconnects.
async fn stream_phases(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("phase stream client connected");

    // Subscribe before the seed read so a write landing in between is
    // delivered rather than lost.
    let mut rx = state.subscribe_phases();

    // Seed the client so it can render immediately instead of waiting
    // for the next transition, which can be half a minute out.
    let current = state.store.phase_status().await;
    if let Err(e) = send_status(&mut socket, current).await {
        debug!(error = %e, "phase stream client dropped during seed");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                let status = match result {
                    Ok(status) => status,
                    Err(RecvError::Lagged(skipped)) => {
                        // The freshest status is all a signal display
                        // needs; replaying missed transitions is not.
                        debug!(skipped, "phase stream client lagged, resyncing from store");
                        state.store.phase_status().await
                    }
                    Err(RecvError::Closed) => {
                        debug!("phase broadcast closed, ending stream");
                        return;
                    }
                };
                if let Err(e) = send_status(&mut socket, status).await {
                    debug!(error = %e, "phase stream client dropped");
                    return;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("phase stream client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("phase stream client dropped (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "phase stream receive error");
                        return;
                    }
                    // Clients have nothing meaningful to send; ignore.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

/// Encode a status as a text frame and push it to the client.
async fn send_status(socket: &mut WebSocket, status: PhaseStatus) -> Result<(), ControlError> {
    socket
        .send(status_frame(status)?)
        .await
        .map_err(|e| ControlError::Internal(format!("websocket send failed: {e}")))
}

/// The JSON text frame for a phase status.
fn status_frame(status: PhaseStatus) -> Result<Message, ControlError> {
    let json = serde_json::to_string(&status)?;
    Ok(Message::Text(json.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use junction_types::Phase;

    use super::*;

    #[test]
    fn status_frame_is_a_wire_format_text_message() {
        let frame = status_frame(PhaseStatus::now(Phase::YellowNs)).unwrap();
        let Message::Text(text) = frame else {
            panic!("expected a text frame");
        };

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["active_phase"], "YELLOW_NS");
        assert!(json["timestamp"].is_f64());
    }
}
