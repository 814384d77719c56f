//! Control server startup helper for embedding in the engine binary.
//!
//! [`spawn_control_api`] binds the listener before spawning anything, so
//! a bad address or an occupied port fails engine startup directly
//! instead of surfacing later as a log line from a background task.
//! Serving then runs on its own Tokio task, concurrent with the control
//! loop and the demand simulator.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Control server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the Control listener and serve it on a background Tokio task.
///
/// Returns a [`JoinHandle`] so the caller can manage the server's
/// lifecycle alongside the two loops. The server runs until the Tokio
/// runtime is shut down or the task is aborted.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address does not
/// parse or the port cannot be claimed.
pub async fn spawn_control_api(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let listener = server::bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "Control server exited with error");
        }
    });

    Ok(handle)
}
