//! Control HTTP server lifecycle management.
//!
//! Binding and serving are separate steps: [`bind`] claims the listener
//! so the caller can fail fast on a bad address or an occupied port,
//! [`serve`] runs the router on an already-bound listener until the
//! process is terminated. [`start_server`] composes the two for
//! standalone use.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the Control server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl ServerConfig {
    /// Resolve the configured host and port to a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the combination does not parse
    /// as an address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port).parse().map_err(|e| {
            ServerError::Bind(format!(
                "invalid address {}:{}: {e}",
                self.host, self.port
            ))
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 5000,
        }
    }
}

impl From<&junction_core::config::ServerConfig> for ServerConfig {
    fn from(config: &junction_core::config::ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Bind the Control server's TCP listener.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address does not parse or the
/// port cannot be claimed.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.socket_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve requests on an already-bound listener until the process is
/// terminated.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the server encounters a fatal I/O
/// error.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Control server listening");
    }

    axum::serve(listener, build_router(state))
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))
}

/// Bind and serve in one call.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, state).await
}

/// Errors that can occur when starting or running the Control server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to resolve or bind the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
