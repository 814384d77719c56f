//! Engine binary for the Junction intersection controller.
//!
//! This is the main entry point that wires together the signal
//! controller, the demand simulator, and the Control API. It loads
//! configuration, opens the shared state store, and runs both loops
//! until the process receives a termination signal.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `junction-config.yaml`
//! 3. Open the state store (snapshot-backed or in-memory)
//! 4. Start the Control API server
//! 5. Spawn the signal controller loop
//! 6. Spawn the demand simulator loop
//! 7. Wait for Ctrl-C
//! 8. Stop the simulator gracefully, abort the rest

mod error;

use std::path::Path;
use std::sync::Arc;

use junction_control::server::ServerConfig;
use junction_control::startup::spawn_control_api;
use junction_control::state::AppState;
use junction_core::config::EngineConfig;
use junction_core::controller::{ControllerConfig, SignalController};
use junction_core::simulator::DemandSimulator;
use junction_core::store::StateStore;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Application entry point for the engine.
///
/// Initializes all subsystems and runs both loops. Returns an error
/// code on failure.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("junction-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        intersection = config.intersection.name,
        port = config.server.port,
        tick_interval_ms = config.traffic.tick_interval_ms,
        persist = config.storage.persist,
        "Configuration loaded"
    );

    // 3. Open the state store.
    let store = if config.storage.persist {
        let opened = StateStore::open(Path::new(&config.storage.data_dir))
            .map_err(EngineError::from)?;
        Arc::new(opened)
    } else {
        Arc::new(StateStore::in_memory())
    };
    info!(
        data_dir = config.storage.data_dir,
        persist = config.storage.persist,
        "State store opened"
    );

    // 4. Start the Control API server.
    let app_state = Arc::new(AppState::new(
        Arc::clone(&store),
        config.intersection.name.clone(),
    ));
    let _control_handle = spawn_control_api(&ServerConfig::from(&config.server), app_state)
        .await
        .map_err(EngineError::from)?;
    info!(port = config.server.port, "Control API server started");

    // 5. Spawn the signal controller loop.
    let controller = SignalController::new(
        Arc::clone(&store),
        ControllerConfig::from(&config.control),
    );
    let controller_handle = tokio::spawn(controller.run());
    info!("Signal controller loop started");

    // 6. Spawn the demand simulator loop.
    let simulator = DemandSimulator::new(Arc::clone(&store), &config.traffic)
        .map_err(EngineError::from)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let simulator_handle = tokio::spawn(simulator.run(shutdown_rx));
    info!("Demand simulator loop started");

    // 7. Wait for Ctrl-C.
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| EngineError::Signal {
            message: format!("{e}"),
        })?;
    info!("Termination signal received, shutting down");

    // 8. Stop the simulator gracefully so it clears the phase status;
    //    the controller and the server are aborted, they hold no state
    //    that outlives the process.
    if shutdown_tx.send(true).is_err() {
        warn!("simulator already stopped");
    }
    if let Err(e) = simulator_handle.await {
        warn!(error = %e, "demand simulator task failed");
    }
    controller_handle.abort();

    info!("junction-engine shutdown complete");

    Ok(())
}

/// Load the engine configuration from `junction-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<EngineConfig, EngineError> {
    let config_path = Path::new("junction-config.yaml");
    if config_path.exists() {
        let config = EngineConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        Ok(EngineConfig::default())
    }
}
