//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: junction_core::config::ConfigError,
    },

    /// The state store could not be opened.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: junction_core::store::StoreError,
    },

    /// The demand simulator rejected its configuration.
    #[error("simulator error: {source}")]
    Simulator {
        /// The underlying simulator error.
        #[from]
        source: junction_core::simulator::SimulatorError,
    },

    /// The Control API server failed to start.
    #[error("control error: {source}")]
    Control {
        /// The underlying startup error.
        #[from]
        source: junction_control::startup::StartupError,
    },

    /// Waiting for the termination signal failed.
    #[error("signal error: {message}")]
    Signal {
        /// Description of the signal failure.
        message: String,
    },
}
