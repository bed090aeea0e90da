//! Client error types

use thiserror::Error;

/// Errors surfaced by the controller client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not reach or talk to the main repeater
    #[error("transport error: {0}")]
    Transport(String),

    /// The topology cache could not be loaded or refreshed
    #[error("topology load failed: {0}")]
    TopologyLoad(String),

    /// An operation needed the topology before it was loaded
    #[error("topology not loaded")]
    TopologyNotLoaded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
