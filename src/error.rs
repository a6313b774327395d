//! # Error Types
//!
//! Custom error types for Enviro Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Enviro Bridge
#[derive(Debug, Error)]
pub enum EnviroBridgeError {
    /// CAN frame construction or encoding errors
    #[error("CAN protocol error: {0}")]
    CanProtocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Journal serialization errors
    #[error("Journal error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serial adapter communication errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No SLCAN adapter found at any of the candidate device paths
    #[error("No CAN adapter found at: {0}")]
    SerialPortNotFound(String),
}

/// Result type alias for Enviro Bridge
pub type Result<T> = std::result::Result<T, EnviroBridgeError>;
