//! # Error Types
//!
//! Custom error types for the X2D codec using `thiserror`.
//!
//! Codec stages themselves never fail: they report a [`Process`] code.
//! These errors cover everything around them.
//!
//! [`Process`]: crate::codec::Process

use crate::codec::Stall;
use thiserror::Error;

/// Main error type for the X2D codec
#[derive(Debug, Error)]
pub enum X2dError {
    /// Message rejected before or after coding
    #[error("X2D message error: {0}")]
    Message(String),

    /// A pipeline could not complete
    #[error("Codec error: {0}")]
    Stall(#[from] Stall),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the X2D codec
pub type Result<T> = std::result::Result<T, X2dError>;
