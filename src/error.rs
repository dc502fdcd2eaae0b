//! Error types for geocollect

use crate::acquire::AcquireError;
use thiserror::Error;

/// Main error type for geocollect operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Positioning failed: {0}")]
    Acquisition(#[from] AcquireError),

    #[error("Address not found for ({lat}, {lon})")]
    AddressNotFound { lat: f64, lon: f64 },

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}

impl Error {
    /// Short machine-readable code used in API responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::Acquisition(_) => "acquisition_failed",
            Error::AddressNotFound { .. } => "address_not_found",
            Error::ProviderUnavailable(_) => "provider_unavailable",
            Error::Transport(_) | Error::Http(_) => "transport_error",
            Error::InvalidCoordinates(_) => "invalid_params",
            Error::Config(_) => "config_error",
            Error::Storage(_) => "save_failed",
            Error::Json(_) => "bad_request",
            Error::Io(_) | Error::Server(_) => "server_error",
        }
    }
}

/// Result type alias for geocollect operations
pub type Result<T> = std::result::Result<T, Error>;
