//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Gateway base URL must start with http:// or https://")]
    InvalidGatewayUrl,

    #[error("Invalid gateway timeout (must be 1-300 seconds)")]
    InvalidTimeout,

    #[error("Too many gateway retries (maximum 5)")]
    TooManyRetries,

    #[error("Invalid stage weights: {0}")]
    InvalidWeights(String),

    #[error("Communication stage is enabled but has no weight")]
    CommunicationWeightMissing,

    #[error("Technical time limit must be greater than zero")]
    InvalidTimeLimit,

    #[error("Points per question must be greater than zero")]
    InvalidPointsPerQuestion,

    #[error("Maximum document size must be greater than zero")]
    InvalidDocumentLimit,

    #[error("Invalid log level directive: {0}")]
    InvalidLogLevel(String),
}
