//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CANDIDATE_ASSESSMENT` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use candidate_assessment::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Gateway at {}", config.gateway.base_url);
//! ```

mod assessment;
mod error;
mod gateway;
mod storage;
mod telemetry;

pub use assessment::{AssessmentConfig, WeightsConfig};
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use storage::StorageConfig;
pub use telemetry::TelemetryConfig;

use serde::Deserialize;

use crate::adapters::gateway::HttpGatewayConfig;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Analysis gateway (base URL, timeout, retries)
    pub gateway: GatewayConfig,

    /// Session storage location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Workflow, weights and stage limits
    #[serde(default)]
    pub assessment: AssessmentConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CANDIDATE_ASSESSMENT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CANDIDATE_ASSESSMENT__GATEWAY__BASE_URL=...` -> `gateway.base_url = ...`
    /// - `CANDIDATE_ASSESSMENT__ASSESSMENT__WEIGHTS__RESUME=0.3` -> `assessment.weights.resume = 0.3`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CANDIDATE_ASSESSMENT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Performs semantic validation of configuration:
    /// - Gateway URL scheme, timeout and retry bounds
    /// - Weight sums and workflow/weight consistency
    /// - Log filter syntax
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.gateway.validate()?;
        self.storage.validate()?;
        self.assessment.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }

    /// HTTP client settings for the gateway adapter
    pub fn http_gateway(&self) -> HttpGatewayConfig {
        HttpGatewayConfig::new(self.gateway.base_url.trim())
            .with_timeout(self.gateway.timeout())
            .with_max_retries(self.gateway.max_retries)
    }
}
