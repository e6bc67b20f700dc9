//! Analysis gateway configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Analysis gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the analysis service
    pub base_url: String,

    /// Bearer token to seed the session store with (optional)
    pub api_token: Option<Secret<String>>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for idempotent requests
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl GatewayConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__BASE_URL"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_retries > 5 {
            return Err(ValidationError::TooManyRetries);
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> GatewayConfig {
        GatewayConfig {
            base_url: url.to_string(),
            api_token: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config("https://analyzer.example.com").validate().is_ok());
        assert!(config("http://localhost:8000").validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            config("ftp://analyzer").validate(),
            Err(ValidationError::InvalidGatewayUrl)
        ));
        assert!(matches!(
            config("  ").validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_timeout_bounds() {
        let mut cfg = config("https://a.example.com");
        cfg.timeout_secs = 0;
        assert!(cfg.validate().is_err());
        cfg.timeout_secs = 301;
        assert!(cfg.validate().is_err());
        cfg.timeout_secs = 60;
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_limit() {
        let mut cfg = config("https://a.example.com");
        cfg.max_retries = 6;
        assert!(matches!(cfg.validate(), Err(ValidationError::TooManyRetries)));
    }
}
