//! Service configuration for provider clients.
//!
//! Centralized configuration for the external services Valet's tools call.
//! Configuration is loaded from environment variables with defaults that
//! point at the real provider endpoints; tests override the base URLs to
//! target a mock server.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Endpoints and timeouts for all provider services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Weather API configuration.
    pub weather: ServiceEndpoint,

    /// Gmail API configuration.
    pub gmail: ServiceEndpoint,

    /// Calendar API configuration.
    pub calendar: ServiceEndpoint,

    /// Analytics reporting API configuration.
    pub analytics: ServiceEndpoint,

    /// Ride provider API configuration.
    pub rides: ServiceEndpoint,

    /// Default request timeout in seconds.
    pub default_timeout_secs: u64,
}

impl Default for ServiceConfig {
    /// Returns the real provider endpoints with a 30 second timeout.
    fn default() -> Self {
        Self {
            weather: ServiceEndpoint {
                base_url: "https://api.open-meteo.com".to_string(),
                api_key: None,
            },
            gmail: ServiceEndpoint {
                base_url: "https://gmail.googleapis.com".to_string(),
                api_key: None,
            },
            calendar: ServiceEndpoint {
                base_url: "https://www.googleapis.com/calendar/v3".to_string(),
                api_key: None,
            },
            analytics: ServiceEndpoint {
                base_url: "https://analyticsdata.googleapis.com".to_string(),
                api_key: None,
            },
            rides: ServiceEndpoint {
                base_url: "https://api.uber.com".to_string(),
                api_key: None,
            },
            default_timeout_secs: 30,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `WEATHER_API_URL`: weather service URL
    /// - `WEATHER_API_KEY`: weather service API key, when required
    /// - `GMAIL_API_URL`: Gmail API URL
    /// - `CALENDAR_API_URL`: Calendar API URL
    /// - `ANALYTICS_API_URL`: analytics reporting API URL
    /// - `RIDES_API_URL`: ride provider API URL
    /// - `SERVICE_TIMEOUT_SECS`: request timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            weather: ServiceEndpoint {
                base_url: std::env::var("WEATHER_API_URL").unwrap_or(default.weather.base_url),
                api_key: std::env::var("WEATHER_API_KEY").ok(),
            },
            gmail: ServiceEndpoint {
                base_url: std::env::var("GMAIL_API_URL").unwrap_or(default.gmail.base_url),
                api_key: None,
            },
            calendar: ServiceEndpoint {
                base_url: std::env::var("CALENDAR_API_URL").unwrap_or(default.calendar.base_url),
                api_key: None,
            },
            analytics: ServiceEndpoint {
                base_url: std::env::var("ANALYTICS_API_URL")
                    .unwrap_or(default.analytics.base_url),
                api_key: None,
            },
            rides: ServiceEndpoint {
                base_url: std::env::var("RIDES_API_URL").unwrap_or(default.rides.base_url),
                api_key: None,
            },
            default_timeout_secs: std::env::var("SERVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.default_timeout_secs),
        }
    }

    /// Get the default request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

/// Configuration for a single service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Base URL for the service.
    pub base_url: String,

    /// API key, for services authenticated per deployment rather than
    /// per user.
    pub api_key: Option<String>,
}

impl ServiceEndpoint {
    /// Build a full URL by appending a path to the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.default_timeout_secs, 30);
        assert!(config.weather.base_url.starts_with("https://"));
    }

    #[test]
    fn test_service_endpoint_url() {
        let endpoint = ServiceEndpoint {
            base_url: "https://api.example.com".to_string(),
            api_key: None,
        };

        assert_eq!(
            endpoint.url("/v1/forecast"),
            "https://api.example.com/v1/forecast"
        );
        assert_eq!(
            endpoint.url("v1/forecast"),
            "https://api.example.com/v1/forecast"
        );
    }

    #[test]
    fn test_service_endpoint_url_trailing_slash() {
        let endpoint = ServiceEndpoint {
            base_url: "https://api.example.com/".to_string(),
            api_key: None,
        };

        assert_eq!(
            endpoint.url("/v1/forecast"),
            "https://api.example.com/v1/forecast"
        );
    }
}
