//! Weather service client.
//!
//! Unauthenticated current-conditions lookup. The default endpoint speaks
//! the Open-Meteo response shape.

use super::config::ServiceEndpoint;
use super::decode_json;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Weather client errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },
}

/// Current conditions for a location.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    /// Air temperature, degrees Celsius.
    pub temperature: f64,

    /// Wind speed, km/h.
    #[serde(rename = "windspeed")]
    pub wind_speed: f64,

    /// Provider weather code.
    #[serde(rename = "weathercode", default)]
    pub weather_code: Option<i64>,
}

/// Envelope around the current-conditions block.
#[derive(Debug, Clone, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

/// Weather service client.
#[derive(Clone)]
pub struct WeatherClient {
    /// HTTP client instance.
    client: Client,

    /// Service endpoint configuration.
    endpoint: ServiceEndpoint,
}

impl WeatherClient {
    /// Create a new weather client.
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoint }
    }

    /// Current conditions at a coordinate.
    #[instrument(skip(self))]
    pub async fn current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentWeather, WeatherError> {
        debug!("Fetching current weather");

        let url = self.endpoint.url("/v1/forecast");
        let mut request = self.client.get(&url).query(&[
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("current_weather", "true".to_string()),
        ]);

        if let Some(ref api_key) = self.endpoint.api_key {
            request = request.query(&[("apikey", api_key.as_str())]);
        }

        let response = request.send().await?;
        let forecast: ForecastResponse = decode_json(response, |status, message| {
            WeatherError::ApiError { status, message }
        })
        .await?;

        Ok(forecast.current_weather)
    }
}
