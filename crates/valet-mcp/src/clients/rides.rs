//! Ride provider client.
//!
//! Price estimates and ride booking on behalf of the user, authenticated
//! with their OAuth access token.

use super::config::ServiceEndpoint;
use super::decode_json;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use valet_auth::{message_indicates_auth_failure, AuthFailure};

/// Ride provider client errors.
#[derive(Debug, Error)]
pub enum RidesError {
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

impl AuthFailure for RidesError {
    fn is_auth_failure(&self) -> bool {
        match self {
            RidesError::ApiError { status, message } => {
                matches!(status, 401 | 403) || message_indicates_auth_failure(message)
            }
            RidesError::RequestFailed(_) => false,
        }
    }
}

/// A trip to price or book.
#[derive(Debug, Clone, Serialize)]
pub struct RideRequest {
    /// Pickup latitude.
    pub start_latitude: f64,

    /// Pickup longitude.
    pub start_longitude: f64,

    /// Drop-off latitude.
    pub end_latitude: f64,

    /// Drop-off longitude.
    pub end_longitude: f64,

    /// Product to book, when booking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

/// One product's price estimate.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceEstimate {
    /// Product display name, e.g. "UberX".
    pub display_name: String,

    /// Human-readable estimate, e.g. "$13-17".
    pub estimate: String,

    /// ISO currency code.
    #[serde(default)]
    pub currency_code: Option<String>,

    /// Trip duration estimate in seconds.
    #[serde(default)]
    pub duration: Option<u64>,
}

/// Envelope around price estimates.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceEstimates {
    /// Per-product estimates.
    #[serde(default)]
    pub prices: Vec<PriceEstimate>,
}

/// Response from a booking request.
#[derive(Debug, Clone, Deserialize)]
pub struct RideReceipt {
    /// Booking identifier.
    pub request_id: String,

    /// Booking status, e.g. "processing".
    pub status: String,

    /// Minutes until pickup, when known.
    #[serde(default)]
    pub eta: Option<u64>,
}

/// Ride provider client.
#[derive(Clone)]
pub struct RidesClient {
    /// HTTP client instance.
    client: Client,

    /// Service endpoint configuration.
    endpoint: ServiceEndpoint,
}

impl RidesClient {
    /// Create a new ride provider client.
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoint }
    }

    /// Get price estimates for a trip.
    #[instrument(skip(self, access_token, trip))]
    pub async fn price_estimates(
        &self,
        access_token: &str,
        trip: &RideRequest,
    ) -> Result<PriceEstimates, RidesError> {
        debug!("Fetching price estimates");

        let url = self.endpoint.url("/v1.2/estimates/price");
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("start_latitude", trip.start_latitude),
                ("start_longitude", trip.start_longitude),
                ("end_latitude", trip.end_latitude),
                ("end_longitude", trip.end_longitude),
            ])
            .send()
            .await?;

        decode_json(response, |status, message| RidesError::ApiError {
            status,
            message,
        })
        .await
    }

    /// Book a ride.
    #[instrument(skip(self, access_token, trip))]
    pub async fn request_ride(
        &self,
        access_token: &str,
        trip: &RideRequest,
    ) -> Result<RideReceipt, RidesError> {
        debug!("Requesting ride");

        let url = self.endpoint.url("/v1.2/requests");
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(trip)
            .send()
            .await?;

        decode_json(response, |status, message| RidesError::ApiError {
            status,
            message,
        })
        .await
    }
}
