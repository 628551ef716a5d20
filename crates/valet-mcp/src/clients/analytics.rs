//! Analytics reporting client.
//!
//! Runs metric reports against the user's analytics property with their
//! OAuth access token.

use super::config::ServiceEndpoint;
use super::decode_json;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use valet_auth::{message_indicates_auth_failure, AuthFailure};

/// Analytics client errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
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

impl AuthFailure for AnalyticsError {
    fn is_auth_failure(&self) -> bool {
        match self {
            AnalyticsError::ApiError { status, message } => {
                matches!(status, 401 | 403) || message_indicates_auth_failure(message)
            }
            AnalyticsError::RequestFailed(_) => false,
        }
    }
}

/// A report to run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRequest {
    /// Analytics property to query.
    #[serde(skip_serializing)]
    pub property_id: String,

    /// Start of the date range, `YYYY-MM-DD`.
    pub start_date: String,

    /// End of the date range, `YYYY-MM-DD`.
    pub end_date: String,

    /// Metric names, e.g. `activeUsers`.
    pub metrics: Vec<String>,

    /// Dimension names, e.g. `country`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,
}

/// Report result rows.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportResponse {
    /// Number of rows in the result.
    #[serde(rename = "rowCount", default)]
    pub row_count: u64,

    /// Result rows, shape mirrors the provider response.
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
}

/// Analytics reporting client.
#[derive(Clone)]
pub struct AnalyticsClient {
    /// HTTP client instance.
    client: Client,

    /// Service endpoint configuration.
    endpoint: ServiceEndpoint,
}

impl AnalyticsClient {
    /// Create a new analytics client.
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoint }
    }

    /// Run a report against a property.
    #[instrument(skip(self, access_token, request), fields(property = %request.property_id))]
    pub async fn run_report(
        &self,
        access_token: &str,
        request: &ReportRequest,
    ) -> Result<ReportResponse, AnalyticsError> {
        debug!("Running analytics report");

        let url = self.endpoint.url(&format!(
            "/v1beta/properties/{}:runReport",
            request.property_id
        ));
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await?;

        decode_json(response, |status, message| AnalyticsError::ApiError {
            status,
            message,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classification() {
        let unauthorized = AnalyticsError::ApiError {
            status: 401,
            message: "token expired".to_string(),
        };
        assert!(unauthorized.is_auth_failure());

        let bad_request = AnalyticsError::ApiError {
            status: 400,
            message: "unknown metric".to_string(),
        };
        assert!(!bad_request.is_auth_failure());
    }

    #[test]
    fn test_property_id_stays_out_of_body() {
        let request = ReportRequest {
            property_id: "123".to_string(),
            start_date: "2026-01-01".to_string(),
            end_date: "2026-01-31".to_string(),
            metrics: vec!["activeUsers".to_string()],
            dimensions: Vec::new(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("property_id").is_none());
        assert!(value.get("dimensions").is_none());
        assert_eq!(value["metrics"][0], "activeUsers");
    }
}
