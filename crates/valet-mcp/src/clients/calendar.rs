//! Calendar service client.
//!
//! Creates events on the user's primary calendar with their OAuth access
//! token.

use super::config::ServiceEndpoint;
use super::decode_json;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use valet_auth::{message_indicates_auth_failure, AuthFailure};

/// Calendar client errors.
#[derive(Debug, Error)]
pub enum CalendarError {
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

impl AuthFailure for CalendarError {
    fn is_auth_failure(&self) -> bool {
        match self {
            CalendarError::ApiError { status, message } => {
                matches!(status, 401 | 403) || message_indicates_auth_failure(message)
            }
            CalendarError::RequestFailed(_) => false,
        }
    }
}

/// An event to create.
#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    /// Event title.
    pub summary: String,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Start instant, RFC 3339.
    pub start_time: String,

    /// End instant, RFC 3339.
    pub end_time: String,

    /// Attendee email addresses.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
}

/// Response from an event creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedEvent {
    /// Event ID assigned by the provider.
    pub id: String,

    /// Link to the event in the provider UI.
    #[serde(rename = "htmlLink", default)]
    pub html_link: Option<String>,

    /// Event status, e.g. "confirmed".
    #[serde(default)]
    pub status: Option<String>,
}

/// Calendar service client.
#[derive(Clone)]
pub struct CalendarClient {
    /// HTTP client instance.
    client: Client,

    /// Service endpoint configuration.
    endpoint: ServiceEndpoint,
}

impl CalendarClient {
    /// Create a new calendar client.
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoint }
    }

    /// Insert an event into the user's primary calendar.
    #[instrument(skip(self, access_token, event), fields(summary = %event.summary))]
    pub async fn create_event(
        &self,
        access_token: &str,
        event: &NewEvent,
    ) -> Result<CreatedEvent, CalendarError> {
        debug!("Creating calendar event");

        let url = self.endpoint.url("/calendars/primary/events");
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;

        decode_json(response, |status, message| CalendarError::ApiError {
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
        let forbidden = CalendarError::ApiError {
            status: 403,
            message: "insufficient scope".to_string(),
        };
        assert!(forbidden.is_auth_failure());

        let conflict = CalendarError::ApiError {
            status: 409,
            message: "duplicate event".to_string(),
        };
        assert!(!conflict.is_auth_failure());
    }

    #[test]
    fn test_new_event_skips_empty_fields() {
        let event = NewEvent {
            summary: "Standup".to_string(),
            description: None,
            start_time: "2026-08-07T09:00:00Z".to_string(),
            end_time: "2026-08-07T09:15:00Z".to_string(),
            attendees: Vec::new(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("description").is_none());
        assert!(value.get("attendees").is_none());
    }
}
