//! Gmail service client.
//!
//! Sends mail on behalf of a user with their OAuth access token. Payloads
//! stay minimal; the interesting behavior is the authentication failure
//! classification feeding the refresh-and-retry-once contract.

use super::config::ServiceEndpoint;
use super::decode_json;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use valet_auth::{message_indicates_auth_failure, AuthFailure};

/// Gmail client errors.
#[derive(Debug, Error)]
pub enum GmailError {
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

impl AuthFailure for GmailError {
    fn is_auth_failure(&self) -> bool {
        match self {
            GmailError::ApiError { status, message } => {
                matches!(status, 401 | 403) || message_indicates_auth_failure(message)
            }
            GmailError::RequestFailed(_) => false,
        }
    }
}

/// An email to send.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    /// Recipient address.
    pub to: String,

    /// Subject line.
    pub subject: String,

    /// Plain-text body.
    pub body: String,
}

/// Response from a send request.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    /// Message ID assigned by the provider.
    pub id: String,

    /// Thread the message landed in.
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,
}

/// Gmail service client.
#[derive(Clone)]
pub struct GmailClient {
    /// HTTP client instance.
    client: Client,

    /// Service endpoint configuration.
    endpoint: ServiceEndpoint,
}

impl GmailClient {
    /// Create a new Gmail client.
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoint }
    }

    /// Send an email as the authenticated user.
    #[instrument(skip(self, access_token, message), fields(to = %message.to))]
    pub async fn send_message(
        &self,
        access_token: &str,
        message: &OutgoingMessage,
    ) -> Result<SentMessage, GmailError> {
        debug!("Sending email");

        let url = self.endpoint.url("/gmail/v1/users/me/messages/send");
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(message)
            .send()
            .await?;

        decode_json(response, |status, message| GmailError::ApiError {
            status,
            message,
        })
        .await
    }
}
