//! Error types for token lifecycle operations.

use thiserror::Error;

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable credential exists and none can be minted without sending
    /// the user back through the provider's consent flow.
    #[error("Re-authentication required for {tool_name}: {reason}")]
    ReauthRequired {
        /// Tool whose credential is unusable.
        tool_name: String,
        /// Why the credential could not be refreshed.
        reason: String,
    },

    /// The provider token endpoint failed or rejected the exchange.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Provider OAuth settings are missing or malformed.
    #[error("OAuth configuration error: {0}")]
    Config(String),

    /// Persistence layer failure.
    #[error(transparent)]
    Store(#[from] valet_store::StoreError),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Classification hook for provider call errors.
///
/// Provider clients implement this so the retry layer can tell an
/// authentication rejection (worth one forced refresh and one retry) from
/// every other failure.
pub trait AuthFailure {
    /// True when the provider rejected the call for authentication reasons.
    fn is_auth_failure(&self) -> bool;
}

/// Whether a provider error message looks like an authentication rejection.
///
/// Matches the OAuth error codes and HTTP reason phrases providers use for
/// dead tokens: `invalid_grant`, `invalid_client`, `unauthorized`,
/// `forbidden`.
pub fn message_indicates_auth_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("invalid_grant")
        || lower.contains("invalid_client")
        || lower.contains("unauthorized")
        || lower.contains("forbidden")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_classification() {
        assert!(message_indicates_auth_failure("error: invalid_grant"));
        assert!(message_indicates_auth_failure("401 Unauthorized"));
        assert!(message_indicates_auth_failure("Forbidden"));
        assert!(!message_indicates_auth_failure("rate limit exceeded"));
        assert!(!message_indicates_auth_failure("connection reset"));
    }
}
