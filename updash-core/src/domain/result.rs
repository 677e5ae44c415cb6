//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Variants follow the failure classes a caller has to tell apart: a missing
/// or unusable credential, a rejected token at the remote API, a transient
/// network problem, and everything else.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API token not configured")]
    CredentialNotConfigured,

    #[error("Failed to decrypt API token")]
    DecryptionFailed,

    #[error("Up API authorization failed: {0}")]
    RemoteAuth(String),

    #[error("Up API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short classification used in the event log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::CredentialNotConfigured => "credential_not_configured",
            Self::DecryptionFailed => "decryption_failed",
            Self::RemoteAuth(_) => "remote_auth",
            Self::RemoteApi { .. } => "remote_api",
            Self::Network(_) => "network",
            Self::Validation(_) => "validation",
            Self::Database(_) => "database",
            Self::Encryption(_) => "encryption",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether the stored token itself is the problem and the user has to
    /// supply a new one
    pub fn needs_new_token(&self) -> bool {
        matches!(
            self,
            Self::CredentialNotConfigured | Self::DecryptionFailed | Self::RemoteAuth(_)
        )
    }

    /// Message that is safe to show to the user
    ///
    /// Never includes key material or ciphertext. Remote API details are
    /// passed through since they come from the API's own error body.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => "The server is misconfigured.".to_string(),
            Self::CredentialNotConfigured => {
                "API token not configured. Please add your Up Banking token in Settings.".to_string()
            }
            Self::DecryptionFailed => {
                "Failed to decrypt your API token. Please re-enter it in Settings.".to_string()
            }
            Self::RemoteAuth(_) => {
                "Your Up Banking token seems invalid or expired. Please update it in Settings."
                    .to_string()
            }
            Self::RemoteApi { .. } => self.to_string(),
            Self::Network(_) => {
                "Could not reach Up Banking. Please try again in a moment.".to_string()
            }
            Self::Validation(msg) => msg.clone(),
            _ => "An unexpected error occurred.".to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(Error::Network("connection reset".into()).is_retryable());
        assert!(!Error::RemoteAuth("bad token".into()).is_retryable());
        assert!(!Error::RemoteApi {
            status: 500,
            message: "boom".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_needs_new_token() {
        assert!(Error::CredentialNotConfigured.needs_new_token());
        assert!(Error::DecryptionFailed.needs_new_token());
        assert!(Error::RemoteAuth("revoked".into()).needs_new_token());
        assert!(!Error::Network("timeout".into()).needs_new_token());
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let err = Error::database("duckdb: IO Error: /home/me/.updash/updash.duckdb");
        assert_eq!(err.user_message(), "An unexpected error occurred.");

        let err = Error::config("UP_TOKEN_ENCRYPTION_KEY has 12 hex characters");
        assert!(!err.user_message().contains("UP_TOKEN_ENCRYPTION_KEY"));
    }

    #[test]
    fn test_remote_api_message_includes_status() {
        let err = Error::RemoteApi {
            status: 422,
            message: "Invalid filter - filter[since] is not a valid date".into(),
        };
        assert_eq!(
            err.to_string(),
            "Up API error (422): Invalid filter - filter[since] is not a valid date"
        );
    }
}
