//! Credential service - per-user lifecycle of the Up API token
//!
//! Save validates and encrypts, lookup decrypts and reports which of the
//! three states the user is in, remove clears the stored triple.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::StoredCredential;
use crate::ports::CredentialStore;
use crate::services::logging::{emit, LogEvent, LoggingService};
use crate::services::vault::TokenVault;

/// Prefix every Up personal access token starts with
pub const TOKEN_PREFIX: &str = "up:yeah:";

const TOKEN_PATTERN: &str = r"^up:yeah:\S+$";

/// Outcome of looking up a user's token
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialState {
    NotConfigured,
    DecryptionFailed,
    Ready(String),
}

impl CredentialState {
    /// The token, or the error matching the state
    pub fn into_token(self) -> Result<String> {
        match self {
            CredentialState::Ready(token) => Ok(token),
            CredentialState::NotConfigured => Err(Error::CredentialNotConfigured),
            CredentialState::DecryptionFailed => Err(Error::DecryptionFailed),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CredentialState::Ready(_))
    }
}

impl fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialState::NotConfigured => f.write_str("NotConfigured"),
            CredentialState::DecryptionFailed => f.write_str("DecryptionFailed"),
            CredentialState::Ready(_) => f.write_str("Ready(<redacted>)"),
        }
    }
}

/// Whether a user has a complete stored token (without decrypting it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Configured,
    NotConfigured,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStatus::Configured => "configured",
            CredentialStatus::NotConfigured => "not_configured",
        }
    }
}

/// Service for saving, loading and removing a user's Up token
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    vault: Arc<TokenVault>,
    logger: Option<Arc<LoggingService>>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn CredentialStore>, vault: Arc<TokenVault>) -> Self {
        Self {
            store,
            vault,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Look up and decrypt the user's token
    ///
    /// A missing row and a partially populated row both count as not
    /// configured. Store failures are returned as errors.
    pub async fn get_decrypted_credential(&self, user_id: &str) -> Result<CredentialState> {
        let secret = match self.store.find_by_id(user_id).await? {
            Some(stored) => stored.complete(),
            None => None,
        };
        let Some(secret) = secret else {
            return Ok(CredentialState::NotConfigured);
        };

        match self.vault.decrypt(&secret) {
            Ok(token) => Ok(CredentialState::Ready(token)),
            Err(_) => {
                emit(
                    &self.logger,
                    LogEvent::new("credential_decrypt_failed")
                        .with_user(user_id)
                        .with_error_kind(&Error::DecryptionFailed),
                );
                Ok(CredentialState::DecryptionFailed)
            }
        }
    }

    /// Convenience for callers that only want a usable token
    pub async fn require_token(&self, user_id: &str) -> Result<String> {
        self.get_decrypted_credential(user_id).await?.into_token()
    }

    /// Validate, encrypt and store a token, replacing any existing one
    pub async fn save_credential(&self, user_id: &str, plaintext: &str) -> Result<()> {
        let token = plaintext.trim();
        if let Err(e) = validate_token(token) {
            emit(
                &self.logger,
                LogEvent::new("credential_rejected")
                    .with_user(user_id)
                    .with_error_kind(&e),
            );
            return Err(e);
        }

        // Encryption failing means the vault is broken; let it propagate
        let secret = self.vault.encrypt(token)?;
        self.store
            .update(user_id, &StoredCredential::from(secret))
            .await?;

        emit(&self.logger, LogEvent::new("credential_saved").with_user(user_id));
        Ok(())
    }

    /// Clear the stored token; succeeds when none is stored
    pub async fn remove_credential(&self, user_id: &str) -> Result<()> {
        self.store
            .update(user_id, &StoredCredential::cleared())
            .await?;
        emit(&self.logger, LogEvent::new("credential_removed").with_user(user_id));
        Ok(())
    }

    /// Report whether a complete token is stored, without decrypting
    pub async fn status(&self, user_id: &str) -> Result<CredentialStatus> {
        let configured = self
            .store
            .find_by_id(user_id)
            .await?
            .map_or(false, |stored| stored.is_configured());
        Ok(if configured {
            CredentialStatus::Configured
        } else {
            CredentialStatus::NotConfigured
        })
    }

    /// Fingerprint of the vault key, safe to display
    pub fn key_fingerprint(&self) -> &str {
        self.vault.key_fingerprint()
    }
}

/// Check a (trimmed) token against the Up token format
pub fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::validation("Token is missing or invalid."));
    }
    let pattern = Regex::new(TOKEN_PATTERN).map_err(|e| Error::Other(e.to_string()))?;
    if !pattern.is_match(token) {
        return Err(Error::validation(format!(
            "Invalid token format. Expected '{}...'",
            TOKEN_PREFIX
        )));
    }
    Ok(())
}
