//! Encrypted credential models

use serde::{Deserialize, Serialize};

/// Length of the AES-GCM initialization vector in bytes
pub const IV_LENGTH: usize = 16;

/// Length of the AES-GCM authentication tag in bytes
pub const AUTH_TAG_LENGTH: usize = 16;

/// An API token at rest: hex-encoded IV, ciphertext and authentication tag
///
/// Replacing a token always produces a brand-new triple; an existing value is
/// never modified in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedSecret {
    pub iv: String,
    pub encrypted_token: String,
    pub auth_tag: String,
}

/// The three credential columns as the persistence layer holds them
///
/// Each column may independently be absent. Only a row with all three present
/// counts as a configured credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub encrypted_token: Option<String>,
    pub iv: Option<String>,
    pub auth_tag: Option<String>,
}

impl StoredCredential {
    /// The all-absent state written when a credential is removed
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Whether all three parts are present and non-empty
    pub fn is_configured(&self) -> bool {
        self.complete().is_some()
    }

    /// Convert to an encrypted secret, treating partial rows as not configured
    pub fn complete(&self) -> Option<EncryptedSecret> {
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
        Some(EncryptedSecret {
            encrypted_token: present(&self.encrypted_token)?,
            iv: present(&self.iv)?,
            auth_tag: present(&self.auth_tag)?,
        })
    }
}

impl From<EncryptedSecret> for StoredCredential {
    fn from(secret: EncryptedSecret) -> Self {
        Self {
            encrypted_token: Some(secret.encrypted_token),
            iv: Some(secret.iv),
            auth_tag: Some(secret.auth_tag),
        }
    }
}
