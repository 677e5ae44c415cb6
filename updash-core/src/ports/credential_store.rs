//! Credential store port - persistence of encrypted API tokens

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::StoredCredential;

/// Per-user storage of the encrypted token columns
///
/// Each user's row is owned by that user alone; writes are single-row and
/// last-write-wins, so implementations need no cross-request locking.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user's credential columns
    ///
    /// Returns `None` when the user has no row at all.
    async fn find_by_id(&self, user_id: &str) -> Result<Option<StoredCredential>>;

    /// Overwrite a user's credential columns
    ///
    /// Writing [`StoredCredential::cleared`] removes the credential.
    async fn update(&self, user_id: &str, credential: &StoredCredential) -> Result<()>;
}
