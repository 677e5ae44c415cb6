//! Remote resource API port

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::result::Result;

/// One authenticated GET against the remote resource API
///
/// `target` is either a path relative to the API base URL (including its
/// query string) or an absolute URL taken from a previous page's links.
/// Implementations return the decoded JSON body, or one of
/// `Error::RemoteAuth`, `Error::RemoteApi` and `Error::Network`.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn fetch(&self, target: &str, token: &str) -> Result<JsonValue>;
}
