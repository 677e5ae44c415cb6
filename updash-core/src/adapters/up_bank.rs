//! Up Banking API client
//!
//! One authenticated GET per call against the Up API. Pagination, decoding
//! into resources and aggregation live in the services layer; this adapter
//! only turns HTTP outcomes into JSON or a classified error.
//!
//! API Documentation: https://developer.up.com.au

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::ports::ResourceApi;

/// Default production API URL
pub const UP_PRODUCTION_URL: &str = "https://api.up.com.au/api/v1";

/// Environment variable read by `Config` to override the Up API base URL
pub const UP_BASE_URL_ENV: &str = "UP_API_BASE_URL";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// JSON:API error document (`{ "errors": [{ status, title, detail }] }`)
#[derive(Debug, Deserialize)]
struct ErrorDocument {
    #[serde(default)]
    errors: Vec<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    #[serde(default)]
    #[allow(dead_code)]
    status: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Up Banking API client
#[derive(Debug, Clone)]
pub struct UpBankClient {
    client: Client,
    base_url: String,
    origin: Url,
    timeout: Duration,
}

impl UpBankClient {
    /// Create a client with a custom base URL and request timeout
    pub fn new_with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(Error::config("Up API base URL cannot be empty"));
        }
        let origin = Url::parse(base_url.trim())
            .map_err(|e| Error::config(format!("Invalid Up API base URL: {}", e)))?;
        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none() {
            return Err(Error::config("Up API base URL must be an http(s) URL with a host"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            origin,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a relative path against the base URL
    ///
    /// Page links returned by the API are absolute, so those are accepted too,
    /// but only on the base URL's scheme, host and port. The bearer token is
    /// never sent anywhere else.
    fn resolve(&self, target: &str) -> Result<String> {
        if !(target.starts_with("http://") || target.starts_with("https://")) {
            return Ok(format!("{}/{}", self.base_url, target.trim_start_matches('/')));
        }

        let url = Url::parse(target).map_err(|_| Error::RemoteApi {
            status: StatusCode::BAD_GATEWAY.as_u16(),
            message: "Up API returned an unparseable page link".to_string(),
        })?;
        let same_origin = url.scheme() == self.origin.scheme()
            && url.host_str() == self.origin.host_str()
            && url.port_or_known_default() == self.origin.port_or_known_default();
        if !same_origin {
            return Err(Error::RemoteApi {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: format!(
                    "Refusing to follow a page link outside {}",
                    self.origin.origin().ascii_serialization()
                ),
            });
        }
        Ok(url.to_string())
    }

    /// Map request errors to classified network errors
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Network(format!(
                "Request timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::Network("Unable to connect to Up Banking servers".to_string())
        } else {
            Error::Network(format!("Up request failed: {}", error))
        }
    }
}

#[async_trait]
impl ResourceApi for UpBankClient {
    async fn fetch(&self, target: &str, token: &str) -> Result<JsonValue> {
        let url = self.resolve(target)?;

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !status.is_success() {
            return Err(error_from_response(status, &body, &resource_name(&url)));
        }

        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(empty_collection());
        }

        serde_json::from_str(&body).map_err(|e| Error::RemoteApi {
            status: status.as_u16(),
            message: format!("Invalid response from {}: {}", resource_name(&url), e),
        })
    }
}

/// The body used when the API answers a list request with no content
pub fn empty_collection() -> JsonValue {
    serde_json::json!({
        "data": [],
        "links": { "prev": null, "next": null }
    })
}

/// Build a classified error from a non-success response
///
/// Uses the first structured error's title and detail when the body has
/// them, otherwise a generic message. 401 is reported as an auth failure.
fn error_from_response(status: StatusCode, body: &str, resource: &str) -> Error {
    let message = structured_message(body)
        .unwrap_or_else(|| format!("{}: failed to fetch {}", status.as_u16(), resource));

    if status == StatusCode::UNAUTHORIZED {
        Error::RemoteAuth(message)
    } else {
        Error::RemoteApi {
            status: status.as_u16(),
            message,
        }
    }
}

fn structured_message(body: &str) -> Option<String> {
    let document: ErrorDocument = serde_json::from_str(body).ok()?;
    let first = document.errors.into_iter().next()?;
    match (first.title, first.detail) {
        (Some(title), Some(detail)) => Some(format!("{} - {}", title, detail)),
        (Some(title), None) => Some(title),
        (None, Some(detail)) => Some(detail),
        (None, None) => None,
    }
}

/// Last path segment of a URL, e.g. "transactions"
fn resource_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(String::from))
        })
        .unwrap_or_else(|| "resource".to_string())
}
