//! HTTP contract for the per-user API routes
//!
//! Handlers are plain async methods from request parts to an [`ApiResponse`],
//! so any HTTP server can mount them. `session` is the user id established
//! by the identity provider; `None` means the request is unauthenticated.
//! Error bodies only ever carry messages that are safe to show.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use url::form_urlencoded;

use crate::domain::filter::parse_timestamp;
use crate::domain::result::{Error, Result};
use crate::domain::{Cursor, CursorKind, DateFilter};
use crate::services::credential::CredentialService;
use crate::services::resources::{ResourceService, TransactionsQuery};

const UNAUTHORIZED: &str = "Unauthorized: User not authenticated.";
const INVALID_CURSOR: &str = "Missing or invalid cursorType/cursorValue query parameters";

/// Status code and JSON body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: JsonValue,
}

impl ApiResponse {
    pub fn ok(body: JsonValue) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn message(message: &str) -> Self {
        Self::ok(json!({ "message": message }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP status for a failed operation
pub fn status_for(error: &Error) -> u16 {
    match error {
        Error::Validation(_) | Error::CredentialNotConfigured => 400,
        Error::RemoteAuth(_) | Error::DecryptionFailed => 401,
        _ => 500,
    }
}

fn fetch_failure(error: &Error, fallback: &str) -> ApiResponse {
    let message = match error {
        Error::Validation(msg) => msg.clone(),
        Error::CredentialNotConfigured => "API token not configured.".to_string(),
        Error::DecryptionFailed => "Failed to decrypt API token.".to_string(),
        Error::RemoteAuth(_) => "Up API Authorization Failed.".to_string(),
        Error::RemoteApi { .. } | Error::Network(_) => error.user_message(),
        _ => fallback.to_string(),
    };
    ApiResponse::error(status_for(error), message)
}

/// Route handlers over the credential and resource services
pub struct ApiHandlers {
    credentials: Arc<CredentialService>,
    resources: Arc<ResourceService>,
}

impl ApiHandlers {
    pub fn new(credentials: Arc<CredentialService>, resources: Arc<ResourceService>) -> Self {
        Self {
            credentials,
            resources,
        }
    }

    /// `GET /transactions?cursorType=&cursorValue=&since=&until=`
    ///
    /// Without a cursor the first page is returned. The body is the Up page
    /// as-is, `{ data, links }`.
    pub async fn get_transactions(&self, session: Option<&str>, query: &str) -> ApiResponse {
        let Some(user_id) = session else {
            return ApiResponse::error(401, UNAUTHORIZED);
        };
        let query = match parse_transactions_query(query) {
            Ok(query) => query,
            Err(e) => return fetch_failure(&e, INVALID_CURSOR),
        };

        let token = match self.credentials.require_token(user_id).await {
            Ok(token) => token,
            Err(e) => return fetch_failure(&e, "Failed to fetch transaction page."),
        };

        match self.resources.transaction_page(&token, &query).await {
            Ok(page) => match serde_json::to_value(page) {
                Ok(body) => ApiResponse::ok(body),
                Err(_) => ApiResponse::error(500, "Failed to fetch transaction page."),
            },
            Err(e) => fetch_failure(&e, "Failed to fetch transaction page."),
        }
    }

    /// `GET /accounts`, every account as `{ data }`
    pub async fn get_accounts(&self, session: Option<&str>) -> ApiResponse {
        let Some(user_id) = session else {
            return ApiResponse::error(401, UNAUTHORIZED);
        };
        let token = match self.credentials.require_token(user_id).await {
            Ok(token) => token,
            Err(e) => return fetch_failure(&e, "Failed to fetch accounts."),
        };

        match self.resources.list_accounts(&token).await {
            Ok(run) => ApiResponse::ok(json!({ "data": run.items })),
            Err(failure) => fetch_failure(&failure.error, "Failed to fetch accounts."),
        }
    }

    /// `POST /token` with body `{ "token": "up:yeah:..." }`
    pub async fn post_token(&self, session: Option<&str>, raw_body: &str) -> ApiResponse {
        let Some(user_id) = session else {
            return ApiResponse::error(401, UNAUTHORIZED);
        };
        let body: JsonValue = match serde_json::from_str(raw_body) {
            Ok(body) => body,
            Err(_) => return ApiResponse::error(400, "Bad Request: Invalid JSON format."),
        };
        let Some(token) = body.get("token").and_then(JsonValue::as_str) else {
            return ApiResponse::error(400, "Bad Request: Token is missing or invalid.");
        };

        match self.credentials.save_credential(user_id, token).await {
            Ok(()) => ApiResponse::message("Token saved successfully."),
            Err(Error::Validation(msg)) => ApiResponse::error(400, format!("Bad Request: {}", msg)),
            Err(_) => ApiResponse::error(500, "Internal Server Error: Failed to save token."),
        }
    }

    /// `DELETE /token`; succeeds when no token is stored
    pub async fn delete_token(&self, session: Option<&str>) -> ApiResponse {
        let Some(user_id) = session else {
            return ApiResponse::error(401, UNAUTHORIZED);
        };
        match self.credentials.remove_credential(user_id).await {
            Ok(()) => ApiResponse::message("Token removed successfully."),
            Err(_) => ApiResponse::error(500, "Internal Server Error: Failed to remove token."),
        }
    }
}

/// Parse `cursorType`, `cursorValue`, `since` and `until`
///
/// The cursor pair must be given together or not at all.
pub fn parse_transactions_query(query: &str) -> Result<TransactionsQuery> {
    let mut cursor_type = None;
    let mut cursor_value = None;
    let mut since = None;
    let mut until = None;

    for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        match key.as_ref() {
            "cursorType" => cursor_type = Some(value.into_owned()),
            "cursorValue" => cursor_value = Some(value.into_owned()),
            "since" => since = Some(parse_timestamp("since", &value)?),
            "until" => until = Some(parse_timestamp("until", &value)?),
            _ => {}
        }
    }

    let cursor = match (cursor_type, cursor_value) {
        (None, None) => None,
        (Some(kind), Some(value)) if !value.is_empty() => {
            let kind = CursorKind::parse(&kind).ok_or_else(|| Error::validation(INVALID_CURSOR))?;
            Some(Cursor { kind, value })
        }
        _ => return Err(Error::validation(INVALID_CURSOR)),
    };

    Ok(TransactionsQuery {
        cursor,
        filter: DateFilter::new(since, until)?,
        page_size: None,
    })
}
