//! Mock Up Banking API server for testing
//!
//! Serves cursor-paginated `/accounts` and `/transactions` and an unpaginated
//! `/categories`, with absolute `next`/`prev` links the way the real API
//! returns them. Failure modes (401, unparseable error bodies, empty bodies,
//! a failing page) are switched on through `MockConfig`.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value as JsonValue};
use url::form_urlencoded;

/// Mock Up server for testing
pub struct MockUpServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Configuration for mock data generation
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub num_accounts: usize,
    pub num_transactions: usize,
    /// Reject every request with a structured 401
    pub fail_auth: bool,
    /// Answer every request with a 500 and an HTML body
    pub malformed_errors: bool,
    /// Answer every request with 200 and no body
    pub empty_body: bool,
    /// Zero-based page index that fails with a structured 500
    pub fail_on_page: Option<usize>,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_accounts: 3,
            num_transactions: 50,
            fail_auth: false,
            malformed_errors: false,
            empty_body: false,
            fail_on_page: None,
            delay_ms: 0,
        }
    }
}

/// A request as the server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub cache_control: Option<String>,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Timestamp of the newest mock transaction; older ones step back 12 hours each
pub fn mock_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 28, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

struct Shared {
    config: MockConfig,
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let shared = Arc::new(Shared {
            config,
            base_url: format!("http://127.0.0.1:{}", port),
            requests: requests.clone(),
        });

        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let shared = shared.clone();
                        thread::spawn(move || handle_connection(stream, &shared));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockUpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, shared: &Shared) {
    // The accepted socket inherits non-blocking mode on some platforms
    let _ = stream.set_nonblocking(false);
    let mut buffer = [0; 8192];
    let n = match stream.read(&mut buffer) {
        Ok(n) => n,
        Err(_) => return,
    };
    let request = String::from_utf8_lossy(&buffer[..n]);
    let config = &shared.config;

    let mut lines = request.lines();
    let parts: Vec<&str> = lines.next().unwrap_or("").split_whitespace().collect();
    if parts.len() < 2 {
        send_json(&mut stream, 400, "Bad Request", &error_body("400", "Bad Request", "Malformed request line"));
        return;
    }
    let (method, target) = (parts[0], parts[1]);

    let mut authorization = None;
    let mut accept = None;
    let mut cache_control = None;
    for line in lines.take_while(|l| !l.is_empty()) {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_lowercase().as_str() {
                "authorization" => authorization = Some(value.trim().to_string()),
                "accept" => accept = Some(value.trim().to_string()),
                "cache-control" => cache_control = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    let (path, query_string) = target.split_once('?').unwrap_or((target, ""));
    let path = path.to_string();
    let query: Vec<(String, String)> = form_urlencoded::parse(query_string.as_bytes())
        .into_owned()
        .collect();

    let recorded = RecordedRequest {
        path: path.clone(),
        query,
        authorization: authorization.clone(),
        accept,
        cache_control,
    };
    if let Ok(mut requests) = shared.requests.lock() {
        requests.push(recorded.clone());
    }

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    let authorized = authorization
        .as_deref()
        .map_or(false, |value| value.starts_with("Bearer up:yeah:"));
    if config.fail_auth || !authorized {
        send_json(
            &mut stream,
            401,
            "Unauthorized",
            &error_body(
                "401",
                "Not Authorized",
                "The request was not authenticated because no valid credential was found in the Authorization header, or the Authorization header was not present.",
            ),
        );
        return;
    }

    if config.malformed_errors {
        send_response(
            &mut stream,
            500,
            "Internal Server Error",
            "text/html",
            "<html><body>Internal Server Error</body></html>",
        );
        return;
    }

    if config.empty_body {
        send_response(&mut stream, 200, "OK", "application/json", "");
        return;
    }

    if method != "GET" {
        send_json(
            &mut stream,
            405,
            "Method Not Allowed",
            &error_body("405", "Method Not Allowed", "Only GET is supported"),
        );
        return;
    }

    let body = match path.as_str() {
        "/accounts" => paginate(generate_mock_accounts(config.num_accounts), &recorded, shared),
        "/transactions" => {
            let items = filter_by_created_at(generate_mock_transactions(config.num_transactions), &recorded);
            paginate(items, &recorded, shared)
        }
        "/categories" => Ok(json!({ "data": generate_mock_categories() })),
        _ => {
            send_json(
                &mut stream,
                404,
                "Not Found",
                &error_body("404", "Not Found", "The requested resource does not exist."),
            );
            return;
        }
    };

    match body {
        Ok(body) => send_json(&mut stream, 200, "OK", &body),
        Err(body) => send_json(&mut stream, 500, "Internal Server Error", &body),
    }
}

/// Slice `items` according to `page[size]` and `page[after]`/`page[before]`
///
/// Cursors are plain item offsets. Returns the error document instead when
/// the requested page is the configured failing one.
fn paginate(
    items: Vec<JsonValue>,
    request: &RecordedRequest,
    shared: &Shared,
) -> Result<JsonValue, JsonValue> {
    let size = request
        .param("page[size]")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10)
        .clamp(1, 100);

    let (start, end) = match (
        request.param("page[after]").and_then(|s| s.parse::<usize>().ok()),
        request.param("page[before]").and_then(|s| s.parse::<usize>().ok()),
    ) {
        (Some(after), _) => (after, after + size),
        (None, Some(before)) => (before.saturating_sub(size), before),
        (None, None) => (0, size),
    };
    let start = start.min(items.len());
    let end = end.min(items.len());

    if shared.config.fail_on_page == Some(start / size) {
        return Err(error_body("500", "Internal Server Error", "Something went wrong"));
    }

    let link = |cursor: &str, value: usize| {
        format!(
            "{}{}?page%5Bsize%5D={}&page%5B{}%5D={}",
            shared.base_url, request.path, size, cursor, value
        )
    };
    let next = (end < items.len()).then(|| link("after", end));
    let prev = (start > 0).then(|| link("before", start));

    Ok(json!({
        "data": items[start..end].to_vec(),
        "links": { "prev": prev, "next": next }
    }))
}

fn filter_by_created_at(items: Vec<JsonValue>, request: &RecordedRequest) -> Vec<JsonValue> {
    let bound = |key: &str| {
        request
            .param(key)
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };
    let since = bound("filter[since]");
    let until = bound("filter[until]");

    items
        .into_iter()
        .filter(|item| {
            let created = item["attributes"]["createdAt"]
                .as_str()
                .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                .map(|dt| dt.with_timezone(&Utc));
            match created {
                Some(at) => since.map_or(true, |s| at >= s) && until.map_or(true, |u| at < u),
                None => false,
            }
        })
        .collect()
}

fn error_body(status: &str, title: &str, detail: &str) -> JsonValue {
    json!({ "errors": [{ "status": status, "title": title, "detail": detail }] })
}

fn send_json(stream: &mut TcpStream, status: u16, status_text: &str, body: &JsonValue) {
    send_response(stream, status, status_text, "application/json", &body.to_string());
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        content_type,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn money(cents: i64) -> JsonValue {
    json!({
        "currencyCode": "AUD",
        "value": format!("{}{}.{:02}", if cents < 0 { "-" } else { "" }, cents.abs() / 100, cents.abs() % 100),
        "valueInBaseUnits": cents
    })
}

fn generate_mock_accounts(count: usize) -> Vec<JsonValue> {
    let kinds = [
        ("Spending", "TRANSACTIONAL"),
        ("Savings", "SAVER"),
        ("Holiday", "SAVER"),
        ("Rainy Day", "SAVER"),
    ];

    (0..count)
        .map(|i| {
            let (name, account_type) = kinds[i % kinds.len()];
            json!({
                "type": "accounts",
                "id": format!("acc_{}", i + 1),
                "attributes": {
                    "displayName": name,
                    "accountType": account_type,
                    "ownershipType": "INDIVIDUAL",
                    "balance": money(100_000 + (i as i64) * 50_000),
                    "createdAt": "2024-01-01T09:00:00+11:00"
                }
            })
        })
        .collect()
}

/// Mock merchants: (description, cents, category)
const MERCHANTS: &[(&str, i64, Option<&str>)] = &[
    ("Woolworths", -4523, Some("groceries")),
    ("Netflix", -1699, Some("tv-and-music")),
    ("Salary", 350_000, None),
    ("Bakery", -450, Some("restaurants-and-cafes")),
    ("Cover from Savings", 0, None),
    ("Shell", -5200, Some("fuel")),
    ("Coles", -2999, Some("groceries")),
    ("Uber", -1250, None),
    ("Interest", 250, None),
    ("Cafe", -650, Some("restaurants-and-cafes")),
];

/// Newest first, like the real API
fn generate_mock_transactions(count: usize) -> Vec<JsonValue> {
    let epoch = mock_epoch();
    (0..count)
        .map(|i| {
            let (description, cents, category) = MERCHANTS[i % MERCHANTS.len()];
            let created_at = epoch - Duration::hours(12 * i as i64);
            json!({
                "type": "transactions",
                "id": format!("tx_{}", i + 1),
                "attributes": {
                    "status": "SETTLED",
                    "rawText": null,
                    "description": description,
                    "message": null,
                    "amount": money(cents),
                    "foreignAmount": null,
                    "settledAt": created_at.to_rfc3339(),
                    "createdAt": created_at.to_rfc3339()
                },
                "relationships": {
                    "account": { "data": { "type": "accounts", "id": "acc_1" } },
                    "category": { "data": category.map(|c| json!({ "type": "categories", "id": c })) },
                    "parentCategory": { "data": null }
                }
            })
        })
        .collect()
}

fn generate_mock_categories() -> Vec<JsonValue> {
    [
        ("groceries", "Groceries"),
        ("tv-and-music", "TV, Music & Streaming"),
        ("restaurants-and-cafes", "Restaurants & Cafes"),
        ("fuel", "Fuel"),
    ]
    .iter()
    .map(|(id, name)| json!({ "type": "categories", "id": id, "attributes": { "name": name } }))
    .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use super::*;
    use crate::adapters::up_bank::UpBankClient;
    use crate::domain::result::Error;
    use crate::domain::{DateFilter, UpAccount, UpTransaction};
    use crate::ports::ResourceApi;
    use crate::services::pagination::{collect_all, fetch_page, ResourceQuery};

    const TOKEN: &str = "up:yeah:mock-token";

    fn client(server: &MockUpServer) -> UpBankClient {
        UpBankClient::new_with_base_url(&server.base_url(), StdDuration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_walk_all_pages_in_order() {
        let server = MockUpServer::start(MockConfig {
            num_transactions: 25,
            ..Default::default()
        })
        .unwrap();
        let client = client(&server);

        let query = ResourceQuery::new("transactions").page_size(10);
        let run = collect_all::<UpTransaction>(&client, TOKEN, &query, 10).await.unwrap();

        assert_eq!(run.pages_fetched, 3);
        assert!(run.exhausted);
        let ids: Vec<String> = run.items.iter().map(|t| t.id.clone()).collect();
        let expected: Vec<String> = (1..=25).map(|i| format!("tx_{}", i)).collect();
        assert_eq!(ids, expected);

        // Later pages were requested through the absolute next links
        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].param("page[after]"), Some("10"));
        assert_eq!(requests[2].param("page[after]"), Some("20"));
    }

    #[tokio::test]
    async fn test_walk_stops_at_page_cap() {
        let server = MockUpServer::start(MockConfig {
            num_transactions: 1000,
            ..Default::default()
        })
        .unwrap();
        let client = client(&server);

        let query = ResourceQuery::new("transactions").page_size(10);
        let run = collect_all::<UpTransaction>(&client, TOKEN, &query, 10).await.unwrap();

        assert_eq!(run.pages_fetched, 10);
        assert_eq!(run.items.len(), 100);
        assert!(run.cap_reached());
        assert_eq!(server.requests().len(), 10);
    }

    #[tokio::test]
    async fn test_request_headers_and_filters() {
        let server = MockUpServer::start(MockConfig::default()).unwrap();
        let client = client(&server);

        let filter = DateFilter::month_containing(mock_epoch());
        let query = ResourceQuery::new("transactions").filter(filter);
        let run = collect_all::<UpTransaction>(&client, TOKEN, &query, 10).await.unwrap();

        let request = &server.requests()[0];
        assert_eq!(request.authorization.as_deref(), Some("Bearer up:yeah:mock-token"));
        assert_eq!(request.accept.as_deref(), Some("application/json"));
        assert_eq!(request.cache_control.as_deref(), Some("no-store"));
        assert_eq!(request.param("page[size]"), Some("100"));
        assert_eq!(request.param("filter[since]"), Some("2025-03-01T00:00:00Z"));
        assert_eq!(request.param("filter[until]"), Some("2025-04-01T00:00:00Z"));

        // 50 transactions, 12 hours apart, all within March
        assert_eq!(run.items.len(), 50);
        assert!(run.items.iter().all(|t| t.attributes.created_at.starts_with("2025-03")));
    }

    #[tokio::test]
    async fn test_every_page_fetch_bypasses_caches() {
        let server = MockUpServer::start(MockConfig {
            num_transactions: 25,
            ..Default::default()
        })
        .unwrap();
        let client = client(&server);

        let query = ResourceQuery::new("transactions").page_size(10);
        collect_all::<UpTransaction>(&client, TOKEN, &query, 10).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests
            .iter()
            .all(|r| r.cache_control.as_deref() == Some("no-store")));
    }

    #[tokio::test]
    async fn test_link_to_another_host_never_sees_token() {
        let home = MockUpServer::start(MockConfig::default()).unwrap();
        let elsewhere = MockUpServer::start(MockConfig::default()).unwrap();
        let client = client(&home);

        let link = format!("{}/accounts?page%5Bafter%5D=x", elsewhere.base_url());
        let err = client.fetch(&link, TOKEN).await.unwrap_err();

        assert!(matches!(err, Error::RemoteApi { status: 502, .. }));
        assert!(elsewhere.requests().is_empty());
        assert!(home.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_is_remote_auth() {
        let server = MockUpServer::start(MockConfig {
            fail_auth: true,
            ..Default::default()
        })
        .unwrap();
        let client = client(&server);

        let err = client.fetch("accounts", TOKEN).await.unwrap_err();
        match err {
            Error::RemoteAuth(message) => assert!(message.starts_with("Not Authorized - ")),
            other => panic!("expected RemoteAuth, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_token_format_is_rejected_by_server() {
        let server = MockUpServer::start(MockConfig::default()).unwrap();
        let client = client(&server);

        let err = client.fetch("accounts", "not-an-up-token").await.unwrap_err();
        assert!(matches!(err, Error::RemoteAuth(_)));
        assert!(err.needs_new_token());
    }

    #[tokio::test]
    async fn test_malformed_error_body_falls_back() {
        let server = MockUpServer::start(MockConfig {
            malformed_errors: true,
            ..Default::default()
        })
        .unwrap();
        let client = client(&server);

        let err = client.fetch("transactions?page%5Bsize%5D=10", TOKEN).await.unwrap_err();
        match err {
            Error::RemoteApi { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "500: failed to fetch transactions");
            }
            other => panic!("expected RemoteApi, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_collection() {
        let server = MockUpServer::start(MockConfig {
            empty_body: true,
            ..Default::default()
        })
        .unwrap();
        let client = client(&server);

        let page = fetch_page::<UpAccount>(&client, TOKEN, "accounts").await.unwrap();
        assert!(page.data.is_empty());
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_failing_page_stops_walk() {
        let server = MockUpServer::start(MockConfig {
            num_transactions: 30,
            fail_on_page: Some(1),
            ..Default::default()
        })
        .unwrap();
        let client = client(&server);

        let query = ResourceQuery::new("transactions").page_size(10);
        let err = collect_all::<UpTransaction>(&client, TOKEN, &query, 10).await.unwrap_err();

        assert_eq!(err.partial.items.len(), 10);
        assert_eq!(err.partial.pages_fetched, 1);
        match err.error {
            Error::RemoteApi { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error - Something went wrong");
            }
            other => panic!("expected RemoteApi, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_before_cursor_walks_backwards() {
        let server = MockUpServer::start(MockConfig {
            num_transactions: 30,
            ..Default::default()
        })
        .unwrap();
        let client = client(&server);

        let page = fetch_page::<UpTransaction>(
            &client,
            TOKEN,
            "transactions?page%5Bsize%5D=10&page%5Bbefore%5D=20",
        )
        .await
        .unwrap();
        assert_eq!(page.data.first().map(|t| t.id.as_str()), Some("tx_11"));
        assert!(page.links.prev.is_some());
        assert!(page.links.next.is_some());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Grab a free port, then close it again
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = UpBankClient::new_with_base_url(
            &format!("http://127.0.0.1:{}", port),
            StdDuration::from_secs(2),
        )
        .unwrap();

        let err = client.fetch("accounts", TOKEN).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_response_times_out_as_network_error() {
        let server = MockUpServer::start(MockConfig {
            delay_ms: 1500,
            ..Default::default()
        })
        .unwrap();
        let client =
            UpBankClient::new_with_base_url(&server.base_url(), StdDuration::from_millis(200)).unwrap();

        let err = client.fetch("accounts", TOKEN).await.unwrap_err();
        assert!(matches!(err, Error::Network(ref m) if m.contains("timed out")));
    }
}
