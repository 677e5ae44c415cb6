//! Pagination aggregation engine
//!
//! Walks a cursor-linked collection page by page, concatenating items in
//! server order until the collection is exhausted or the page cap is hit.
//! Fetches within one walk are strictly sequential since every request
//! depends on the previous page's `next` link.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::form_urlencoded;

use crate::domain::result::{Error, Result};
use crate::domain::{Cursor, DateFilter, Page};
use crate::ports::ResourceApi;

/// Largest page size the Up API accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default safety bound on pages per walk
pub const DEFAULT_MAX_PAGES: u32 = 10;

/// Starting request for a list endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    resource: String,
    page_size: u32,
    cursor: Option<Cursor>,
    filter: DateFilter,
}

impl ResourceQuery {
    /// Query a collection path such as `transactions` or `accounts/{id}/transactions`
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            page_size: MAX_PAGE_SIZE,
            cursor: None,
            filter: DateFilter::unbounded(),
        }
    }

    /// Page size, clamped to `1..=100`
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn filter(mut self, filter: DateFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Relative request target with an encoded query string
    pub fn to_target(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("page[size]", &self.page_size.to_string());
        if let Some(cursor) = &self.cursor {
            query.append_pair(cursor.kind.query_param(), &cursor.value);
        }
        for (key, value) in self.filter.query_pairs() {
            query.append_pair(key, &value);
        }
        format!("{}?{}", self.resource.trim_matches('/'), query.finish())
    }
}

/// Items collected by one walk, with its completeness
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationRun<T> {
    /// All fetched items, page order preserved
    pub items: Vec<T>,
    /// Successful page fetches
    pub pages_fetched: u32,
    /// The last fetched page had no `next` link
    pub exhausted: bool,
    pub max_pages: u32,
}

impl<T> AggregationRun<T> {
    fn new(max_pages: u32) -> Self {
        Self {
            items: Vec::new(),
            pages_fetched: 0,
            exhausted: false,
            max_pages,
        }
    }

    /// The walk stopped at the page cap; more items may exist remotely
    pub fn cap_reached(&self) -> bool {
        !self.exhausted && self.pages_fetched >= self.max_pages
    }

    pub fn is_complete(&self) -> bool {
        self.exhausted
    }

    /// Completeness caveats to surface next to the result
    pub fn warnings(&self) -> Vec<String> {
        if self.cap_reached() {
            vec![format!(
                "Stopped after {} pages; results may be incomplete",
                self.pages_fetched
            )]
        } else {
            Vec::new()
        }
    }
}

/// A walk that failed part-way
///
/// `partial` holds whatever was collected before the failure. It is metadata
/// for diagnostics and must not be presented as a result.
#[derive(Debug)]
pub struct AggregationError<T> {
    pub error: Error,
    pub partial: AggregationRun<T>,
}

impl<T> fmt::Display for AggregationError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (after {} pages)",
            self.error, self.partial.pages_fetched
        )
    }
}

impl<T: fmt::Debug> std::error::Error for AggregationError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<AggregationError<T>> for Error {
    fn from(err: AggregationError<T>) -> Self {
        err.error
    }
}

/// Fetch and decode a single page
pub async fn fetch_page<T: DeserializeOwned>(
    api: &dyn ResourceApi,
    token: &str,
    target: &str,
) -> Result<Page<T>> {
    let value = api.fetch(target, token).await?;
    if value.is_null() {
        return Ok(Page::empty());
    }
    Ok(serde_json::from_value(value)?)
}

/// Walk every page of `query`, up to `max_pages` fetches
///
/// Stops on the first failed fetch and returns it together with the partial
/// run. A run that stops at the cap is still a success; check
/// [`AggregationRun::cap_reached`].
pub async fn collect_all<T: DeserializeOwned>(
    api: &dyn ResourceApi,
    token: &str,
    query: &ResourceQuery,
    max_pages: u32,
) -> std::result::Result<AggregationRun<T>, AggregationError<T>> {
    let mut run = AggregationRun::new(max_pages);
    if max_pages == 0 {
        return Err(AggregationError {
            error: Error::validation("max_pages must be at least 1"),
            partial: run,
        });
    }

    let mut target = query.to_target();
    loop {
        let page: Page<T> = match fetch_page(api, token, &target).await {
            Ok(page) => page,
            Err(error) => return Err(AggregationError { error, partial: run }),
        };

        run.items.extend(page.data);
        run.pages_fetched += 1;

        match page.links.next.filter(|next| !next.is_empty()) {
            None => {
                run.exhausted = true;
                break;
            }
            Some(_) if run.pages_fetched >= max_pages => break,
            Some(next) => target = next,
        }
    }

    Ok(run)
}
