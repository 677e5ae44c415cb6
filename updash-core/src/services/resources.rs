//! Resource service - typed operations over the Up API collections
//!
//! Whole-collection reads go through the aggregation engine; single-page
//! reads (the dashboard table, cursor listing, the unpaginated category
//! list) fetch exactly one page.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{Cursor, DateFilter, Page, UpAccount, UpCategory, UpTransaction};
use crate::ports::ResourceApi;
use crate::services::logging::{emit, LogEvent, LoggingService};
use crate::services::pagination::{
    collect_all, fetch_page, AggregationError, AggregationRun, ResourceQuery, DEFAULT_MAX_PAGES,
    MAX_PAGE_SIZE,
};

/// Outcome of a whole-collection walk
pub type Aggregated<T> = std::result::Result<AggregationRun<T>, AggregationError<T>>;

/// Default page size for the dashboard table and listing pages
pub const DEFAULT_RECENT_PAGE_SIZE: u32 = 25;

/// Page sizes and bounds applied to every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSettings {
    pub page_size: u32,
    pub max_pages: u32,
    pub recent_page_size: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            recent_page_size: DEFAULT_RECENT_PAGE_SIZE,
        }
    }
}

/// One page of transactions from a cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionsQuery {
    /// Start of the listing when `None`
    pub cursor: Option<Cursor>,
    pub filter: DateFilter,
    /// Falls back to the configured listing page size
    pub page_size: Option<u32>,
}

/// Service for reading accounts, transactions and categories
pub struct ResourceService {
    api: Arc<dyn ResourceApi>,
    settings: FetchSettings,
    logger: Option<Arc<LoggingService>>,
}

impl ResourceService {
    pub fn new(api: Arc<dyn ResourceApi>, settings: FetchSettings) -> Self {
        Self {
            api,
            settings,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn settings(&self) -> FetchSettings {
        self.settings
    }

    /// Every account, walked at the largest page size
    pub async fn list_accounts(&self, token: &str) -> Aggregated<UpAccount> {
        self.walk(token, ResourceQuery::new("accounts")).await
    }

    /// First page of the transaction feed, newest first
    ///
    /// The page keeps its links so a listing can continue from it.
    pub async fn recent_transactions(
        &self,
        token: &str,
        page_size: u32,
    ) -> Result<Page<UpTransaction>> {
        let query = ResourceQuery::new("transactions").page_size(page_size);
        self.single_page(token, query.resource(), &query.to_target()).await
    }

    /// Every transaction inside `filter`, within the page cap
    pub async fn transactions_in_range(
        &self,
        token: &str,
        filter: DateFilter,
    ) -> Aggregated<UpTransaction> {
        self.walk(token, ResourceQuery::new("transactions").filter(filter))
            .await
    }

    /// Every category, used to name analytics buckets
    ///
    /// The categories endpoint is not paginated, so this is one plain request
    /// with no paging parameters.
    pub async fn list_categories(&self, token: &str) -> Result<Vec<UpCategory>> {
        let page: Page<UpCategory> = self.single_page(token, "categories", "categories").await?;
        Ok(page.data)
    }

    /// One page of transactions starting at the query's cursor
    pub async fn transaction_page(
        &self,
        token: &str,
        query: &TransactionsQuery,
    ) -> Result<Page<UpTransaction>> {
        let size = query.page_size.unwrap_or(self.settings.recent_page_size);
        let query = ResourceQuery::new("transactions")
            .page_size(size)
            .cursor(query.cursor.clone())
            .filter(query.filter);
        self.single_page(token, query.resource(), &query.to_target()).await
    }

    async fn single_page<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        resource: &str,
        target: &str,
    ) -> Result<Page<T>> {
        let result = fetch_page(self.api.as_ref(), token, target).await;
        if let Err(e @ Error::RemoteAuth(_)) = &result {
            emit(
                &self.logger,
                LogEvent::new("remote_auth_failed")
                    .with_resource(resource)
                    .with_error_kind(e),
            );
        }
        result
    }

    async fn walk<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        query: ResourceQuery,
    ) -> Aggregated<T> {
        let query = query.page_size(self.settings.page_size);
        let result = collect_all(self.api.as_ref(), token, &query, self.settings.max_pages).await;

        match &result {
            Ok(run) => {
                emit(
                    &self.logger,
                    LogEvent::new("aggregation_completed")
                        .with_resource(query.resource())
                        .with_pages(run.pages_fetched),
                );
                if run.cap_reached() {
                    emit(
                        &self.logger,
                        LogEvent::new("pagination_cap_reached")
                            .with_resource(query.resource())
                            .with_pages(run.pages_fetched),
                    );
                }
            }
            Err(failure) => {
                let event = match failure.error {
                    Error::RemoteAuth(_) => "remote_auth_failed",
                    _ => "aggregation_failed",
                };
                emit(
                    &self.logger,
                    LogEvent::new(event)
                        .with_resource(query.resource())
                        .with_pages(failure.partial.pages_fetched)
                        .with_error_kind(&failure.error),
                );
            }
        }

        result
    }
}
