//! Transaction listing state
//!
//! Holds the rows of an incrementally loaded transaction list. Every request
//! is issued as a [`Ticket`] carrying a request id; only the completion for
//! the most recently issued ticket is applied, so a slow response for an old
//! filter can never overwrite newer rows.

use serde::Serialize;

use crate::domain::result::Error;
use crate::domain::{Cursor, DateFilter, Page, UpTransaction};
use crate::services::resources::TransactionsQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingState {
    Idle,
    Loading,
    Loaded,
    Error,
}

/// An issued page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub request_id: u64,
    pub query: TransactionsQuery,
}

/// What `complete` did with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer request was issued since; the response was dropped
    Discarded,
}

#[derive(Debug)]
pub struct ListingView {
    state: ListingState,
    rows: Vec<UpTransaction>,
    filter: DateFilter,
    next_cursor: Option<Cursor>,
    request_id: u64,
    page_size: u32,
    error: Option<String>,
    warnings: Vec<String>,
}

impl ListingView {
    pub fn new(page_size: u32) -> Self {
        Self {
            state: ListingState::Idle,
            rows: Vec::new(),
            filter: DateFilter::unbounded(),
            next_cursor: None,
            request_id: 0,
            page_size,
            error: None,
            warnings: Vec::new(),
        }
    }

    /// Drop all rows and request the first page for `filter`
    pub fn change_filter(&mut self, filter: DateFilter) -> Ticket {
        self.restart(filter, None)
    }

    /// Drop all rows and request the page at `cursor`
    pub fn restart(&mut self, filter: DateFilter, cursor: Option<Cursor>) -> Ticket {
        self.filter = filter;
        self.rows.clear();
        self.next_cursor = None;
        self.error = None;
        self.warnings.clear();
        self.issue(cursor)
    }

    /// Request the next page
    ///
    /// Returns `None` unless the list is loaded and has a next cursor.
    pub fn load_more(&mut self) -> Option<Ticket> {
        if self.state != ListingState::Loaded {
            return None;
        }
        let cursor = self.next_cursor.clone()?;
        Some(self.issue(Some(cursor)))
    }

    fn issue(&mut self, cursor: Option<Cursor>) -> Ticket {
        self.request_id += 1;
        self.state = ListingState::Loading;
        Ticket {
            request_id: self.request_id,
            query: TransactionsQuery {
                cursor,
                filter: self.filter,
                page_size: Some(self.page_size),
            },
        }
    }

    /// Apply the response for `ticket`, unless it is stale
    pub fn complete(
        &mut self,
        ticket: &Ticket,
        result: std::result::Result<Page<UpTransaction>, Error>,
    ) -> Completion {
        if ticket.request_id != self.request_id {
            return Completion::Discarded;
        }

        match result {
            Ok(page) => {
                self.rows.extend(page.data);
                self.next_cursor = Cursor::from_link(page.links.next.as_deref());
                if page.links.next.is_some() && self.next_cursor.is_none() {
                    self.warnings
                        .push("Next page link had no cursor; listing stops here".to_string());
                }
                self.error = None;
                self.state = ListingState::Loaded;
            }
            Err(e) => {
                self.error = Some(e.user_message());
                self.state = ListingState::Error;
            }
        }
        Completion::Applied
    }

    pub fn state(&self) -> ListingState {
        self.state
    }

    pub fn rows(&self) -> &[UpTransaction] {
        &self.rows
    }

    pub fn filter(&self) -> DateFilter {
        self.filter
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
