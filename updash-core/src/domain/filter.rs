//! Date range filters for transaction queries

use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// A `[since, until)` window; either end may be open
///
/// `until` is exclusive: for a calendar month pass the first instant of the
/// following month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateFilter {
    pub fn new(since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(s), Some(u)) = (since, until) {
            if s >= u {
                return Err(Error::validation("'since' must be earlier than 'until'"));
            }
        }
        Ok(Self { since, until })
    }

    /// No filtering at all
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    /// The UTC calendar month containing `now`
    pub fn month_containing(now: DateTime<Utc>) -> Self {
        let start = first_of_month(now.year(), now.month());
        let (next_year, next_month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };
        Self {
            since: start,
            until: first_of_month(next_year, next_month),
        }
    }

    /// Whether a timestamp falls inside the window
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.since.map_or(true, |s| at >= s) && self.until.map_or(true, |u| at < u)
    }

    /// Query parameters in the Up API's wire format
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(since) = self.since {
            pairs.push(("filter[since]", to_wire(since)));
        }
        if let Some(until) = self.until {
            pairs.push(("filter[until]", to_wire(until)));
        }
        pairs
    }

    /// Short month name of the window start, e.g. "Mar"
    pub fn month_label(&self) -> Option<String> {
        self.since.map(|s| s.format("%b").to_string())
    }
}

/// Parse an RFC 3339 timestamp supplied by a caller
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::validation(format!("Invalid '{}' timestamp: expected RFC 3339", field)))
}

fn to_wire(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn first_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}
