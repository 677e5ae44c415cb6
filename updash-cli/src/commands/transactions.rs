//! Transactions command - cursor-paged transaction listing

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use updash_core::domain::filter::parse_timestamp;
use updash_core::services::ListingState;
use updash_core::{Cursor, DateFilter};

use super::dashboard::transactions_table;
use super::{get_context, log_command};
use crate::output;

pub struct TransactionsArgs {
    pub since: Option<String>,
    pub until: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub pages: u32,
    pub json: bool,
}

/// RFC 3339, or a plain date meaning midnight UTC
fn parse_bound(field: &str, value: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| anyhow!("Invalid '{}' date", field));
    }
    Ok(parse_timestamp(field, value)?)
}

pub async fn run(user: &str, args: TransactionsArgs) -> Result<()> {
    let since = args.since.as_deref().map(|v| parse_bound("since", v)).transpose()?;
    let until = args.until.as_deref().map(|v| parse_bound("until", v)).transpose()?;
    let filter = DateFilter::new(since, until)?;
    let cursor = match (args.after, args.before) {
        (Some(after), _) => Some(Cursor::after(after)),
        (None, Some(before)) => Some(Cursor::before(before)),
        (None, None) => None,
    };

    let ctx = get_context()?;
    log_command(&ctx, user, "transactions");
    let token = ctx.credentials.require_token(user).await?;

    let mut listing = ctx.listing();
    let mut ticket = Some(listing.restart(filter, cursor));
    let mut loaded_pages = 0;

    let spinner = output::spinner("Loading transactions...");
    while let Some(current) = ticket.take() {
        let result = ctx.resources.transaction_page(&token, &current.query).await;
        listing.complete(&current, result);
        loaded_pages += 1;
        if loaded_pages < args.pages.max(1) {
            ticket = listing.load_more();
        }
    }
    spinner.finish_and_clear();

    if listing.state() == ListingState::Error && listing.rows().is_empty() {
        bail!(listing.error().unwrap_or("Failed to fetch transactions").to_string());
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "data": listing.rows(),
                "next_cursor": listing.next_cursor(),
                "error": listing.error(),
            }))?
        );
        return Ok(());
    }

    if listing.rows().is_empty() {
        println!("No transactions found.");
    } else {
        println!("{}", transactions_table(listing.rows()));
    }

    if let Some(error) = listing.error() {
        output::error(error);
    }
    for warning in listing.warnings() {
        output::warning(warning);
    }
    if let Some(next) = listing.next_cursor() {
        output::info(&format!(
            "More available: updash transactions --{} {}",
            next.kind, next.value
        ));
    }

    Ok(())
}
