//! Dashboard command - balances, recent transactions and monthly totals

use anyhow::{bail, Result};
use chrono::Utc;
use colored::Colorize;
use serde_json::{json, Value as JsonValue};
use updash_core::domain::money::{format_minor_units, format_spending, MonetaryAmount, DEFAULT_CURRENCY};
use updash_core::services::DashboardView;
use updash_core::{Error, UpTransaction, ViewOutcome};

use super::{get_context, log_command};
use crate::output;

pub async fn run(user: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    log_command(&ctx, user, "dashboard");

    let spinner = output::spinner("Loading dashboard...");
    let outcome = ctx.dashboard.dashboard(user, Utc::now()).await;
    spinner.finish_and_clear();

    let view = match outcome? {
        ViewOutcome::Ready(view) => view,
        ViewOutcome::NeedsToken(problem) => bail!(problem.message()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&view))?);
    } else {
        print_view(&view);
    }

    if let Some(problem) = view.credential_problem() {
        bail!(problem.message());
    }
    Ok(())
}

fn part_json<T>(part: &Result<T, Error>, f: impl FnOnce(&T) -> JsonValue) -> JsonValue {
    match part {
        Ok(value) => f(value),
        Err(e) => json!({ "error": e.user_message() }),
    }
}

fn to_json(view: &DashboardView) -> JsonValue {
    json!({
        "accounts": part_json(&view.accounts, |run| json!({
            "data": run.items,
            "complete": run.is_complete(),
        })),
        "total_balance": view.total_balance,
        "recent": part_json(&view.recent, |page| json!({
            "data": page.data,
            "links": page.links,
        })),
        "month": part_json(&view.month, |summary| json!(summary)),
    })
}

fn print_view(view: &DashboardView) {
    println!("{}", "Accounts".bold());
    match &view.accounts {
        Ok(run) => {
            let mut table = output::create_table();
            table.set_header(vec!["Account", "Type", "Balance"]);
            for account in &run.items {
                table.add_row(vec![
                    comfy_table::Cell::new(&account.attributes.display_name),
                    comfy_table::Cell::new(&account.attributes.account_type),
                    output::amount_cell(&account.attributes.balance),
                ]);
            }
            println!("{}", table);
            if let Some(total) = view.total_balance {
                let total = MonetaryAmount::new(total, DEFAULT_CURRENCY);
                println!("  Total balance: {}", total.format().bold());
            }
            for warning in run.warnings() {
                output::warning(&format!("  {}", warning));
            }
        }
        Err(e) => output::error(&format!("  {}", e.user_message())),
    }
    println!();

    println!("{}", "This Month".bold());
    match &view.month {
        Ok(summary) => {
            let totals = summary.totals;
            println!("  Income:   {}", format_minor_units(totals.income, DEFAULT_CURRENCY).green());
            println!("  Spending: {}", format_spending(totals.spending, DEFAULT_CURRENCY).red());
            println!("  Net:      {}", format_minor_units(totals.net(), DEFAULT_CURRENCY));
            println!("  Transactions: {}", summary.transaction_count);
            for warning in &summary.warnings {
                output::warning(&format!("  {}", warning));
            }
        }
        Err(e) => output::error(&format!("  {}", e.user_message())),
    }
    println!();

    println!("{}", "Recent Transactions".bold());
    match &view.recent {
        Ok(page) if page.data.is_empty() => println!("  No transactions yet."),
        Ok(page) => {
            println!("{}", transactions_table(&page.data));
            if !page.is_last() {
                output::info("  Run 'updash transactions' to see more.");
            }
        }
        Err(e) => output::error(&format!("  {}", e.user_message())),
    }
}

/// Date, description and amount for each transaction
pub fn transactions_table(transactions: &[UpTransaction]) -> comfy_table::Table {
    let mut table = output::create_table();
    table.set_header(vec!["Date", "Description", "Amount"]);
    for tx in transactions {
        let attrs = &tx.attributes;
        table.add_row(vec![
            comfy_table::Cell::new(attrs.created_at.get(..10).unwrap_or(&attrs.created_at)),
            comfy_table::Cell::new(&attrs.description),
            output::amount_cell(&attrs.amount),
        ]);
    }
    table
}
