//! Analytics command - this month's spending by category

use anyhow::{bail, Result};
use chrono::Utc;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};
use updash_core::domain::money::{format_minor_units, DEFAULT_CURRENCY};
use updash_core::ViewOutcome;

use super::{get_context, log_command};
use crate::output;

pub async fn run(user: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    log_command(&ctx, user, "analytics");

    let spinner = output::spinner("Loading analytics...");
    let outcome = ctx.dashboard.analytics(user, Utc::now()).await;
    spinner.finish_and_clear();

    let view = match outcome? {
        ViewOutcome::Ready(view) => view,
        ViewOutcome::NeedsToken(problem) => bail!(problem.message()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let month = view.month.as_deref().unwrap_or("This month");
    println!("{}", format!("Spending by Category ({})", month).bold());

    if view.breakdown.buckets.is_empty() {
        println!("  No spending this month.");
    } else {
        let total = view.breakdown.total_spending;
        let mut table = output::create_table();
        table.set_header(vec!["#", "Category", "Spent", "Share"]);
        for bucket in &view.breakdown.buckets {
            let share = if total > 0 {
                bucket.total as f64 * 100.0 / total as f64
            } else {
                0.0
            };
            table.add_row(vec![
                Cell::new(bucket.palette_slot + 1),
                Cell::new(&bucket.name),
                Cell::new(format_minor_units(bucket.total, DEFAULT_CURRENCY))
                    .set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1}%", share)).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{}", table);
        println!("  Total spending: {}", format_minor_units(total, DEFAULT_CURRENCY).bold());
    }
    println!();

    println!("{}", "Income vs Spending".bold());
    println!(
        "  {}: {} in, {} out",
        view.trend.month,
        format_minor_units(view.trend.income, DEFAULT_CURRENCY).green(),
        format_minor_units(view.trend.spending, DEFAULT_CURRENCY).red()
    );

    for warning in &view.warnings {
        output::warning(&format!("  {}", warning));
    }

    Ok(())
}
