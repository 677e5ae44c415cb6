//! Output formatting utilities

use std::time::Duration;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use updash_core::domain::money::MonetaryAmount;
use updash_core::Error;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Right-aligned, colored money cell: green for income, red for spending
pub fn amount_cell(amount: &MonetaryAmount) -> Cell {
    let text = amount.format();
    let text = if amount.is_income() {
        text.green().to_string()
    } else if amount.is_spending() {
        text.red().to_string()
    } else {
        text
    };
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Spinner on stderr while waiting on the network; hidden when not a terminal
pub fn spinner(msg: &str) -> ProgressBar {
    if atty::isnt(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// One-line description of a failed command
///
/// Core errors are shown through their safe user message; configuration
/// errors keep their detail since they never contain the key itself.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<Error>() {
        Some(Error::Config(msg)) => format!("Configuration error: {}", msg),
        Some(core) => core.user_message(),
        None => format!("{:#}", err),
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
