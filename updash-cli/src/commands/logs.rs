//! Logs command - view and manage the event log

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use updash_core::{EntryPoint, LoggingService};

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete log entries
    Clear {
        /// Only delete logs older than N days
        #[arg(long)]
        older_than_days: Option<u64>,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show per-event counts and the database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let dir = get_data_dir()?;
    std::fs::create_dir_all(&dir)?;
    LoggingService::new(&dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Event", "User", "Context", "Error"]);

            for entry in entries {
                let pages = entry.pages.map(|p| format!("{} pages", p));
                let context = [entry.command.as_deref(), entry.resource.as_deref(), pages.as_deref()]
                    .iter()
                    .filter_map(|&s| s)
                    .collect::<Vec<_>>()
                    .join(", ");

                let error = match (&entry.error_message, &entry.error_details) {
                    (Some(kind), Some(details)) => format!("{} ({})", kind, details).red().to_string(),
                    (Some(kind), None) => kind.red().to_string(),
                    _ => String::new(),
                };

                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.event,
                    entry.user_id.unwrap_or_default(),
                    context,
                    error,
                ]);
            }

            println!("{}", table);
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let prompt = match older_than_days {
                Some(days) => format!("Delete logs older than {} days?", days),
                None => "Delete all log entries?".to_string(),
            };
            if !force && !json && !Confirm::new().with_prompt(prompt).default(false).interact()? {
                println!("Cancelled.");
                return Ok(());
            }

            let deleted = match older_than_days {
                Some(days) => {
                    let cutoff_ms = Utc::now().timestamp_millis() - (days as i64 * 24 * 60 * 60 * 1000);
                    service.delete_before(cutoff_ms)?
                }
                None => service.clear()?,
            };

            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                output::success(&format!("Deleted {} log entries", deleted));
            }
        }
        LogsCommands::Stats { json } => {
            let total = service.count()?;
            let events = service.stats()?;
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "total_entries": total,
                        "events": events,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    }))?
                );
                return Ok(());
            }

            println!("{}", "Log Statistics".bold());
            println!("  Total entries: {}", total);
            println!("  Database: {}", db_path.display());
            println!("  Size: {}", output::format_size(size_bytes));

            if !events.is_empty() {
                println!();
                let mut table = output::create_table();
                table.set_header(vec!["Event", "Count", "Errors"]);
                for event in events {
                    let errors = if event.errors > 0 {
                        event.errors.to_string().red().to_string()
                    } else {
                        "0".to_string()
                    };
                    table.add_row(vec![event.event, event.count.to_string(), errors]);
                }
                println!("{}", table);
            }
        }
    }

    Ok(())
}
