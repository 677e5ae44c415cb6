//! updash CLI - your Up Banking dashboard in the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{analytics, config, dashboard, logs, token, transactions};

/// updash - your Up Banking dashboard in the terminal
#[derive(Parser)]
#[command(name = "updash", version, about, long_about = None)]
struct Cli {
    /// User whose token and data to use
    #[arg(long, global = true, env = "UPDASH_USER", default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the stored Up Banking API token
    Token {
        #[command(subcommand)]
        command: token::TokenCommands,
    },

    /// Show balances, recent transactions and this month's totals
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show this month's spending by category
    Analytics {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transactions page by page
    Transactions {
        /// Only transactions at or after this time (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Only transactions before this time (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
        /// Continue after this cursor
        #[arg(long, conflicts_with = "before")]
        after: Option<String>,
        /// Continue before this cursor
        #[arg(long)]
        before: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and edit settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&output::describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let user = cli.user;
    match cli.command {
        Commands::Token { command } => token::run(&user, command).await,
        Commands::Dashboard { json } => dashboard::run(&user, json).await,
        Commands::Analytics { json } => analytics::run(&user, json).await,
        Commands::Transactions { since, until, after, before, pages, json } => {
            let args = transactions::TransactionsArgs { since, until, after, before, pages, json };
            transactions::run(&user, args).await
        }
        Commands::Config { command } => config::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
