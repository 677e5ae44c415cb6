//! CLI command implementations

pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod logs;
pub mod token;
pub mod transactions;

use std::path::PathBuf;

use anyhow::{Context, Result};
use updash_core::config::data_dir;
use updash_core::{EntryPoint, LogEvent, UpdashContext};

/// Get the updash data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    data_dir()
}

/// Build the context for a command
///
/// Fails before any work is done when the configuration is invalid, e.g.
/// a missing or malformed UP_TOKEN_ENCRYPTION_KEY.
pub fn get_context() -> Result<UpdashContext> {
    let dir = get_data_dir()?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create updash directory: {:?}", dir))?;

    UpdashContext::new(&dir, EntryPoint::Cli)
}

/// Record a command in the event log, ignoring any errors
pub fn log_command(ctx: &UpdashContext, user: &str, command: &str) {
    if let Some(logger) = &ctx.logger {
        let _ = logger.log(LogEvent::new("command_executed").with_command(command).with_user(user));
    }
}
