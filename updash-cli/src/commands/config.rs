//! Config command - inspect and edit settings.json

use anyhow::{anyhow, Result};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use updash_core::config::{Config, ENCRYPTION_KEY_ENV};
use updash_core::services::VaultKey;

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings (environment overrides applied)
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one setting in settings.json
    Set {
        /// Setting to change
        #[arg(value_enum)]
        setting: Setting,
        /// New value
        value: String,
    },
    /// Print a new random encryption key to export as UP_TOKEN_ENCRYPTION_KEY
    GenerateKey,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Setting {
    BaseUrl,
    RequestTimeoutSecs,
    MaxPages,
    PageSize,
    RecentPageSize,
}

fn parse_number(value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("Expected a whole number, got '{}'", value))
}

/// Apply one change to `config`; the result still has to pass validation
fn apply(config: &mut Config, setting: Setting, value: &str) -> Result<()> {
    match setting {
        Setting::BaseUrl => config.api_base_url = value.trim().to_string(),
        Setting::RequestTimeoutSecs => config.request_timeout_secs = parse_number(value)?.into(),
        Setting::MaxPages => config.max_pages = parse_number(value)?,
        Setting::PageSize => config.page_size = parse_number(value)?,
        Setting::RecentPageSize => config.recent_page_size = parse_number(value)?,
    }
    Ok(())
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let dir = get_data_dir()?;

    match command {
        ConfigCommands::Show { json } => {
            let config = Config::load(&dir)?;
            let key = match &config.encryption_key {
                None => "not set".to_string(),
                Some(hex_key) => match VaultKey::from_hex(hex_key) {
                    Ok(key) => format!("set (fingerprint {})", key.fingerprint()),
                    Err(_) => "invalid".to_string(),
                },
            };

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "data_dir": dir.to_string_lossy(),
                        "encryption_key": key,
                        "base_url": config.api_base_url,
                        "request_timeout_secs": config.request_timeout_secs,
                        "max_pages": config.max_pages,
                        "page_size": config.page_size,
                        "recent_page_size": config.recent_page_size,
                    }))?
                );
                return Ok(());
            }

            println!("{}", "Settings".bold());
            println!("  Data directory: {}", dir.display());
            println!("  {}: {}", ENCRYPTION_KEY_ENV, key);
            println!("  Base URL: {}", config.api_base_url);
            println!("  Request timeout: {}s", config.request_timeout_secs);
            println!("  Max pages: {}", config.max_pages);
            println!("  Page size: {}", config.page_size);
            println!("  Recent page size: {}", config.recent_page_size);
        }
        ConfigCommands::Set { setting, value } => {
            std::fs::create_dir_all(&dir)?;
            // File values only, so environment overrides are not written back
            let mut config = Config::load_with_env(&dir, |_| None)?;
            apply(&mut config, setting, &value)?;
            config.validate_settings()?;
            config.save(&dir)?;
            output::success("Settings saved.");
        }
        ConfigCommands::GenerateKey => {
            let key = VaultKey::generate();
            println!("{}", key.to_hex().as_str());
            eprintln!(
                "{}",
                format!(
                    "Export this as {}. Tokens saved under a different key cannot be decrypted.",
                    ENCRYPTION_KEY_ENV
                )
                .dimmed()
            );
        }
    }

    Ok(())
}
