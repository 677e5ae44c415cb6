//! Token command - save, remove and inspect the Up Banking API token

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Password};
use updash_core::CredentialStatus;

use super::{get_context, log_command};
use crate::output;

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Validate, encrypt and store a personal access token
    Set {
        /// Token (prompted for without echo when omitted)
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove the stored token
    Remove {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Show whether a token is stored
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(user: &str, command: TokenCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        TokenCommands::Set { token } => {
            log_command(&ctx, user, "token set");
            let token = match token {
                Some(t) => t,
                None => Password::new()
                    .with_prompt("Up Banking personal access token")
                    .interact()?,
            };

            ctx.credentials.save_credential(user, &token).await?;
            output::success("Token saved successfully.");
            println!("Run 'updash dashboard' to load your accounts.");
        }
        TokenCommands::Remove { force } => {
            log_command(&ctx, user, "token remove");
            if !force {
                println!(
                    "\n{}",
                    format!("This will remove the stored Up token for '{}'.", user).yellow()
                );
                if !Confirm::new()
                    .with_prompt("Are you sure?")
                    .default(false)
                    .interact()?
                {
                    println!("{}\n", "Cancelled".dimmed());
                    return Ok(());
                }
            }

            ctx.credentials.remove_credential(user).await?;
            output::success("Token removed successfully.");
        }
        TokenCommands::Status { json } => {
            let status = ctx.credentials.status(user).await?;
            let fingerprint = ctx.credentials.key_fingerprint();

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "user": user,
                        "status": status,
                        "key_fingerprint": fingerprint,
                    })
                );
                return Ok(());
            }

            println!("{}", "Up Banking Token".bold());
            println!("  User: {}", user);
            match status {
                CredentialStatus::Configured => println!("  Status: {}", "configured".green()),
                CredentialStatus::NotConfigured => {
                    println!("  Status: {}", "not configured".yellow());
                }
            }
            println!("  Key fingerprint: {}", fingerprint.dimmed());
        }
    }

    Ok(())
}
