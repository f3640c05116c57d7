//! Email CLI commands
//!
//! Implements CLI commands for an account's email addresses.

use std::sync::Arc;

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{
    format_email_list, format_email_plan, format_history, format_history_verbose, format_outcome,
};
use crate::error::SyncResult;
use crate::models::{CallContext, ParentId};
use crate::services::AccountEmailService;
use crate::storage::Database;

/// Email subcommands
#[derive(Subcommand)]
pub enum EmailCommands {
    /// List an account's email addresses
    List {
        /// Account ID
        account: ParentId,
    },
    /// Add an address, or replace the one with the same key
    Add {
        /// Account ID
        account: ParentId,
        /// Email address
        address: String,
    },
    /// Remove an address
    Remove {
        /// Account ID
        account: ParentId,
        /// Email address
        address: String,
    },
    /// Replace all of an account's addresses
    Set {
        /// Account ID
        account: ParentId,
        /// The complete new set of addresses (none clears the collection)
        addresses: Vec<String>,
        /// Show the changes without writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the audit history of an account's addresses
    History {
        /// Account ID
        account: ParentId,
        /// Show every field of each record
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Handle an email command
pub fn handle_email_command(
    db: Arc<Database>,
    settings: &Settings,
    context: &CallContext,
    cmd: EmailCommands,
) -> SyncResult<()> {
    let service = AccountEmailService::new(db, settings);

    match cmd {
        EmailCommands::List { account } => {
            let emails = service.get_emails(account)?;
            println!("{}", format_email_list(&emails).trim_end());
        }

        EmailCommands::Add { account, address } => {
            let outcome = service.add_email(account, &address, context)?;
            println!("Saved {}: {}", address.trim(), format_outcome(&outcome));
        }

        EmailCommands::Remove { account, address } => {
            let outcome = service.remove_email(account, &address, context)?;
            if outcome.deleted == 0 {
                println!("{} was not on the account; nothing changed.", address.trim());
            } else {
                println!("Removed {}: {}", address.trim(), format_outcome(&outcome));
            }
        }

        EmailCommands::Set {
            account,
            addresses,
            dry_run,
        } => {
            if dry_run {
                let plan = service.preview_emails(account, &addresses)?;
                println!("Planned changes ({} writes):", plan.len());
                println!("{}", format_email_plan(&plan));
                return Ok(());
            }

            let outcome = service.save_emails(account, &addresses, context)?;
            println!("Saved {} addresses: {}", addresses.len(), format_outcome(&outcome));
        }

        EmailCommands::History { account, verbose } => {
            let records = service.email_history(account)?;
            if verbose && !records.is_empty() {
                println!("{}", format_history_verbose(&records));
            } else {
                println!("{}", format_history(&records).trim_end());
            }
        }
    }

    Ok(())
}
