//! Custom field CLI commands

use std::sync::Arc;

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_field_list, format_history, format_outcome};
use crate::error::SyncResult;
use crate::models::{CallContext, ParentId};
use crate::services::CustomFieldService;
use crate::storage::Database;

/// Custom field subcommands
#[derive(Subcommand)]
pub enum FieldCommands {
    /// List a parent's custom fields
    List {
        /// Parent ID
        parent: ParentId,
    },
    /// Set a field, creating it if needed
    Set {
        /// Parent ID
        parent: ParentId,
        /// Field name
        name: String,
        /// Field value
        value: String,
    },
    /// Remove a field
    Remove {
        /// Parent ID
        parent: ParentId,
        /// Field name
        name: String,
    },
    /// Show the audit history of a parent's fields
    History {
        /// Parent ID
        parent: ParentId,
    },
}

/// Handle a custom field command
pub fn handle_field_command(
    db: Arc<Database>,
    settings: &Settings,
    context: &CallContext,
    cmd: FieldCommands,
) -> SyncResult<()> {
    let service = CustomFieldService::new(db, settings);

    match cmd {
        FieldCommands::List { parent } => {
            let fields = service.get_fields(parent)?;
            println!("{}", format_field_list(&fields).trim_end());
        }
        FieldCommands::Set {
            parent,
            name,
            value,
        } => {
            let outcome = service.set_field(parent, &name, &value, context)?;
            println!("Set {}: {}", name.trim(), format_outcome(&outcome));
        }
        FieldCommands::Remove { parent, name } => {
            let outcome = service.remove_field(parent, &name, context)?;
            if outcome.deleted == 0 {
                println!("No field named '{}'; nothing changed.", name.trim());
            } else {
                println!("Removed {}", name.trim());
            }
        }
        FieldCommands::History { parent } => {
            let records = service.field_history(parent)?;
            println!("{}", format_history(&records).trim_end());
        }
    }

    Ok(())
}
