use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use audited_collections::cli::{handle_email_command, handle_field_command};
use audited_collections::config::{AuditPaths, Settings};
use audited_collections::models::CallContext;
use audited_collections::services::AccountEmailService;
use audited_collections::storage::Database;

#[derive(Parser)]
#[command(
    name = "audcol",
    version,
    about = "Audited child collections with an append-only change history",
    long_about = "audcol keeps a parent's child collections (account email addresses, \
                  custom fields) in sync with a desired state. Every insert, update \
                  and delete is written together with its audit record in a single \
                  transaction."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Actor recorded in audit records (defaults to the configured actor)
    #[arg(long, global = true, env = "AUDCOL_ACTOR")]
    actor: Option<String>,

    /// Reason code recorded in audit records
    #[arg(long, global = true)]
    reason: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Account email commands
    #[command(subcommand)]
    Email(audited_collections::cli::EmailCommands),

    /// Custom field commands
    #[command(subcommand)]
    Field(audited_collections::cli::FieldCommands),

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Initialize paths and settings
    let paths = AuditPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    paths.ensure_directories()?;

    let db = Arc::new(Database::open_file(paths.store_file())?);

    let mut context = CallContext::new(cli.actor.unwrap_or_else(|| settings.default_actor.clone()));
    if let Some(reason) = cli.reason {
        context = context.with_reason(reason);
    }

    match cli.command {
        Some(Commands::Email(cmd)) => {
            handle_email_command(db, &settings, &context, cmd)?;
        }
        Some(Commands::Field(cmd)) => {
            handle_field_command(db, &settings, &context, cmd)?;
        }
        Some(Commands::Config) => {
            let store = match AccountEmailService::new(Arc::clone(&db), &settings).ping() {
                Ok(()) => "ok".to_string(),
                Err(e) => format!("unreachable ({})", e),
            };

            println!("audcol Configuration");
            println!("====================");
            println!("Base directory: {}", paths.base_dir().display());
            println!("Settings file:  {}", paths.settings_file().display());
            println!("Store file:     {}", paths.store_file().display());
            println!("Store status:   {}", store);
            println!();
            println!("Settings:");
            println!("  Skip unchanged updates:     {}", settings.skip_unchanged_updates);
            println!("  Case-insensitive emails:    {}", settings.case_insensitive_email_keys);
            println!("  Default actor:              {}", settings.default_actor);
        }
        None => {
            println!("audcol - audited child collections");
            println!();
            println!("Run 'audcol --help' for usage information.");
        }
    }

    Ok(())
}
