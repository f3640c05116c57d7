//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod email;
pub mod field;

pub use email::{handle_email_command, EmailCommands};
pub use field::{handle_field_command, FieldCommands};
