//! Display formatting for terminal output
//!
//! Plain-text tables for collections, sync outcomes and audit history.

pub mod collection;
pub mod history;

pub use collection::{format_email_list, format_email_plan, format_field_list, format_outcome};
pub use history::{format_history, format_history_verbose};
