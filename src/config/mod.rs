//! Configuration module
//!
//! Path resolution for the on-disk store and persisted engine settings.

pub mod paths;
pub mod settings;

pub use paths::AuditPaths;
pub use settings::Settings;
