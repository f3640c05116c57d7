//! Engine settings
//!
//! Persisted as `config.json` in the base directory. Missing fields fall back
//! to their defaults so older files keep loading.

use serde::{Deserialize, Serialize};

use super::paths::AuditPaths;
use crate::error::SyncError;

/// User-tunable settings for the collection engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Skip UPDATE writes (and their audit records) when the payload is unchanged
    #[serde(default)]
    pub skip_unchanged_updates: bool,

    /// Compare email addresses case-insensitively when reconciling
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive_email_keys: bool,

    /// Actor recorded in audit records when the caller does not name one
    #[serde(default = "default_actor")]
    pub default_actor: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_case_insensitive() -> bool {
    true
}

fn default_actor() -> String {
    "audcol".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            skip_unchanged_updates: false,
            case_insensitive_email_keys: default_case_insensitive(),
            default_actor: default_actor(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &AuditPaths) -> Result<Self, SyncError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| SyncError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| SyncError::Config(format!("Failed to parse settings file: {}", e)))?;

        if settings.default_actor.trim().is_empty() {
            return Err(SyncError::Config("default_actor cannot be empty".into()));
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &AuditPaths) -> Result<(), SyncError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| SyncError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| SyncError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.schema_version, 1);
        assert!(!settings.skip_unchanged_updates);
        assert!(settings.case_insensitive_email_keys);
        assert_eq!(settings.default_actor, "audcol");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AuditPaths::with_base_dir(temp_dir.path().to_path_buf());

        let settings = Settings {
            skip_unchanged_updates: true,
            default_actor: "billing-admin".into(),
            ..Settings::default()
        };
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert!(loaded.skip_unchanged_updates);
        assert_eq!(loaded.default_actor, "billing-admin");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AuditPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"skip_unchanged_updates": true}"#).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert!(loaded.skip_unchanged_updates);
        assert!(loaded.case_insensitive_email_keys);
    }

    #[test]
    fn test_empty_actor_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AuditPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"default_actor": "  "}"#).unwrap();

        let err = Settings::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
