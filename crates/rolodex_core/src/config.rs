//! Persistence unit configuration.
//!
//! # Invariants
//! - A unit name is never empty.
//! - Memory storage is shared by every session of one persistence unit and
//!   lives as long as the unit.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Validation error for persistence unit configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyName,
    EmptyDatabasePath { unit: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "persistence unit name cannot be empty"),
            Self::EmptyDatabasePath { unit } => {
                write!(f, "persistence unit `{unit}` has an empty database path")
            }
        }
    }
}

impl Error for ConfigError {}

/// Where a persistence unit keeps its data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    File {
        path: PathBuf,
    },
}

/// Named configuration from which sessions are created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceUnitConfig {
    pub name: String,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl PersistenceUnitConfig {
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: StorageConfig::Memory,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            storage: StorageConfig::File { path: path.into() },
        }
    }

    /// Checks configuration values that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if let StorageConfig::File { path } = &self.storage {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyDatabasePath {
                    unit: self.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PersistenceUnitConfig, StorageConfig};
    use std::path::PathBuf;

    #[test]
    fn storage_defaults_to_memory() {
        let config: PersistenceUnitConfig =
            serde_json::from_str(r#"{ "name": "rolodex-manual" }"#).unwrap();
        assert_eq!(config.storage, StorageConfig::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_storage_deserializes_tagged_path() {
        let config: PersistenceUnitConfig = serde_json::from_str(
            r#"{ "name": "rolodex", "storage": { "kind": "file", "path": "/tmp/rolodex.db" } }"#,
        )
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::File {
                path: PathBuf::from("/tmp/rolodex.db")
            }
        );
    }

    #[test]
    fn validate_rejects_blank_name_and_empty_path() {
        assert_eq!(
            PersistenceUnitConfig::in_memory("  ").validate(),
            Err(ConfigError::EmptyName)
        );
        let error = PersistenceUnitConfig::file("rolodex", "")
            .validate()
            .unwrap_err();
        assert_eq!(
            error,
            ConfigError::EmptyDatabasePath {
                unit: "rolodex".to_string()
            }
        );
        assert!(error.to_string().contains("empty database path"));
    }
}
