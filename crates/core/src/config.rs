//! Engine configuration
//!
//! Loaded from TOML. Every section is optional; missing keys fall back to
//! the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub invite: InviteConfig,
    pub colors: ColorConfig,
    pub storage: StorageConfig,
}

/// Invite code generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InviteConfig {
    /// Characters per code
    pub code_length: usize,
    /// Random draws before giving up on finding an unused code
    pub max_attempts: u32,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            max_attempts: 32,
        }
    }
}

/// Member color assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Reserved for the room owner; never handed to a member
    pub owner_color: String,
    /// Handed out in order to joining members
    pub palette: Vec<String>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            owner_color: "#6B7280".to_string(),
            palette: [
                "#EF4444", "#F97316", "#F59E0B", "#84CC16", "#10B981", "#06B6D4", "#3B82F6",
                "#8B5CF6", "#EC4899", "#14B8A6", "#A855F7", "#F43F5E",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

/// Persistence tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Conditional-save attempts before reporting a write conflict
    pub max_write_retries: u32,
    /// How long SQLite waits on a locked database
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_write_retries: 5,
            busy_timeout_ms: 5000,
        }
    }
}

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML content
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invite.code_length == 0 {
            return Err(ConfigError::Invalid(
                "invite.code_length must be positive".into(),
            ));
        }
        if self.invite.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "invite.max_attempts must be positive".into(),
            ));
        }
        if self.colors.palette.is_empty() {
            return Err(ConfigError::Invalid("colors.palette is empty".into()));
        }
        if self
            .colors
            .palette
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&self.colors.owner_color))
        {
            return Err(ConfigError::Invalid(format!(
                "owner color {} also appears in the member palette",
                self.colors.owner_color
            )));
        }
        if self.storage.max_write_retries == 0 {
            return Err(ConfigError::Invalid(
                "storage.max_write_retries must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.invite.code_length, 6);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_toml(
            r##"
[invite]
code_length = 8

[colors]
owner_color = "#000000"
palette = ["#111111", "#222222"]

[storage]
busy_timeout_ms = 250
"##,
        )
        .unwrap();
        assert_eq!(config.invite.code_length, 8);
        assert_eq!(config.invite.max_attempts, 32);
        assert_eq!(config.colors.palette.len(), 2);
        assert_eq!(config.storage.busy_timeout_ms, 250);
        assert_eq!(config.storage.max_write_retries, 5);
    }

    #[test]
    fn test_owner_color_in_palette_rejected() {
        let err = EngineConfig::from_toml(
            r##"
[colors]
owner_color = "#111111"
palette = ["#111111"]
"##,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = EngineConfig::from_toml("[invite\ncode_length = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/roomgrid.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
