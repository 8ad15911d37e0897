//! Error types for droidrig
//!
//! Centralized error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for droidrig core operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),
}

/// Result type alias for droidrig core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Io(e) => format!("File operation failed: {}", e),
            CoreError::Config(msg) => format!("Configuration error: {}", msg),
            CoreError::TomlParse { path, .. } => {
                format!("Could not read {:?}. Fix or delete the file and try again.", path)
            }
            CoreError::UnknownPlatform(id) => {
                format!("Unknown platform '{}'. Use win32, darwin or linux.", id)
            }
            _ => self.to_string(),
        }
    }
}
