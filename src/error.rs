//! Error types for the profile_variables callback.
//!
//! Only run-fatal conditions are represented here. Malformed filter values,
//! undefined variables and hosts that disappear mid-run are handled in-band
//! by the recorder and never surface as an [`Error`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for profile_variables operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for profile_variables.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The host execution engine failed in a way the recorder cannot recover from.
    #[error("Execution engine error: {0}")]
    Engine(String),

    /// The inventory could not be listed.
    #[error("Inventory unavailable: {0}")]
    InventoryUnavailable(String),

    /// A task identifier was not known to the engine.
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A configuration file could not be read or parsed.
    #[error("Failed to load config from '{path}': {message}")]
    Config {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Error loading a run fixture.
    #[error("Failed to load run fixture '{path}': {message}")]
    Fixture {
        /// Path to the fixture file
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO and Serialization Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl Error {
    /// Creates a new engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }

    /// Creates a new configuration error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new fixture error.
    pub fn fixture(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Fixture {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Engine(_) | Error::TaskNotFound(_) => 2,
            Error::InventoryUnavailable(_) => 5,
            Error::Config { .. } => 3,
            Error::Fixture { .. } | Error::YamlParse(_) => 4,
            _ => 1,
        }
    }
}
