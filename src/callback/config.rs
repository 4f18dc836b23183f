//! Persisted configuration for the profile_variables callback.
//!
//! Supports multiple configuration sources with proper precedence:
//!
//! 1. Default values (lowest priority)
//! 2. Configuration files (TOML, YAML, or JSON)
//! 3. Environment variables
//! 4. CLI arguments (highest priority)
//!
//! Per-run extra variables (`-e profile_variables_record_vars=...`) sit above
//! all of these and are applied by the recorder at play start, not here.
//!
//! # Configuration File Format (TOML)
//!
//! ```toml
//! [callback_profile_variables]
//! # Colon separated string or a list
//! record_tasks = "Debug:Install"
//! record_vars = ["var_on_play", "var_set_during_play"]
//! record_hosts = "hosta"
//!
//! # "immediate" (snapshot as each host starts a task) or
//! # "boundary" (snapshot the previous task when the next one starts)
//! mode = "immediate"
//!
//! # "stdout", "stderr", or a file path
//! output = "stdout"
//! ```
//!
//! # Environment Variables
//!
//! - `PROFILE_VARIABLES_RECORD_TASKS`
//! - `PROFILE_VARIABLES_RECORD_VARS`
//! - `PROFILE_VARIABLES_RECORD_HOSTS`
//! - `PROFILE_VARIABLES_MODE`
//! - `PROFILE_VARIABLES_OUTPUT`

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::callback::filter::{FilterValue, PersistedFilters};
use crate::callback::plugins::RecordMode;
use crate::error::{Error, Result};

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "PROFILE_VARIABLES";

// ============================================================================
// Core Configuration Type
// ============================================================================

/// Persisted settings for the profile_variables callback.
///
/// Every field is optional so that layers can be merged: a later source
/// only overrides what it actually sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileVariablesConfig {
    /// Task filter (string or list)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_tasks: Option<JsonValue>,

    /// Variable filter (string or list)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_vars: Option<JsonValue>,

    /// Host filter (string or list)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_hosts: Option<JsonValue>,

    /// Snapshot timing policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RecordMode>,

    /// Output destination: "stdout", "stderr", or a file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl ProfileVariablesConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective recording mode.
    pub fn mode(&self) -> RecordMode {
        self.mode.unwrap_or_default()
    }

    /// Effective output destination.
    pub fn output(&self) -> &str {
        self.output.as_deref().unwrap_or("stdout")
    }

    /// The persisted filter tier, classified into [`FilterValue`]s.
    pub fn persisted_filters(&self) -> PersistedFilters {
        PersistedFilters {
            record_tasks: FilterValue::from_json(self.record_tasks.as_ref()),
            record_vars: FilterValue::from_json(self.record_vars.as_ref()),
            record_hosts: FilterValue::from_json(self.record_hosts.as_ref()),
        }
    }

    /// Merge another configuration into this one (other takes precedence).
    pub fn merge(&mut self, other: ProfileVariablesConfig) {
        if other.record_tasks.is_some() {
            self.record_tasks = other.record_tasks;
        }
        if other.record_vars.is_some() {
            self.record_vars = other.record_vars;
        }
        if other.record_hosts.is_some() {
            self.record_hosts = other.record_hosts;
        }
        if other.mode.is_some() {
            self.mode = other.mode;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
    }
}

// ============================================================================
// Configuration Loader
// ============================================================================

/// Builder for loading configuration from multiple sources.
#[derive(Debug)]
pub struct ProfileVariablesConfigLoader {
    /// Configuration files to load (in order)
    config_files: Vec<PathBuf>,
    /// Environment variable prefix
    env_prefix: Option<String>,
    /// CLI overrides
    cli_overrides: ProfileVariablesConfig,
    /// Whether to load from standard locations
    load_standard_locations: bool,
}

impl Default for ProfileVariablesConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileVariablesConfigLoader {
    /// Create a new configuration loader.
    pub fn new() -> Self {
        Self {
            config_files: Vec::new(),
            env_prefix: Some(ENV_PREFIX.to_string()),
            cli_overrides: ProfileVariablesConfig::default(),
            load_standard_locations: true,
        }
    }

    /// Add a configuration file to load.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Disable environment variable loading.
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Disable loading from standard configuration locations.
    pub fn without_standard_locations(mut self) -> Self {
        self.load_standard_locations = false;
        self
    }

    /// Set CLI override for the recording mode.
    pub fn with_mode(mut self, mode: RecordMode) -> Self {
        self.cli_overrides.mode = Some(mode);
        self
    }

    /// Set CLI override for the output destination.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.cli_overrides.output = Some(output.into());
        self
    }

    /// Load configuration from all sources.
    pub fn load(self) -> Result<ProfileVariablesConfig> {
        let mut config = ProfileVariablesConfig::default();

        // Standard locations are best effort
        if self.load_standard_locations {
            for path in Self::standard_config_paths() {
                if path.exists() {
                    debug!("Loading profile_variables config from: {}", path.display());
                    match Self::load_file(&path) {
                        Ok(file_config) => config.merge(file_config),
                        Err(e) => warn!("Ignoring {}: {}", path.display(), e),
                    }
                }
            }
        }

        for path in &self.config_files {
            if path.exists() {
                debug!("Loading profile_variables config from: {}", path.display());
                config.merge(Self::load_file(path)?);
            } else {
                warn!("profile_variables config file not found: {}", path.display());
            }
        }

        if let Some(prefix) = &self.env_prefix {
            config.merge(Self::load_from_env(prefix));
        }

        // CLI overrides (highest priority)
        config.merge(self.cli_overrides);

        Ok(config)
    }

    /// Get standard configuration file locations.
    fn standard_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/rustible/profile_variables.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".rustible/profile_variables.toml"));
        }

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_config).join("rustible/profile_variables.toml"));
        }

        paths.push(PathBuf::from("profile_variables.toml"));
        paths
    }

    /// Load configuration from a file.
    ///
    /// Read and parse failures carry the file's path.
    fn load_file(path: &Path) -> Result<ProfileVariablesConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::config(path, format!("cannot read file: {}", e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let parsed: std::result::Result<SectionWrapper, String> = match extension {
            "toml" => toml::from_str(&content).map_err(|e| e.to_string()),
            "yml" | "yaml" => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .map_err(|e| e.to_string()),
        };

        let wrapper = parsed.map_err(|message| Error::config(path, message))?;
        Ok(wrapper.callback_profile_variables)
    }

    /// Load configuration from environment variables.
    fn load_from_env(prefix: &str) -> ProfileVariablesConfig {
        let mut config = ProfileVariablesConfig::default();

        if let Ok(val) = env::var(format!("{}_RECORD_TASKS", prefix)) {
            config.record_tasks = Some(JsonValue::String(val));
        }
        if let Ok(val) = env::var(format!("{}_RECORD_VARS", prefix)) {
            config.record_vars = Some(JsonValue::String(val));
        }
        if let Ok(val) = env::var(format!("{}_RECORD_HOSTS", prefix)) {
            config.record_hosts = Some(JsonValue::String(val));
        }

        if let Ok(val) = env::var(format!("{}_MODE", prefix)) {
            match val.parse::<RecordMode>() {
                Ok(mode) => config.mode = Some(mode),
                Err(e) => warn!("Ignoring {}_MODE: {}", prefix, e),
            }
        }

        if let Ok(val) = env::var(format!("{}_OUTPUT", prefix)) {
            config.output = Some(val);
        }

        config
    }
}

/// Wrapper for config file format that nests under `[callback_profile_variables]`.
#[derive(Debug, Deserialize)]
struct SectionWrapper {
    #[serde(default)]
    callback_profile_variables: ProfileVariablesConfig,
}
