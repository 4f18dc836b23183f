//! Subcommands module for the profile-variables CLI

pub mod config;
pub mod replay;

use anyhow::{Context, Result};
use profile_variables::callback::ProfileVariablesConfigLoader;
use profile_variables::vars::Variables;
use std::path::Path;

/// Loader for the persisted configuration tiers, honouring global flags.
pub fn config_loader(config: Option<&Path>, no_default_config: bool) -> ProfileVariablesConfigLoader {
    let mut loader = ProfileVariablesConfigLoader::new();
    if no_default_config {
        loader = loader.without_standard_locations();
    }
    if let Some(path) = config {
        loader = loader.with_file(path);
    }
    loader
}

/// Parse `-e` values: `key=value`, `@file.yml`, or an inline YAML/JSON mapping.
///
/// Values after `=` are read as YAML scalars or sequences, falling back to
/// the raw string. Later values override earlier ones.
pub fn parse_extra_vars(values: &[String]) -> Result<Variables> {
    let mut vars = Variables::new();

    for value in values {
        if let Some(file_path) = value.strip_prefix('@') {
            let content = std::fs::read_to_string(file_path)
                .with_context(|| format!("Failed to read extra vars file: {}", file_path))?;
            let file_vars: Variables = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse extra vars file: {}", file_path))?;
            vars.merge(&file_vars);
        } else if value.trim_start().starts_with('{') {
            let inline: Variables = serde_yaml::from_str(value)
                .with_context(|| format!("Failed to parse extra vars: {}", value))?;
            vars.merge(&inline);
        } else if let Some((key, raw)) = value.split_once('=') {
            let parsed: serde_json::Value = serde_yaml::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
            let parsed = match parsed {
                // An empty value parses as YAML null
                serde_json::Value::Null => serde_json::Value::String(raw.to_string()),
                other => other,
            };
            vars.set(key.trim(), parsed);
        } else {
            anyhow::bail!(
                "Invalid extra vars '{}': expected key=value, @file or a mapping",
                value
            );
        }
    }

    Ok(vars)
}
