//! Config command - show the effective callback configuration

use super::config_loader;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use profile_variables::callback::ProfileVariablesConfig;
use serde::Serialize;
use std::path::Path;

/// Output format for the config command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConfigFormat {
    /// TOML, as accepted by configuration files
    #[default]
    Toml,
    /// JSON
    Json,
}

/// Arguments for the config command
#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
    pub format: ConfigFormat,
}

#[derive(Serialize)]
struct Section<'a> {
    callback_profile_variables: &'a ProfileVariablesConfig,
}

impl ConfigArgs {
    /// Execute the config command
    pub fn execute(&self, config: Option<&Path>, no_default_config: bool) -> Result<i32> {
        let config = config_loader(config, no_default_config).load()?;
        println!("{}", render(&config, self.format)?);
        Ok(0)
    }
}

/// Render a configuration nested under its file section.
fn render(config: &ProfileVariablesConfig, format: ConfigFormat) -> Result<String> {
    let section = Section {
        callback_profile_variables: config,
    };
    Ok(match format {
        ConfigFormat::Toml => toml::to_string_pretty(&section)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&section)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use profile_variables::callback::RecordMode;
    use serde_json::json;

    #[test]
    fn test_render_toml_round_trips_through_loader_format() {
        let config = ProfileVariablesConfig {
            record_vars: Some(json!(["a", "b"])),
            mode: Some(RecordMode::Boundary),
            ..Default::default()
        };
        let rendered = render(&config, ConfigFormat::Toml).unwrap();
        assert!(rendered.contains("[callback_profile_variables]"));
        assert!(rendered.contains("mode = \"boundary\""));
    }

    #[test]
    fn test_render_json() {
        let rendered = render(&ProfileVariablesConfig::default(), ConfigFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value, json!({"callback_profile_variables": {}}));
    }
}
