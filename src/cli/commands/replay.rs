//! Replay command - run a fixture through the variable audit recorder

use super::{config_loader, parse_extra_vars};
use anyhow::{Context, Result};
use clap::Parser;
use profile_variables::callback::{sink_for_output, ProfileVariablesCallback, RecordMode};
use profile_variables::replay::{replay, RunFixture, StaticEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Arguments for the replay command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Path to the run fixture (YAML or JSON)
    #[arg(required = true)]
    pub fixture: PathBuf,

    /// Extra variables (key=value, @file.yml, or a mapping)
    #[arg(short = 'e', long = "extra-vars", action = clap::ArgAction::Append)]
    pub extra_vars: Vec<String>,

    /// Recording mode (immediate or boundary)
    #[arg(short = 'm', long)]
    pub mode: Option<RecordMode>,

    /// Write the audit document to this file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

impl ReplayArgs {
    /// Execute the replay command
    pub async fn execute(&self, config: Option<&Path>, no_default_config: bool) -> Result<i32> {
        let mut loader = config_loader(config, no_default_config);
        if let Some(mode) = self.mode {
            loader = loader.with_mode(mode);
        }
        if let Some(output) = &self.output {
            loader = loader.with_output(output.display().to_string());
        }
        let config = loader.load()?;

        let extra_vars = parse_extra_vars(&self.extra_vars)?;
        let fixture = RunFixture::from_file(&self.fixture)?;
        let engine = Arc::new(StaticEngine::new(fixture).with_extra_vars(extra_vars));

        let sink = sink_for_output(config.output())
            .with_context(|| format!("Failed to open output: {}", config.output()))?;
        let recorder = ProfileVariablesCallback::with_config(&config, engine.clone(), sink);

        info!(
            fixture = %self.fixture.display(),
            mode = %recorder.mode(),
            "Replaying run"
        );
        let stats = replay(&engine, &recorder).await?;
        info!(
            plays = stats.plays,
            tasks = stats.tasks,
            handlers = stats.handlers,
            records = recorder.records().len(),
            "Replay complete"
        );

        Ok(0)
    }
}
