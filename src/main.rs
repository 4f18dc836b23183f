//! profile-variables - track variable values across a run
//!
//! This is the main entry point for the profile-variables CLI.

mod cli;

use anyhow::Result;
use cli::{Cli, Commands};
use profile_variables::error::Error;
use profile_variables::VERSION;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 {
        eprintln!("profile-variables v{}", VERSION);
    }

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<Error>().map_or(1, Error::exit_code)
        }
    };

    std::process::exit(exit_code);
}

/// Execute the selected subcommand
async fn run(cli: &Cli) -> Result<i32> {
    let config = cli.config.as_deref();
    match &cli.command {
        Commands::Replay(args) => args.execute(config, cli.no_default_config).await,
        Commands::Config(args) => args.execute(config, cli.no_default_config),
    }
}

/// Initialize logging based on verbosity level
///
/// Diagnostics go to stderr so the audit document on stdout stays parseable.
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}
