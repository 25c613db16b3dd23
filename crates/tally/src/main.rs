//! Tally - telemetry pipeline engine
//!
//! # Usage
//!
//! ```bash
//! # Run the engine (default)
//! tally
//! tally --config configs/tally.toml
//!
//! # Load and build a configuration without starting anything
//! tally validate --config configs/tally.toml
//! ```

mod cmd;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tally_config::{Config, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Tally - telemetry pipeline engine
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the engine
    Serve,

    /// Load and build the configuration, then exit
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Validate) => {
            // validate reports on stdout; only warnings go to the log
            init_logging(&LogConfig::default(), Some("warn"))?;
            cmd::validate::run(cli.config.as_deref())
        }
        Some(Command::Serve) | None => {
            let log = load_log_config(cli.config.as_deref());
            init_logging(&log, cli.log_level.as_deref())?;
            cmd::serve::run(cli.config).await
        }
    }
}

/// Logging section of the config file, or defaults if it cannot be read
///
/// Errors are reported later, when the serve command loads the file.
fn load_log_config(config_path: Option<&Path>) -> LogConfig {
    config_path
        .filter(|p| p.exists())
        .and_then(|p| Config::from_file(p).ok())
        .map(|c| c.log)
        .unwrap_or_default()
}

/// Initialize the tracing subscriber
///
/// Precedence for the filter: `RUST_LOG`, then the CLI flag, then the
/// config file level. Config directives apply to the latter two.
fn init_logging(log: &LogConfig, cli_level: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log.filter(cli_level)))
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = match log.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match log.format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false).with_writer(writer))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false).with_writer(writer))
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
