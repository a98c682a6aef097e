//! stow - resilient bucket and object operations from the command line
//!
//! Usage: stow [OPTIONS] <COMMAND>

mod commands;
mod config;
mod exit_code;
mod output;

use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser};
use stow_core::{ClientConfig, ObjectClient};
use stow_s3::S3Backend;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::commands::Commands;
use crate::config::ConfigManager;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

#[derive(Parser, Debug)]
#[command(
    name = "stow",
    version,
    about = "Resilient bucket and object operations for S3-compatible storage"
)]
struct Cli {
    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Endpoint URL for S3-compatible services
    #[arg(long, global = true, env = "STOW_ENDPOINT")]
    endpoint: Option<String>,

    /// Region for requests and new buckets
    #[arg(long, global = true, env = "STOW_REGION")]
    region: Option<String>,

    /// Use path-style addressing
    #[arg(long, global = true)]
    path_style: bool,

    /// Number of parallel operations in bulk commands
    #[arg(short = 'P', long, global = true)]
    parallel: Option<usize>,

    /// Maximum attempts per request, the first included
    #[arg(long, global = true)]
    retries: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_config(&self) -> OutputConfig {
        OutputConfig {
            json: self.json,
            no_color: self.no_color,
            quiet: self.quiet,
        }
    }

    /// Apply command-line overrides on top of the file configuration
    fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(endpoint) = &self.endpoint {
            config.connection.endpoint = Some(endpoint.clone());
        }
        if let Some(region) = &self.region {
            config.connection.region = region.clone();
        }
        if self.path_style {
            config.connection.path_style = true;
        }
        if let Some(parallel) = self.parallel {
            config.bulk.concurrency = parallel;
        }
        if let Some(retries) = self.retries {
            config.retry.max_attempts = retries;
        }
        config
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let manager = ConfigManager::new().context("Failed to locate configuration")?;
    let config = manager
        .load()
        .with_context(|| format!("Failed to load {}", manager.config_path().display()))?;
    let config = cli.apply(config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Exit code for a start-up failure
fn startup_exit_code(error: &anyhow::Error) -> ExitCode {
    error
        .downcast_ref::<stow_core::Error>()
        .map_or(ExitCode::GeneralError, |e| ExitCode::from_i32(e.exit_code()))
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let formatter = Formatter::new(cli.output_config());

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return startup_exit_code(&e).into();
        }
    };

    // Ctrl-C stops dispatching new requests; in-flight ones finish
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight requests");
            on_interrupt.cancel();
        }
    });

    let backend = S3Backend::new(&config.connection).await;
    let client = ObjectClient::new(Arc::new(backend), &config).with_cancellation(cancel);

    commands::execute(cli.command, &client, &formatter).await.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let cli = Cli::parse_from([
            "stow",
            "--region",
            "eu-west-1",
            "-P",
            "3",
            "--retries",
            "2",
            "rm",
            "photos",
            "cat.jpg",
        ]);

        let config = cli.apply(ClientConfig::default());
        assert_eq!(config.connection.region, "eu-west-1");
        assert_eq!(config.bulk.concurrency, 3);
        assert_eq!(config.retry.max_attempts, 2);
    }

    #[test]
    fn test_mb_region_and_ignore_existing() {
        let cli = Cli::parse_from(["stow", "mb", "photos", "--region", "eu-west-1", "-p"]);

        let config = cli.apply(ClientConfig::default());
        assert_eq!(config.connection.region, "eu-west-1");
        match cli.command {
            Commands::Mb(args) => {
                assert_eq!(args.bucket, "photos");
                assert!(args.ignore_existing);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_startup_exit_code() {
        let err = anyhow::Error::new(stow_core::Error::Config("bad".into())).context("loading");
        assert_eq!(startup_exit_code(&err), ExitCode::UsageError);

        let err = anyhow::anyhow!("something else");
        assert_eq!(startup_exit_code(&err), ExitCode::GeneralError);
    }
}
