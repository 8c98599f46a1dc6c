//! diskgate - command-line runner for the cloud disk gateway
//!
//! Reads one JSON request from a file or stdin, runs it and prints the
//! JSON result on stdout. Logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use diskgate_core::{FailureKind, Gateway, GatewayConfig, GatewayResult};
use diskgate_transfer::{BarProgress, NoProgress, ProgressSink};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// diskgate - upload, download and manage files on a cloud disk in one call
#[derive(Parser)]
#[command(name = "diskgate")]
#[command(author, version, about = "Single-call cloud disk gateway", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except the result
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file to use instead of the default one
    #[arg(long, global = true, env = "DISKGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one JSON request and print the JSON result
    Exec {
        /// Request file, stdin when omitted or "-"
        request: Option<PathBuf>,
    },

    /// Show or create configuration
    Config {
        /// Show current configuration
        #[arg(long, conflicts_with_all = ["init", "path"])]
        show: bool,

        /// Write the commented default configuration file
        #[arg(long, conflicts_with_all = ["show", "path"])]
        init: bool,

        /// Show configuration file path
        #[arg(long, conflicts_with_all = ["show", "init"])]
        path: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Exec { request } => {
            let config = load_config(cli.config.as_deref())?;
            let body = read_request(request.as_deref())?;

            let result = match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(value) => gateway(config, cli.quiet).execute_value(value),
                Err(e) => GatewayResult::failure(
                    FailureKind::Validation,
                    format!("Invalid request JSON: {}", e),
                ),
            };

            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(map_result_to_exit_code(&result))
        }

        Commands::Config { show, init, path } => {
            let config_path = match &cli.config {
                Some(path) => path.clone(),
                None => GatewayConfig::config_path().context("Failed to get config path")?,
            };

            if show {
                let config = match &cli.config {
                    Some(path) => load_config(Some(path.as_path()))?,
                    None => GatewayConfig::load().context("Failed to load configuration")?,
                };
                println!("{}", toml::to_string_pretty(&config)?);
            } else if init {
                if config_path.exists() {
                    bail!("{} already exists", config_path.display());
                }
                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&config_path, GatewayConfig::default_config_content())
                    .with_context(|| format!("Failed to write {}", config_path.display()))?;
                info!("Created {}", config_path.display());
                println!("{}", config_path.display());
            } else if path {
                println!("{}", config_path.display());
            } else {
                eprintln!("Please specify --show, --init, or --path");
                return Ok(3);
            }
            Ok(0)
        }
    }
}

/// Explicit file must exist; the default location falls back to defaults
fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    match path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            GatewayConfig::load_from(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => Ok(GatewayConfig::load_or_default()),
    }
}

fn read_request(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read request from {}", path.display())),
        _ => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read request from stdin")?;
            Ok(body)
        }
    }
}

fn gateway(config: GatewayConfig, quiet: bool) -> Gateway {
    Gateway::new(config).with_progress(move |label: &str| -> Arc<dyn ProgressSink> {
        if quiet {
            Arc::new(NoProgress)
        } else {
            Arc::new(BarProgress::new(label))
        }
    })
}

fn map_result_to_exit_code(result: &GatewayResult) -> i32 {
    match result.failure_kind() {
        None => 0,
        Some(FailureKind::Validation) => 3,
        Some(_) => 1,
    }
}
