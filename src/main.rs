//! attested-tx-builder host
//!
//! Thin, network-free CLI around the library: reads a config file and a
//! request file (operation plus prepared context), builds the unsigned
//! transaction and prints the `BuildOutput` JSON on stdout. Logs go to
//! stderr so stdout stays machine-readable.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use std::io::Read;

use anyhow::{Context, Result};
use attested_tx_builder::{
    structured_logging::BuildLogger,
    tx_builder::{OperationRequest, PreparedContextDto, TransactionBuilder},
    BuilderConfig, Token,
};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TX_BUILDER_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an unsigned transaction
    Build {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Request file with `request` and `context`; `-` reads stdin
        #[arg(short, long)]
        request: String,

        /// Request id for log correlation (generated when omitted)
        #[arg(long, env = "TX_BUILDER_REQUEST_ID")]
        request_id: Option<String>,
    },
    /// List supported tokens
    Tokens,
}

/// On-disk request: the operation plus the prepared context
#[derive(Debug, Deserialize)]
struct RequestFile {
    request: OperationRequest,
    context: PreparedContextDto,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs);

    match args.command {
        Command::Build {
            config,
            request,
            request_id,
        } => build(&config, &request, request_id),
        Command::Tokens => print_tokens(),
    }
}

/// Initialize logging subsystem on stderr
fn init_logging(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "attested_tx_builder=debug,info"
    } else {
        "attested_tx_builder=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<BuilderConfig> {
    if std::path::Path::new(path).exists() {
        BuilderConfig::from_file(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(BuilderConfig::default())
    }
}

fn read_request(path: &str) -> Result<RequestFile> {
    let text = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read request {}", path))?
    };
    serde_json::from_str(&text).context("Request file is not a valid build request")
}

fn build(config_path: &str, request_path: &str, request_id: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let file = read_request(request_path)?;
    let logger = request_id.map(BuildLogger::new).unwrap_or_default();

    info!(
        request_id = %logger.request_id(),
        operation = %file.request.operation,
        "Building transaction"
    );

    let builder = TransactionBuilder::new(config).context("Invalid builder configuration")?;
    let output = builder
        .build_from_dto(&file.request, file.context, &logger)
        .with_context(|| format!("Build failed for request {}", logger.request_id()))?;

    println!("{}", output.to_json().context("Failed to encode build output")?);
    Ok(())
}

fn print_tokens() -> Result<()> {
    let tokens: Vec<serde_json::Value> = Token::ALL
        .iter()
        .map(|t| {
            serde_json::json!({
                "symbol": t.symbol(),
                "mint": t.mint().to_string(),
                "decimals": t.decimals(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&tokens)?);
    Ok(())
}
