//! `pgscan` — scan project files for package dependencies, report them, or
//! publish them to ProGet as consumer records.
//!
//! # Flow
//! 1. Parse the raw argument tokens ([`cli::ParsedArguments`]).
//! 2. Load settings ([`config::load_config`]) and build provenance
//!    ([`config::BuildMetadata`]).
//! 3. Expand `--input` into concrete files ([`inputs::resolve_inputs`]).
//! 4. Run `report` or `publish` once per file ([`batch`], [`commands`]).
//! 5. After a publish batch, embed the highest version of every package into
//!    the `--application-nuspec` manifest ([`manifest`]).
//! 6. On failure print the message (plus usage for syntax errors) and exit
//!    with the error's code ([`error::ScanError::exit_code`]).

mod aggregate;
mod analyzer;
mod batch;
mod cli;
mod commands;
mod config;
mod error;
mod inputs;
mod manifest;
mod models;
mod registry;
mod version;

use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use analyzer::ManifestResolver;
use batch::BatchContext;
use cli::ParsedArguments;
use config::{load_config, BuildMetadata};
use error::{exitcode, ScanError, ScanResult};
use registry::proget::ProGetClient;

/// Log filter variable, e.g. `PGSCAN_LOG=pgscan=debug`.
const LOG_ENV: &str = "PGSCAN_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();

    let tokens: Vec<String> = std::env::args().skip(1).collect();
    if tokens.is_empty() {
        eprintln!("{}", cli::usage());
        std::process::exit(exitcode::USAGE);
    }

    if let Err(e) = run(&tokens).await {
        tracing::debug!(error = ?e, "run failed");
        eprintln!("{}", e.to_string().red());
        if e.show_usage() {
            eprintln!();
            eprintln!("{}", cli::usage());
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(tokens: &[String]) -> ScanResult<()> {
    let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let args = ParsedArguments::parse(tokens)?;
    let config = load_config(&working_dir, args.named("config").map(Path::new))
        .map_err(ScanError::Config)?;
    let build = BuildMetadata::from_env(&config.manifest);
    tracing::debug!(?build, "build metadata");

    let publisher = ProGetClient::new(config.registry.user_agent.as_str())
        .context("creating HTTP client")
        .map_err(ScanError::Config)?;

    let ctx = BatchContext {
        resolver: &ManifestResolver,
        publisher: &publisher,
        config: &config,
        build: &build,
        working_dir: &working_dir,
    };
    batch::run(tokens, &ctx).await
}
