//! vow CLI - runs the bootstrap pipeline and prints what each URL returned.
//!
//! ```text
//! main() -> VowConfig::load() -> init_tracing() -> Bootstrap::run() on a LocalSet
//!                                                        |
//!                                                        v
//!                                   [delay] -> fetch (when + lenient) -> bind
//! ```
//!
//! One JSON line per URL goes to stdout. Logs go to `~/.vow/logs/vow.log`.

mod bootstrap;

use anyhow::Result;
use clap::Parser;
use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    process::ExitCode,
    sync::Mutex,
};
use tokio::runtime::Builder;
use tokio::task::LocalSet;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use vow_config::{ConfigError, VowConfig, env_bootstrap_urls};
use vow_http::Client;
use vow_types::Settlement;

use crate::bootstrap::Bootstrap;

#[derive(Parser, Debug)]
#[command(name = "vow", version)]
#[command(about = "Fetch every URL in parallel and print one JSON line per URL")]
struct Cli {
    /// URLs to fetch. Without any, they come from VOW_BOOTSTRAP_URLS or ~/.vow/config.toml
    urls: Vec<String>,
}

fn init_tracing(configured: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or("info")))
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_vow_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Without a log file, stdout stays reserved for results.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_vow_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in vow_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn vow_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.vow/logs/vow.log
    if let Some(config_path) = VowConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("vow.log"));
    }

    // Fallback: ./.vow/logs/vow.log
    candidates.push(PathBuf::from(".vow").join("logs").join("vow.log"));

    candidates
}

/// Arguments win over `VOW_BOOTSTRAP_URLS`, which wins over the config file.
fn bootstrap_urls(args: Vec<String>, config: Option<&VowConfig>) -> Vec<String> {
    if !args.is_empty() {
        return args;
    }
    match config {
        Some(config) => config.bootstrap_urls(),
        None => env_bootstrap_urls().unwrap_or_default(),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded: Result<Option<VowConfig>, ConfigError> = VowConfig::load();
    let config = loaded.as_ref().ok().and_then(Option::as_ref);
    init_tracing(config.and_then(VowConfig::log_filter));
    if let Err(err) = &loaded {
        tracing::warn!("Ignoring config: {err}");
    }

    let urls = bootstrap_urls(cli.urls, config);
    if urls.is_empty() {
        tracing::warn!("No bootstrap URLs configured");
    }

    let client = Client::builder()
        .user_agent(concat!("vow/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let bootstrap = Bootstrap::from_config(client, urls, config);

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = LocalSet::new().block_on(
        &runtime,
        bootstrap.run(|fetched| println!("{}", fetched.to_json())),
    );

    match outcome {
        Settlement::Resolved(_) => {
            tracing::info!("Bootstrap complete");
            Ok(ExitCode::SUCCESS)
        }
        Settlement::Rejected(payload) => {
            match payload {
                Some(payload) => tracing::error!(%payload, "Error while booting"),
                None => tracing::error!("Error while booting"),
            }
            eprintln!("vow: bootstrap failed");
            Ok(ExitCode::FAILURE)
        }
        Settlement::Canceled => {
            tracing::error!("Bootstrap canceled");
            eprintln!("vow: bootstrap canceled");
            Ok(ExitCode::FAILURE)
        }
    }
}
