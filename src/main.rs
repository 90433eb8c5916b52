//! Cachify - command-line front end of the response cache
//!
//! Runs one cache operation against the disk-backed store and prints the
//! resulting value as JSON on stdout.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cachify::cli::{build_request, parse_value_arg, Cli, Command};
use cachify::models::RemoveOptions;
use cachify::{CacheEngine, EngineConfig, FileStore, Lookup, ReqwestFetcher};

/// Main entry point for the cachify CLI.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber (stderr, so stdout stays machine-readable)
/// 2. Load configuration from environment variables
/// 3. Open the file store and build the engine
/// 4. Run the requested subcommand
#[tokio::main]
async fn main() -> ExitCode {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cachify=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs the subcommand. Returns false when a read found no value.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = EngineConfig::from_env();
    let store = match cli.store_dir.clone().or_else(|| config.store_dir.clone()) {
        Some(dir) => FileStore::with_dir(dir),
        None => FileStore::new().ok_or_else(|| anyhow!("no cache directory available"))?,
    };
    debug!("Using store at {}", store.dir().display());

    let engine = CacheEngine::builder(Arc::new(store), Arc::new(ReqwestFetcher::new()))
        .config(config)
        .build();

    let found = match cli.command {
        Command::Fetch {
            url,
            key,
            headers,
            pre_sync,
        } => {
            let request = build_request(&url, &headers)?;
            let response = engine
                .cachify(request, key.cachify_options(pre_sync))
                .await
                .with_context(|| format!("fetching {}", url))?
                .ok_or_else(|| anyhow!("request for '{}' was not cacheable", key.key))?;
            print_lookup(response)?
        }
        Command::Get { key } => {
            let lookup = engine.get_cache(key.get_options()).await?;
            print_lookup(lookup)?
        }
        Command::Set { key, value } => {
            engine
                .set_cache(key.set_options(), parse_value_arg(&value))
                .await?;
            info!("Stored '{}'", key.key);
            true
        }
        Command::Remove { key } => {
            engine.remove_cache(RemoveOptions::new(key)).await?;
            true
        }
    };

    engine.shutdown();
    Ok(found)
}

fn print_lookup(lookup: Lookup) -> anyhow::Result<bool> {
    match lookup.into_value() {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(true)
        }
        None => Ok(false),
    }
}
