#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the case tracker.
//!
//! ```text
//! case_tracker refresh [--debug] [--only cases|hospitals]
//! case_tracker history
//! case_tracker show <key>
//! ```
//!
//! Configuration is read the same way as the server: `case_tracker.toml`
//! (or `$CASE_TRACKER_CONFIG`) plus environment overrides.

use std::sync::Arc;

use case_tracker_refresh::history::SnapshotHistory;
use case_tracker_refresh::{
    CaseCountRefresher, RefreshRequest, RefreshTarget, Refreshers, TrackerConfig,
};
use case_tracker_store::KvStore;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "case_tracker", about = "Refresh and inspect case tracker data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the official sources and rebuild the cached views
    Refresh {
        /// Print the extracted records instead of publishing cached views
        #[arg(long)]
        debug: bool,
        /// Refresh a single source
        #[arg(long, value_enum)]
        only: Option<Source>,
    },
    /// List recorded snapshot timestamps, oldest first
    History,
    /// Print a stored value
    Show {
        /// Store key, e.g. `cached_case_counts`
        key: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Cases,
    Hospitals,
}

impl From<Source> for RefreshTarget {
    fn from(source: Source) -> Self {
        match source {
            Source::Cases => Self::Cases,
            Source::Hospitals => Self::Hospitals,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let config = TrackerConfig::load()?;
    let store = config.open_store()?;

    match cli.command {
        Commands::Refresh { debug, only } => {
            let cases = CaseCountRefresher::from_config(&config, store.clone())?;
            let refreshers = Refreshers::new(Arc::new(cases));
            let request = RefreshRequest {
                debug,
                target: only.map(RefreshTarget::from).unwrap_or_default(),
            };

            match refreshers.refresh_official_sources(request).await {
                Ok(body) => println!("{}", serde_json::to_string_pretty(&body)?),
                Err(e) => {
                    log::error!("Refresh failed: {e}");
                    eprintln!("{}", serde_json::to_string_pretty(&e.to_error_body())?);
                    std::process::exit(1);
                }
            }
        }
        Commands::History => {
            let history = SnapshotHistory::load(store.as_ref()).await?;

            if history.timestamps().is_empty() {
                println!("No snapshots recorded.");
                return Ok(());
            }

            for timestamp in history.timestamps() {
                println!("{}", timestamp.as_str());
            }
            println!("\n{} snapshot(s)", history.timestamps().len());
        }
        Commands::Show { key } => {
            let Some(text) = store.get(&key).await? else {
                eprintln!("Key not found: {key}");
                std::process::exit(1);
            };

            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(_) => println!("{text}"),
            }
        }
    }

    Ok(())
}
