#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `org_map`: geocode organization records and merge them into the
//! canonical dataset.
//!
//! Every subcommand runs without prompts. With no subcommand, an
//! interactive menu offers the same actions.

mod commands;
mod interactive;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use org_map_ingest::config::PipelineConfig;

#[derive(Parser)]
#[command(
    name = "org_map",
    about = "Organization map geocoding and merge pipeline"
)]
struct Cli {
    /// Config file (defaults to `org_map.toml` in the working directory, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Overrides for a geocoding run.
#[derive(Args)]
struct GeocodeArgs {
    /// CSV extract to geocode
    #[arg(long)]
    input: PathBuf,
    /// Rows to skip when no checkpoint exists
    #[arg(long)]
    skip_rows: Option<u64>,
    /// Checkpoint file
    #[arg(long)]
    checkpoint: Option<PathBuf>,
    /// Address cache file
    #[arg(long)]
    cache: Option<PathBuf>,
    /// Batch summary written on completion
    #[arg(long)]
    batch: Option<PathBuf>,
    /// Save progress every N rows
    #[arg(long)]
    save_every: Option<u64>,
    /// Minimum milliseconds between geocoder requests
    #[arg(long)]
    rate_limit_ms: Option<u64>,
    /// Attempts per query variant
    #[arg(long)]
    max_retries: Option<u32>,
}

impl GeocodeArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(skip_rows) = self.skip_rows {
            config.skip_rows = skip_rows;
        }
        if let Some(path) = &self.checkpoint {
            config.checkpoint_path.clone_from(path);
        }
        if let Some(path) = &self.cache {
            config.cache_path.clone_from(path);
        }
        if let Some(path) = &self.batch {
            config.batch_path.clone_from(path);
        }
        if let Some(save_every) = self.save_every {
            config.save_every = save_every;
        }
        if let Some(rate_limit_ms) = self.rate_limit_ms {
            config.rate_limit_ms = rate_limit_ms;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode a CSV extract, resuming from the checkpoint
    Geocode(GeocodeArgs),
    /// Merge the batch summary into the canonical dataset
    Merge {
        /// Batch summary to merge
        #[arg(long)]
        batch: Option<PathBuf>,
        /// Canonical dataset to merge into
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Geocode, then merge if the run completes
    Run {
        #[command(flatten)]
        geocode: GeocodeArgs,
        /// Canonical dataset to merge into
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Show checkpoint and batch progress
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = org_map_cli_utils::init_logger();
    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(&mut config, &multi).await;
    };

    match command {
        Commands::Geocode(args) => {
            args.apply(&mut config);
            commands::geocode(&config, &args.input, &multi).await?;
        }
        Commands::Merge {
            batch,
            dataset,
            dry_run,
        } => {
            if let Some(batch) = batch {
                config.batch_path = batch;
            }
            if let Some(dataset) = dataset {
                config.dataset_path = dataset;
            }
            commands::merge(&config, dry_run)?;
        }
        Commands::Run { geocode, dataset } => {
            geocode.apply(&mut config);
            if let Some(dataset) = dataset {
                config.dataset_path = dataset;
            }
            commands::run(&config, &geocode.input, &multi).await?;
        }
        Commands::Status => commands::status(&config),
    }

    Ok(())
}
