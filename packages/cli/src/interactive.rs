//! Menu-driven front end for running the pipeline without flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use org_map_cli_utils::MultiProgress;
use org_map_ingest::config::PipelineConfig;

use crate::commands;

/// Top-level actions offered by the menu.
enum Action {
    Run,
    Geocode,
    Merge,
    Status,
}

impl Action {
    const ALL: &[Self] = &[Self::Run, Self::Geocode, Self::Merge, Self::Status];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Run => "Geocode and merge",
            Self::Geocode => "Geocode a CSV extract",
            Self::Merge => "Merge the batch into the dataset",
            Self::Status => "Show progress",
        }
    }
}

fn prompt_path(prompt: &str, default: Option<&PathBuf>) -> Result<PathBuf, dialoguer::Error> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.display().to_string());
    }
    Ok(PathBuf::from(input.interact_text()?))
}

fn prompt_skip_rows(config: &mut PipelineConfig) -> Result<(), dialoguer::Error> {
    config.skip_rows = Input::<u64>::new()
        .with_prompt("Rows to skip if no checkpoint exists")
        .default(config.skip_rows)
        .interact_text()?;
    Ok(())
}

/// Prompts for an action and its inputs, then runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected action fails.
pub async fn run(
    config: &mut PipelineConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Organization Map Pipeline");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Run => {
            let input = prompt_path("CSV extract", None)?;
            prompt_skip_rows(config)?;
            config.dataset_path = prompt_path("Canonical dataset", Some(&config.dataset_path))?;
            commands::run(config, &input, multi).await?;
        }
        Action::Geocode => {
            let input = prompt_path("CSV extract", None)?;
            prompt_skip_rows(config)?;
            commands::geocode(config, &input, multi).await?;
        }
        Action::Merge => {
            config.batch_path = prompt_path("Batch summary", Some(&config.batch_path))?;
            config.dataset_path = prompt_path("Canonical dataset", Some(&config.dataset_path))?;
            let dry_run = Confirm::new()
                .with_prompt("Preview only (no files written)?")
                .default(false)
                .interact()?;
            commands::merge(config, dry_run)?;
        }
        Action::Status => commands::status(config),
    }

    Ok(())
}
