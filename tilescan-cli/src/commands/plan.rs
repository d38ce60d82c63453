//! Plan command - list the tiles a request would download.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tilescan::config::ConfigFile;
use tilescan::coverage::{CoveragePlan, TmsPathEncoder};
use tilescan::request::{expand_template, SurveyRequest};

use crate::error::CliError;

/// Arguments for the plan command.
pub struct PlanArgs {
    pub request: PathBuf,
    pub project: String,
    pub json: bool,
}

/// Build the coverage plan for a request document on disk.
pub fn plan(request_path: &Path, project: &str, config: &ConfigFile) -> Result<CoveragePlan, CliError> {
    let bytes = fs::read(request_path).map_err(|error| CliError::FileRead {
        path: request_path.to_path_buf(),
        error,
    })?;
    let request = SurveyRequest::from_json(&bytes)?;

    let root = expand_template(&config.imagery.root_template, project);
    let encoder = TmsPathEncoder::new(root, request.epsg, request.level)?
        .with_extension(config.imagery.extension.as_str());
    Ok(encoder.plan(&request.area)?)
}

/// Run the plan command.
pub fn run(args: PlanArgs, config: &ConfigFile) -> Result<(), CliError> {
    let plan = plan(&args.request, &args.project, config)?;

    for skipped in &plan.skipped {
        eprintln!("Skipped area {}: {}", skipped.index, skipped.error);
    }

    if args.json {
        let jobs: Vec<_> = plan
            .jobs
            .iter()
            .map(|job| {
                json!({
                    "tile": [job.tile.zoom, job.tile.x, job.tile.y],
                    "key": job.key,
                    "file": job.file_name,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&jobs)?);
    } else {
        for job in &plan.jobs {
            println!("{}\t{}", job.key, job.file_name);
        }
        eprintln!("{} tiles at zoom {}", plan.tile_count(), plan.zoom);
    }
    Ok(())
}
