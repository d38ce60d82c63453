//! Run command - survey a project end to end.

use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tilescan::config::ConfigFile;
use tilescan::coverage::{CoveragePlan, TileJob};
use tilescan::detection::{Detector, LabelDirectoryDetector, YoloCommandDetector};
use tilescan::storage::{Credentials, DirectoryStore, ObjectStore};
use tilescan::survey::{Survey, SurveyObserver, SurveyOptions, SurveyReport};
use tracing::info;

use super::common::{http_store, resolve_endpoint};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
pub struct RunArgs {
    pub project: String,
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub labels: Option<PathBuf>,
    pub keep_tiles: bool,
}

/// Download progress shown while a survey runs.
struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }
}

impl SurveyObserver for DownloadProgress {
    fn plan_ready(&self, plan: &CoveragePlan) {
        self.bar.set_length(plan.tile_count() as u64);
        self.bar.set_message("tiles");
    }

    fn tile_finished(&self, _job: &TileJob) {
        self.bar.inc(1);
    }

    fn detection_started(&self, tiles: usize) {
        self.bar
            .finish_with_message(format!("tiles, running detector on {}", tiles));
    }
}

fn detector_for(config: &ConfigFile, labels: Option<PathBuf>) -> Arc<dyn Detector> {
    let detection = &config.detection;
    match labels {
        Some(dir) => {
            info!(dir = %dir.display(), "Grading existing labels");
            Arc::new(
                LabelDirectoryDetector::new(detection.image_size, detection.confidence)
                    .with_labels_dir(dir),
            )
        }
        None => Arc::new(YoloCommandDetector::new(
            detection.program.clone(),
            detection.script.clone(),
            detection.weights.clone(),
            detection.image_size,
            detection.confidence,
        )),
    }
}

fn print_summary(report: &SurveyReport) {
    println!();
    println!("Project {}", report.project);
    println!("  Ground resolution: {:.4} cm/px", report.gsd_cm);
    println!(
        "  Tiles: {} planned, {} downloaded ({} bytes)",
        report.tiles_planned, report.tiles_downloaded, report.bytes_downloaded
    );
    println!("  Graded tiles: {}", report.entries.len());
    println!("  Result: {}", report.result_key);

    if !report.failed.is_empty() {
        println!();
        println!("{} tiles could not be downloaded:", report.failed.len());
        for failed in report.failed.iter().take(10) {
            println!("  {}: {}", failed.key, failed.error);
        }
        if report.failed.len() > 10 {
            println!("  ... and {} more", report.failed.len() - 10);
        }
    }
    for skipped in &report.skipped_areas {
        println!("Skipped area {}: {}", skipped.index, skipped.error);
    }
}

/// Run the survey command.
pub fn run(mut runner: CliRunner, args: RunArgs) -> Result<(), CliError> {
    {
        let config = runner.config_mut();
        if let Some(region) = args.region {
            config.storage.region = region;
        }
        if let (Some(access_key), Some(secret_key)) = (args.access_key, args.secret_key) {
            config.storage.credentials = Some(Credentials::new(access_key, secret_key));
        }
        if let Some(work_dir) = args.work_dir {
            config.paths.work_dir = work_dir;
        }
        if args.keep_tiles {
            config.paths.keep_tiles = true;
        }
    }
    let config = runner.config();

    let store: Arc<dyn ObjectStore> = match args.store_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Using directory object store");
            Arc::new(DirectoryStore::new(dir))
        }
        None => http_store(resolve_endpoint(args.endpoint, args.bucket, config)?, config)?,
    };
    let detector = detector_for(config, args.labels);

    let progress = Arc::new(DownloadProgress::new());
    let survey = Survey::new(store, detector, SurveyOptions::from_config(config))
        .with_observer(progress.clone());

    println!("Surveying project {}...", args.project);
    let result = survey.run(&args.project);
    if !progress.bar.is_finished() {
        progress.bar.abandon();
    }

    let report = result?;
    print_summary(&report);
    Ok(())
}
