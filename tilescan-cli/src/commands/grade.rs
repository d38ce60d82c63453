//! Grade command - grade existing detector labels.
//!
//! Prints the result document that a survey would upload for the labels.

use std::path::PathBuf;

use tilescan::detection::{Detector, LabelDirectoryDetector};
use tilescan::request::ResponseEntry;
use tilescan::resolution::PixelScale;
use tilescan::survey::build_response;

use crate::error::CliError;

/// Arguments for the grade command.
pub struct GradeArgs {
    pub labels: PathBuf,
    pub lat: f64,
    pub zoom: u8,
    pub tile_size: u32,
    pub confidence: f64,
    pub pretty: bool,
}

/// Grade the labels in `args.labels`.
pub fn grade(args: &GradeArgs) -> Result<Vec<ResponseEntry>, CliError> {
    if !args.labels.is_dir() {
        return Err(CliError::Config(format!(
            "labels directory '{}' does not exist",
            args.labels.display()
        )));
    }

    let detector = LabelDirectoryDetector::new(args.tile_size, args.confidence)
        .with_labels_dir(&args.labels);
    let tiles = detector.detect(&args.labels)?;
    let scale = PixelScale::at(args.lat, args.zoom, detector.input_size_px())?;
    Ok(build_response(&tiles, &scale))
}

/// Run the grade command.
pub fn run(args: GradeArgs) -> Result<(), CliError> {
    let entries = grade(&args)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&entries)?
    } else {
        serde_json::to_string(&entries)?
    };
    println!("{}", json);
    Ok(())
}
