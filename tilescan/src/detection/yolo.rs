//! Detection through an external YOLOv9 `detect.py` run.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::{read_label_directory, DetectionError, Detector, TileDetections};

/// Run name passed to the detector; output lands in `{tile_dir}/predict`.
pub const PREDICT_DIR_NAME: &str = "predict";

/// Runs the YOLO detection script as a child process and reads its labels.
#[derive(Debug, Clone)]
pub struct YoloCommandDetector {
    program: String,
    script: PathBuf,
    weights: PathBuf,
    image_size: u32,
    confidence: f64,
}

impl YoloCommandDetector {
    pub fn new(
        program: impl Into<String>,
        script: impl Into<PathBuf>,
        weights: impl Into<PathBuf>,
        image_size: u32,
        confidence: f64,
    ) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            weights: weights.into(),
            image_size,
            confidence,
        }
    }

    /// The command that runs detection over `tile_dir`.
    ///
    /// The source glob is passed through unexpanded; the script resolves it.
    pub fn command(&self, tile_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.script)
            .arg("--weights")
            .arg(&self.weights)
            .arg("--img")
            .arg(self.image_size.to_string())
            .arg("--source")
            .arg(tile_dir.join("*.png"))
            .arg("--name")
            .arg(PREDICT_DIR_NAME)
            .arg("--project")
            .arg(tile_dir)
            .arg("--conf-thres")
            .arg(self.confidence.to_string())
            .args(["--exist-ok", "--save-txt", "--save-conf"]);
        cmd
    }

    /// Removes output left by an earlier run.
    fn clear_previous_run(&self, tile_dir: &Path) -> Result<(), DetectionError> {
        let predict_dir = tile_dir.join(PREDICT_DIR_NAME);
        if predict_dir.exists() {
            debug!(dir = %predict_dir.display(), "Clearing previous detector output");
            fs::remove_dir_all(&predict_dir).map_err(|source| DetectionError::Io {
                path: predict_dir,
                source,
            })?;
        }
        Ok(())
    }
}

impl Detector for YoloCommandDetector {
    fn detect(&self, tile_dir: &Path) -> Result<Vec<TileDetections>, DetectionError> {
        self.clear_previous_run(tile_dir)?;

        info!(
            program = %self.program,
            script = %self.script.display(),
            weights = %self.weights.display(),
            dir = %tile_dir.display(),
            "Running detector"
        );

        let output = self
            .command(tile_dir)
            .output()
            .map_err(|source| DetectionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(last) => format!("{} ({})", output.status, last.trim()),
                None => output.status.to_string(),
            };
            return Err(DetectionError::ProcessFailed {
                program: self.program.clone(),
                status,
            });
        }

        let labels_dir = tile_dir.join(PREDICT_DIR_NAME).join("labels");
        read_label_directory(&labels_dir, self.confidence)
    }

    fn input_size_px(&self) -> u32 {
        self.image_size
    }
}
