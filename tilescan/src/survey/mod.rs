//! End-to-end survey of one project.
//!
//! A run reads the project's request document, downloads every tile the
//! requested areas touch, runs the detector over them and uploads the graded
//! result:
//!
//! ```text
//! request.json ─► plan ─► download ─► detect ─► grade ─► result.json
//! ```
//!
//! Tiles land in `{work_dir}/{project}` and are removed afterwards unless
//! `keep_tiles` is set. Tiles that fail to download are left out of the
//! result rather than failing the run.

mod error;
mod response;

pub use error::SurveyError;
pub use response::{build_response, grade_tile};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::coverage::{CoveragePlan, SkippedArea, TileJob, TmsPathEncoder};
use crate::detection::Detector;
use crate::request::{
    expand_template, request_key, response_to_json, result_key, ResponseEntry, SurveyRequest,
    JSON_CONTENT_TYPE,
};
use crate::resolution::{ground_sample_distance_cm_for_tile_size, PixelScale};
use crate::storage::{
    download_tiles, DownloadCallback, DownloadReport, FailedDownload, ObjectStore,
};

/// Settings for a survey run.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyOptions {
    /// Parent of the per-project tile directories
    pub work_dir: PathBuf,
    /// Tile pyramid prefix, with `{project}` placeholder
    pub root_template: String,
    /// Extension of tile objects in storage
    pub extension: String,
    /// Pixel size of the imagery tiles
    pub tile_size: u32,
    /// Parallel downloads, 0 for one per CPU
    pub concurrency: usize,
    pub keep_tiles: bool,
}

impl SurveyOptions {
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            work_dir: config.paths.work_dir.clone(),
            root_template: config.imagery.root_template.clone(),
            extension: config.imagery.extension.clone(),
            tile_size: config.imagery.tile_size,
            concurrency: config.storage.concurrency,
            keep_tiles: config.paths.keep_tiles,
        }
    }

    /// Directory the project's tiles are downloaded into.
    pub fn tile_dir(&self, project: &str) -> PathBuf {
        self.work_dir.join(project)
    }
}

impl Default for SurveyOptions {
    fn default() -> Self {
        Self::from_config(&ConfigFile::default())
    }
}

/// Progress notifications from a running survey.
pub trait SurveyObserver: Send + Sync {
    /// The plan is known and downloads are about to start.
    fn plan_ready(&self, _plan: &CoveragePlan) {}

    /// One tile download finished, successfully or not.
    fn tile_finished(&self, _job: &TileJob) {}

    /// Downloads are done and the detector is starting.
    fn detection_started(&self, _tiles: usize) {}
}

/// Outcome of a survey run.
#[derive(Debug)]
pub struct SurveyReport {
    pub project: String,
    /// Ground sample distance used for grading, in cm/px
    pub gsd_cm: f64,
    pub tiles_planned: usize,
    pub tiles_downloaded: usize,
    pub bytes_downloaded: u64,
    pub failed: Vec<FailedDownload>,
    pub skipped_areas: Vec<SkippedArea>,
    /// Entries written to the result document
    pub entries: Vec<ResponseEntry>,
    /// Storage key of the result document
    pub result_key: String,
}

impl SurveyReport {
    /// True if every planned tile was downloaded and every area covered.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped_areas.is_empty()
    }
}

/// Runs surveys against one store and detector.
pub struct Survey {
    store: Arc<dyn ObjectStore>,
    detector: Arc<dyn Detector>,
    options: SurveyOptions,
    observer: Option<Arc<dyn SurveyObserver>>,
}

impl Survey {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        detector: Arc<dyn Detector>,
        options: SurveyOptions,
    ) -> Self {
        Self {
            store,
            detector,
            options,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SurveyObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(&self) -> &SurveyOptions {
        &self.options
    }

    /// Downloads and parses the project's request document.
    pub fn fetch_request(&self, project: &str) -> Result<SurveyRequest, SurveyError> {
        check_project(project)?;
        let key = request_key(project);
        let bytes = self.store.get(&key)?;
        let request = SurveyRequest::from_json(&bytes)?;
        debug!(
            key = %key,
            level = request.level,
            epsg = request.epsg,
            areas = request.area.len(),
            "Request loaded"
        );
        Ok(request)
    }

    /// Pixel scale for grading the request's detections.
    ///
    /// Fails if the detector's input size differs from the imagery tile size.
    pub fn scale_for(&self, request: &SurveyRequest) -> Result<PixelScale, SurveyError> {
        let gsd = ground_sample_distance_cm_for_tile_size(
            request.reference_latitude(),
            request.level,
            self.options.tile_size,
        )?;
        Ok(PixelScale::for_detector(
            gsd,
            self.options.tile_size,
            self.detector.input_size_px(),
        )?)
    }

    /// Tiles to download for the request.
    pub fn plan(&self, project: &str, request: &SurveyRequest) -> Result<CoveragePlan, SurveyError> {
        check_project(project)?;
        let root = expand_template(&self.options.root_template, project);
        let encoder = TmsPathEncoder::new(root, request.epsg, request.level)?
            .with_extension(self.options.extension.as_str());
        Ok(encoder.plan(&request.area)?)
    }

    /// Runs the full survey for `project` and uploads its result.
    pub fn run(&self, project: &str) -> Result<SurveyReport, SurveyError> {
        info!(project, "Starting survey");

        let request = self.fetch_request(project)?;
        let scale = self.scale_for(&request)?;
        info!(
            project,
            gsd_cm = scale.gsd_cm(),
            latitude = request.reference_latitude(),
            level = request.level,
            "Ground resolution"
        );

        let plan = self.plan(project, &request)?;
        if let Some(observer) = &self.observer {
            observer.plan_ready(&plan);
        }

        let tile_dir = self.options.tile_dir(project);
        let result = self.download_and_detect(&plan, &tile_dir, &scale);
        if !self.options.keep_tiles {
            remove_tile_dir(&tile_dir);
        }
        let (download, entries) = result?;

        let key = result_key(project);
        self.store
            .put(&key, &response_to_json(&entries)?, JSON_CONTENT_TYPE)?;

        let report = SurveyReport {
            project: project.to_string(),
            gsd_cm: scale.gsd_cm(),
            tiles_planned: plan.tile_count(),
            tiles_downloaded: download.downloaded.len(),
            bytes_downloaded: download.bytes,
            failed: download.failed,
            skipped_areas: plan.skipped,
            entries,
            result_key: key,
        };

        info!(
            project,
            planned = report.tiles_planned,
            downloaded = report.tiles_downloaded,
            failed = report.failed.len(),
            entries = report.entries.len(),
            key = %report.result_key,
            "Survey finished"
        );
        Ok(report)
    }

    fn download_and_detect(
        &self,
        plan: &CoveragePlan,
        tile_dir: &Path,
        scale: &PixelScale,
    ) -> Result<(DownloadReport, Vec<ResponseEntry>), SurveyError> {
        // Stale tiles from an earlier run would be detected again
        if tile_dir.exists() {
            fs::remove_dir_all(tile_dir).map_err(|source| SurveyError::Io {
                path: tile_dir.to_path_buf(),
                source,
            })?;
        }

        let callback = self.observer.as_ref().map(|observer| {
            let observer = Arc::clone(observer);
            move |job: &TileJob| observer.tile_finished(job)
        });
        let download = download_tiles(
            self.store.as_ref(),
            &plan.jobs,
            tile_dir,
            self.options.concurrency,
            callback.as_ref().map(|cb| cb as &DownloadCallback<'_>),
        )?;

        if download.downloaded.is_empty() {
            warn!(dir = %tile_dir.display(), "No tiles downloaded, skipping detection");
            return Ok((download, Vec::new()));
        }

        if let Some(observer) = &self.observer {
            observer.detection_started(download.downloaded.len());
        }
        let detections = self.detector.detect(tile_dir)?;
        let entries = build_response(&detections, scale);
        debug!(
            tiles = detections.len(),
            entries = entries.len(),
            "Detections graded"
        );
        Ok((download, entries))
    }
}

fn check_project(project: &str) -> Result<(), SurveyError> {
    let valid = !project.is_empty()
        && project != "."
        && project != ".."
        && !project.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(SurveyError::InvalidProject(project.to_string()))
    }
}

fn remove_tile_dir(tile_dir: &Path) {
    if !tile_dir.exists() {
        return;
    }
    match fs::remove_dir_all(tile_dir) {
        Ok(()) => debug!(dir = %tile_dir.display(), "Removed tile directory"),
        Err(e) => warn!(dir = %tile_dir.display(), error = %e, "Failed to remove tile directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use crate::detection::{LabelDirectoryDetector, DEFAULT_CONFIDENCE};
    use crate::resolution::MeasurementError;
    use crate::severity::SeverityGrade;
    use crate::storage::tests::MemoryStore;

    const REQUEST: &str = r#"{
        "latitude": [37.5660, 37.5672],
        "level": 19,
        "epsg": 5186,
        "area": [[[126.9770, 37.5660], [126.9790, 37.5660],
                  [126.9790, 37.5672], [126.9770, 37.5672]]]
    }"#;

    struct Fixture {
        work: TempDir,
        labels: TempDir,
        store: Arc<MemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                work: TempDir::new().unwrap(),
                labels: TempDir::new().unwrap(),
                store: Arc::new(MemoryStore::with(&[(
                    "public/16/auto-detection/pothole/request.json",
                    REQUEST,
                )])),
            }
        }

        fn options(&self) -> SurveyOptions {
            SurveyOptions {
                work_dir: self.work.path().to_path_buf(),
                ..SurveyOptions::default()
            }
        }

        fn survey(&self, options: SurveyOptions) -> Survey {
            let detector = LabelDirectoryDetector::new(256, DEFAULT_CONFIDENCE)
                .with_labels_dir(self.labels.path());
            Survey::new(self.store.clone(), Arc::new(detector), options)
        }

        /// Stores every planned tile and returns the plan.
        fn upload_tiles(&self, survey: &Survey) -> CoveragePlan {
            let request = survey.fetch_request("16").unwrap();
            let plan = survey.plan("16", &request).unwrap();
            for job in &plan.jobs {
                self.store.put(&job.key, b"tile", "image/png").unwrap();
            }
            plan
        }

        fn write_label(&self, job: &TileJob, content: &str) {
            let stem = job.file_name.trim_end_matches(".png");
            fs::write(self.labels.path().join(format!("{}.txt", stem)), content).unwrap();
        }

        fn result(&self) -> (serde_json::Value, String) {
            let objects = self.store.objects.lock().unwrap();
            let (body, content_type) = &objects["public/16/auto-detection/pothole/result.json"];
            (serde_json::from_slice(body).unwrap(), content_type.clone())
        }
    }

    #[test]
    fn test_plan_uses_project_root() {
        let fixture = Fixture::new();
        let survey = fixture.survey(fixture.options());
        let request = survey.fetch_request("16").unwrap();
        let plan = survey.plan("16", &request).unwrap();

        assert!(!plan.is_empty());
        for job in &plan.jobs {
            assert!(job.key.starts_with("public/16/manifold/orthomosaic_tiles/19/"));
            assert_eq!(
                job.key,
                format!(
                    "public/16/manifold/orthomosaic_tiles/19/{}/{}",
                    job.tile.x, job.tile.y
                )
            );
        }
    }

    #[test]
    fn test_full_run_uploads_graded_result() {
        let fixture = Fixture::new();
        let survey = fixture.survey(fixture.options());
        let plan = fixture.upload_tiles(&survey);
        let first = &plan.jobs[0];
        // ~23.7 cm/px: 0.002 of a tile is ~17 cm across, 0.05 is ~430 cm
        fixture.write_label(first, "0 0.5 0.5 0.002 0.002 0.9\n0 0.2 0.2 0.05 0.05 0.8\n");

        let report = survey.run("16").unwrap();

        assert!(report.is_complete());
        assert_eq!(report.tiles_planned, plan.tile_count());
        assert_eq!(report.tiles_downloaded, plan.tile_count());
        assert_eq!(report.bytes_downloaded, 4 * plan.tile_count() as u64);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].point, first.center);
        assert_eq!(report.entries[0].grade, SeverityGrade::Critical);

        let (json, content_type) = fixture.result();
        assert_eq!(content_type, "application/json");
        assert_eq!(json[0]["grade"], 4);
        assert_eq!(json[0]["percentage"]["grade1"], "50%");
        assert_eq!(json[0]["percentage"]["grade4"], "50%");

        // Tiles are cleaned up by default
        assert!(!fixture.work.path().join("16").exists());
    }

    #[test]
    fn test_missing_tiles_give_partial_result() {
        let fixture = Fixture::new();
        let survey = fixture.survey(SurveyOptions {
            keep_tiles: true,
            ..fixture.options()
        });
        let plan = fixture.upload_tiles(&survey);
        assert!(plan.tile_count() > 1);
        let missing = plan.jobs[0].key.clone();
        fixture.store.objects.lock().unwrap().remove(&missing);

        let report = survey.run("16").unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, missing);
        assert_eq!(report.tiles_downloaded, plan.tile_count() - 1);

        let tile_dir = fixture.work.path().join("16");
        assert!(!tile_dir.join(&plan.jobs[0].file_name).exists());
        assert!(tile_dir.join(&plan.jobs[1].file_name).exists());
        assert_eq!(fixture.result().0, serde_json::json!([]));
    }

    #[test]
    fn test_no_tiles_uploads_empty_result() {
        let fixture = Fixture::new();
        let survey = fixture.survey(fixture.options());
        let report = survey.run("16").unwrap();

        assert_eq!(report.tiles_downloaded, 0);
        assert!(report.entries.is_empty());
        assert_eq!(fixture.result().0, serde_json::json!([]));
    }

    #[test]
    fn test_missing_request() {
        let fixture = Fixture::new();
        let survey = fixture.survey(fixture.options());
        assert!(matches!(
            survey.run("17"),
            Err(SurveyError::Storage(crate::storage::StorageError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_detector_size_mismatch() {
        let fixture = Fixture::new();
        let survey = fixture.survey(SurveyOptions {
            tile_size: 512,
            ..fixture.options()
        });
        assert!(matches!(
            survey.run("16"),
            Err(SurveyError::Measurement(
                MeasurementError::MeasurementConfigMismatch {
                    imagery: 512,
                    detector: 256
                }
            ))
        ));
    }

    #[test]
    fn test_rejects_path_like_project() {
        let fixture = Fixture::new();
        let survey = fixture.survey(fixture.options());
        for project in ["", "..", "16/../17", "a\\b"] {
            assert!(matches!(
                survey.run(project),
                Err(SurveyError::InvalidProject(_))
            ));
        }
    }

    #[test]
    fn test_malformed_labels_fail_and_clean_up() {
        let fixture = Fixture::new();
        let survey = fixture.survey(fixture.options());
        let plan = fixture.upload_tiles(&survey);
        fixture.write_label(&plan.jobs[0], "not a label\n");

        assert!(matches!(
            survey.run("16"),
            Err(SurveyError::Detection(_))
        ));
        assert!(!fixture.work.path().join("16").exists());
        assert!(!fixture
            .store
            .objects
            .lock()
            .unwrap()
            .contains_key("public/16/auto-detection/pothole/result.json"));
    }

    #[derive(Default)]
    struct Counter {
        planned: AtomicUsize,
        finished: AtomicUsize,
        detecting: AtomicUsize,
    }

    impl SurveyObserver for Counter {
        fn plan_ready(&self, plan: &CoveragePlan) {
            self.planned.store(plan.tile_count(), Ordering::SeqCst);
        }

        fn tile_finished(&self, _job: &TileJob) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }

        fn detection_started(&self, tiles: usize) {
            self.detecting.store(tiles, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_observer_sees_every_tile() {
        let fixture = Fixture::new();
        let counter = Arc::new(Counter::default());
        let survey = fixture
            .survey(fixture.options())
            .with_observer(counter.clone());
        let plan = fixture.upload_tiles(&survey);

        survey.run("16").unwrap();

        assert_eq!(counter.planned.load(Ordering::SeqCst), plan.tile_count());
        assert_eq!(counter.finished.load(Ordering::SeqCst), plan.tile_count());
        assert_eq!(counter.detecting.load(Ordering::SeqCst), plan.tile_count());
    }

    #[test]
    fn test_scale_uses_reference_latitude() {
        let fixture = Fixture::new();
        let survey = fixture.survey(fixture.options());
        let request = survey.fetch_request("16").unwrap();
        let scale = survey.scale_for(&request).unwrap();

        let expected = crate::resolution::ground_sample_distance_cm(37.5666, 19).unwrap();
        assert!((scale.gsd_cm() - expected).abs() < 1e-9);
        assert_eq!(scale.tile_size_px(), 256);
    }
}
