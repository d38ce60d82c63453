//! Tilescan - orthomosaic tile coverage and road damage grading
//!
//! This library finds the TMS map tiles that cover survey areas drawn in a
//! projected coordinate system, downloads them from object storage, and
//! grades detected defects by their physical size.
//!
//! # High-Level API
//!
//! The [`survey`] module runs the whole flow for one project:
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilescan::config::ConfigFile;
//! use tilescan::detection::YoloCommandDetector;
//! use tilescan::storage::HttpObjectStore;
//! use tilescan::survey::{Survey, SurveyOptions};
//!
//! let config = ConfigFile::load()?;
//! let store = HttpObjectStore::for_bucket("survey-bucket", "ap-northeast-2", 30)?;
//! let detector = YoloCommandDetector::new("python", "yolov9/detect.py", "weights/pothole.pt", 256, 0.5);
//! let survey = Survey::new(Arc::new(store), Arc::new(detector), SurveyOptions::from_config(&config));
//! let report = survey.run("16")?;
//! ```
//!
//! The building blocks are usable on their own: [`crs`] projects points,
//! [`coord`] maps them to tiles, [`coverage`] finds the tiles under a polygon
//! and [`resolution`] with [`severity`] turn box sizes into grades.

pub mod config;
pub mod coord;
pub mod coverage;
pub mod crs;
pub mod detection;
pub mod logging;
pub mod request;
pub mod resolution;
pub mod severity;
pub mod storage;
pub mod survey;

/// Version of the tilescan library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
