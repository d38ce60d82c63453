//! Survey error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::coverage::CoverageError;
use crate::detection::DetectionError;
use crate::request::RequestError;
use crate::resolution::MeasurementError;
use crate::storage::StorageError;

/// Errors that stop a survey run.
///
/// A single missing tile is not one of them; those are reported in
/// [`SurveyReport::failed`](super::SurveyReport::failed).
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Project ids become path and key segments.
    #[error("invalid project id '{0}'")]
    InvalidProject(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("request error: {0}")]
    Request(#[from] RequestError),

    #[error("coverage error: {0}")]
    Coverage(#[from] CoverageError),

    #[error("measurement error: {0}")]
    Measurement(#[from] MeasurementError),

    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}
