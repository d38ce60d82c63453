//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilescan::config::ConfigFileError;
use tilescan::coverage::CoverageError;
use tilescan::detection::DetectionError;
use tilescan::request::RequestError;
use tilescan::resolution::MeasurementError;
use tilescan::storage::StorageError;
use tilescan::survey::SurveyError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// Could not reach object storage
    Storage(StorageError),
    /// Survey run failed
    Survey(SurveyError),
    /// Request document rejected
    Request(RequestError),
    /// Coverage could not be computed
    Coverage(CoverageError),
    /// Detections could not be read
    Detection(DetectionError),
    /// Ground resolution or box size out of range
    Measurement(MeasurementError),
    /// Failed to read an input file
    FileRead { path: PathBuf, error: std::io::Error },
    /// Failed to write output
    Output(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Set [storage] bucket or endpoint in the config file,");
                eprintln!("or pass --bucket / --endpoint. Run 'tilescan init' to create one.");
            }
            CliError::Survey(SurveyError::Detection(DetectionError::Spawn { .. })) => {
                eprintln!();
                eprintln!("Check [detection] program and script in the config file.");
                eprintln!("Use --labels <DIR> to grade existing detector output instead.");
            }
            CliError::Storage(StorageError::HttpStatus {
                status: 401 | 403,
                ..
            })
            | CliError::Survey(SurveyError::Storage(StorageError::HttpStatus {
                status: 401 | 403,
                ..
            })) => {
                eprintln!();
                eprintln!("The bucket refused the request. Set [storage] access_key and secret_key");
                eprintln!("in the config file, or pass --access-key / --secret-key.");
            }
            CliError::Survey(SurveyError::Measurement(
                MeasurementError::MeasurementConfigMismatch { .. },
            )) => {
                eprintln!();
                eprintln!("[imagery] tile_size and [detection] image_size must be equal.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Storage(e) => write!(f, "Storage error: {}", e),
            CliError::Survey(e) => write!(f, "Survey failed: {}", e),
            CliError::Request(e) => write!(f, "Invalid request: {}", e),
            CliError::Coverage(e) => write!(f, "Coverage failed: {}", e),
            CliError::Detection(e) => write!(f, "Failed to read detections: {}", e),
            CliError::Measurement(e) => write!(f, "Measurement error: {}", e),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path.display(), error)
            }
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Storage(e) => Some(e),
            CliError::Survey(e) => Some(e),
            CliError::Request(e) => Some(e),
            CliError::Coverage(e) => Some(e),
            CliError::Detection(e) => Some(e),
            CliError::Measurement(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        CliError::Storage(e)
    }
}

impl From<SurveyError> for CliError {
    fn from(e: SurveyError) -> Self {
        CliError::Survey(e)
    }
}

impl From<RequestError> for CliError {
    fn from(e: RequestError) -> Self {
        CliError::Request(e)
    }
}

impl From<CoverageError> for CliError {
    fn from(e: CoverageError) -> Self {
        CliError::Coverage(e)
    }
}

impl From<DetectionError> for CliError {
    fn from(e: DetectionError) -> Self {
        CliError::Detection(e)
    }
}

impl From<MeasurementError> for CliError {
    fn from(e: MeasurementError) -> Self {
        CliError::Measurement(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}
