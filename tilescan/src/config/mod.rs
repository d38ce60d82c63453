//! User configuration.
//!
//! Settings are read from an INI file, `~/.tilescan/config.ini` by default.
//! Every key is optional and falls back to the values in [`defaults`].
//!
//! ```ini
//! [storage]
//! bucket = survey-bucket
//! region = ap-northeast-2
//!
//! [detection]
//! weights = weights/pothole.pt
//! confidence = 0.5
//! ```

pub mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, DetectionSettings, ImagerySettings, PathSettings, StorageSettings};
