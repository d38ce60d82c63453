//! CLI runner for common setup.
//!
//! Loads the config file and initializes logging so command handlers start
//! from the same state.

use std::path::Path;

use tilescan::config::{config_file_path, ConfigFile};
use tilescan::logging::{default_log_file, init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file to read instead of `~/.tilescan/config.ini`
    /// * `verbose` - Log at debug level unless RUST_LOG says otherwise
    /// * `stdout` - Echo log lines to stdout; off for commands whose output is data
    pub fn new(config_path: Option<&Path>, verbose: bool, stdout: bool) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let level = if verbose { "debug" } else { "info" };
        let logging_guard = init_logging(&config.paths.log_dir, default_log_file(), stdout, level)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Mutable access for command-line overrides.
    pub fn config_mut(&mut self) -> &mut ConfigFile {
        &mut self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str, config_path: Option<&Path>) {
        info!("tilescan v{}", tilescan::VERSION);
        info!(
            config = %config_path.map(Path::to_path_buf).unwrap_or_else(config_file_path).display(),
            log = %self.logging_guard.log_path().display(),
            "tilescan CLI: {} command",
            command
        );
    }
}
