//! Object storage access and parallel tile download.
//!
//! Storage is reached through the [`ObjectStore`] trait so the survey
//! pipeline can run against an HTTP bucket in production and a plain
//! directory in tests.
//!
//! # Download behaviour
//!
//! [`download_tiles`] fetches every job on a rayon pool. A failed tile is
//! logged and recorded in the [`DownloadReport`]; the rest of the batch
//! carries on, and callers decide whether a partial set is acceptable.

mod directory;
mod http;
mod signing;

pub use directory::DirectoryStore;
pub use http::{bucket_endpoint, HttpObjectStore, DEFAULT_REGION, DEFAULT_TIMEOUT_SECS};
pub use signing::{encode_key, sign_request, Credentials, RequestSignature};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coverage::TileJob;

/// Errors from object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key does not exist.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The HTTP client could not be created.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(String),

    /// The endpoint is not an absolute URL with a host.
    #[error("invalid storage endpoint {0}")]
    InvalidEndpoint(String),

    /// A key that cannot be mapped to a storage location.
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// The download worker pool could not be started.
    #[error("failed to start download pool: {0}")]
    ThreadPool(String),
}

/// Key/value object storage.
pub trait ObjectStore: Send + Sync {
    /// Fetches the object stored under `key`.
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Stores `body` under `key`.
    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Fetches `key` into the file `dest`, returning the byte count.
    fn download_to(&self, key: &str, dest: &Path) -> Result<u64, StorageError> {
        let bytes = self.get(key)?;
        fs::write(dest, &bytes).map_err(|source| StorageError::WriteFailed {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(bytes.len() as u64)
    }
}

/// Called after each tile attempt, successful or not.
pub type DownloadCallback<'a> = dyn Fn(&TileJob) + Send + Sync + 'a;

/// A tile that could not be fetched.
#[derive(Debug)]
pub struct FailedDownload {
    pub key: String,
    pub error: StorageError,
}

/// Outcome of a batch download.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Local paths of the tiles written
    pub downloaded: Vec<PathBuf>,
    pub failed: Vec<FailedDownload>,
    pub bytes: u64,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Downloads `jobs` into `dest_dir`, naming each file by its job.
///
/// `concurrency` of 0 uses rayon's global pool. Errors are returned only
/// for problems that affect the whole batch.
pub fn download_tiles(
    store: &dyn ObjectStore,
    jobs: &[TileJob],
    dest_dir: &Path,
    concurrency: usize,
    callback: Option<&DownloadCallback<'_>>,
) -> Result<DownloadReport, StorageError> {
    fs::create_dir_all(dest_dir).map_err(|source| StorageError::CreateDirFailed {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    info!(
        tiles = jobs.len(),
        dest = %dest_dir.display(),
        concurrency,
        "Downloading tiles"
    );

    let fetch = || {
        jobs.par_iter()
            .map(|job| {
                let path = dest_dir.join(&job.file_name);
                let result = store.download_to(&job.key, &path);
                if let Some(cb) = callback {
                    cb(job);
                }
                (path, job, result)
            })
            .collect::<Vec<_>>()
    };

    let results = if concurrency == 0 {
        fetch()
    } else {
        rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .build()
            .map_err(|e| StorageError::ThreadPool(e.to_string()))?
            .install(fetch)
    };

    let mut report = DownloadReport::default();
    for (path, job, result) in results {
        match result {
            Ok(bytes) => {
                debug!(key = %job.key, path = %path.display(), bytes, "Tile downloaded");
                report.bytes += bytes;
                report.downloaded.push(path);
            }
            Err(error) => {
                warn!(key = %job.key, error = %error, "Tile download failed");
                report.failed.push(FailedDownload {
                    key: job.key.clone(),
                    error,
                });
            }
        }
    }

    info!(
        downloaded = report.downloaded.len(),
        failed = report.failed.len(),
        bytes = report.bytes,
        "Tile download finished"
    );
    Ok(report)
}
