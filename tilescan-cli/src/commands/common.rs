//! Common utilities shared across CLI commands.

use std::sync::Arc;

use tilescan::config::ConfigFile;
use tilescan::storage::{bucket_endpoint, HttpObjectStore, ObjectStore};
use tracing::info;

use crate::error::CliError;

/// Resolve the storage endpoint from CLI args and config.
///
/// Precedence: `--endpoint`, `--bucket`, then the config file's endpoint
/// and bucket.
pub fn resolve_endpoint(
    cli_endpoint: Option<String>,
    cli_bucket: Option<String>,
    config: &ConfigFile,
) -> Result<String, CliError> {
    cli_endpoint
        .or_else(|| cli_bucket.map(|bucket| bucket_endpoint(&bucket, &config.storage.region)))
        .or_else(|| config.storage.resolved_endpoint())
        .ok_or_else(|| CliError::Config("no storage endpoint or bucket configured".to_string()))
}

/// Create the HTTP store for the resolved endpoint.
///
/// Requests are signed when the config carries credentials.
pub fn http_store(endpoint: String, config: &ConfigFile) -> Result<Arc<dyn ObjectStore>, CliError> {
    Ok(Arc::new(build_http_store(endpoint, config)?))
}

fn build_http_store(endpoint: String, config: &ConfigFile) -> Result<HttpObjectStore, CliError> {
    let storage = &config.storage;
    info!(
        endpoint = %endpoint,
        region = %storage.region,
        timeout = storage.timeout,
        signed = storage.credentials.is_some(),
        "Using HTTP object store"
    );
    let mut store = HttpObjectStore::new(endpoint, storage.timeout)?.with_region(&storage.region);
    if let Some(credentials) = &storage.credentials {
        store = store.with_credentials(credentials.clone());
    }
    Ok(store)
}
