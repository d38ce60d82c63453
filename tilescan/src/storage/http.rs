//! Object store over plain HTTP(S) using a blocking reqwest client.

use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Response;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use tracing::debug;

use super::signing::{encode_key, sign_request, Credentials};
use super::{ObjectStore, StorageError};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "ap-northeast-2";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Bucket reached as `{endpoint}/{key}`.
///
/// Without credentials requests are sent unsigned, so the bucket (or a
/// gateway in front of it) must allow anonymous access. With credentials
/// every request is signed with AWS Signature Version 4 for the store's
/// region.
pub struct HttpObjectStore {
    client: reqwest::blocking::Client,
    endpoint: String,
    /// `Host` header value, with the port when it is not the default
    host: String,
    region: String,
    credentials: Option<Credentials>,
}

impl HttpObjectStore {
    /// Creates a store for an explicit endpoint URL.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, StorageError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let parsed = Url::parse(&endpoint)
            .map_err(|e| StorageError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(StorageError::InvalidEndpoint(format!(
                    "{}: no host",
                    endpoint
                )))
            }
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StorageError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            host,
            region: DEFAULT_REGION.to_string(),
            credentials: None,
        })
    }

    /// Creates a store for the virtual-hosted URL of an S3 bucket.
    pub fn for_bucket(bucket: &str, region: &str, timeout_secs: u64) -> Result<Self, StorageError> {
        Ok(Self::new(bucket_endpoint(bucket, region), timeout_secs)?.with_region(region))
    }

    /// Region used in request signatures.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Signs every request with `credentials`.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn is_signed(&self) -> bool {
        self.credentials.is_some()
    }

    /// Full URL of `key`.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, encode_key(key.trim_start_matches('/')))
    }

    fn send(
        &self,
        method: Method,
        key: &str,
        body: Option<(&[u8], &str)>,
    ) -> Result<(String, Response), StorageError> {
        let url = self.url_for(key);
        let mut request = self.client.request(method.clone(), &url);

        if let Some(credentials) = &self.credentials {
            let path = Url::parse(&url)
                .map_err(|e| StorageError::InvalidKey(format!("{}: {}", key, e)))?
                .path()
                .to_string();
            let payload = body.map(|(bytes, _)| bytes).unwrap_or_default();
            let signature = sign_request(
                credentials,
                &self.region,
                method.as_str(),
                &self.host,
                &path,
                payload,
                Utc::now(),
            );
            debug!(method = %method, path = %path, access_key = credentials.access_key(), "Signed request");
            request = request
                .header("x-amz-date", signature.amz_date)
                .header("x-amz-content-sha256", signature.content_sha256)
                .header(AUTHORIZATION, signature.authorization);
        }

        if let Some((bytes, content_type)) = body {
            request = request.header(CONTENT_TYPE, content_type).body(bytes.to_vec());
        }

        let response = request.send().map_err(|e| request_failed(&url, e))?;
        check_status(&url, key, response.status())?;
        Ok((url, response))
    }
}

/// Virtual-hosted style S3 endpoint.
pub fn bucket_endpoint(bucket: &str, region: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com", bucket, region)
}

fn check_status(url: &str, key: &str, status: StatusCode) -> Result<(), StorageError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::NOT_FOUND {
        Err(StorageError::NotFound {
            key: key.to_string(),
        })
    } else {
        Err(StorageError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

fn request_failed(url: &str, e: reqwest::Error) -> StorageError {
    StorageError::RequestFailed {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

impl ObjectStore for HttpObjectStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let (url, response) = self.send(Method::GET, key, None)?;
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| request_failed(&url, e))
    }

    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.send(Method::PUT, key, Some((body, content_type)))?;
        Ok(())
    }
}
