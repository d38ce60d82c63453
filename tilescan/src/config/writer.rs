//! INI serialization: `ConfigFile` → commented config.ini text.

use std::path::Path;

use super::settings::ConfigFile;

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Renders `config` as the commented INI written to config.ini.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let endpoint = config.storage.endpoint.as_deref().unwrap_or("");
    let bucket = config.storage.bucket.as_deref().unwrap_or("");
    let (access_key, secret_key) = config
        .storage
        .credentials
        .as_ref()
        .map(|c| (c.access_key(), c.secret_key()))
        .unwrap_or(("", ""));
    let keep_tiles = if config.paths.keep_tiles { "true" } else { "false" };

    format!(
        r#"[storage]
; Base URL of the object store. Takes precedence over bucket/region.
; Example: endpoint = http://localhost:9000/survey-bucket
endpoint = {}
; S3 bucket, reached at https://<bucket>.s3.<region>.amazonaws.com
bucket = {}
region = {}
; Access key pair for signed requests (leave both empty for anonymous access)
access_key = {}
secret_key = {}
; Request timeout in seconds
timeout = {}
; Parallel tile downloads (0 = one per CPU)
concurrency = {}

[imagery]
; Edge length of the orthomosaic tiles in pixels
tile_size = {}
; Storage prefix of the tile pyramid. {{project}} is replaced by the project id
root_template = {}
; Extension appended to tile keys (empty for none)
extension = {}

[detection]
; Detector command: <program> <script> --weights <weights> --img <image_size> ...
program = {}
script = {}
weights = {}
; Detector input size in pixels. Must equal imagery tile_size
image_size = {}
; Minimum confidence of reported detections (0 to 1)
confidence = {}

[paths]
; Tiles are downloaded into <work_dir>/<project>
work_dir = {}
log_dir = {}
; Keep downloaded tiles after the survey finishes
keep_tiles = {}
"#,
        endpoint,
        bucket,
        config.storage.region,
        access_key,
        secret_key,
        config.storage.timeout,
        config.storage.concurrency,
        config.imagery.tile_size,
        config.imagery.root_template,
        config.imagery.extension,
        config.detection.program,
        path_to_string(&config.detection.script),
        path_to_string(&config.detection.weights),
        config.detection.image_size,
        config.detection.confidence,
        path_to_string(&config.paths.work_dir),
        path_to_string(&config.paths.log_dir),
        keep_tiles,
    )
}
