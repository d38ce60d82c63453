//! INI parsing: `Ini` → `ConfigFile`.
//!
//! The single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::storage::Credentials;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Non-empty trimmed value of `key`.
fn get<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    props: &Properties,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ConfigFileError> {
    match get(props, key) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, v, reason)),
        None => Ok(None),
    }
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Parses an `Ini` into a `ConfigFile`, starting from defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [storage]
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = get(section, "endpoint") {
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid(
                    "storage",
                    "endpoint",
                    v,
                    "must start with http:// or https://",
                ));
            }
            config.storage.endpoint = Some(v.to_string());
        }
        if let Some(v) = get(section, "bucket") {
            config.storage.bucket = Some(v.to_string());
        }
        if let Some(v) = get(section, "region") {
            config.storage.region = v.to_string();
        }
        config.storage.credentials =
            match (get(section, "access_key"), get(section, "secret_key")) {
                (Some(access), Some(secret)) => Some(Credentials::new(access, secret)),
                (None, None) => None,
                (Some(_), None) => {
                    return Err(invalid(
                        "storage",
                        "secret_key",
                        "",
                        "required when access_key is set",
                    ))
                }
                (None, Some(_)) => {
                    return Err(invalid(
                        "storage",
                        "access_key",
                        "",
                        "required when secret_key is set",
                    ))
                }
            };
        if let Some(v) = parse_number::<u64>(
            section,
            "storage",
            "timeout",
            "must be a positive integer (seconds)",
        )? {
            if v == 0 {
                return Err(invalid(
                    "storage",
                    "timeout",
                    "0",
                    "must be a positive integer (seconds)",
                ));
            }
            config.storage.timeout = v;
        }
        if let Some(v) = parse_number(
            section,
            "storage",
            "concurrency",
            "must be a non-negative integer (0 = one per CPU)",
        )? {
            config.storage.concurrency = v;
        }
    }

    // [imagery]
    if let Some(section) = ini.section(Some("imagery")) {
        if let Some(v) = parse_number::<u32>(
            section,
            "imagery",
            "tile_size",
            "must be a positive integer (pixels)",
        )? {
            if v == 0 {
                return Err(invalid(
                    "imagery",
                    "tile_size",
                    "0",
                    "must be a positive integer (pixels)",
                ));
            }
            config.imagery.tile_size = v;
        }
        if let Some(v) = get(section, "root_template") {
            config.imagery.root_template = v.trim_end_matches('/').to_string();
        }
        // An explicitly empty extension is meaningful
        if let Some(v) = section.get("extension") {
            config.imagery.extension = v.trim().trim_start_matches('.').to_string();
        }
    }

    // [detection]
    if let Some(section) = ini.section(Some("detection")) {
        if let Some(v) = get(section, "program") {
            config.detection.program = v.to_string();
        }
        if let Some(v) = get(section, "script") {
            config.detection.script = expand_tilde(v);
        }
        if let Some(v) = get(section, "weights") {
            config.detection.weights = expand_tilde(v);
        }
        if let Some(v) = parse_number::<u32>(
            section,
            "detection",
            "image_size",
            "must be a positive integer (pixels)",
        )? {
            if v == 0 {
                return Err(invalid(
                    "detection",
                    "image_size",
                    "0",
                    "must be a positive integer (pixels)",
                ));
            }
            config.detection.image_size = v;
        }
        if let Some(v) = get(section, "confidence") {
            let parsed: f64 = v
                .parse()
                .map_err(|_| invalid("detection", "confidence", v, "must be between 0 and 1"))?;
            if !(0.0..=1.0).contains(&parsed) {
                return Err(invalid(
                    "detection",
                    "confidence",
                    v,
                    "must be between 0 and 1",
                ));
            }
            config.detection.confidence = parsed;
        }
    }

    // [paths]
    if let Some(section) = ini.section(Some("paths")) {
        if let Some(v) = get(section, "work_dir") {
            config.paths.work_dir = expand_tilde(v);
        }
        if let Some(v) = get(section, "log_dir") {
            config.paths.log_dir = expand_tilde(v);
        }
        if let Some(v) = get(section, "keep_tiles") {
            config.paths.keep_tiles = parse_bool(v)
                .ok_or_else(|| invalid("paths", "keep_tiles", v, "must be true or false"))?;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_full_config() {
        let config = load(
            r#"
[storage]
bucket = survey-bucket
region = us-east-1
timeout = 10
concurrency = 16

[imagery]
tile_size = 512
root_template = public/{project}/ortho/
extension = .jpg

[detection]
program = python3
script = /opt/yolov9/detect.py
weights = /opt/weights/best.pt
image_size = 512
confidence = 0.35

[paths]
work_dir = /var/tmp/tiles
log_dir = /var/log/tilescan
keep_tiles = yes
"#,
        )
        .unwrap();

        assert_eq!(config.storage.bucket.as_deref(), Some("survey-bucket"));
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.storage.timeout, 10);
        assert_eq!(config.storage.concurrency, 16);
        assert_eq!(
            config.storage.resolved_endpoint().as_deref(),
            Some("https://survey-bucket.s3.us-east-1.amazonaws.com")
        );
        assert_eq!(config.imagery.tile_size, 512);
        assert_eq!(config.imagery.root_template, "public/{project}/ortho");
        assert_eq!(config.imagery.extension, "jpg");
        assert_eq!(config.detection.program, "python3");
        assert_eq!(config.detection.script, PathBuf::from("/opt/yolov9/detect.py"));
        assert_eq!(config.detection.image_size, 512);
        assert_eq!(config.detection.confidence, 0.35);
        assert_eq!(config.paths.work_dir, PathBuf::from("/var/tmp/tiles"));
        assert!(config.paths.keep_tiles);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = load("[storage]\nendpoint = http://localhost:9000/bucket\n").unwrap();
        assert_eq!(
            config.storage.resolved_endpoint().as_deref(),
            Some("http://localhost:9000/bucket")
        );
        assert_eq!(config.storage.region, DEFAULT_REGION);
        assert_eq!(config.imagery.tile_size, DEFAULT_TILE_SIZE);
        assert_eq!(config.detection.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_credentials() {
        let config = load("[storage]\nbucket = b\naccess_key = AKID\nsecret_key = s3cr3t\n").unwrap();
        let credentials = config.storage.credentials.unwrap();
        assert_eq!(credentials.access_key(), "AKID");
        assert_eq!(credentials.secret_key(), "s3cr3t");

        let anonymous = load("[storage]\nbucket = b\naccess_key =\nsecret_key =\n").unwrap();
        assert!(anonymous.storage.credentials.is_none());
    }

    #[test]
    fn test_empty_extension_disables_it() {
        let config = load("[imagery]\nextension =\n").unwrap();
        assert_eq!(config.imagery.extension, "");
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("[storage]\ntimeout = soon\n", "storage.timeout"),
            ("[storage]\ntimeout = 0\n", "storage.timeout"),
            ("[storage]\nendpoint = localhost\n", "storage.endpoint"),
            ("[imagery]\ntile_size = -1\n", "imagery.tile_size"),
            ("[detection]\nconfidence = 1.5\n", "detection.confidence"),
            ("[detection]\nimage_size = 0\n", "detection.image_size"),
            ("[paths]\nkeep_tiles = maybe\n", "paths.keep_tiles"),
            ("[storage]\naccess_key = AKID\n", "storage.secret_key"),
            ("[storage]\nsecret_key = s3cr3t\n", "storage.access_key"),
        ];
        for (content, location) in cases {
            let err = load(content).unwrap_err();
            assert!(
                err.to_string().contains(location),
                "{:?} should mention {}",
                err.to_string(),
                location
            );
        }
    }

    #[test]
    fn test_parse_bool() {
        for v in ["true", "1", "yes", "ON"] {
            assert_eq!(parse_bool(v), Some(true));
        }
        for v in ["false", "0", "no", "off"] {
            assert_eq!(parse_bool(v), Some(false));
        }
        assert_eq!(parse_bool("perhaps"), None);
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/weights/best.pt"), home.join("weights/best.pt"));
        }
    }
}
