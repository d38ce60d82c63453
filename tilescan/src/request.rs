//! Survey request and response documents.
//!
//! Both live in object storage next to the project's imagery:
//!
//! ```text
//! public/{project}/auto-detection/pothole/request.json   (input)
//! public/{project}/auto-detection/pothole/result.json    (output)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{GeoPoint, MAX_LAT, MAX_ZOOM};
use crate::severity::{SeverityDistribution, SeverityGrade};

/// Content type of uploaded documents.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Placeholder replaced by the project id in key templates.
pub const PROJECT_PLACEHOLDER: &str = "{project}";

/// Errors reading or writing request documents.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zoom level {0} is outside 0..=30")]
    InvalidLevel(u8),

    #[error("reference latitude range [{min}, {max}] is outside the Web Mercator domain")]
    InvalidLatitude { min: f64, max: f64 },
}

/// Storage key of a project's request document.
pub fn request_key(project: &str) -> String {
    format!("public/{}/auto-detection/pothole/request.json", project)
}

/// Storage key of a project's result document.
pub fn result_key(project: &str) -> String {
    format!("public/{}/auto-detection/pothole/result.json", project)
}

/// Expands `{project}` in a key template.
pub fn expand_template(template: &str, project: &str) -> String {
    template.replace(PROJECT_PLACEHOLDER, project)
}

/// Areas to survey, as read from the request document.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRequest {
    /// Latitude range `[min, max]` of the project
    pub latitude: [f64; 2],
    /// Zoom level of the imagery tiles
    pub level: u8,
    /// EPSG code the areas are projected into for coverage
    pub epsg: u32,
    /// Area rings as `[lng, lat]` vertices
    pub area: Vec<Vec<GeoPoint>>,
}

impl SurveyRequest {
    /// Parses and validates a request document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, RequestError> {
        let request: SurveyRequest = serde_json::from_slice(bytes)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.level > MAX_ZOOM {
            return Err(RequestError::InvalidLevel(self.level));
        }
        let [min, max] = self.latitude;
        if !(min.abs() < MAX_LAT && max.abs() < MAX_LAT) {
            return Err(RequestError::InvalidLatitude { min, max });
        }
        Ok(())
    }

    /// Midpoint of the latitude range, used for ground resolution.
    pub fn reference_latitude(&self) -> f64 {
        (self.latitude[0] + self.latitude[1]) / 2.0
    }
}

/// One graded tile in the result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEntry {
    /// Tile center `[lng, lat]`
    pub point: GeoPoint,
    /// Worst grade among the tile's detections
    pub grade: SeverityGrade,
    /// Grade distribution of the tile's detections
    pub percentage: SeverityDistribution,
}

/// Serializes the result document.
pub fn response_to_json(entries: &[ResponseEntry]) -> Result<Vec<u8>, RequestError> {
    Ok(serde_json::to_vec(entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Percent;

    const REQUEST: &str = r#"{
        "latitude": [37.4, 37.6],
        "level": 19,
        "epsg": 5186,
        "area": [[[127.0, 37.5], [127.01, 37.5], [127.01, 37.51]]],
        "requestedAt": "2024-05-01T09:00:00Z"
    }"#;

    #[test]
    fn test_parse_request() {
        let request = SurveyRequest::from_json(REQUEST.as_bytes()).unwrap();
        assert_eq!(request.level, 19);
        assert_eq!(request.epsg, 5186);
        assert_eq!(request.area.len(), 1);
        assert_eq!(request.area[0][1], GeoPoint::new(127.01, 37.5));
        assert!((request.reference_latitude() - 37.5).abs() < 1e-12);
    }

    #[test]
    fn test_vertices_parse_exactly() {
        let doc = REQUEST.replace("[127.01, 37.51]", "[127.00023651123047, 37.566079089960844]");
        let request = SurveyRequest::from_json(doc.as_bytes()).unwrap();
        assert_eq!(
            request.area[0][2],
            GeoPoint::new(127.00023651123047, 37.566079089960844)
        );

        // Result points read back bit for bit
        let point = GeoPoint::new(127.00023651123047, 37.566079089960844);
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(serde_json::from_str::<GeoPoint>(&json).unwrap(), point);
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(
            SurveyRequest::from_json(b"{\"level\": 19}"),
            Err(RequestError::Json(_))
        ));

        let deep = REQUEST.replace("\"level\": 19", "\"level\": 40");
        assert!(matches!(
            SurveyRequest::from_json(deep.as_bytes()),
            Err(RequestError::InvalidLevel(40))
        ));

        let polar = REQUEST.replace("[37.4, 37.6]", "[37.4, 89.0]");
        assert!(matches!(
            SurveyRequest::from_json(polar.as_bytes()),
            Err(RequestError::InvalidLatitude { .. })
        ));
    }

    #[test]
    fn test_keys() {
        assert_eq!(request_key("16"), "public/16/auto-detection/pothole/request.json");
        assert_eq!(result_key("16"), "public/16/auto-detection/pothole/result.json");
        assert_eq!(
            expand_template("public/{project}/manifold/orthomosaic_tiles", "16"),
            "public/16/manifold/orthomosaic_tiles"
        );
    }

    #[test]
    fn test_response_shape() {
        let entry = ResponseEntry {
            point: GeoPoint::new(127.5, 37.25),
            grade: SeverityGrade::Severe,
            percentage: SeverityDistribution {
                grade1: Percent(50),
                grade2: Percent(0),
                grade3: Percent(50),
                grade4: Percent(0),
            },
        };
        let json: serde_json::Value =
            serde_json::from_slice(&response_to_json(&[entry]).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "point": [127.5, 37.25],
                "grade": 3,
                "percentage": {"grade1": "50%", "grade2": "0%", "grade3": "50%", "grade4": "0%"}
            }])
        );
    }
}
