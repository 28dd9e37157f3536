//! Shape and bounds checks for incoming signing requests
//!
//! Checks run in a fixed order and stop at the first failure, so a request
//! with several problems always reports the earliest one.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::placement::Placement;

/// Upper bound on signature boxes per request
pub const MAX_PLACEMENTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorKind {
    InvalidPdfId,
    InvalidSignature,
    InvalidCoordinates,
    InvalidCoordinatesShape,
    TooManyBoxes,
}

impl ValidationErrorKind {
    /// Wire code reported to clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPdfId => "INVALID_PDF_ID",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidCoordinates => "INVALID_COORDINATES",
            Self::InvalidCoordinatesShape => "INVALID_COORDINATES_SHAPE",
            Self::TooManyBoxes => "TOO_MANY_BOXES",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// A request that passed every check
#[derive(Debug, Clone, PartialEq)]
pub struct SigningRequest {
    pub document_id: String,
    /// Base64 payload as sent, possibly data-URL prefixed
    pub signature_image: String,
    pub placements: Vec<Placement>,
}

/// Run all checks; `None` means the request is well formed
pub fn validate(request: &Value) -> Option<ValidationError> {
    parse_signing_request(request).err()
}

/// Validate `request` and convert it into a [`SigningRequest`]
pub fn parse_signing_request(request: &Value) -> Result<SigningRequest, ValidationError> {
    let document_id = non_empty_string(request, &["documentId", "pdfId"]).ok_or_else(|| {
        ValidationError::new(
            ValidationErrorKind::InvalidPdfId,
            "documentId must be a non-empty string",
        )
    })?;

    let signature_image = non_empty_string(request, &["signatureImage", "signatureBase64"])
        .ok_or_else(|| {
            ValidationError::new(
                ValidationErrorKind::InvalidSignature,
                "signatureImage must be a non-empty base64 string",
            )
        })?;

    let coordinates = match request.get("coordinates") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidCoordinates,
                "coordinates must be a non-empty array",
            ))
        }
    };

    let placements = coordinates
        .iter()
        .enumerate()
        .map(|(index, item)| parse_placement(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    if placements.len() > MAX_PLACEMENTS {
        return Err(ValidationError::new(
            ValidationErrorKind::TooManyBoxes,
            format!(
                "at most {} signature boxes are allowed, got {}",
                MAX_PLACEMENTS,
                placements.len()
            ),
        ));
    }

    Ok(SigningRequest {
        document_id: document_id.to_string(),
        signature_image: signature_image.to_string(),
        placements,
    })
}

/// First of `keys` holding a non-empty string
fn non_empty_string<'a>(request: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| request.get(*key))
        .find_map(|value| value.as_str().filter(|s| !s.is_empty()))
}

fn shape_error(index: usize, detail: &str) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::InvalidCoordinatesShape,
        format!("coordinates[{}]: {}", index, detail),
    )
}

fn finite_field(obj: &Map<String, Value>, index: usize, key: &str) -> Result<f64, ValidationError> {
    obj.get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .ok_or_else(|| shape_error(index, &format!("{} must be a finite number", key)))
}

/// Missing, null, zero or negative pages become page 1
fn page_number(obj: &Map<String, Value>, index: usize) -> Result<u32, ValidationError> {
    match obj.get("page") {
        None | Some(Value::Null) => Ok(1),
        Some(value) => {
            let page = value
                .as_f64()
                .ok_or_else(|| shape_error(index, "page must be a number"))?
                .trunc();
            if page < 1.0 {
                Ok(1)
            } else {
                Ok(page.min(u32::MAX as f64) as u32)
            }
        }
    }
}

fn parse_placement(index: usize, item: &Value) -> Result<Placement, ValidationError> {
    let obj = item
        .as_object()
        .ok_or_else(|| shape_error(index, "must be an object"))?;

    let x = finite_field(obj, index, "x")?;
    let y = finite_field(obj, index, "y")?;
    let width = finite_field(obj, index, "width")?;
    let height = finite_field(obj, index, "height")?;
    if width <= 0.0 || height <= 0.0 {
        return Err(shape_error(index, "width and height must be positive"));
    }

    let mut placement = Placement::new(x, y, width, height).on_page(page_number(obj, index)?);
    placement.field_type = obj
        .get("fieldType")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn coordinate() -> Value {
        json!({"x": 50.0, "y": 500.0, "width": 250.0, "height": 60.0, "page": 1})
    }

    fn request_with(coordinates: Value) -> Value {
        json!({
            "documentId": "sample-a4.pdf",
            "signatureImage": "data:image/png;base64,aGVsbG8=",
            "coordinates": coordinates,
        })
    }

    fn kind_of(request: &Value) -> Option<ValidationErrorKind> {
        validate(request).map(|e| e.kind)
    }

    #[test]
    fn test_empty_request_is_missing_id() {
        let err = validate(&json!({})).unwrap();
        assert_eq!(err.kind, ValidationErrorKind::InvalidPdfId);
        assert_eq!(err.code(), "INVALID_PDF_ID");
    }

    #[test]
    fn test_non_string_or_empty_id() {
        assert_eq!(
            kind_of(&json!({"documentId": 42})),
            Some(ValidationErrorKind::InvalidPdfId)
        );
        assert_eq!(
            kind_of(&json!({"documentId": ""})),
            Some(ValidationErrorKind::InvalidPdfId)
        );
    }

    #[test]
    fn test_id_without_image() {
        assert_eq!(
            kind_of(&json!({"documentId": "a.pdf"})),
            Some(ValidationErrorKind::InvalidSignature)
        );
        assert_eq!(
            kind_of(&json!({"documentId": "a.pdf", "signatureImage": ""})),
            Some(ValidationErrorKind::InvalidSignature)
        );
    }

    #[test]
    fn test_empty_or_missing_coordinates() {
        assert_eq!(
            kind_of(&request_with(json!([]))),
            Some(ValidationErrorKind::InvalidCoordinates)
        );
        assert_eq!(
            kind_of(&request_with(json!({"x": 1}))),
            Some(ValidationErrorKind::InvalidCoordinates)
        );
        assert_eq!(
            kind_of(&json!({"documentId": "a.pdf", "signatureImage": "aGVsbG8="})),
            Some(ValidationErrorKind::InvalidCoordinates)
        );
    }

    #[test]
    fn test_string_coordinate_is_shape_error() {
        let request = request_with(json!([{"x": "a", "y": 1, "width": 10, "height": 10}]));
        let err = validate(&request).unwrap();
        assert_eq!(err.code(), "INVALID_COORDINATES_SHAPE");
        assert!(err.message.contains("coordinates[0]"));
    }

    #[test]
    fn test_missing_field_and_non_object() {
        assert_eq!(
            kind_of(&request_with(json!([{"x": 1, "y": 1, "width": 10}]))),
            Some(ValidationErrorKind::InvalidCoordinatesShape)
        );
        assert_eq!(
            kind_of(&request_with(json!([coordinate(), 7]))),
            Some(ValidationErrorKind::InvalidCoordinatesShape)
        );
    }

    #[test]
    fn test_non_positive_box_is_shape_error() {
        assert_eq!(
            kind_of(&request_with(json!([{"x": 1, "y": 1, "width": 0, "height": 10}]))),
            Some(ValidationErrorKind::InvalidCoordinatesShape)
        );
        assert_eq!(
            kind_of(&request_with(json!([{"x": 1, "y": 1, "width": 5, "height": -1}]))),
            Some(ValidationErrorKind::InvalidCoordinatesShape)
        );
    }

    #[test]
    fn test_non_numeric_page_is_shape_error() {
        let request =
            request_with(json!([{"x": 1, "y": 1, "width": 5, "height": 5, "page": "two"}]));
        assert_eq!(
            kind_of(&request),
            Some(ValidationErrorKind::InvalidCoordinatesShape)
        );
    }

    #[test]
    fn test_fifty_one_boxes_rejected() {
        let coordinates: Vec<Value> = (0..51).map(|_| coordinate()).collect();
        let err = validate(&request_with(Value::Array(coordinates))).unwrap();
        assert_eq!(err.code(), "TOO_MANY_BOXES");
    }

    #[test]
    fn test_fifty_boxes_accepted() {
        let coordinates: Vec<Value> = (0..50).map(|_| coordinate()).collect();
        assert_eq!(validate(&request_with(Value::Array(coordinates))), None);
    }

    #[test]
    fn test_shape_checked_before_count() {
        let mut coordinates: Vec<Value> = (0..60).map(|_| coordinate()).collect();
        coordinates[3] = json!({"x": "a"});
        assert_eq!(
            kind_of(&request_with(Value::Array(coordinates))),
            Some(ValidationErrorKind::InvalidCoordinatesShape)
        );
    }

    #[test]
    fn test_parse_valid_request() {
        let request = request_with(json!([
            {"x": 50.0, "y": 500.0, "width": 250.0, "height": 60.0, "page": 2, "fieldType": "signature"},
            {"x": 10, "y": 20, "width": 30, "height": 40}
        ]));
        let parsed = parse_signing_request(&request).unwrap();

        assert_eq!(parsed.document_id, "sample-a4.pdf");
        assert_eq!(parsed.signature_image, "data:image/png;base64,aGVsbG8=");

        let mut first = Placement::new(50.0, 500.0, 250.0, 60.0).on_page(2);
        first.field_type = Some("signature".into());
        assert_eq!(
            parsed.placements,
            vec![first, Placement::new(10.0, 20.0, 30.0, 40.0)]
        );
    }

    #[test]
    fn test_legacy_field_names_accepted() {
        let request = json!({
            "pdfId": "upload.pdf",
            "signatureBase64": "aGVsbG8=",
            "coordinates": [coordinate()],
        });
        let parsed = parse_signing_request(&request).unwrap();
        assert_eq!(parsed.document_id, "upload.pdf");
        assert_eq!(parsed.signature_image, "aGVsbG8=");
    }

    #[test]
    fn test_page_normalization() {
        let request = request_with(json!([
            {"x": 1, "y": 1, "width": 5, "height": 5, "page": 0},
            {"x": 1, "y": 1, "width": 5, "height": 5, "page": -3},
            {"x": 1, "y": 1, "width": 5, "height": 5, "page": null},
            {"x": 1, "y": 1, "width": 5, "height": 5, "page": 2.9}
        ]));
        let pages: Vec<u32> = parse_signing_request(&request)
            .unwrap()
            .placements
            .iter()
            .map(|p| p.page)
            .collect();
        assert_eq!(pages, vec![1, 1, 1, 2]);
    }
}
