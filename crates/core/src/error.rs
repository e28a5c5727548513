use crate::bbox::BoundingBox;

/// Errors raised by the dataset model.
///
/// Every structural violation is reported at the point of mutation (or
/// hydration) so callers can match on the variant instead of parsing text.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error(
        "Frame {frame} of plate {label} is outside [{frame_start}, {frame_end}] (bbox {bbox})"
    )]
    RangeViolation {
        label: String,
        frame: u32,
        frame_start: u32,
        frame_end: u32,
        bbox: BoundingBox,
    },

    #[error("Plate {label} has frame_start {frame_start} after frame_end {frame_end}")]
    InvalidPlateRange {
        label: String,
        frame_start: u32,
        frame_end: u32,
    },

    #[error("Invalid bbox: {0}")]
    Shape(#[from] ShapeViolation),

    #[error("bbox coordinate {index} is not an integer: {value}")]
    Coercion { index: usize, value: String },

    #[error("Duplicate video_id: {0}")]
    DuplicateKey(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Malformed dataset document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ways a bounding box can fail its shape check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeViolation {
    #[error("expected 4 coordinates, got {0}")]
    WrongLength(usize),

    #[error("{0:?} is degenerate or inverted (need x_min < x_max and y_min < y_max)")]
    Degenerate([i64; 4]),
}
