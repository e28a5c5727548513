//! Annotated frame: a frame number plus the plate's bounding box in it.

use serde::Serialize;

use crate::bbox::BoundingBox;
use crate::error::CoreError;

/// One annotated frame of a plate.
///
/// Serialized as `{"frame": n, "bbox": [x_min, y_min, x_max, y_max]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    #[serde(rename = "frame")]
    frame_number: u32,
    bbox: BoundingBox,
}

impl Frame {
    pub fn new(frame_number: u32, bbox: BoundingBox) -> Self {
        Self { frame_number, bbox }
    }

    /// Build a frame from raw integer coordinates, validating the box.
    pub fn from_coords(frame_number: u32, coords: &[i64]) -> Result<Self, CoreError> {
        Ok(Self::new(frame_number, BoundingBox::try_from_slice(coords)?))
    }

    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Replace the bounding box (e.g. after refinement).
    pub fn set_bbox(&mut self, bbox: BoundingBox) {
        self.bbox = bbox;
    }
}
