//! Bounding-box annotation sidecars (Pascal VOC style XML).
//!
//! One file per annotated frame, holding a single plate object. Writing uses
//! a fixed template; reading only extracts the first object's `<bndbox>`.

use std::sync::LazyLock;

use regex::Regex;

use crate::bbox::BoundingBox;
use crate::error::CoreError;
use crate::vehicle_type::VehicleType;

/// Folder name recorded in every sidecar.
pub const ANNOTATION_FOLDER: &str = "frames";

static OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<object>(.*?)</object>").expect("valid regex"));

static BNDBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<bndbox>(.*?)</bndbox>").expect("valid regex"));

const BNDBOX_TAGS: [&str; 4] = ["xmin", "ymin", "xmax", "ymax"];

/// Object name written for a plate: `plate-{vehicle_type}`, with
/// `plate-None` for plates whose vehicle type is not labeled yet.
pub fn plate_object_name(vehicle_type: Option<VehicleType>) -> String {
    match vehicle_type {
        Some(vt) => format!("plate-{vt}"),
        None => "plate-None".to_string(),
    }
}

/// Everything needed to render one annotation sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDocument {
    pub image_filename: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub object_name: String,
    pub bbox: BoundingBox,
}

impl AnnotationDocument {
    /// Render the sidecar XML.
    pub fn to_xml(&self) -> String {
        format!(
            "<annotation>
    <folder>{ANNOTATION_FOLDER}</folder>
    <filename>{filename}</filename>
    <size>
        <width>{width}</width>
        <height>{height}</height>
        <depth>{depth}</depth>
    </size>
    <object>
        <name>{name}</name>
        <pose>Unspecified</pose>
        <truncated>0</truncated>
        <occluded>0</occluded>
        <difficult>0</difficult>
        <bndbox>
            <xmin>{xmin}</xmin>
            <ymin>{ymin}</ymin>
            <xmax>{xmax}</xmax>
            <ymax>{ymax}</ymax>
        </bndbox>
    </object>
</annotation>
",
            filename = self.image_filename,
            width = self.width,
            height = self.height,
            depth = self.depth,
            name = self.object_name,
            xmin = self.bbox.x_min(),
            ymin = self.bbox.y_min(),
            xmax = self.bbox.x_max(),
            ymax = self.bbox.y_max(),
        )
    }
}

/// Read the first object's bounding box from a sidecar.
///
/// Returns `Ok(None)` when the document has no `<object>`. Coordinates are
/// parsed as decimals and rounded to the nearest pixel before validation.
pub fn read_annotation_bbox(xml: &str) -> Result<Option<BoundingBox>, CoreError> {
    let object = match OBJECT_RE.captures(xml) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => return Ok(None),
    };

    let bndbox = BNDBOX_RE
        .captures(object)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            CoreError::Validation("annotation object is missing <bndbox>".to_string())
        })?;

    let mut coords = [0f64; 4];
    for (index, tag) in BNDBOX_TAGS.iter().enumerate() {
        let raw = tag_text(bndbox, tag).ok_or_else(|| {
            CoreError::Validation(format!("annotation <bndbox> is missing <{tag}>"))
        })?;
        coords[index] = raw.parse::<f64>().map_err(|_| CoreError::Coercion {
            index,
            value: format!("{raw:?}"),
        })?;
    }

    BoundingBox::from_rounded(coords).map(Some)
}

fn tag_text<'a>(haystack: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = haystack.find(&open)? + open.len();
    let end = start + haystack[start..].find(&close)?;
    Some(haystack[start..end].trim())
}
