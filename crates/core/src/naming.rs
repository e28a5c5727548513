//! File naming conventions shared by the download, extraction and
//! annotation tools.
//!
//! - videos: `{video_id}.mp4`
//! - frame images: `{video_id}_{frame_number}_{label}.jpeg`
//! - annotation sidecars: `{video_id}_{frame_number}_{label}.xml`

/// Extension of extracted frame images.
pub const IMAGE_EXTENSION: &str = "jpeg";

/// Extension of annotation sidecar files.
pub const ANNOTATION_EXTENSION: &str = "xml";

/// Extension of downloaded videos.
pub const VIDEO_EXTENSION: &str = "mp4";

/// Downloaded video filename for a video id.
///
/// ```
/// use icvlp_core::naming::video_filename;
///
/// assert_eq!(video_filename("0001"), "0001.mp4");
/// ```
pub fn video_filename(video_id: &str) -> String {
    format!("{video_id}.{VIDEO_EXTENSION}")
}

fn frame_stem(video_id: &str, frame_number: u32, label: &str) -> String {
    format!("{video_id}_{frame_number}_{label}")
}

/// Extracted frame image filename.
///
/// ```
/// use icvlp_core::naming::frame_image_filename;
///
/// assert_eq!(frame_image_filename("0001", 5, "N123XYZ"), "0001_5_N123XYZ.jpeg");
/// ```
pub fn frame_image_filename(video_id: &str, frame_number: u32, label: &str) -> String {
    format!("{}.{IMAGE_EXTENSION}", frame_stem(video_id, frame_number, label))
}

/// Annotation sidecar filename for the same frame.
pub fn annotation_filename(video_id: &str, frame_number: u32, label: &str) -> String {
    format!(
        "{}.{ANNOTATION_EXTENSION}",
        frame_stem(video_id, frame_number, label)
    )
}

/// Image filename matching an annotation filename, or `None` if the name
/// is not an `.xml` file.
pub fn image_for_annotation(annotation: &str) -> Option<String> {
    let stem = annotation.strip_suffix(".xml")?;
    Some(format!("{stem}.{IMAGE_EXTENSION}"))
}

/// Annotation filename matching an image filename, or `None` if the name
/// is not a `.jpeg` file.
pub fn annotation_for_image(image: &str) -> Option<String> {
    let stem = image.strip_suffix(".jpeg")?;
    Some(format!("{stem}.{ANNOTATION_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_name() {
        assert_eq!(annotation_filename("0001", 5, "N123XYZ"), "0001_5_N123XYZ.xml");
    }

    #[test]
    fn swap_extensions() {
        assert_eq!(
            image_for_annotation("0001_5_N123XYZ.xml").as_deref(),
            Some("0001_5_N123XYZ.jpeg")
        );
        assert_eq!(
            annotation_for_image("0001_5_N123XYZ.jpeg").as_deref(),
            Some("0001_5_N123XYZ.xml")
        );
    }

    #[test]
    fn swap_rejects_other_extensions() {
        assert!(image_for_annotation("notes.txt").is_none());
        assert!(annotation_for_image("frame.png").is_none());
    }
}
