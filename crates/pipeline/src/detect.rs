//! Detector-driven labeling.
//!
//! For every sampled frame a plate does not have yet, the frame image is
//! extracted, handed to a [`PlateDetector`], and the first detection that
//! forms a valid box is written as an annotation sidecar and appended to the
//! plate.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use icvlp_core::annotation::{plate_object_name, AnnotationDocument};
use icvlp_core::naming::{annotation_filename, frame_image_filename};
use icvlp_core::{BoundingBox, Frame, VehicleType};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::extract::{open_video, FrameGrabber};
use crate::import::plate_at_mut;
use crate::store::DatasetStore;

/// Channel count written into generated sidecars.
const IMAGE_DEPTH: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("failed to spawn detector {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("detector {program} failed (exit code {exit_code:?}): {stderr}")]
    Failed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("detector output is not a JSON list of [x_min, y_min, x_max, y_max]: {0}")]
    InvalidOutput(String),

    #[error("cannot read image: {0}")]
    Image(#[from] image::ImageError),
}

/// "Detect license plates in an image" capability.
#[async_trait]
pub trait PlateDetector: Send + Sync {
    /// Candidate boxes as `[x_min, y_min, x_max, y_max]`, best first.
    async fn detect(&self, image: &Path) -> Result<Vec<[f32; 4]>, DetectorError>;
}

/// Detector run as an external program.
///
/// The image path is appended to `args`; stdout must be a JSON array such as
/// `[[10.5, 20, 110, 60]]`.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
}

impl CommandDetector {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl PlateDetector for CommandDetector {
    async fn detect(&self, image: &Path) -> Result<Vec<[f32; 4]>, DetectorError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .output()
            .await
            .map_err(|source| DetectorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DetectorError::Failed {
                program: self.program.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        parse_detections(&output.stdout)
    }
}

/// Parse detector stdout.
pub fn parse_detections(stdout: &[u8]) -> Result<Vec<[f32; 4]>, DetectorError> {
    serde_json::from_slice(stdout).map_err(|e| DetectorError::InvalidOutput(e.to_string()))
}

/// Counts over a labeling run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSummary {
    pub labeled: usize,
    /// Sampled frames the plate already had.
    pub already_labeled: usize,
    /// Frames where no detection formed a valid box.
    pub no_detection: usize,
    pub failed: usize,
    pub videos_missing: usize,
}

impl fmt::Display for LabelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Labeled {} frames ({} already labeled, {} without detection, {} failed, {} videos missing).",
            self.labeled, self.already_labeled, self.no_detection, self.failed, self.videos_missing,
        )
    }
}

struct PlateWork {
    plate_index: usize,
    label: String,
    vehicle_type: Option<VehicleType>,
    frame_numbers: Vec<u32>,
}

/// Label every plate's missing sampled frames with `detector`.
///
/// Sidecars go to `cfg.annotations_dir`, frame images to `cfg.frames_dir`.
/// The dataset is saved according to `cfg.save_policy`.
pub async fn auto_label<G, D>(
    store: &mut DatasetStore,
    cfg: &PipelineConfig,
    grabber: &G,
    detector: &D,
) -> Result<LabelSummary, PipelineError>
where
    G: FrameGrabber + ?Sized,
    D: PlateDetector + ?Sized,
{
    for dir in [&cfg.frames_dir, &cfg.annotations_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| PipelineError::io(dir, e))?;
    }

    let mut summary = LabelSummary::default();

    for video_index in 0..store.dataset().len() {
        let video = &store.dataset().videos()[video_index];
        let video_id = video.video_id().to_string();
        let Some((video_path, step)) = open_video(grabber, &cfg.video_dir, video).await else {
            summary.videos_missing += 1;
            continue;
        };

        let mut work = Vec::new();
        for (plate_index, plate) in video.plates().iter().enumerate() {
            let mut frame_numbers = Vec::new();
            for n in plate.sampled_frame_numbers(step) {
                if plate.contains_frame_number(n) {
                    summary.already_labeled += 1;
                } else {
                    frame_numbers.push(n);
                }
            }
            work.push(PlateWork {
                plate_index,
                label: plate.label().to_string(),
                vehicle_type: plate.vehicle_type(),
                frame_numbers,
            });
        }

        for plate in work {
            for &frame_number in &plate.frame_numbers {
                let image_name = frame_image_filename(&video_id, frame_number, &plate.label);
                let image_path = cfg.frames_dir.join(&image_name);

                let labeled = label_frame(grabber, detector, &video_path, frame_number, &image_path).await;
                let (bbox, width, height) = match labeled {
                    Ok(Some(found)) => found,
                    Ok(None) => {
                        tracing::info!(image = %image_name, "No plate detected");
                        summary.no_detection += 1;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(image = %image_name, error = %e, "Labeling failed. Continuing...");
                        summary.failed += 1;
                        continue;
                    }
                };

                let Some(target) = plate_at_mut(store, video_index, plate.plate_index) else {
                    break;
                };
                if let Err(e) = target.append(Frame::new(frame_number, bbox)) {
                    tracing::warn!(image = %image_name, error = %e, "Frame rejected. Continuing...");
                    summary.failed += 1;
                    continue;
                }

                // Sidecar and dataset share the truncated box so a re-import
                // reproduces the stored frame.
                let document = AnnotationDocument {
                    image_filename: image_name.clone(),
                    width,
                    height,
                    depth: IMAGE_DEPTH,
                    object_name: plate_object_name(plate.vehicle_type),
                    bbox,
                };
                let sidecar = cfg
                    .annotations_dir
                    .join(annotation_filename(&video_id, frame_number, &plate.label));
                tokio::fs::write(&sidecar, document.to_xml())
                    .await
                    .map_err(|e| PipelineError::io(&sidecar, e))?;

                tracing::debug!(image = %image_name, %bbox, "Frame labeled");
                summary.labeled += 1;
                store.save_after_insert(cfg.save_policy)?;
            }
        }
    }

    store.save()?;
    tracing::info!("{summary}");
    Ok(summary)
}

/// Extract one frame (unless its image already exists) and run the detector
/// on it. Returns the accepted box with the image size.
async fn label_frame<G, D>(
    grabber: &G,
    detector: &D,
    video_path: &Path,
    frame_number: u32,
    image_path: &Path,
) -> Result<Option<(BoundingBox, u32, u32)>, PipelineError>
where
    G: FrameGrabber + ?Sized,
    D: PlateDetector + ?Sized,
{
    if !image_path.exists() {
        grabber.grab(video_path, frame_number, image_path).await?;
    }

    let detections = detector.detect(image_path).await?;
    let Some(bbox) = detections
        .into_iter()
        .find_map(|xyxy| BoundingBox::from_detection(xyxy).ok())
    else {
        return Ok(None);
    };

    let (width, height) = image::image_dimensions(image_path).map_err(DetectorError::from)?;
    Ok(Some((bbox, width, height)))
}
