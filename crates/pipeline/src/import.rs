//! Rebuild plate frames from annotation sidecars on disk.
//!
//! Each plate's frames are cleared, then every sampled frame number with a
//! readable `{video_id}_{frame}_{label}.xml` sidecar is appended again.
//! Missing or unusable sidecars are logged and skipped.

use std::path::Path;

use icvlp_core::annotation::read_annotation_bbox;
use icvlp_core::naming::annotation_filename;
use icvlp_core::{Frame, Plate};

use crate::config::SavePolicy;
use crate::error::PipelineError;
use crate::store::DatasetStore;

/// Counts over an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Sampled frames with no sidecar file.
    pub missing: usize,
    /// Sidecars without an `<object>`.
    pub empty: usize,
    /// Sidecars that could not be read or whose bbox failed validation.
    pub rejected: usize,
}

/// Position of a plate inside the dataset, plus what is needed to find its
/// sidecars. Positions stay valid because import never adds or removes
/// videos or plates.
struct PlateTarget {
    video_index: usize,
    plate_index: usize,
    video_id: String,
    label: String,
    frame_numbers: Vec<u32>,
}

pub(crate) fn plate_at_mut(
    store: &mut DatasetStore,
    video_index: usize,
    plate_index: usize,
) -> Option<&mut Plate> {
    store
        .dataset_mut()
        .videos_mut()
        .nth(video_index)?
        .plates_mut()
        .nth(plate_index)
}

/// Re-import every plate's frames from `annotations_dir`, sampling each
/// plate's range every `step` frames.
pub fn import_annotations(
    store: &mut DatasetStore,
    annotations_dir: &Path,
    step: u32,
    policy: SavePolicy,
) -> Result<ImportSummary, PipelineError> {
    let targets: Vec<PlateTarget> = store
        .dataset()
        .videos()
        .iter()
        .enumerate()
        .flat_map(|(video_index, video)| {
            video
                .plates()
                .iter()
                .enumerate()
                .map(move |(plate_index, plate)| PlateTarget {
                    video_index,
                    plate_index,
                    video_id: video.video_id().to_string(),
                    label: plate.label().to_string(),
                    frame_numbers: plate.sampled_frame_numbers(step).collect(),
                })
        })
        .collect();

    let mut summary = ImportSummary::default();

    for target in targets {
        if let Some(plate) = plate_at_mut(store, target.video_index, target.plate_index) {
            plate.clear_frames();
        }

        for frame_number in target.frame_numbers {
            let filename = annotation_filename(&target.video_id, frame_number, &target.label);
            let path = annotations_dir.join(&filename);

            if !path.exists() {
                tracing::debug!(file = %filename, "Annotation doesn't exist. Continuing...");
                summary.missing += 1;
                continue;
            }

            let xml = match std::fs::read_to_string(&path) {
                Ok(xml) => xml,
                Err(e) => {
                    tracing::warn!(file = %filename, error = %e, "Cannot read annotation. Continuing...");
                    summary.rejected += 1;
                    continue;
                }
            };

            let bbox = match read_annotation_bbox(&xml) {
                Ok(Some(bbox)) => bbox,
                Ok(None) => {
                    tracing::info!(file = %filename, "Annotation has no object. Continuing...");
                    summary.empty += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(file = %filename, error = %e, "Annotation rejected. Continuing...");
                    summary.rejected += 1;
                    continue;
                }
            };

            let Some(plate) = plate_at_mut(store, target.video_index, target.plate_index) else {
                break;
            };
            if let Err(e) = plate.append(Frame::new(frame_number, bbox)) {
                tracing::warn!(file = %filename, error = %e, "Frame rejected. Continuing...");
                summary.rejected += 1;
                continue;
            }
            summary.imported += 1;
            store.save_after_insert(policy)?;
        }
    }

    store.save()?;
    tracing::info!(
        imported = summary.imported,
        missing = summary.missing,
        empty = summary.empty,
        rejected = summary.rejected,
        "Annotation import finished",
    );
    Ok(summary)
}
