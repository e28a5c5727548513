//! Frame extraction: sample every plate's frame range from the downloaded
//! video and write one JPEG per sampled frame.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use icvlp_core::naming::{frame_image_filename, video_filename};
use icvlp_core::{Dataset, Video};

use crate::error::PipelineError;
use crate::ffmpeg::{self, frame_step, FfmpegError};

/// "Extract frame from video file" capability.
#[async_trait]
pub trait FrameGrabber: Send + Sync {
    /// Native frame rate of the video file.
    async fn video_fps(&self, video: &Path) -> Result<f64, FfmpegError>;

    /// Write frame `frame_number` of `video` to `output` as JPEG. Numbers
    /// are 1-based; frame 0 is the first frame too.
    async fn grab(&self, video: &Path, frame_number: u32, output: &Path)
        -> Result<(), FfmpegError>;
}

/// [`FrameGrabber`] backed by the `ffprobe` / `ffmpeg` binaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegGrabber;

#[async_trait]
impl FrameGrabber for FfmpegGrabber {
    async fn video_fps(&self, video: &Path) -> Result<f64, FfmpegError> {
        ffmpeg::probe_fps(video).await
    }

    async fn grab(
        &self,
        video: &Path,
        frame_number: u32,
        output: &Path,
    ) -> Result<(), FfmpegError> {
        ffmpeg::extract_frame(video, frame_number, output).await
    }
}

/// Counts over an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub videos_processed: usize,
    pub videos_missing: usize,
    pub distinct_plates: usize,
    /// Sampled frames, including ones whose image already existed.
    pub images: usize,
    pub extracted: usize,
    pub failed: usize,
}

impl fmt::Display for ExtractSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} videos: {} plates, {} images ({} newly extracted, {} failed, {} videos missing).",
            self.videos_processed,
            self.distinct_plates,
            self.images,
            self.extracted,
            self.failed,
            self.videos_missing,
        )
    }
}

/// Locate the downloaded file for `video` and compute its sampling stride.
///
/// Returns `None` (after logging) when the video is missing or unreadable.
pub(crate) async fn open_video<G: FrameGrabber + ?Sized>(
    grabber: &G,
    video_dir: &Path,
    video: &Video,
) -> Option<(PathBuf, u32)> {
    let path = video_dir.join(video_filename(video.video_id()));
    if !path.exists() {
        tracing::info!(video_id = %video.video_id(), "Video not found. Skipping.");
        return None;
    }
    match grabber.video_fps(&path).await {
        Ok(native_fps) => Some((path, frame_step(native_fps, video.fps()))),
        Err(e) => {
            tracing::warn!(video_id = %video.video_id(), error = %e, "Cannot read frame rate. Skipping.");
            None
        }
    }
}

/// Extract sampled frames of every plate into `frames_dir`.
///
/// Existing images are left untouched, so interrupted runs can be resumed.
pub async fn extract_frames<G: FrameGrabber + ?Sized>(
    dataset: &Dataset,
    video_dir: &Path,
    frames_dir: &Path,
    grabber: &G,
) -> Result<ExtractSummary, PipelineError> {
    tokio::fs::create_dir_all(frames_dir)
        .await
        .map_err(|e| PipelineError::io(frames_dir, e))?;

    let mut summary = ExtractSummary::default();
    let mut plates_seen: HashSet<&str> = HashSet::new();

    for video in dataset.videos() {
        let Some((video_path, step)) = open_video(grabber, video_dir, video).await else {
            summary.videos_missing += 1;
            continue;
        };
        summary.videos_processed += 1;
        tracing::debug!(video_id = %video.video_id(), step, "Extracting frames");

        for plate in video.plates() {
            plates_seen.insert(plate.label());

            for frame_number in plate.sampled_frame_numbers(step) {
                summary.images += 1;
                let output =
                    frames_dir.join(frame_image_filename(video.video_id(), frame_number, plate.label()));
                if output.exists() {
                    continue;
                }
                match grabber.grab(&video_path, frame_number, &output).await {
                    Ok(()) => summary.extracted += 1,
                    Err(e) => {
                        tracing::warn!(
                            video_id = %video.video_id(),
                            label = %plate.label(),
                            frame_number,
                            error = %e,
                            "Frame extraction failed",
                        );
                        summary.failed += 1;
                    }
                }
            }
        }
    }

    summary.distinct_plates = plates_seen.len();
    tracing::info!("{summary}");
    Ok(summary)
}
