//! FFmpeg/FFprobe helpers for reading source-video frame rates and
//! extracting single frames as JPEG images.

use std::path::Path;

use serde::Deserialize;

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("video file not found: {0}")]
    VideoNotFound(String),
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    pub streams: Vec<FfprobeStream>,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    /// e.g. "30/1" or "30000/1001"
    pub r_frame_rate: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Frame rate of the first video stream of `path`.
pub async fn probe_fps(path: &Path) -> Result<f64, FfmpegError> {
    ensure_exists(path)?;

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(path)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let probe = serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))?;
    framerate_of(&probe)
}

/// Extract frame `frame_number` of `video_path` to `output_path`.
///
/// Frame numbers are 1-based; frame 0 reads the first frame as well.
pub async fn extract_frame(
    video_path: &Path,
    frame_number: u32,
    output_path: &Path,
) -> Result<(), FfmpegError> {
    ensure_exists(video_path)?;
    let index = select_index(frame_number);

    let output = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(video_path)
        .args([
            "-vf",
            &format!("select=eq(n\\,{index})"),
            "-vsync",
            "0",
            "-frames:v",
            "1",
            "-q:v",
            "2",
        ])
        .arg(output_path)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}

/// Parse an ffprobe rational like `"30000/1001"` (or a plain number).
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Extraction stride: how many source frames to advance per sampled frame
/// so that a video recorded at `video_fps` is sampled at `target_fps`.
/// Never less than 1.
pub fn frame_step(video_fps: f64, target_fps: u32) -> u32 {
    if target_fps == 0 || !video_fps.is_finite() {
        return 1;
    }
    let step = (video_fps / f64::from(target_fps)).floor();
    if step < 1.0 {
        1
    } else {
        step.min(f64::from(u32::MAX)) as u32
    }
}

/// Zero-based index for ffmpeg's `select` filter.
fn select_index(frame_number: u32) -> u32 {
    frame_number.saturating_sub(1)
}

fn framerate_of(probe: &FfprobeOutput) -> Result<f64, FfmpegError> {
    probe
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref().unwrap_or("video") == "video")
        .find_map(|s| s.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .ok_or_else(|| FfmpegError::ParseError("no video stream with a frame rate".to_string()))
}

fn ensure_exists(path: &Path) -> Result<(), FfmpegError> {
    if path.exists() {
        Ok(())
    } else {
        Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rational_rates() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("25"), Some(25.0));
    }

    #[test]
    fn rejects_bad_rates() {
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
        assert_eq!(parse_frame_rate("0/1"), None);
    }

    #[test]
    fn step_floors_ratio() {
        assert_eq!(frame_step(30.0, 1), 30);
        assert_eq!(frame_step(29.97, 5), 5);
        assert_eq!(frame_step(24.0, 5), 4);
    }

    #[test]
    fn step_is_at_least_one() {
        assert_eq!(frame_step(10.0, 30), 1);
        assert_eq!(frame_step(30.0, 0), 1);
    }

    #[test]
    fn framerate_from_probe_json() {
        let probe: FfprobeOutput = serde_json::from_str(
            r#"{"streams": [
                {"codec_type": "audio", "r_frame_rate": "0/0"},
                {"codec_type": "video", "r_frame_rate": "60/1"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(framerate_of(&probe).unwrap(), 60.0);
    }

    #[test]
    fn framerate_missing_is_parse_error() {
        let probe: FfprobeOutput = serde_json::from_str(r#"{"streams": []}"#).unwrap();
        assert!(matches!(framerate_of(&probe), Err(FfmpegError::ParseError(_))));
    }

    #[tokio::test]
    async fn missing_video_is_reported() {
        let err = probe_fps(Path::new("/nonexistent/video.mp4")).await.unwrap_err();
        assert!(matches!(err, FfmpegError::VideoNotFound(_)));
    }

    #[test]
    fn frame_zero_selects_first_frame() {
        assert_eq!(select_index(0), 0);
        assert_eq!(select_index(1), 0);
        assert_eq!(select_index(25), 24);
    }
}
