use icvlp_core::CoreError;

use crate::config::ConfigError;
use crate::detect::DetectorError;
use crate::downloader::DownloadError;
use crate::ffmpeg::FfmpegError;

/// Errors that abort a pipeline run.
///
/// Per-item problems (a missing sidecar, a rejected detection) are logged
/// and skipped by the individual steps instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
