//! Source-video downloads through an external command-line downloader.
//!
//! Downloads are idempotent: every downloaded (or already present) file path
//! is appended to a plain-text log, one path per line, and logged paths are
//! never fetched again. Remove a line from the log to force a re-download.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use icvlp_core::naming::video_filename;
use icvlp_core::Video;
use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::error::PipelineError;

/// Supported downloader binaries.
pub const VALID_DOWNLOADERS: &[&str] = &["yt-dlp", "youtube-dl"];

/// Format selector passed to the downloader (webm 1080p, else best mp4).
const FORMAT_SELECTOR: &str = "248/mp4";

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Downloader must be one of {valid}, got '{0}'", valid = VALID_DOWNLOADERS.join(", "))]
    UnknownDownloader(String),

    #[error("{0} cannot be found in PATH")]
    NotInstalled(String),

    #[error("no downloader implemented for URL {0}")]
    UnsupportedUrl(String),

    #[error("{program} failed for {url} (exit code {exit_code:?}): {stderr}")]
    Failed {
        program: String,
        url: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// "Fetch video by URL to path" capability.
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Whether a URL points at YouTube.
pub fn is_youtube_url(url: &str) -> bool {
    url.contains("youtube") || url.contains("youtu.be")
}

// ---------------------------------------------------------------------------
// yt-dlp / youtube-dl
// ---------------------------------------------------------------------------

/// Fetcher backed by `yt-dlp` or `youtube-dl`.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: String,
}

impl YtDlpFetcher {
    pub fn new(program: &str) -> Result<Self, DownloadError> {
        if !VALID_DOWNLOADERS.contains(&program) {
            return Err(DownloadError::UnknownDownloader(program.to_string()));
        }
        Ok(Self {
            program: program.to_string(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run `<program> --version` and return the reported version.
    pub async fn check_available(&self) -> Result<String, DownloadError> {
        let output = tokio::process::Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map_err(|_| DownloadError::NotInstalled(self.program.clone()))?;
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || version.is_empty() {
            return Err(DownloadError::NotInstalled(self.program.clone()));
        }
        Ok(version)
    }
}

#[async_trait]
impl VideoFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        if !is_youtube_url(url) {
            return Err(DownloadError::UnsupportedUrl(url.to_string()));
        }

        let output = tokio::process::Command::new(&self.program)
            .arg(url)
            .arg("-o")
            .arg(dest)
            .args(["-f", FORMAT_SELECTOR])
            .output()
            .await
            .map_err(|source| DownloadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DownloadError::Failed {
                program: self.program.clone(),
                url: url.to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Downloader
// ---------------------------------------------------------------------------

/// Result of one download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The path was already in the download log.
    AlreadyLogged,
    /// The file was on disk but not logged; it is logged now.
    AlreadyExists,
    Downloaded,
    /// No fetcher handles this URL.
    Unsupported,
    Failed(String),
}

/// Counts over a batch of downloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub already_present: usize,
    pub unsupported: usize,
    pub failed: usize,
}

/// Idempotent downloader keyed by a log of downloaded paths.
pub struct Downloader<F> {
    fetcher: F,
    directory: PathBuf,
    log_path: PathBuf,
    pacing: bool,
}

impl<F: VideoFetcher> Downloader<F> {
    pub fn new(fetcher: F, directory: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            directory: directory.into(),
            log_path: log_path.into(),
            pacing: true,
        }
    }

    /// Enable or disable the random pause between fetches.
    pub fn with_pacing(mut self, pacing: bool) -> Self {
        self.pacing = pacing;
        self
    }

    /// Where `video` is (or will be) stored.
    pub fn download_path(&self, video: &Video) -> PathBuf {
        self.directory.join(video_filename(video.video_id()))
    }

    /// Download one video unless it is already logged or present.
    pub async fn download(&self, video: &Video) -> Result<DownloadOutcome, PipelineError> {
        let path = self.download_path(video);
        let key = path.display().to_string();

        if self.logged_paths().await?.iter().any(|line| line == &key) {
            tracing::info!(
                path = %key,
                log = %self.log_path.display(),
                "Video already logged; remove the line from the log to download again",
            );
            return Ok(DownloadOutcome::AlreadyLogged);
        }

        if path.exists() {
            tracing::info!(path = %key, "Video already exists");
            self.append_log(&key).await?;
            return Ok(DownloadOutcome::AlreadyExists);
        }

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| PipelineError::io(&self.directory, e))?;

        tracing::info!(video_id = %video.video_id(), url = %video.url(), path = %key, "Downloading video");
        match self.fetcher.fetch(video.url(), &path).await {
            Ok(()) => {
                tracing::info!(video_id = %video.video_id(), "Finished downloading video");
                self.append_log(&key).await?;
                Ok(DownloadOutcome::Downloaded)
            }
            Err(DownloadError::UnsupportedUrl(url)) => {
                tracing::error!(video_id = %video.video_id(), url = %url, "Downloader not implemented for URL");
                Ok(DownloadOutcome::Unsupported)
            }
            Err(e) => {
                tracing::error!(video_id = %video.video_id(), error = %e, "Unsuccessful download");
                Ok(DownloadOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Download every video in order, pausing briefly after each real fetch
    /// attempt so the remote host is not hammered.
    pub async fn download_all<'a, I>(&self, videos: I) -> Result<DownloadSummary, PipelineError>
    where
        I: IntoIterator<Item = &'a Video>,
    {
        let mut summary = DownloadSummary::default();
        for video in videos {
            let outcome = self.download(video).await?;
            let fetched = matches!(outcome, DownloadOutcome::Downloaded | DownloadOutcome::Failed(_));
            match outcome {
                DownloadOutcome::Downloaded => summary.downloaded += 1,
                DownloadOutcome::AlreadyLogged | DownloadOutcome::AlreadyExists => {
                    summary.already_present += 1
                }
                DownloadOutcome::Unsupported => summary.unsupported += 1,
                DownloadOutcome::Failed(_) => summary.failed += 1,
            }
            if fetched && self.pacing {
                let pause_ms = rand::rng().random_range(500u64..1000);
                tokio::time::sleep(Duration::from_millis(pause_ms)).await;
            }
        }
        Ok(summary)
    }

    async fn logged_paths(&self) -> Result<Vec<String>, PipelineError> {
        match tokio::fs::read_to_string(&self.log_path).await {
            Ok(contents) => Ok(contents
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(PipelineError::io(&self.log_path, e)),
        }
    }

    async fn append_log(&self, key: &str) -> Result<(), PipelineError> {
        tracing::debug!(path = %key, log = %self.log_path.display(), "Adding path to download log");
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .map_err(|e| PipelineError::io(&self.log_path, e))?;
        file.write_all(format!("{key}\n").as_bytes())
            .await
            .map_err(|e| PipelineError::io(&self.log_path, e))?;
        file.flush()
            .await
            .map_err(|e| PipelineError::io(&self.log_path, e))
    }
}
