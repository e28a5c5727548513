//! `icvlp-pipeline` -- steps that build and maintain the dataset on disk.
//!
//! Download source videos, extract sampled frames, import or generate
//! annotation sidecars, and edit plates. External tools (yt-dlp, ffmpeg,
//! plate detectors) sit behind the [`VideoFetcher`], [`FrameGrabber`] and
//! [`PlateDetector`] traits so every step can run against fakes in tests.

pub mod config;
pub mod detect;
pub mod downloader;
pub mod editing;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod import;
pub mod prune;
pub mod store;

pub use config::{PipelineConfig, SavePolicy};
pub use detect::{auto_label, CommandDetector, LabelSummary, PlateDetector};
pub use downloader::{DownloadOutcome, DownloadSummary, Downloader, VideoFetcher, YtDlpFetcher};
pub use editing::{add_plate, set_vehicle_type, unlabeled_plates, AddPlateOutcome};
pub use error::PipelineError;
pub use extract::{extract_frames, ExtractSummary, FfmpegGrabber, FrameGrabber};
pub use import::{import_annotations, ImportSummary};
pub use prune::prune_annotations;
pub use store::DatasetStore;
