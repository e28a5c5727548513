//! `icvlp` -- command-line front end for the ICVLP dataset pipeline.
//!
//! Reads the dataset document, runs one pipeline step, and writes the
//! document back when the step changed it.
//!
//! # Environment variables
//!
//! Paths and defaults come from [`PipelineConfig::from_env`]; a `.env` file
//! in the working directory is loaded first. `RUST_LOG` controls log
//! filtering (default `icvlp=info,icvlp_pipeline=info,icvlp_core=info`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use icvlp_core::stats::DatasetStats;
use icvlp_core::{Dataset, VehicleType};
use icvlp_pipeline::{
    add_plate, auto_label, extract_frames, import_annotations, prune_annotations,
    set_vehicle_type, unlabeled_plates, AddPlateOutcome, CommandDetector, DatasetStore,
    Downloader, FfmpegGrabber, PipelineConfig, YtDlpFetcher,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "icvlp=info,icvlp_pipeline=info,icvlp_core=info";

#[derive(Parser, Debug)]
#[command(author, version, about = "Build and maintain the ICVLP license-plate video dataset")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Dataset document, overriding ICVLP_DATASET_PATH.
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download every source video that is not in the download log.
    Download,
    /// Extract sampled frames of every plate as JPEG images.
    Extract,
    /// Rebuild plate frames from annotation sidecars.
    ImportAnnotations {
        /// Frame stride; defaults to ICVLP_ANNOTATION_STEP.
        #[arg(long)]
        step: Option<u32>,
    },
    /// Remove annotation sidecars whose frame image is gone.
    PruneAnnotations {
        /// Move pruned sidecars here instead of deleting them.
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },
    /// Label missing frames with an external plate detector.
    Detect {
        /// Detector program; receives the image path as its last argument.
        #[arg(long)]
        detector: String,
        /// Extra arguments passed to the detector before the image path.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Register a plate on a video.
    AddPlate {
        video_id: String,
        label: String,
        #[arg(long)]
        start: u32,
        #[arg(long)]
        end: u32,
        #[arg(long, value_parser = parse_vehicle_type)]
        vehicle_type: Option<VehicleType>,
    },
    /// Set a plate's vehicle type (`none` clears it).
    SetVehicleType {
        video_id: String,
        label: String,
        vehicle_type: String,
    },
    /// List plates without a vehicle type.
    Unlabeled,
    /// Print dataset statistics.
    Stats {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load the dataset, checking every invariant.
    Validate,
}

fn parse_vehicle_type(value: &str) -> Result<VehicleType, String> {
    value.parse().map_err(|e: icvlp_core::CoreError| e.to_string())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "icvlp failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = PipelineConfig::from_env().context("invalid configuration")?;
    if let Some(path) = cli.dataset {
        cfg.dataset_path = path;
    }

    match cli.command {
        Command::PruneAnnotations { backup_dir } => {
            let backup = backup_dir.or(cfg.backup_dir);
            let pruned = prune_annotations(&cfg.annotations_dir, &cfg.frames_dir, backup.as_deref())?;
            tracing::info!(count = pruned.len(), "Pruned annotations");
        }
        Command::Download => {
            let store = open_store(&cfg)?;
            let fetcher = YtDlpFetcher::new(&cfg.downloader)?;
            let version = fetcher.check_available().await?;
            tracing::info!(program = fetcher.program(), %version, "Using downloader");
            let downloader = Downloader::new(fetcher, &cfg.video_dir, &cfg.download_log);
            let summary = downloader.download_all(store.dataset().videos()).await?;
            tracing::info!(
                downloaded = summary.downloaded,
                already_present = summary.already_present,
                unsupported = summary.unsupported,
                failed = summary.failed,
                "Downloads finished",
            );
        }
        Command::Extract => {
            let store = open_store(&cfg)?;
            extract_frames(store.dataset(), &cfg.video_dir, &cfg.frames_dir, &FfmpegGrabber).await?;
        }
        Command::ImportAnnotations { step } => {
            let mut store = open_store(&cfg)?;
            let step = step.unwrap_or(cfg.annotation_step).max(1);
            import_annotations(&mut store, &cfg.annotations_dir, step, cfg.save_policy)?;
        }
        Command::Detect { detector, args } => {
            let mut store = open_store(&cfg)?;
            let detector = CommandDetector::new(detector, args);
            auto_label(&mut store, &cfg, &FfmpegGrabber, &detector).await?;
        }
        Command::AddPlate {
            video_id,
            label,
            start,
            end,
            vehicle_type,
        } => {
            let mut store = open_store(&cfg)?;
            let outcome = register_plate(&mut store, &video_id, &label, vehicle_type, start, end)?;
            if outcome == AddPlateOutcome::AlreadyLabeled {
                println!("Plate {label} is already labeled in video {video_id}");
            }
        }
        Command::SetVehicleType {
            video_id,
            label,
            vehicle_type,
        } => {
            let mut store = open_store(&cfg)?;
            let vehicle_type = match vehicle_type.trim() {
                "none" | "None" => None,
                other => Some(other.parse::<VehicleType>()?),
            };
            set_vehicle_type(store.dataset_mut(), &video_id, &label, vehicle_type)?;
            store.save()?;
        }
        Command::Unlabeled => {
            let store = open_store(&cfg)?;
            for (video_id, label) in unlabeled_plates(store.dataset()) {
                println!("{video_id}\t{label}");
            }
        }
        Command::Stats { json } => print_stats(open_store(&cfg)?.dataset(), json)?,
        Command::Validate => {
            let store = open_store(&cfg)?;
            let dataset = store.dataset();
            println!(
                "{} is valid: {} videos, {} plates, {} frames",
                cfg.dataset_path.display(),
                dataset.len(),
                dataset.plate_count(),
                dataset.frame_count(),
            );
        }
    }

    Ok(())
}

fn open_store(cfg: &PipelineConfig) -> anyhow::Result<DatasetStore> {
    DatasetStore::open(&cfg.dataset_path)
        .with_context(|| format!("cannot load dataset {}", cfg.dataset_path.display()))
}

/// Add a plate and write the dataset only when it actually changed.
fn register_plate(
    store: &mut DatasetStore,
    video_id: &str,
    label: &str,
    vehicle_type: Option<VehicleType>,
    start: u32,
    end: u32,
) -> anyhow::Result<AddPlateOutcome> {
    let exists = store
        .dataset()
        .require_video(video_id)?
        .contains_plate_label(label);
    if exists {
        tracing::info!(video_id, label, "Plate already labeled");
        return Ok(AddPlateOutcome::AlreadyLabeled);
    }
    let outcome = add_plate(store.dataset_mut(), video_id, label, vehicle_type, start, end)?;
    store.save()?;
    Ok(outcome)
}

fn print_stats(dataset: &Dataset, json: bool) -> anyhow::Result<()> {
    let stats = DatasetStats::collect(dataset);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{stats}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn detect_collects_trailing_arguments() {
        let cli = Cli::try_parse_from([
            "icvlp", "detect", "--detector", "python", "detect.py", "--conf", "0.4",
        ])
        .unwrap();
        match cli.command {
            Command::Detect { detector, args } => {
                assert_eq!(detector, "python");
                assert_eq!(args, vec!["detect.py", "--conf", "0.4"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn add_plate_parses_vehicle_type() {
        let cli = Cli::try_parse_from([
            "icvlp", "--dataset", "ds.json", "add-plate", "0001", "B1234XYZ", "--start", "1",
            "--end", "90", "--vehicle-type", "box_truck",
        ])
        .unwrap();
        assert_eq!(cli.dataset, Some(PathBuf::from("ds.json")));
        match cli.command {
            Command::AddPlate { vehicle_type, start, end, .. } => {
                assert_eq!(vehicle_type, Some(VehicleType::BoxTruck));
                assert_eq!((start, end), (1, 90));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn existing_plate_leaves_dataset_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icvlp.json");
        let mut ds = Dataset::new();
        let mut video = icvlp_core::Video::new("0001", "youtube", "https://youtu.be/a", 5).unwrap();
        video.append(icvlp_core::Plate::new("B1234XYZ", None, 1, 10).unwrap());
        ds.append(video).unwrap();
        ds.save(&path).unwrap();

        let mut store = DatasetStore::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let outcome = register_plate(&mut store, "0001", "b1234xyz", None, 1, 10).unwrap();
        assert_eq!(outcome, AddPlateOutcome::AlreadyLabeled);
        assert!(!path.exists());

        let outcome = register_plate(&mut store, "0001", "D77AB", None, 2, 4).unwrap();
        assert_eq!(outcome, AddPlateOutcome::Added);
        let saved = Dataset::from_json(&path).unwrap();
        assert_eq!(saved.plate_count(), 2);
    }

    #[test]
    fn unknown_vehicle_type_rejected() {
        let result = Cli::try_parse_from([
            "icvlp", "add-plate", "0001", "A1", "--start", "0", "--end", "1", "--vehicle-type",
            "tank",
        ]);
        assert!(result.is_err());
    }
}
