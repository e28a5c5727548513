use std::path::PathBuf;

/// Default dataset document.
pub const DEFAULT_DATASET_PATH: &str = "icvlp_v0.1.json";
/// Default frame stride when importing annotation sidecars.
pub const DEFAULT_ANNOTATION_STEP: u32 = 5;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// When the dataset document is written back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    /// After every single insertion, so an interrupted run loses at most one
    /// annotation.
    EveryInsert,
    /// Once, when the run finishes.
    AtEnd,
}

/// Pipeline configuration loaded from environment variables.
///
/// All fields have defaults matching the usual repository layout.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub dataset_path: PathBuf,
    pub video_dir: PathBuf,
    pub frames_dir: PathBuf,
    pub annotations_dir: PathBuf,
    /// Where pruned annotations are moved. Deleted when `None`.
    pub backup_dir: Option<PathBuf>,
    /// `yt-dlp` or `youtube-dl`.
    pub downloader: String,
    pub download_log: PathBuf,
    pub annotation_step: u32,
    pub save_policy: SavePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            video_dir: PathBuf::from("videos"),
            frames_dir: PathBuf::from("frames"),
            annotations_dir: PathBuf::from("annotations"),
            backup_dir: None,
            downloader: "yt-dlp".to_string(),
            download_log: PathBuf::from("downloaded_videos.txt"),
            annotation_step: DEFAULT_ANNOTATION_STEP,
            save_policy: SavePolicy::EveryInsert,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `ICVLP_DATASET_PATH`      | `icvlp_v0.1.json`       |
    /// | `ICVLP_VIDEO_DIR`         | `videos`                |
    /// | `ICVLP_FRAMES_DIR`        | `frames`                |
    /// | `ICVLP_ANNOTATIONS_DIR`   | `annotations`           |
    /// | `ICVLP_BACKUP_DIR`        | unset                   |
    /// | `ICVLP_DOWNLOADER`        | `yt-dlp`                |
    /// | `ICVLP_DOWNLOAD_LOG`      | `downloaded_videos.txt` |
    /// | `ICVLP_ANNOTATION_STEP`   | `5`                     |
    /// | `ICVLP_SAVE_EVERY_INSERT` | `true`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`PipelineConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let path = |var: &str, default: PathBuf| lookup(var).map(PathBuf::from).unwrap_or(default);

        let annotation_step = match lookup("ICVLP_ANNOTATION_STEP") {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(step) if step > 0 => step,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "ICVLP_ANNOTATION_STEP",
                        value,
                    })
                }
            },
            None => defaults.annotation_step,
        };

        let save_policy = match lookup("ICVLP_SAVE_EVERY_INSERT") {
            Some(value) => match parse_bool(&value) {
                Some(true) => SavePolicy::EveryInsert,
                Some(false) => SavePolicy::AtEnd,
                None => {
                    return Err(ConfigError::Invalid {
                        var: "ICVLP_SAVE_EVERY_INSERT",
                        value,
                    })
                }
            },
            None => defaults.save_policy,
        };

        Ok(Self {
            dataset_path: path("ICVLP_DATASET_PATH", defaults.dataset_path),
            video_dir: path("ICVLP_VIDEO_DIR", defaults.video_dir),
            frames_dir: path("ICVLP_FRAMES_DIR", defaults.frames_dir),
            annotations_dir: path("ICVLP_ANNOTATIONS_DIR", defaults.annotations_dir),
            backup_dir: lookup("ICVLP_BACKUP_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            downloader: lookup("ICVLP_DOWNLOADER").unwrap_or(defaults.downloader),
            download_log: path("ICVLP_DOWNLOAD_LOG", defaults.download_log),
            annotation_step,
            save_policy,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.dataset_path, PathBuf::from("icvlp_v0.1.json"));
        assert_eq!(cfg.annotation_step, 5);
        assert_eq!(cfg.save_policy, SavePolicy::EveryInsert);
        assert!(cfg.backup_dir.is_none());
        assert_eq!(cfg.downloader, "yt-dlp");
    }

    #[test]
    fn overrides_from_variables() {
        let cfg = PipelineConfig::from_lookup(lookup(&[
            ("ICVLP_DATASET_PATH", "/data/icvlp.json"),
            ("ICVLP_BACKUP_DIR", "backup"),
            ("ICVLP_ANNOTATION_STEP", "10"),
            ("ICVLP_SAVE_EVERY_INSERT", "false"),
            ("ICVLP_DOWNLOADER", "youtube-dl"),
        ]))
        .unwrap();
        assert_eq!(cfg.dataset_path, PathBuf::from("/data/icvlp.json"));
        assert_eq!(cfg.backup_dir, Some(PathBuf::from("backup")));
        assert_eq!(cfg.annotation_step, 10);
        assert_eq!(cfg.save_policy, SavePolicy::AtEnd);
        assert_eq!(cfg.downloader, "youtube-dl");
    }

    #[test]
    fn zero_step_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[("ICVLP_ANNOTATION_STEP", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("ICVLP_ANNOTATION_STEP"));
    }

    #[test]
    fn bad_bool_rejected() {
        assert!(
            PipelineConfig::from_lookup(lookup(&[("ICVLP_SAVE_EVERY_INSERT", "maybe")])).is_err()
        );
    }
}
