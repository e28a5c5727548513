//! Remove annotation sidecars whose frame image no longer exists.

use std::fs;
use std::path::Path;

use icvlp_core::naming::image_for_annotation;

use crate::error::PipelineError;

/// Prune every `.xml` in `annotations_dir` without a matching `.jpeg` in
/// `frames_dir`. Pruned files are moved into `backup_dir` when given,
/// deleted otherwise. Returns the pruned filenames, sorted.
pub fn prune_annotations(
    annotations_dir: &Path,
    frames_dir: &Path,
    backup_dir: Option<&Path>,
) -> Result<Vec<String>, PipelineError> {
    let entries = fs::read_dir(annotations_dir).map_err(|e| PipelineError::io(annotations_dir, e))?;

    let mut orphans = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(annotations_dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(image) = image_for_annotation(&name) else {
            continue;
        };
        if !frames_dir.join(&image).exists() {
            orphans.push(name);
        }
    }
    orphans.sort();

    if let Some(backup) = backup_dir {
        if !orphans.is_empty() {
            fs::create_dir_all(backup).map_err(|e| PipelineError::io(backup, e))?;
        }
    }

    for name in &orphans {
        let source = annotations_dir.join(name);
        match backup_dir {
            Some(backup) => {
                let target = backup.join(name);
                fs::rename(&source, &target).map_err(|e| PipelineError::io(&source, e))?;
                tracing::info!(file = %name, backup = %backup.display(), "Moved annotation without image");
            }
            None => {
                fs::remove_file(&source).map_err(|e| PipelineError::io(&source, e))?;
                tracing::info!(file = %name, "Removed annotation without image");
            }
        }
    }

    Ok(orphans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn deletes_orphans_without_backup() {
        let annotations = tempfile::tempdir().unwrap();
        let frames = tempfile::tempdir().unwrap();
        touch(annotations.path(), "0001_1_A1.xml");
        touch(annotations.path(), "0001_6_A1.xml");
        touch(annotations.path(), "readme.txt");
        touch(frames.path(), "0001_1_A1.jpeg");

        let pruned = prune_annotations(annotations.path(), frames.path(), None).unwrap();

        assert_eq!(pruned, vec!["0001_6_A1.xml"]);
        assert!(annotations.path().join("0001_1_A1.xml").exists());
        assert!(!annotations.path().join("0001_6_A1.xml").exists());
        assert!(annotations.path().join("readme.txt").exists());
    }

    #[test]
    fn moves_orphans_into_backup() {
        let annotations = tempfile::tempdir().unwrap();
        let frames = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let backup = root.path().join("backup_annotations");
        touch(annotations.path(), "0002_3_B2.xml");

        let pruned = prune_annotations(annotations.path(), frames.path(), Some(&backup)).unwrap();

        assert_eq!(pruned, vec!["0002_3_B2.xml"]);
        assert!(backup.join("0002_3_B2.xml").exists());
        assert!(!annotations.path().join("0002_3_B2.xml").exists());
    }

    #[test]
    fn nothing_to_prune() {
        let annotations = tempfile::tempdir().unwrap();
        let frames = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let backup = root.path().join("unused");
        let pruned = prune_annotations(annotations.path(), frames.path(), Some(&backup)).unwrap();
        assert!(pruned.is_empty());
        assert!(!backup.exists());
    }

    #[test]
    fn missing_annotations_dir_is_error() {
        let frames = tempfile::tempdir().unwrap();
        assert!(prune_annotations(Path::new("/nonexistent/annotations"), frames.path(), None).is_err());
    }
}
