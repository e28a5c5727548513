//! Video: a source recording and the plates labeled in it.

use serde::Serialize;

use crate::error::CoreError;
use crate::frame::Frame;
use crate::label::normalize_label;
use crate::plate::Plate;

/// A source video with its plates.
///
/// Plates are not constrained by any video-level bound. Labels are not
/// required to be unique, but tooling treats them as a key when checking
/// whether a plate has already been labeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
    video_id: String,
    source: String,
    url: String,
    fps: u32,
    plates: Vec<Plate>,
}

impl Video {
    /// Create a video with no plates. `fps` is the sampling rate used when
    /// extracting frames and must be positive.
    pub fn new(video_id: &str, source: &str, url: &str, fps: u32) -> Result<Self, CoreError> {
        if video_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "video_id must not be empty".to_string(),
            ));
        }
        if fps == 0 {
            return Err(CoreError::Validation(format!(
                "fps of video {video_id} must be greater than 0"
            )));
        }
        Ok(Self {
            video_id: video_id.to_string(),
            source: source.to_string(),
            url: url.to_string(),
            fps,
            plates: Vec::new(),
        })
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    /// Mutable access to the plates for frame-level edits. The plate list
    /// itself only grows through [`Video::append`] / [`Video::extend`].
    pub fn plates_mut(&mut self) -> impl Iterator<Item = &mut Plate> {
        self.plates.iter_mut()
    }

    pub fn append(&mut self, plate: Plate) {
        self.plates.push(plate);
    }

    pub fn extend<I>(&mut self, plates: I)
    where
        I: IntoIterator<Item = Plate>,
    {
        self.plates.extend(plates);
    }

    /// First plate whose label matches once `label` is normalized.
    pub fn plate_by_label(&self, label: &str) -> Option<&Plate> {
        let pos = self.plate_position(label)?;
        self.plates.get(pos)
    }

    pub fn plate_by_label_mut(&mut self, label: &str) -> Option<&mut Plate> {
        let pos = self.plate_position(label)?;
        self.plates.get_mut(pos)
    }

    /// Stored labels are already normalized, so a plain comparison suffices.
    fn plate_position(&self, label: &str) -> Option<usize> {
        let label = normalize_label(label).ok()?;
        self.plates.iter().position(|p| p.label() == label)
    }

    /// Like [`Video::plate_by_label_mut`], but a miss is a
    /// [`CoreError::NotFound`].
    pub fn require_plate_mut(&mut self, label: &str) -> Result<&mut Plate, CoreError> {
        let video_id = self.video_id.clone();
        self.plate_by_label_mut(label)
            .ok_or_else(|| CoreError::NotFound {
                entity: "Plate",
                id: format!("{video_id}/{}", label.trim().to_uppercase()),
            })
    }

    pub fn contains_plate_label(&self, label: &str) -> bool {
        self.plate_by_label(label).is_some()
    }

    /// Every frame of every plate: plate order, then insertion order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.plates.iter().flat_map(|p| p.frames().iter())
    }

    pub fn frame_count(&self) -> usize {
        self.plates.iter().map(Plate::len).sum()
    }

    /// Remove the first plate whose label matches, ignoring case.
    pub fn remove_plate(&mut self, label: &str) -> Option<Plate> {
        let pos = self.plate_position(label)?;
        Some(self.plates.remove(pos))
    }
}
