//! Dataset: the full collection of annotated videos and its JSON persistence.
//!
//! The persisted document is a JSON array of videos:
//!
//! ```text
//! [
//!   {
//!     "video_id": "0001", "source": "...", "url": "...", "fps": 1,
//!     "plates": [
//!       {
//!         "label": "N123XYZ", "vehicle_type": null,
//!         "frame_start": 1, "frame_end": 10,
//!         "frames": [ {"frame": 5, "bbox": [1, 1, 90, 90]} ]
//!       }
//!     ]
//!   }
//! ]
//! ```
//!
//! Loading rebuilds the tree through the same `append` paths used by
//! callers, so every invariant (bbox shape, frame range, plate range,
//! video-id uniqueness) holds for hydrated datasets too.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::Value;

use crate::bbox::BoundingBox;
use crate::error::CoreError;
use crate::frame::Frame;
use crate::plate::Plate;
use crate::vehicle_type::VehicleType;
use crate::video::Video;

/// Ordered collection of videos with globally unique `video_id`s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Dataset {
    videos: Vec<Video>,
}

// ---------------------------------------------------------------------------
// Document records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrameRecord {
    frame: u32,
    bbox: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlateRecord {
    label: String,
    #[serde(default)]
    vehicle_type: Option<VehicleType>,
    frame_start: u32,
    frame_end: u32,
    #[serde(default)]
    frames: Vec<FrameRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VideoRecord {
    video_id: String,
    source: String,
    url: String,
    fps: u32,
    #[serde(default)]
    plates: Vec<PlateRecord>,
}

impl TryFrom<FrameRecord> for Frame {
    type Error = CoreError;

    fn try_from(record: FrameRecord) -> Result<Self, Self::Error> {
        Ok(Frame::new(record.frame, BoundingBox::coerce(&record.bbox)?))
    }
}

impl TryFrom<PlateRecord> for Plate {
    type Error = CoreError;

    fn try_from(record: PlateRecord) -> Result<Self, Self::Error> {
        let mut plate = Plate::new(
            &record.label,
            record.vehicle_type,
            record.frame_start,
            record.frame_end,
        )?;
        for frame in record.frames {
            plate.append(Frame::try_from(frame)?)?;
        }
        Ok(plate)
    }
}

impl TryFrom<VideoRecord> for Video {
    type Error = CoreError;

    fn try_from(record: VideoRecord) -> Result<Self, Self::Error> {
        let mut video = Video::new(&record.video_id, &record.source, &record.url, record.fps)?;
        for plate in record.plates {
            video.append(Plate::try_from(plate)?);
        }
        Ok(video)
    }
}

// ---------------------------------------------------------------------------
// Container operations
// ---------------------------------------------------------------------------

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    /// Mutable access for plate and frame edits. Video ids are read-only,
    /// so uniqueness cannot be broken through this.
    pub fn videos_mut(&mut self) -> impl Iterator<Item = &mut Video> {
        self.videos.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    fn contains_id(&self, video_id: &str) -> bool {
        self.videos.iter().any(|v| v.video_id() == video_id)
    }

    /// Append a video whose id is not yet present.
    pub fn append(&mut self, video: Video) -> Result<(), CoreError> {
        if self.contains_id(video.video_id()) {
            return Err(CoreError::DuplicateKey(video.video_id().to_string()));
        }
        self.videos.push(video);
        Ok(())
    }

    /// Append a batch of videos. The batch is rejected as a whole if any id
    /// collides with an existing video or with another video in the batch.
    pub fn extend<I>(&mut self, videos: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = Video>,
    {
        let batch: Vec<Video> = videos.into_iter().collect();
        let mut seen: HashSet<&str> = HashSet::with_capacity(batch.len());
        for video in &batch {
            let id = video.video_id();
            if self.contains_id(id) || !seen.insert(id) {
                return Err(CoreError::DuplicateKey(id.to_string()));
            }
        }
        self.videos.extend(batch);
        Ok(())
    }

    pub fn get_video_by_id(&self, video_id: &str) -> Option<&Video> {
        self.videos.iter().find(|v| v.video_id() == video_id)
    }

    pub fn get_video_by_id_mut(&mut self, video_id: &str) -> Option<&mut Video> {
        self.videos.iter_mut().find(|v| v.video_id() == video_id)
    }

    /// Like [`Dataset::get_video_by_id`], but a miss is a
    /// [`CoreError::NotFound`].
    pub fn require_video(&self, video_id: &str) -> Result<&Video, CoreError> {
        self.get_video_by_id(video_id)
            .ok_or_else(|| not_found(video_id))
    }

    pub fn require_video_mut(&mut self, video_id: &str) -> Result<&mut Video, CoreError> {
        self.get_video_by_id_mut(video_id)
            .ok_or_else(|| not_found(video_id))
    }

    pub fn remove_video(&mut self, video_id: &str) -> Option<Video> {
        let pos = self.videos.iter().position(|v| v.video_id() == video_id)?;
        Some(self.videos.remove(pos))
    }

    pub fn plate_count(&self) -> usize {
        self.videos.iter().map(|v| v.plates().len()).sum()
    }

    pub fn frame_count(&self) -> usize {
        self.videos.iter().map(Video::frame_count).sum()
    }

    // -----------------------------------------------------------------------
    // JSON persistence
    // -----------------------------------------------------------------------

    /// Parse a dataset document, validating every level as it is rebuilt.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let records: Vec<VideoRecord> = serde_json::from_str(json)?;
        let mut dataset = Self::new();
        for record in records {
            dataset.append(Video::try_from(record)?)?;
        }
        Ok(dataset)
    }

    /// Load a dataset document from disk.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let dataset = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            videos = dataset.len(),
            "Dataset loaded",
        );
        Ok(dataset)
    }

    /// Serialize to the canonical document: 2-space indent, canonical field
    /// order, non-ASCII escaped as `\uXXXX`, no trailing newline.
    pub fn to_json(&self) -> Result<String, CoreError> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiPrettyFormatter::default());
        self.serialize(&mut ser)?;
        // Every byte written is ASCII.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the document next to `path` and rename it into place, so an
    /// interrupted write never truncates the existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let tmp = temp_path(path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        tracing::debug!(
            path = %path.display(),
            videos = self.len(),
            "Dataset saved",
        );
        Ok(())
    }
}

/// Pretty printer that escapes every non-ASCII character as UTF-16
/// `\uXXXX` units, matching documents written by earlier tooling.
#[derive(Default)]
struct AsciiPrettyFormatter {
    inner: PrettyFormatter<'static>,
}

impl Formatter for AsciiPrettyFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..index].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

fn not_found(video_id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "Video",
        id: video_id.to_string(),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
