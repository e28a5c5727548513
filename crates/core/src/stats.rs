//! Dataset statistics.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::dataset::Dataset;

/// Key used for plates without a vehicle type.
pub const UNLABELED_VEHICLE_TYPE: &str = "none";

/// Counts over a whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub video_count: usize,
    pub plate_count: usize,
    /// Distinct plate labels, in first-seen order.
    pub distinct_plates: Vec<String>,
    pub frame_count: usize,
    /// Vehicle types counted once per distinct label; the first plate seen
    /// with a label decides its type.
    pub vehicle_type_count: BTreeMap<String, usize>,
}

impl DatasetStats {
    pub fn collect(dataset: &Dataset) -> Self {
        let mut stats = Self::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for video in dataset.videos() {
            stats.video_count += 1;
            for plate in video.plates() {
                stats.plate_count += 1;
                stats.frame_count += plate.len();
                if seen.insert(plate.label()) {
                    stats.distinct_plates.push(plate.label().to_string());
                    let key = plate
                        .vehicle_type()
                        .map_or(UNLABELED_VEHICLE_TYPE, |vt| vt.as_str());
                    *stats.vehicle_type_count.entry(key.to_string()).or_default() += 1;
                }
            }
        }

        stats
    }
}

impl fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of videos: {}", self.video_count)?;
        writeln!(f, "Number of plates: {}", self.plate_count)?;
        writeln!(f, "Number of distinct plates: {}", self.distinct_plates.len())?;
        writeln!(f, "Number of frames: {}", self.frame_count)?;
        writeln!(f, "Number of vehicles by type:")?;
        for (vehicle_type, count) in &self.vehicle_type_count {
            writeln!(f, "  {vehicle_type}: {count}")?;
        }
        Ok(())
    }
}
