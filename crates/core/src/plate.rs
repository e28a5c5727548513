//! Plate: one tracked license plate within a video, bounded to a frame range.
//!
//! Frames are kept in insertion order. Every frame number must lie in
//! `[frame_start, frame_end]`; violating frames are rejected, never clamped.

use serde::Serialize;

use crate::error::CoreError;
use crate::frame::Frame;
use crate::label::{normalize_label, LabelComposition};
use crate::vehicle_type::VehicleType;

/// A labeled plate and its annotated frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plate {
    label: String,
    vehicle_type: Option<VehicleType>,
    frame_start: u32,
    frame_end: u32,
    frames: Vec<Frame>,
}

impl Plate {
    /// Create an empty plate. The label is trimmed and upper-cased.
    pub fn new(
        label: &str,
        vehicle_type: Option<VehicleType>,
        frame_start: u32,
        frame_end: u32,
    ) -> Result<Self, CoreError> {
        let label = normalize_label(label)?;
        if frame_start > frame_end {
            return Err(CoreError::InvalidPlateRange {
                label,
                frame_start,
                frame_end,
            });
        }
        Ok(Self {
            label,
            vehicle_type,
            frame_start,
            frame_end,
            frames: Vec::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vehicle_type(&self) -> Option<VehicleType> {
        self.vehicle_type
    }

    /// Back-fill or clear the vehicle type.
    pub fn set_vehicle_type(&mut self, vehicle_type: Option<VehicleType>) {
        self.vehicle_type = vehicle_type;
    }

    pub fn frame_start(&self) -> u32 {
        self.frame_start
    }

    pub fn frame_end(&self) -> u32 {
        self.frame_end
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Split the label into region, number and suffix.
    pub fn composition(&self) -> Option<LabelComposition> {
        LabelComposition::parse(&self.label)
    }

    /// Whether `frame_number` lies in this plate's declared range.
    pub fn in_range(&self, frame_number: u32) -> bool {
        (self.frame_start..=self.frame_end).contains(&frame_number)
    }

    fn check_range(&self, frame: &Frame) -> Result<(), CoreError> {
        if self.in_range(frame.frame_number()) {
            return Ok(());
        }
        Err(CoreError::RangeViolation {
            label: self.label.clone(),
            frame: frame.frame_number(),
            frame_start: self.frame_start,
            frame_end: self.frame_end,
            bbox: *frame.bbox(),
        })
    }

    /// Append a single frame after range-checking it.
    pub fn append(&mut self, frame: Frame) -> Result<(), CoreError> {
        self.check_range(&frame)?;
        self.frames.push(frame);
        Ok(())
    }

    /// Append a batch of frames. Nothing is added unless every frame passes.
    pub fn extend<I>(&mut self, frames: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = Frame>,
    {
        let batch: Vec<Frame> = frames.into_iter().collect();
        for frame in &batch {
            self.check_range(frame)?;
        }
        self.frames.extend(batch);
        Ok(())
    }

    /// Whether a frame with this number has already been annotated.
    pub fn contains_frame_number(&self, frame_number: u32) -> bool {
        self.frames
            .iter()
            .any(|f| f.frame_number() == frame_number)
    }

    /// First frame with this number, in insertion order.
    pub fn frame(&self, frame_number: u32) -> Option<&Frame> {
        self.frames
            .iter()
            .find(|f| f.frame_number() == frame_number)
    }

    pub fn frame_mut(&mut self, frame_number: u32) -> Option<&mut Frame> {
        self.frames
            .iter_mut()
            .find(|f| f.frame_number() == frame_number)
    }

    pub fn frame_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.frames.iter().map(Frame::frame_number)
    }

    /// Frame numbers from `frame_start` to `frame_end` inclusive, every
    /// `step` frames. A step of zero is treated as one.
    pub fn sampled_frame_numbers(&self, step: u32) -> impl Iterator<Item = u32> {
        (self.frame_start..=self.frame_end).step_by(step.max(1) as usize)
    }

    /// Remove the first frame with this number.
    pub fn remove_frame(&mut self, frame_number: u32) -> Option<Frame> {
        let pos = self
            .frames
            .iter()
            .position(|f| f.frame_number() == frame_number)?;
        Some(self.frames.remove(pos))
    }

    /// Drop every annotated frame, keeping the plate itself.
    pub fn clear_frames(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn plate() -> Plate {
        Plate::new("N123XYZ", None, 1, 10).unwrap()
    }

    fn frame(n: u32) -> Frame {
        Frame::from_coords(n, &[1, 1, 90, 90]).unwrap()
    }

    // -- construction ------------------------------------------------------

    #[test]
    fn label_is_upper_cased() {
        let p = Plate::new(" b1234xyz", Some(VehicleType::Bus), 0, 0).unwrap();
        assert_eq!(p.label(), "B1234XYZ");
        assert_eq!(p.vehicle_type(), Some(VehicleType::Bus));
    }

    #[test]
    fn inverted_range_rejected() {
        assert_matches!(
            Plate::new("X1", None, 20, 10),
            Err(CoreError::InvalidPlateRange {
                frame_start: 20,
                frame_end: 10,
                ..
            })
        );
    }

    #[test]
    fn empty_label_rejected() {
        assert_matches!(Plate::new("", None, 1, 2), Err(CoreError::Validation(_)));
    }

    // -- append ------------------------------------------------------------

    #[test]
    fn append_within_range() {
        let mut p = plate();
        p.append(frame(5)).unwrap();
        p.append(frame(1)).unwrap();
        p.append(frame(10)).unwrap();
        assert_eq!(p.frame_numbers().collect::<Vec<_>>(), vec![5, 1, 10]);
    }

    #[test]
    fn append_out_of_range_leaves_frames_unchanged() {
        let mut p = plate();
        p.append(frame(5)).unwrap();
        let err = p.append(frame(20)).unwrap_err();
        assert_matches!(
            err,
            CoreError::RangeViolation {
                frame: 20,
                frame_start: 1,
                frame_end: 10,
                ..
            }
        );
        assert!(err.to_string().contains("[1, 1, 90, 90]"));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn append_below_range_rejected() {
        let mut p = Plate::new("Y1", None, 1000, 2000).unwrap();
        assert!(p.append(frame(999)).is_err());
        assert!(p.is_empty());
    }

    // -- extend ------------------------------------------------------------

    #[test]
    fn extend_adds_whole_batch() {
        let mut p = plate();
        p.extend(vec![frame(2), frame(4)]).unwrap();
        assert_eq!(p.frames(), &[frame(2), frame(4)]);
    }

    #[test]
    fn extend_is_all_or_nothing() {
        let mut p = plate();
        p.append(frame(3)).unwrap();
        let err = p.extend(vec![frame(4), frame(11), frame(5)]).unwrap_err();
        assert_matches!(err, CoreError::RangeViolation { frame: 11, .. });
        assert_eq!(p.frame_numbers().collect::<Vec<_>>(), vec![3]);
    }

    // -- queries -----------------------------------------------------------

    #[test]
    fn contains_frame_number_lookup() {
        let mut p = plate();
        p.append(frame(7)).unwrap();
        assert!(p.contains_frame_number(7));
        assert!(!p.contains_frame_number(8));
        assert_eq!(p.frame(7), Some(&frame(7)));
        assert!(p.frame(8).is_none());
    }

    #[test]
    fn sampled_frames_include_start_and_step() {
        let p = plate();
        assert_eq!(
            p.sampled_frame_numbers(5).collect::<Vec<_>>(),
            vec![1, 6]
        );
        assert_eq!(p.sampled_frame_numbers(0).count(), 10);
    }

    #[test]
    fn composition_from_label() {
        let p = plate();
        let c = p.composition().unwrap();
        assert_eq!((c.region.as_str(), c.number.as_str(), c.suffix.as_str()), ("N", "123", "XYZ"));
    }

    // -- removal -----------------------------------------------------------

    #[test]
    fn remove_frame_by_number() {
        let mut p = plate();
        p.extend(vec![frame(2), frame(3)]).unwrap();
        assert_eq!(p.remove_frame(2), Some(frame(2)));
        assert_eq!(p.remove_frame(2), None);
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn clear_frames_keeps_plate() {
        let mut p = plate();
        p.append(frame(2)).unwrap();
        p.clear_frames();
        assert!(p.is_empty());
        assert_eq!(p.label(), "N123XYZ");
    }

    #[test]
    fn vehicle_type_backfill() {
        let mut p = plate();
        p.set_vehicle_type(Some(VehicleType::BoxTruck));
        assert_eq!(p.vehicle_type(), Some(VehicleType::BoxTruck));
    }

    #[test]
    fn frame_mut_allows_bbox_refinement() {
        let mut p = plate();
        p.append(frame(4)).unwrap();
        let refined = crate::bbox::BoundingBox::new(5, 5, 50, 50).unwrap();
        p.frame_mut(4).unwrap().set_bbox(refined);
        assert_eq!(p.frame(4).unwrap().bbox(), &refined);
    }
}
