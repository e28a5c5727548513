//! Plate-level edits: registering plates and back-filling vehicle types.

use icvlp_core::{CoreError, Dataset, Plate, VehicleType};

/// Result of [`add_plate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPlateOutcome {
    Added,
    /// The video already has a plate with this label; nothing changed.
    AlreadyLabeled,
}

/// Register a new plate on `video_id`.
pub fn add_plate(
    dataset: &mut Dataset,
    video_id: &str,
    label: &str,
    vehicle_type: Option<VehicleType>,
    frame_start: u32,
    frame_end: u32,
) -> Result<AddPlateOutcome, CoreError> {
    let plate = Plate::new(label, vehicle_type, frame_start, frame_end)?;
    let video = dataset.require_video_mut(video_id)?;

    if video.contains_plate_label(plate.label()) {
        tracing::info!(video_id, label = %plate.label(), "Plate already labeled");
        return Ok(AddPlateOutcome::AlreadyLabeled);
    }

    tracing::info!(
        video_id,
        label = %plate.label(),
        frame_start,
        frame_end,
        "Plate added",
    );
    video.append(plate);
    Ok(AddPlateOutcome::Added)
}

/// Set (or clear) the vehicle type of a plate.
pub fn set_vehicle_type(
    dataset: &mut Dataset,
    video_id: &str,
    label: &str,
    vehicle_type: Option<VehicleType>,
) -> Result<(), CoreError> {
    let plate = dataset
        .require_video_mut(video_id)?
        .require_plate_mut(label)?;
    plate.set_vehicle_type(vehicle_type);
    tracing::info!(
        video_id,
        label = %plate.label(),
        vehicle_type = vehicle_type.map_or("none", |vt| vt.as_str()),
        "Vehicle type set",
    );
    Ok(())
}

/// `(video_id, label)` of every plate without a vehicle type, in dataset order.
pub fn unlabeled_plates(dataset: &Dataset) -> Vec<(String, String)> {
    dataset
        .videos()
        .iter()
        .flat_map(|video| {
            video
                .plates()
                .iter()
                .filter(|p| p.vehicle_type().is_none())
                .map(move |p| (video.video_id().to_string(), p.label().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use icvlp_core::Video;

    fn dataset() -> Dataset {
        let mut dataset = Dataset::new();
        let mut video = Video::new("0001", "youtube", "https://youtu.be/a", 5).unwrap();
        video.append(Plate::new("B1234XYZ", Some(VehicleType::Bus), 0, 50).unwrap());
        video.append(Plate::new("D77AB", None, 10, 20).unwrap());
        dataset.append(video).unwrap();
        dataset
            .append(Video::new("0002", "youtube", "https://youtu.be/b", 5).unwrap())
            .unwrap();
        dataset
    }

    // -- add_plate ---

    #[test]
    fn adds_normalized_plate() {
        let mut ds = dataset();
        let outcome = add_plate(&mut ds, "0002", " l9x ", None, 3, 9).unwrap();
        assert_eq!(outcome, AddPlateOutcome::Added);
        let video = ds.get_video_by_id("0002").unwrap();
        assert_eq!(video.plates()[0].label(), "L9X");
    }

    #[test]
    fn existing_label_is_not_duplicated() {
        let mut ds = dataset();
        let outcome = add_plate(&mut ds, "0001", "b1234xyz", None, 0, 1).unwrap();
        assert_eq!(outcome, AddPlateOutcome::AlreadyLabeled);
        assert_eq!(ds.get_video_by_id("0001").unwrap().plates().len(), 2);
    }

    #[test]
    fn unknown_video_is_not_found() {
        let mut ds = dataset();
        let err = add_plate(&mut ds, "9999", "A1", None, 0, 1).unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "Video", .. });
    }

    #[test]
    fn inverted_range_rejected() {
        let mut ds = dataset();
        let err = add_plate(&mut ds, "0002", "A1", None, 9, 3).unwrap_err();
        assert_matches!(err, CoreError::InvalidPlateRange { .. });
    }

    // -- vehicle types ---

    #[test]
    fn sets_and_lists_vehicle_types() {
        let mut ds = dataset();
        assert_eq!(
            unlabeled_plates(&ds),
            vec![("0001".to_string(), "D77AB".to_string())]
        );

        set_vehicle_type(&mut ds, "0001", "d77ab", Some(VehicleType::PickupTruck)).unwrap();
        assert!(unlabeled_plates(&ds).is_empty());
        let plate = ds.get_video_by_id("0001").unwrap().plate_by_label("D77AB").unwrap();
        assert_eq!(plate.vehicle_type(), Some(VehicleType::PickupTruck));
    }

    #[test]
    fn unknown_plate_is_not_found() {
        let mut ds = dataset();
        let err = set_vehicle_type(&mut ds, "0001", "ZZZ", None).unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "Plate", .. });
    }
}
