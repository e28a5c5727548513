//! Vehicle categories a plate can be labeled with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Commercial vehicle category carrying a plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    SingleAxle,
    Bus,
    BoxTruck,
    SemiTrailer,
    PickupTruck,
    Minibus,
}

/// All vehicle types in labeling-menu order.
pub const ALL_VEHICLE_TYPES: &[VehicleType] = &[
    VehicleType::SingleAxle,
    VehicleType::Bus,
    VehicleType::BoxTruck,
    VehicleType::SemiTrailer,
    VehicleType::PickupTruck,
    VehicleType::Minibus,
];

/// All valid vehicle type strings.
const VALID_VEHICLE_TYPE_STRINGS: &[&str] = &[
    "single_axle",
    "bus",
    "box_truck",
    "semi_trailer",
    "pickup_truck",
    "minibus",
];

impl VehicleType {
    /// Return the vehicle type as its persisted snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleAxle => "single_axle",
            Self::Bus => "bus",
            Self::BoxTruck => "box_truck",
            Self::SemiTrailer => "semi_trailer",
            Self::PickupTruck => "pickup_truck",
            Self::Minibus => "minibus",
        }
    }
}

impl FromStr for VehicleType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_axle" => Ok(Self::SingleAxle),
            "bus" => Ok(Self::Bus),
            "box_truck" => Ok(Self::BoxTruck),
            "semi_trailer" => Ok(Self::SemiTrailer),
            "pickup_truck" => Ok(Self::PickupTruck),
            "minibus" => Ok(Self::Minibus),
            _ => Err(CoreError::Validation(format!(
                "Invalid vehicle type '{s}'. Must be one of: {}",
                VALID_VEHICLE_TYPE_STRINGS.join(", ")
            ))),
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
