//! `icvlp-core` -- typed model of the ICVLP license-plate video dataset.
//!
//! The hierarchy is [`Dataset`] → [`Video`] → [`Plate`] → [`Frame`].
//! Containers only grow through their `append` / `extend` methods, which
//! is where invariants are enforced:
//!
//! - a [`BoundingBox`] always has `x_min < x_max` and `y_min < y_max`,
//! - a plate only holds frames inside `[frame_start, frame_end]`,
//! - `video_id` is unique across a dataset.
//!
//! The dataset persists as a single JSON document (see [`dataset`]).

pub mod annotation;
pub mod bbox;
pub mod dataset;
pub mod error;
pub mod frame;
pub mod label;
pub mod naming;
pub mod plate;
pub mod stats;
pub mod vehicle_type;
pub mod video;

pub use bbox::BoundingBox;
pub use dataset::Dataset;
pub use error::{CoreError, ShapeViolation};
pub use frame::Frame;
pub use plate::Plate;
pub use vehicle_type::VehicleType;
pub use video::Video;
