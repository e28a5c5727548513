//! Axis-aligned plate bounding boxes in pixel coordinates.
//!
//! A [`BoundingBox`] can only be obtained through a validating constructor,
//! so holding one is proof that `x_min < x_max` and `y_min < y_max`.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{CoreError, ShapeViolation};

/// Number of coordinates in a persisted bbox (`x_min, y_min, x_max, y_max`).
pub const BBOX_LEN: usize = 4;

/// `(x_min, y_min, x_max, y_max)` with a strictly positive width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    x_min: i64,
    y_min: i64,
    x_max: i64,
    y_max: i64,
}

impl BoundingBox {
    /// Build a box from integer coordinates, rejecting degenerate or
    /// inverted boxes.
    pub fn new(x_min: i64, y_min: i64, x_max: i64, y_max: i64) -> Result<Self, CoreError> {
        if x_min >= x_max || y_min >= y_max {
            return Err(ShapeViolation::Degenerate([x_min, y_min, x_max, y_max]).into());
        }
        Ok(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Build a box from a coordinate slice that must hold exactly four values.
    pub fn try_from_slice(coords: &[i64]) -> Result<Self, CoreError> {
        match coords {
            [x_min, y_min, x_max, y_max] => Self::new(*x_min, *y_min, *x_max, *y_max),
            _ => Err(ShapeViolation::WrongLength(coords.len()).into()),
        }
    }

    /// Build a box from loosely typed JSON coordinates.
    ///
    /// Integers pass through, finite floats are truncated toward zero and
    /// strings are parsed as an integer or a decimal number. Strings that do
    /// not parse fail with [`CoreError::Coercion`]; values that cannot be a
    /// number at all (bool, null, array, object) fail with
    /// [`CoreError::TypeMismatch`].
    pub fn coerce(coords: &[Value]) -> Result<Self, CoreError> {
        if coords.len() != BBOX_LEN {
            return Err(ShapeViolation::WrongLength(coords.len()).into());
        }
        let mut ints = [0i64; BBOX_LEN];
        for (index, value) in coords.iter().enumerate() {
            ints[index] = coerce_coordinate(index, value)?;
        }
        Self::try_from_slice(&ints)
    }

    /// Build a box from decimal coordinates (as read from XML sidecars),
    /// rounding each to the nearest integer, ties to even.
    pub fn from_rounded(coords: [f64; BBOX_LEN]) -> Result<Self, CoreError> {
        let mut ints = [0i64; BBOX_LEN];
        for (index, c) in coords.iter().enumerate() {
            ints[index] = float_to_int(index, c.round_ties_even())?;
        }
        Self::try_from_slice(&ints)
    }

    /// Build a box from detector output, truncating toward zero.
    pub fn from_detection(xyxy: [f32; BBOX_LEN]) -> Result<Self, CoreError> {
        let mut ints = [0i64; BBOX_LEN];
        for (index, c) in xyxy.iter().enumerate() {
            ints[index] = float_to_int(index, f64::from(*c).trunc())?;
        }
        Self::try_from_slice(&ints)
    }

    pub fn x_min(&self) -> i64 {
        self.x_min
    }

    pub fn y_min(&self) -> i64 {
        self.y_min
    }

    pub fn x_max(&self) -> i64 {
        self.x_max
    }

    pub fn y_max(&self) -> i64 {
        self.y_max
    }

    pub fn width(&self) -> i64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> i64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Coordinates in persisted order.
    pub fn as_array(&self) -> [i64; BBOX_LEN] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

impl Serialize for BoundingBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_array().serialize(serializer)
    }
}

fn coerce_coordinate(index: usize, value: &Value) -> Result<i64, CoreError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) => float_to_int(index, f.trunc()),
                None => Err(CoreError::Coercion {
                    index,
                    value: n.to_string(),
                }),
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(i);
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => float_to_int(index, f.trunc()),
                _ => Err(CoreError::Coercion {
                    index,
                    value: format!("{s:?}"),
                }),
            }
        }
        other => Err(CoreError::TypeMismatch {
            expected: "integer bbox coordinate",
            found: json_kind(other).to_string(),
        }),
    }
}

// `as` saturates, so range-check first to keep huge values from silently clamping.
fn float_to_int(index: usize, f: f64) -> Result<i64, CoreError> {
    if !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(CoreError::Coercion {
            index,
            value: f.to_string(),
        });
    }
    Ok(f as i64)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn values(v: Value) -> Vec<Value> {
        v.as_array().cloned().unwrap()
    }

    // -- new / try_from_slice ----------------------------------------------

    #[test]
    fn valid_box_accepted() {
        let bbox = BoundingBox::new(1, 1, 90, 90).unwrap();
        assert_eq!(bbox.as_array(), [1, 1, 90, 90]);
        assert_eq!(bbox.width(), 89);
        assert_eq!(bbox.height(), 89);
        assert_eq!(bbox.area(), 89 * 89);
    }

    #[test]
    fn inverted_box_rejected() {
        let err = BoundingBox::new(200, 200, 100, 100).unwrap_err();
        assert_matches!(
            err,
            CoreError::Shape(ShapeViolation::Degenerate([200, 200, 100, 100]))
        );
    }

    #[test]
    fn zero_width_box_rejected() {
        assert_matches!(
            BoundingBox::new(10, 0, 10, 5),
            Err(CoreError::Shape(ShapeViolation::Degenerate(_)))
        );
    }

    #[test]
    fn zero_height_box_rejected() {
        assert_matches!(
            BoundingBox::new(0, 7, 5, 7),
            Err(CoreError::Shape(ShapeViolation::Degenerate(_)))
        );
    }

    #[test]
    fn short_slice_rejected() {
        assert_matches!(
            BoundingBox::try_from_slice(&[1, 200]),
            Err(CoreError::Shape(ShapeViolation::WrongLength(2)))
        );
    }

    #[test]
    fn long_slice_rejected() {
        assert_matches!(
            BoundingBox::try_from_slice(&[1, 2, 3, 4, 5]),
            Err(CoreError::Shape(ShapeViolation::WrongLength(5)))
        );
    }

    // -- coerce ------------------------------------------------------------

    #[test]
    fn coerce_numeric_string_and_float() {
        let bbox = BoundingBox::coerce(&values(json!(["1", 1.2, 200, 200]))).unwrap();
        assert_eq!(bbox.as_array(), [1, 1, 200, 200]);
    }

    #[test]
    fn coerce_decimal_string_truncates() {
        let bbox = BoundingBox::coerce(&values(json!([" 3.9 ", 0, "10", 20.99]))).unwrap();
        assert_eq!(bbox.as_array(), [3, 0, 10, 20]);
    }

    #[test]
    fn coerce_non_numeric_string_fails() {
        let err = BoundingBox::coerce(&values(json!(["a string", 1, 200, 200]))).unwrap_err();
        assert_matches!(err, CoreError::Coercion { index: 0, .. });
    }

    #[test]
    fn coerce_nan_string_fails() {
        assert_matches!(
            BoundingBox::coerce(&values(json!([1, "NaN", 200, 200]))),
            Err(CoreError::Coercion { index: 1, .. })
        );
    }

    #[test]
    fn coerce_null_is_type_mismatch() {
        assert_matches!(
            BoundingBox::coerce(&values(json!([1, 1, null, 200]))),
            Err(CoreError::TypeMismatch { .. })
        );
    }

    #[test]
    fn coerce_bool_is_type_mismatch() {
        assert_matches!(
            BoundingBox::coerce(&values(json!([true, 1, 5, 200]))),
            Err(CoreError::TypeMismatch { .. })
        );
    }

    #[test]
    fn coerce_checks_length_first() {
        assert_matches!(
            BoundingBox::coerce(&values(json!(["x", 1]))),
            Err(CoreError::Shape(ShapeViolation::WrongLength(2)))
        );
    }

    #[test]
    fn coerce_still_checks_ordering() {
        assert_matches!(
            BoundingBox::coerce(&values(json!(["200", "200", "100", "100"]))),
            Err(CoreError::Shape(ShapeViolation::Degenerate(_)))
        );
    }

    // -- from_rounded / from_detection -------------------------------------

    #[test]
    fn rounded_coordinates() {
        let bbox = BoundingBox::from_rounded([10.4, 10.6, 99.6, 120.0]).unwrap();
        assert_eq!(bbox.as_array(), [10, 11, 100, 120]);
    }

    #[test]
    fn rounded_halves_go_to_even() {
        let bbox = BoundingBox::from_rounded([10.5, 20.5, 111.5, 60.0]).unwrap();
        assert_eq!(bbox.as_array(), [10, 20, 112, 60]);
    }

    #[test]
    fn rounded_rejects_infinite() {
        assert_matches!(
            BoundingBox::from_rounded([f64::INFINITY, 0.0, 1.0, 1.0]),
            Err(CoreError::Coercion { index: 0, .. })
        );
    }

    #[test]
    fn detection_truncates() {
        let bbox = BoundingBox::from_detection([10.9, 20.1, 110.99, 60.5]).unwrap();
        assert_eq!(bbox.as_array(), [10, 20, 110, 60]);
    }

    #[test]
    fn detection_collapsing_to_degenerate_rejected() {
        assert_matches!(
            BoundingBox::from_detection([10.2, 5.0, 10.8, 9.0]),
            Err(CoreError::Shape(ShapeViolation::Degenerate(_)))
        );
    }

    // -- serialization -----------------------------------------------------

    #[test]
    fn serializes_as_array() {
        let bbox = BoundingBox::new(1, 2, 3, 4).unwrap();
        assert_eq!(serde_json::to_value(bbox).unwrap(), json!([1, 2, 3, 4]));
        assert_eq!(bbox.to_string(), "[1, 2, 3, 4]");
    }
}
