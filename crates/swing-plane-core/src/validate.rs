//! Field readers for untrusted JSON coming from the vision model and from
//! input files.
//!
//! Every field access at a capability boundary goes through one of these
//! helpers; none of them panic, and anything that does not validate comes back
//! as `None`.

use std::str::FromStr;

use nalgebra::Point2;
use serde_json::Value;

/// Values with a magnitude above this are assumed to be on a 0–100 scale.
pub const PERCENT_SCALE_THRESHOLD: f32 = 1.5;

/// Read a finite number. Numeric strings are accepted.
pub fn read_number(v: &Value) -> Option<f32> {
    let x = match v {
        Value::Number(n) => n.as_f64()? as f32,
        Value::String(s) => s.trim().parse::<f32>().ok()?,
        _ => return None,
    };
    x.is_finite().then_some(x)
}

/// Bring a raw coordinate into `[0, 1]`, reinterpreting percent-scale values.
pub fn normalize_coord(x: f32) -> Option<f32> {
    if !x.is_finite() {
        return None;
    }
    let x = if x.abs() > PERCENT_SCALE_THRESHOLD {
        x / 100.0
    } else {
        x
    };
    Some(x.clamp(0.0, 1.0))
}

/// Read one normalized coordinate.
pub fn read_coord(v: &Value) -> Option<f32> {
    normalize_coord(read_number(v)?)
}

/// Read a point given either as `{"x": .., "y": ..}` or as `[x, y]`.
pub fn read_point(v: &Value) -> Option<Point2<f32>> {
    let (x, y) = match v {
        Value::Object(obj) => (obj.get("x")?, obj.get("y")?),
        Value::Array(arr) if arr.len() >= 2 => (&arr[0], &arr[1]),
        _ => return None,
    };
    Some(Point2::new(read_coord(x)?, read_coord(y)?))
}

/// Read `obj[key]` as a point.
pub fn read_field_point(obj: &Value, key: &str) -> Option<Point2<f32>> {
    obj.get(key).and_then(read_point)
}

/// Read a string field and parse it into an enum.
pub fn read_enum<T: FromStr>(v: &Value) -> Option<T> {
    v.as_str().and_then(|s| s.parse::<T>().ok())
}

/// Read a confidence in `(0, 1]`; percent-scale values are rescaled.
pub fn read_confidence(v: &Value) -> Option<f32> {
    let c = read_number(v)?;
    let c = if c > PERCENT_SCALE_THRESHOLD { c / 100.0 } else { c };
    (c > 0.0).then(|| c.min(1.0))
}

/// Read a non-negative integer index.
pub fn read_index(v: &Value) -> Option<u32> {
    let x = read_number(v)?;
    (x >= 0.0 && x <= u32::MAX as f32 && x.fract() == 0.0).then_some(x as u32)
}
