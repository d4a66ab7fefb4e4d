//! Per-frame body landmarks as delivered by the external pose model.

use std::collections::BTreeMap;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Handedness;
use crate::validate::read_point;

/// Named body landmark. Wire names are camelCase (`leftWrist`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Landmark {
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Landmark {
    pub const ALL: [Landmark; 12] = [
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
        Landmark::LeftWrist,
        Landmark::RightWrist,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Landmark::LeftShoulder => "leftShoulder",
            Landmark::RightShoulder => "rightShoulder",
            Landmark::LeftElbow => "leftElbow",
            Landmark::RightElbow => "rightElbow",
            Landmark::LeftWrist => "leftWrist",
            Landmark::RightWrist => "rightWrist",
            Landmark::LeftHip => "leftHip",
            Landmark::RightHip => "rightHip",
            Landmark::LeftKnee => "leftKnee",
            Landmark::RightKnee => "rightKnee",
            Landmark::LeftAnkle => "leftAnkle",
            Landmark::RightAnkle => "rightAnkle",
        }
    }

    /// Lead-side wrist: left for a right-handed golfer, right for a left-handed one.
    pub fn lead_wrist(handedness: Handedness) -> Landmark {
        match handedness {
            Handedness::Right => Landmark::LeftWrist,
            Handedness::Left => Landmark::RightWrist,
        }
    }

    pub fn trail_wrist(handedness: Handedness) -> Landmark {
        match handedness {
            Handedness::Right => Landmark::RightWrist,
            Handedness::Left => Landmark::LeftWrist,
        }
    }

    pub fn lead_shoulder(handedness: Handedness) -> Landmark {
        match handedness {
            Handedness::Right => Landmark::LeftShoulder,
            Handedness::Left => Landmark::RightShoulder,
        }
    }

    pub fn trail_shoulder(handedness: Handedness) -> Landmark {
        match handedness {
            Handedness::Right => Landmark::RightShoulder,
            Handedness::Left => Landmark::LeftShoulder,
        }
    }

    pub fn trail_hip(handedness: Handedness) -> Landmark {
        match handedness {
            Handedness::Right => Landmark::RightHip,
            Handedness::Left => Landmark::LeftHip,
        }
    }
}

/// Landmarks seen in one frame. Missing keys mean "not detected".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseSnapshot {
    points: BTreeMap<Landmark, Point2<f32>>,
}

impl PoseSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `{ "leftWrist": {"x":..,"y":..} | null, ... }` object.
    ///
    /// Unknown keys are ignored and invalid values are dropped; anything that
    /// is not an object yields an empty snapshot.
    pub fn from_json(value: &Value) -> Self {
        let mut snapshot = Self::new();
        let Some(obj) = value.as_object() else {
            return snapshot;
        };
        for lm in Landmark::ALL {
            if let Some(p) = obj.get(lm.wire_name()).and_then(read_point) {
                snapshot.points.insert(lm, p);
            }
        }
        snapshot
    }

    pub fn with(mut self, landmark: Landmark, p: Point2<f32>) -> Self {
        self.insert(landmark, p);
        self
    }

    /// Insert a landmark; non-finite points are ignored.
    pub fn insert(&mut self, landmark: Landmark, p: Point2<f32>) {
        if p.x.is_finite() && p.y.is_finite() {
            self.points.insert(landmark, p);
        }
    }

    pub fn get(&self, landmark: Landmark) -> Option<Point2<f32>> {
        self.points.get(&landmark).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Midpoint of two landmarks when both are present.
    pub fn midpoint(&self, a: Landmark, b: Landmark) -> Option<Point2<f32>> {
        let pa = self.get(a)?;
        let pb = self.get(b)?;
        Some(Point2::new(0.5 * (pa.x + pb.x), 0.5 * (pa.y + pb.y)))
    }

    pub fn shoulder_mid(&self) -> Option<Point2<f32>> {
        self.midpoint(Landmark::LeftShoulder, Landmark::RightShoulder)
    }

    pub fn hip_mid(&self) -> Option<Point2<f32>> {
        self.midpoint(Landmark::LeftHip, Landmark::RightHip)
    }

    pub fn shoulder_width(&self) -> Option<f32> {
        let l = self.get(Landmark::LeftShoulder)?;
        let r = self.get(Landmark::RightShoulder)?;
        Some((l - r).norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wire_snapshot_defensively() {
        let v = json!({
            "leftWrist": {"x": 0.4, "y": 0.6},
            "rightWrist": null,
            "leftShoulder": {"x": "0.3", "y": 0.2},
            "rightShoulder": {"x": 70, "y": 20},
            "leftHip": {"x": "bad", "y": 0.5},
            "nose": {"x": 0.5, "y": 0.1}
        });
        let pose = PoseSnapshot::from_json(&v);
        assert_eq!(pose.len(), 3);
        assert!(pose.get(Landmark::RightWrist).is_none());
        assert!(pose.get(Landmark::LeftHip).is_none());
        let rs = pose.get(Landmark::RightShoulder).expect("percent scale");
        assert!((rs.x - 0.7).abs() < 1e-6 && (rs.y - 0.2).abs() < 1e-6);
        assert!((pose.shoulder_width().expect("width") - 0.4).abs() < 1e-5);
    }

    #[test]
    fn non_object_is_empty() {
        assert!(PoseSnapshot::from_json(&json!([1, 2, 3])).is_empty());
        assert!(PoseSnapshot::from_json(&Value::Null).is_empty());
    }
}
