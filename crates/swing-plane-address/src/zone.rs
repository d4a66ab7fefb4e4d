//! Address-zone records and the multi-frame merge.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use swing_plane_core::{median_point, ConfidenceTier, NormPoint};

/// A located point with its confidence tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TieredPoint {
    #[serde(flatten)]
    pub point: NormPoint,
    pub tier: ConfidenceTier,
}

impl TieredPoint {
    pub fn new(p: Point2<f32>, tier: ConfidenceTier) -> Self {
        Self {
            point: p.into(),
            tier,
        }
    }

    pub fn position(&self) -> Point2<f32> {
        self.point.into()
    }
}

/// Named fields of an [`AddressZone`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    Clubhead,
    Grip,
    Ball,
    Shoulder,
    SideShoulder,
    SideHip,
}

impl AddressField {
    pub const ALL: [AddressField; 6] = [
        AddressField::Clubhead,
        AddressField::Grip,
        AddressField::Ball,
        AddressField::Shoulder,
        AddressField::SideShoulder,
        AddressField::SideHip,
    ];
}

/// Calibration landmarks of the setup position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressZone {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clubhead: Option<TieredPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grip: Option<TieredPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ball: Option<TieredPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shoulder: Option<TieredPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_shoulder: Option<TieredPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_hip: Option<TieredPoint>,
}

impl AddressZone {
    pub fn get(&self, field: AddressField) -> Option<TieredPoint> {
        match field {
            AddressField::Clubhead => self.clubhead,
            AddressField::Grip => self.grip,
            AddressField::Ball => self.ball,
            AddressField::Shoulder => self.shoulder,
            AddressField::SideShoulder => self.side_shoulder,
            AddressField::SideHip => self.side_hip,
        }
    }

    pub fn set(&mut self, field: AddressField, value: Option<TieredPoint>) {
        let slot = match field {
            AddressField::Clubhead => &mut self.clubhead,
            AddressField::Grip => &mut self.grip,
            AddressField::Ball => &mut self.ball,
            AddressField::Shoulder => &mut self.shoulder,
            AddressField::SideShoulder => &mut self.side_shoulder,
            AddressField::SideHip => &mut self.side_hip,
        };
        *slot = value;
    }

    /// Fill a field only when it is still empty.
    pub fn fill(&mut self, field: AddressField, value: Option<TieredPoint>) {
        if self.get(field).is_none() {
            self.set(field, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        AddressField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// Clubhead, falling back to the ball.
    pub fn anchor(&self) -> Option<TieredPoint> {
        self.clubhead.or(self.ball)
    }
}

/// Merge per-frame zones field by field.
///
/// Each field keeps only the values of its best tier; their component-wise
/// median is the merged position.
pub fn merge_zones(zones: &[AddressZone]) -> AddressZone {
    let mut merged = AddressZone::default();
    for field in AddressField::ALL {
        let values: Vec<TieredPoint> = zones.iter().filter_map(|z| z.get(field)).collect();
        let Some(best) = values.iter().map(|v| v.tier).max() else {
            continue;
        };
        let points: Vec<Point2<f32>> = values
            .iter()
            .filter(|v| v.tier == best)
            .map(TieredPoint::position)
            .collect();
        merged.set(field, median_point(&points).map(|p| TieredPoint::new(p, best)));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(x: f32, y: f32, tier: ConfidenceTier) -> Option<TieredPoint> {
        Some(TieredPoint::new(Point2::new(x, y), tier))
    }

    #[test]
    fn merge_prefers_tier_then_median() {
        let zones = [
            AddressZone {
                ball: tp(0.70, 0.90, ConfidenceTier::Medium),
                grip: tp(0.50, 0.60, ConfidenceTier::Low),
                ..AddressZone::default()
            },
            AddressZone {
                ball: tp(0.72, 0.88, ConfidenceTier::High),
                ..AddressZone::default()
            },
            AddressZone {
                ball: tp(0.74, 0.86, ConfidenceTier::High),
                grip: tp(0.52, 0.62, ConfidenceTier::Low),
                ..AddressZone::default()
            },
        ];
        let merged = merge_zones(&zones);
        let ball = merged.ball.expect("ball");
        assert_eq!(ball.tier, ConfidenceTier::High);
        assert!((ball.point.x - 0.73).abs() < 1e-6);
        let grip = merged.grip.expect("grip");
        assert!((grip.point.y - 0.61).abs() < 1e-6);
        assert!(merged.clubhead.is_none());
        assert!(merge_zones(&[]).is_empty());
    }

    #[test]
    fn fill_keeps_existing_values() {
        let mut zone = AddressZone {
            shoulder: tp(0.4, 0.3, ConfidenceTier::High),
            ..AddressZone::default()
        };
        zone.fill(AddressField::Shoulder, tp(0.1, 0.1, ConfidenceTier::Medium));
        zone.fill(AddressField::SideHip, tp(0.6, 0.6, ConfidenceTier::Medium));
        assert_eq!(zone.shoulder.expect("shoulder").tier, ConfidenceTier::High);
        assert!(zone.side_hip.is_some());
        assert_eq!(zone.anchor(), None);
    }
}
