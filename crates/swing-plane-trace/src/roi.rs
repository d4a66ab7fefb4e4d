//! Region-of-interest gate: the expected hand zone in body-relative units.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use swing_plane_core::PoseSnapshot;

use crate::normalize::Transform;
use crate::params::RoiParams;

/// What the ROI centre was anchored to on a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiAnchor {
    Hips,
    Shoulders,
    /// No body anchor; the previous centre is carried with a grown radius.
    Carried,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiState {
    /// Local coordinates.
    pub center: Point2<f32>,
    /// Multiplier on the gate radius, `>= 1`.
    pub scale: f32,
    /// Consecutive frames (including this one) without a body anchor.
    pub missing_streak: u32,
    pub anchor: RoiAnchor,
    /// `false` once too many anchors in a row are missing.
    pub gate_active: bool,
}

/// Radius multiplier after `missing_streak` frames without an anchor.
///
/// Non-decreasing in the streak and capped at the last growth step.
pub fn growth_factor(missing_streak: u32, params: &RoiParams) -> f32 {
    let [g1, g2, g3] = params.missing_growth;
    match missing_streak {
        0 => 1.0,
        1 => g1,
        2 => g2.max(g1),
        _ => g3.max(g2).max(g1),
    }
}

fn anchor_center(
    pose: &PoseSnapshot,
    transform: &Transform,
    params: &RoiParams,
) -> Option<(Point2<f32>, RoiAnchor)> {
    if let Some(hips) = pose.hip_mid() {
        let local = transform.to_local(hips);
        let c = Point2::from(local.coords * params.hip_anchor_scale);
        if c.x.is_finite() && c.y > params.hip_anchor_y_min && c.y < params.hip_anchor_y_max {
            return Some((c, RoiAnchor::Hips));
        }
    }
    let body_visible = pose.shoulder_mid().is_some() || pose.hip_mid().is_some();
    body_visible.then(|| {
        let [x, y] = params.shoulder_fallback_center;
        (Point2::new(x, y), RoiAnchor::Shoulders)
    })
}

/// Track the ROI centre and radius scale across frames.
pub fn track_roi(
    poses: &[PoseSnapshot],
    transforms: &[Transform],
    frames: usize,
    params: &RoiParams,
) -> Vec<RoiState> {
    let [fx, fy] = params.shoulder_fallback_center;
    let mut center = Point2::new(fx, fy);
    let mut streak = 0u32;
    let empty = PoseSnapshot::new();
    (0..frames)
        .map(|i| {
            let pose = poses.get(i).unwrap_or(&empty);
            let transform = transforms.get(i).copied().unwrap_or_else(Transform::identity);
            let anchor = match anchor_center(pose, &transform, params) {
                Some((c, anchor)) => {
                    center = c;
                    streak = 0;
                    anchor
                }
                None => {
                    streak = streak.saturating_add(1);
                    RoiAnchor::Carried
                }
            };
            RoiState {
                center,
                scale: growth_factor(streak, params),
                missing_streak: streak,
                anchor,
                gate_active: streak < params.disable_after_missing,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use swing_plane_core::Landmark;

    fn body() -> PoseSnapshot {
        PoseSnapshot::new()
            .with(Landmark::LeftShoulder, Point2::new(0.4, 0.3))
            .with(Landmark::RightShoulder, Point2::new(0.6, 0.3))
            .with(Landmark::LeftHip, Point2::new(0.45, 0.6))
            .with(Landmark::RightHip, Point2::new(0.55, 0.6))
    }

    #[test]
    fn growth_is_monotone_and_capped() {
        let params = RoiParams::default();
        let mut poses = vec![body()];
        poses.extend(std::iter::repeat(PoseSnapshot::new()).take(10));
        let transforms = vec![Transform::identity(); poses.len()];
        let states = track_roi(&poses, &transforms, poses.len(), &params);
        let mut prev = 0.0;
        for s in &states {
            assert!(s.scale >= prev);
            assert!(s.scale <= 1.8);
            prev = s.scale;
        }
        assert_relative_eq!(states[1].scale, 1.1);
        assert_relative_eq!(states[2].scale, 1.4);
        assert_relative_eq!(states[10].scale, 1.8);
        assert!(states[2].gate_active);
        assert!(!states[3].gate_active);
        assert_eq!(states[5].center, states[0].center);
    }

    #[test]
    fn hips_anchor_in_local_units() {
        let params = RoiParams::default();
        let pose = body();
        let t = Transform::from_pose(&pose, 1e-4).expect("shoulders");
        let states = track_roi(&[pose], &[t], 1, &params);
        assert_eq!(states[0].anchor, RoiAnchor::Hips);
        // Hips 0.3 below the shoulders at width 0.2: 1.5 local, halved.
        assert_relative_eq!(states[0].center.y, 0.75, epsilon = 1e-5);
        assert_relative_eq!(states[0].center.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn implausible_hips_fall_back_to_shoulder_centre() {
        let params = RoiParams::default();
        let pose = PoseSnapshot::new()
            .with(Landmark::LeftShoulder, Point2::new(0.45, 0.3))
            .with(Landmark::RightShoulder, Point2::new(0.55, 0.3))
            .with(Landmark::LeftHip, Point2::new(0.45, 0.9))
            .with(Landmark::RightHip, Point2::new(0.55, 0.9));
        let t = Transform::from_pose(&pose, 1e-4).expect("shoulders");
        let states = track_roi(&[pose], &[t], 1, &params);
        assert_eq!(states[0].anchor, RoiAnchor::Shoulders);
        assert_relative_eq!(states[0].center.y, 0.35);
    }
}
