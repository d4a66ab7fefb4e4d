//! Validation of the vision model's address answers, and pose fallbacks.

use serde_json::Value;
use swing_plane_core::validate::{read_enum, read_number, read_point, PERCENT_SCALE_THRESHOLD};
use swing_plane_core::{ConfidenceTier, Handedness, Landmark, NormRect, PoseSnapshot};

use crate::zone::{AddressField, AddressZone, TieredPoint};

/// Tier from a tier name or a numeric confidence.
pub fn read_tier(v: &Value) -> Option<ConfidenceTier> {
    if let Some(tier) = read_enum::<ConfidenceTier>(v) {
        return Some(tier);
    }
    let c = read_number(v)?;
    let c = if c > PERCENT_SCALE_THRESHOLD { c / 100.0 } else { c };
    Some(if c >= 0.8 {
        ConfidenceTier::High
    } else if c >= 0.5 {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    })
}

/// Read `obj[key]` as a tiered point; a missing tier counts as medium.
fn read_tiered(obj: &Value, keys: &[&str]) -> Option<TieredPoint> {
    let v = keys.iter().find_map(|k| obj.get(*k))?;
    let p = read_point(v)?;
    let tier = v
        .get("confidence")
        .or_else(|| v.get("tier"))
        .and_then(read_tier)
        .unwrap_or_default();
    Some(TieredPoint::new(p, tier))
}

/// Parse an `address` response into a partial zone.
pub fn parse_address_response(value: &Value) -> AddressZone {
    if !value.is_object() {
        return AddressZone::default();
    }
    AddressZone {
        clubhead: read_tiered(value, &["clubhead", "club_head", "clubHead"]),
        grip: read_tiered(value, &["grip"]),
        ball: read_tiered(value, &["ball"]),
        shoulder: read_tiered(value, &["shoulder"]),
        side_shoulder: read_tiered(value, &["side_shoulder", "sideShoulder"]),
        side_hip: read_tiered(value, &["side_hip", "sideHip"]),
    }
}

/// Clubhead answers from a crop query, mapped back to image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RoiObservation {
    pub clubhead: Option<TieredPoint>,
    pub ball_side: Option<TieredPoint>,
}

/// Parse a `clubhead_roi` response given in crop coordinates.
pub fn parse_roi_response(value: &Value, roi: &NormRect) -> RoiObservation {
    let to_image = |tp: TieredPoint| TieredPoint::new(roi.to_image(tp.position()), tp.tier);
    RoiObservation {
        clubhead: read_tiered(value, &["clubhead", "club_head", "clubHead"]).map(to_image),
        ball_side: read_tiered(value, &["ball_side", "ballSide"]).map(to_image),
    }
}

/// Fill shoulder and trail-side landmarks from the pose where the vision
/// answer left them empty. Unknown handedness is treated as right-handed.
pub fn fill_from_pose(
    zone: &mut AddressZone,
    pose: &PoseSnapshot,
    handedness: Option<Handedness>,
    tier: ConfidenceTier,
) {
    let h = handedness.unwrap_or(Handedness::Right);
    let from = |lm: Landmark| pose.get(lm).map(|p| TieredPoint::new(p, tier));
    zone.fill(AddressField::Shoulder, from(Landmark::lead_shoulder(h)));
    zone.fill(AddressField::SideShoulder, from(Landmark::trail_shoulder(h)));
    zone.fill(AddressField::SideHip, from(Landmark::trail_hip(h)));
}
