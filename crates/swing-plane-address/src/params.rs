use serde::{Deserialize, Serialize};
use swing_plane_core::ConfidenceTier;

/// Address-zone detection parameters.
///
/// Distances are in normalized image units unless noted otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressParams {
    /// Expected clubhead sits this far from the ball back along the shaft.
    pub expected_ball_offset: f32,
    /// Crop half-size as a fraction of the grip-ball distance.
    pub crop_half_scale: f32,
    pub crop_half_min: f32,
    pub crop_half_max: f32,
    /// Candidates further than this above or beyond the ball are excluded.
    pub exclusion_margin: f32,
    /// Score window inside which the source preference decides, keyed by the
    /// best candidate's tier.
    pub tie_window_high: f32,
    pub tie_window_medium: f32,
    pub tie_window_low: f32,
    pub weight_expected: f32,
    pub weight_line: f32,
    pub tier_penalty_medium: f32,
    pub tier_penalty_low: f32,
    /// Penalty per source-preference rank.
    pub source_prior_step: f32,
    /// Intensity units added per crop-normalized unit of distance to the ball.
    pub darkest_ball_bias: f32,
    /// Minimum Otsu separation (0..255) for a crop to be considered to have
    /// dark structure at all.
    pub min_contrast: f32,
    /// Hough lines must be within this many degrees of the shaft direction.
    pub hough_angle_tolerance_deg: f32,
    pub hough_angle_bins: usize,
    pub blob_min_area: usize,
    /// Side of the square patch (pixels) averaged by the patch detector.
    pub patch_size: usize,
    pub pca_min_pixels: usize,
    /// Tier assigned to points taken from the pose.
    pub pose_tier: ConfidenceTier,
}

impl Default for AddressParams {
    fn default() -> Self {
        Self {
            expected_ball_offset: 0.025,
            crop_half_scale: 0.35,
            crop_half_min: 0.08,
            crop_half_max: 0.2,
            exclusion_margin: 0.06,
            tie_window_high: 0.02,
            tie_window_medium: 0.07,
            tie_window_low: 0.12,
            weight_expected: 1.0,
            weight_line: 0.5,
            tier_penalty_medium: 0.01,
            tier_penalty_low: 0.03,
            source_prior_step: 0.005,
            darkest_ball_bias: 60.0,
            min_contrast: 20.0,
            hough_angle_tolerance_deg: 25.0,
            hough_angle_bins: 180,
            blob_min_area: 4,
            patch_size: 5,
            pca_min_pixels: 6,
            pose_tier: ConfidenceTier::Medium,
        }
    }
}

impl AddressParams {
    pub fn tie_window(&self, tier: ConfidenceTier) -> f32 {
        match tier {
            ConfidenceTier::High => self.tie_window_high,
            ConfidenceTier::Medium => self.tie_window_medium,
            ConfidenceTier::Low => self.tie_window_low,
        }
    }

    pub fn tier_penalty(&self, tier: ConfidenceTier) -> f32 {
        match tier {
            ConfidenceTier::High => 0.0,
            ConfidenceTier::Medium => self.tier_penalty_medium,
            ConfidenceTier::Low => self.tier_penalty_low,
        }
    }
}
