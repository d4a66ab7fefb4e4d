use serde::{Deserialize, Serialize};

/// Confidences assigned by the hand-candidate fallback chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateParams {
    pub both_wrists_confidence: f32,
    pub lead_wrist_confidence: f32,
    pub single_wrist_confidence: f32,
    pub nudged_wrist_confidence: f32,
    /// Fraction of the way a lone trail wrist is pulled toward the shoulder midpoint.
    pub nudge_fraction: f32,
    pub elbow_pair_confidence: f32,
    pub shoulder_pair_confidence: f32,
    pub hip_pair_confidence: f32,
    /// Confidence of a vision grip point tagged low, medium or high.
    pub vision_tier_confidence: [f32; 3],
    /// Confidence of a vision grip point without a tier.
    pub vision_default_confidence: f32,
}

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            both_wrists_confidence: 1.0,
            lead_wrist_confidence: 0.85,
            single_wrist_confidence: 0.75,
            nudged_wrist_confidence: 0.6,
            nudge_fraction: 0.15,
            elbow_pair_confidence: 0.5,
            shoulder_pair_confidence: 0.35,
            hip_pair_confidence: 0.25,
            vision_tier_confidence: [0.6, 0.85, 1.0],
            vision_default_confidence: 1.0,
        }
    }
}

/// Region-of-interest gate tracking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiParams {
    /// Scale applied to the local hip midpoint to get the ROI centre.
    pub hip_anchor_scale: f32,
    /// Accepted vertical range (exclusive) of the scaled hip anchor.
    pub hip_anchor_y_min: f32,
    pub hip_anchor_y_max: f32,
    /// Centre used when only the shoulders are visible.
    pub shoulder_fallback_center: [f32; 2],
    /// Radius growth for 1, 2 and 3+ consecutive frames without a body anchor.
    pub missing_growth: [f32; 3],
    /// The gate is switched off once this many anchors in a row are missing.
    pub disable_after_missing: u32,
}

impl Default for RoiParams {
    fn default() -> Self {
        Self {
            hip_anchor_scale: 0.5,
            hip_anchor_y_min: -0.3,
            hip_anchor_y_max: 0.9,
            shoulder_fallback_center: [0.0, 0.35],
            missing_growth: [1.1, 1.4, 1.8],
            disable_after_missing: 3,
        }
    }
}

/// Temporal outlier filter thresholds (transform-local units).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Minimum shoulder width for a frame to define its own transform.
    pub min_transform_scale: f32,
    pub low_confidence: f32,
    /// Consecutive low-confidence frames needed to mask a streak.
    pub low_confidence_streak: usize,
    pub roi_radius_base: f32,
    pub roi_radius_pad: f32,
    pub roi_above_base: f32,
    pub roi_above_pad: f32,
    pub roi_below_base: f32,
    pub roi_below_pad: f32,
    /// ROI multiplier for candidates below full confidence.
    pub partial_roi_scale: f32,
    /// Speed/acceleration multiplier for candidates below full confidence.
    pub partial_motion_scale: f32,
    /// Units per second.
    pub max_speed: f32,
    /// Absolute change between consecutive speed estimates.
    pub max_speed_change: f32,
    pub default_fps: f32,
    pub min_fps: f32,
    pub max_fps: f32,
    /// Timestamp deltas outside `(min_dt, max_dt)` are ignored for fps estimation.
    pub min_dt: f32,
    pub max_dt: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            min_transform_scale: 1e-4,
            low_confidence: 0.15,
            low_confidence_streak: 2,
            roi_radius_base: 2.2,
            roi_radius_pad: 0.2,
            roi_above_base: 1.2,
            roi_above_pad: 0.2,
            roi_below_base: 2.2,
            roi_below_pad: 0.4,
            partial_roi_scale: 0.9,
            partial_motion_scale: 0.85,
            max_speed: 10.0,
            max_speed_change: 40.0,
            default_fps: 30.0,
            min_fps: 5.0,
            max_fps: 120.0,
            min_dt: 0.001,
            max_dt: 0.5,
        }
    }
}

/// Gap filling and final smoothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructParams {
    pub ema_alpha: f32,
    pub densify: bool,
    /// Extra spline points inserted per gap near Top and Impact.
    pub densify_points: usize,
    pub densify_window_sec: f32,
}

impl Default for ReconstructParams {
    fn default() -> Self {
        Self {
            ema_alpha: 0.25,
            densify: true,
            densify_points: 3,
            densify_window_sec: 0.15,
        }
    }
}

/// Grip-versus-pose trace arbitration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterParams {
    pub unique_quantum: f32,
    pub collapsed_min_unique: usize,
    pub collapsed_min_spread: f32,
    /// Pose wins outright when its spread reaches `grip_spread * pose_spread_margin`.
    pub pose_spread_margin: f32,
    pub high_quality_min_unique: usize,
    pub high_quality_min_spread: f32,
    /// Grip keeps a non-top phase when its spread reaches `pose_spread * ratio`.
    pub phase_grip_ratio: f32,
    pub top_grip_ratio: f32,
}

impl Default for ArbiterParams {
    fn default() -> Self {
        Self {
            unique_quantum: 0.01,
            collapsed_min_unique: 3,
            collapsed_min_spread: 0.06,
            pose_spread_margin: 1.05,
            high_quality_min_unique: 8,
            high_quality_min_spread: 0.16,
            phase_grip_ratio: 0.85,
            top_grip_ratio: 1.0,
        }
    }
}

/// All hand-trace parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceParams {
    pub candidate: CandidateParams,
    pub roi: RoiParams,
    pub filter: FilterParams,
    pub reconstruct: ReconstructParams,
    pub arbiter: ArbiterParams,
}
