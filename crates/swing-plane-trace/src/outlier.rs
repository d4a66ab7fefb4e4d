//! Single-pass temporal outlier filter over body-relative candidates.

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use swing_plane_core::median;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::candidate::{Candidate, FrameMeta};
use crate::normalize::{NormalizedCandidates, Transform};
use crate::params::FilterParams;
use crate::roi::RoiState;

/// Outcome of the filter for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterVerdict {
    Kept,
    Missing,
    LowConfidence,
    OutsideRoi,
    TooFast,
    TooMuchAcceleration,
}

/// Frames per second from the median timestamp step.
///
/// Steps outside `(min_dt, max_dt)` are ignored; with no usable step the
/// default rate is returned.
pub fn estimate_fps(frames: &[FrameMeta], params: &FilterParams) -> f32 {
    let steps = frames.windows(2).filter_map(|w| {
        let dt = w[1].timestamp_sec? - w[0].timestamp_sec?;
        (dt > params.min_dt && dt < params.max_dt).then_some(dt)
    });
    match median(steps) {
        Some(dt) if dt > 0.0 => (1.0 / dt).clamp(params.min_fps, params.max_fps),
        _ => params.default_fps,
    }
}

/// Candidates that survived the filter, still in local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct FilteredCandidates {
    pub frames: Vec<FrameMeta>,
    pub transforms: Vec<Transform>,
    /// `Some` exactly where the verdict is [`FilterVerdict::Kept`].
    pub kept: Vec<Option<Candidate>>,
    pub verdicts: Vec<FilterVerdict>,
    pub fps: f32,
}

impl FilteredCandidates {
    pub fn kept_count(&self) -> usize {
        self.kept.iter().flatten().count()
    }

    pub fn count(&self, verdict: FilterVerdict) -> usize {
        self.verdicts.iter().filter(|v| **v == verdict).count()
    }

    pub fn summary(&self) -> FilterSummary {
        FilterSummary {
            kept: self.count(FilterVerdict::Kept),
            missing: self.count(FilterVerdict::Missing),
            low_confidence: self.count(FilterVerdict::LowConfidence),
            outside_roi: self.count(FilterVerdict::OutsideRoi),
            too_fast: self.count(FilterVerdict::TooFast),
            too_much_acceleration: self.count(FilterVerdict::TooMuchAcceleration),
            fps: self.fps,
        }
    }
}

/// Verdict counts reported in the debug section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub kept: usize,
    pub missing: usize,
    pub low_confidence: usize,
    pub outside_roi: usize,
    pub too_fast: usize,
    pub too_much_acceleration: usize,
    pub fps: f32,
}

/// Frames whose confidence sits below the threshold for `streak` frames in a
/// row; each such frame also invalidates the one before it.
fn low_confidence_mask(local: &[Option<Candidate>], params: &FilterParams) -> Vec<bool> {
    let mut mask = vec![false; local.len()];
    let mut run = 0usize;
    for (i, c) in local.iter().enumerate() {
        match c {
            Some(c) if c.confidence < params.low_confidence => {
                run += 1;
                if run >= params.low_confidence_streak.max(1) {
                    mask[i] = true;
                    if i > 0 {
                        mask[i - 1] = true;
                    }
                }
            }
            _ => run = 0,
        }
    }
    mask
}

fn outside_roi(p: Point2<f32>, roi: &RoiState, conf_scale: f32, params: &FilterParams) -> bool {
    let radius = (params.roi_radius_base * conf_scale + params.roi_radius_pad) * roi.scale;
    let above = (params.roi_above_base * conf_scale + params.roi_above_pad) * roi.scale;
    let below = (params.roi_below_base * conf_scale + params.roi_below_pad) * roi.scale;
    let dist = (p - roi.center).norm();
    dist > radius || p.y < roi.center.y - above || p.y > roi.center.y + below
}

struct Reference {
    position: Point2<f32>,
    time: f32,
    frame: u32,
}

fn step_dt(prev: &Reference, time: f32, frame: u32, has_timestamps: bool, fps: f32) -> f32 {
    let min_dt = 1.0 / fps;
    if has_timestamps {
        min_dt.max((time - prev.time).abs())
    } else {
        min_dt.max(frame.abs_diff(prev.frame) as f32 / fps)
    }
}

/// Run the confidence-streak mask, ROI test, speed test and acceleration test
/// left to right. Rejected frames never become the reference for later tests.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(frames = normalized.len()))
)]
pub fn filter_candidates(
    normalized: &NormalizedCandidates,
    params: &FilterParams,
) -> FilteredCandidates {
    let fps = estimate_fps(&normalized.frames, params);
    let mask = low_confidence_mask(&normalized.local, params);
    let mut verdicts = Vec::with_capacity(normalized.len());
    let mut kept = Vec::with_capacity(normalized.len());
    let mut prev: Option<Reference> = None;
    let mut prev_speed: Option<f32> = None;

    for (i, meta) in normalized.frames.iter().enumerate() {
        let Some(c) = normalized.local.get(i).copied().flatten() else {
            verdicts.push(FilterVerdict::Missing);
            kept.push(None);
            continue;
        };
        let time = meta.time(fps);
        let motion = prev.as_ref().map(|p| {
            let dt = step_dt(p, time, meta.index, meta.timestamp_sec.is_some(), fps);
            (c.position - p.position).norm() / dt
        });
        let partial = c.confidence < 1.0;
        let roi_scale = if partial { params.partial_roi_scale } else { 1.0 };
        let motion_scale = if partial {
            params.partial_motion_scale
        } else {
            1.0
        };
        let roi = normalized.roi.as_ref().and_then(|r| r.get(i));
        let verdict = if mask[i] {
            FilterVerdict::LowConfidence
        } else if roi.is_some_and(|r| r.gate_active && outside_roi(c.position, r, roi_scale, params)) {
            FilterVerdict::OutsideRoi
        } else if motion.is_some_and(|s| s > params.max_speed * motion_scale) {
            FilterVerdict::TooFast
        } else if motion
            .zip(prev_speed)
            .is_some_and(|(s, ps)| (s - ps).abs() > params.max_speed_change * motion_scale)
        {
            FilterVerdict::TooMuchAcceleration
        } else {
            FilterVerdict::Kept
        };
        if verdict == FilterVerdict::Kept {
            if motion.is_some() {
                prev_speed = motion;
            }
            prev = Some(Reference {
                position: c.position,
                time,
                frame: meta.index,
            });
            kept.push(Some(c));
        } else {
            kept.push(None);
        }
        verdicts.push(verdict);
    }

    let filtered = FilteredCandidates {
        frames: normalized.frames.clone(),
        transforms: normalized.transforms.clone(),
        kept,
        verdicts,
        fps,
    };
    let s = filtered.summary();
    debug!(
        "outlier filter: {} kept, {} roi, {} speed, {} accel, {} low-confidence at {:.1} fps",
        s.kept, s.outside_roi, s.too_fast, s.too_much_acceleration, s.low_confidence, s.fps
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::HandSource;
    use crate::roi::RoiAnchor;
    use swing_plane_core::Phase;

    fn meta(index: u32, fps: f32) -> FrameMeta {
        FrameMeta {
            index,
            timestamp_sec: Some((index - 1) as f32 / fps),
            phase: Phase::Downswing,
        }
    }

    fn cand(x: f32, y: f32, confidence: f32, index: u32) -> Option<Candidate> {
        Some(Candidate {
            position: Point2::new(x, y),
            confidence,
            phase: Phase::Downswing,
            frame_index: index,
            timestamp_sec: None,
            source: HandSource::BothWrists,
        })
    }

    fn normalized(local: Vec<Option<Candidate>>, roi: Option<Vec<RoiState>>) -> NormalizedCandidates {
        let frames: Vec<_> = (1..=local.len() as u32).map(|i| meta(i, 30.0)).collect();
        NormalizedCandidates {
            transforms: vec![Transform::identity(); frames.len()],
            frames,
            local,
            roi,
        }
    }

    #[test]
    fn fps_from_median_step() {
        let frames: Vec<_> = (1..=6).map(|i| meta(i, 60.0)).collect();
        let fps = estimate_fps(&frames, &FilterParams::default());
        assert!((fps - 60.0).abs() < 0.5);
        let untimed = vec![FrameMeta {
            index: 1,
            timestamp_sec: None,
            phase: Phase::Top,
        }];
        assert_eq!(estimate_fps(&untimed, &FilterParams::default()), 30.0);
    }

    #[test]
    fn half_unit_jump_at_30_fps_is_too_fast() {
        // 0.5 units in 1/30 s is 15 units/s, above the 10 units/s limit.
        let n = normalized(vec![cand(0.1, 0.4, 1.0, 1), cand(0.6, 0.4, 1.0, 2)], None);
        let out = filter_candidates(&n, &FilterParams::default());
        assert_eq!(out.verdicts, vec![FilterVerdict::Kept, FilterVerdict::TooFast]);
        assert!(out.kept[1].is_none());
    }

    #[test]
    fn rejected_frames_do_not_become_the_reference() {
        let n = normalized(
            vec![
                cand(0.1, 0.4, 1.0, 1),
                cand(0.9, 0.4, 1.0, 2),
                cand(0.12, 0.4, 1.0, 3),
            ],
            None,
        );
        let out = filter_candidates(&n, &FilterParams::default());
        assert_eq!(out.verdicts[1], FilterVerdict::TooFast);
        assert_eq!(out.verdicts[2], FilterVerdict::Kept);
    }

    #[test]
    fn low_confidence_streak_masks_pairs() {
        let n = normalized(
            vec![
                cand(0.1, 0.4, 1.0, 1),
                cand(0.1, 0.4, 0.1, 2),
                cand(0.1, 0.4, 0.1, 3),
                None,
                cand(0.1, 0.4, 0.1, 5),
            ],
            None,
        );
        let out = filter_candidates(&n, &FilterParams::default());
        assert_eq!(
            out.verdicts,
            vec![
                FilterVerdict::Kept,
                FilterVerdict::LowConfidence,
                FilterVerdict::LowConfidence,
                FilterVerdict::Missing,
                FilterVerdict::Kept,
            ]
        );
    }

    #[test]
    fn roi_gate_rejects_far_points_until_disabled() {
        let state = |streak: u32, active: bool| RoiState {
            center: Point2::new(0.0, 0.35),
            scale: 1.0,
            missing_streak: streak,
            anchor: RoiAnchor::Shoulders,
            gate_active: active,
        };
        let n = normalized(
            vec![cand(0.0, 3.5, 1.0, 1)],
            Some(vec![state(0, true)]),
        );
        let out = filter_candidates(&n, &FilterParams::default());
        assert_eq!(out.verdicts, vec![FilterVerdict::OutsideRoi]);

        let n = normalized(
            vec![cand(0.0, 3.5, 1.0, 1)],
            Some(vec![state(3, false)]),
        );
        let out = filter_candidates(&n, &FilterParams::default());
        assert_eq!(out.verdicts, vec![FilterVerdict::Kept]);
    }

    #[test]
    fn sudden_braking_is_too_much_acceleration() {
        // 0.3 units/frame at 30 fps is 9 units/s, then a full stop.
        let n = normalized(
            vec![
                cand(0.0, 0.4, 1.0, 1),
                cand(0.3, 0.4, 1.0, 2),
                cand(0.3, 0.4, 1.0, 3),
            ],
            None,
        );
        let params = FilterParams {
            max_speed_change: 5.0,
            ..FilterParams::default()
        };
        let out = filter_candidates(&n, &params);
        assert_eq!(out.verdicts[1], FilterVerdict::Kept);
        assert_eq!(out.verdicts[2], FilterVerdict::TooMuchAcceleration);
    }
}
