//! Grip-direct trace: one vision query per frame for the grip position.

use log::debug;
use nalgebra::Point2;
use serde_json::Value;
use swing_plane_core::validate::{read_confidence, read_enum, read_point};
use swing_plane_core::{
    query_or_none, CancelFlag, ConfidenceTier, Frame, PoseSnapshot, VisionPrompt, VisionQuery,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::candidate::{Candidate, FrameMeta, HandSource};
use crate::outlier::FilterSummary;
use crate::params::{CandidateParams, TraceParams};
use crate::pose_trace::trace_from_candidates;
use crate::trace::Trace;

/// Validate a grip response.
///
/// Accepts `{"grip": point}`, `{"grip": {x, y, confidence}}` or a bare point
/// at the top level. `confidence` may be a number or a tier name.
pub fn parse_grip_response(value: &Value, params: &CandidateParams) -> Option<(Point2<f32>, f32)> {
    let grip = match value.get("grip") {
        Some(Value::Null) => return None,
        Some(g) => g,
        None => value,
    };
    let position = read_point(grip)?;
    let confidence = grip
        .get("confidence")
        .or_else(|| value.get("confidence"))
        .and_then(|c| {
            read_enum::<ConfidenceTier>(c)
                .map(|tier| params.vision_tier_confidence[tier as usize])
                .or_else(|| read_confidence(c))
        })
        .unwrap_or(params.vision_default_confidence);
    Some((position, confidence.clamp(f32::MIN_POSITIVE, 1.0)))
}

/// Query the grip position frame by frame.
pub fn grip_candidates<V: VisionQuery + ?Sized>(
    vision: Option<&V>,
    frames: &[Frame],
    metas: &[FrameMeta],
    cancel: Option<&CancelFlag>,
    params: &CandidateParams,
) -> Vec<Option<Candidate>> {
    frames
        .iter()
        .zip(metas)
        .map(|(frame, meta)| {
            let response =
                query_or_none(vision, std::slice::from_ref(frame), VisionPrompt::Grip, cancel)?;
            let (position, confidence) = parse_grip_response(&response, params)?;
            Some(Candidate {
                position,
                confidence,
                phase: meta.phase,
                frame_index: meta.index,
                timestamp_sec: meta.timestamp_sec,
                source: HandSource::Vision,
            })
        })
        .collect()
}

/// Grip-direct trace, filtered and reconstructed like the pose variants.
///
/// Returns `None` when the vision model gave no grip point at all.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(frames = frames.len()))
)]
pub fn grip_trace<V: VisionQuery + ?Sized>(
    vision: Option<&V>,
    frames: &[Frame],
    metas: &[FrameMeta],
    poses: &[PoseSnapshot],
    cancel: Option<&CancelFlag>,
    params: &TraceParams,
) -> Option<(Trace, FilterSummary)> {
    let candidates = grip_candidates(vision, frames, metas, cancel, &params.candidate);
    let found = candidates.iter().flatten().count();
    if found == 0 {
        return None;
    }
    debug!("vision grip points on {found} of {} frames", frames.len());
    Some(trace_from_candidates(&candidates, metas, poses, true, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use swing_plane_core::{GrayImage, Phase, VisionError};

    struct ByFrame;

    impl VisionQuery for ByFrame {
        fn query(&self, frames: &[Frame], _: &str) -> Result<Option<Value>, VisionError> {
            let i = frames[0].index;
            match i {
                2 => Err(VisionError::Timeout { ms: 100 }),
                3 => Ok(Some(json!({ "grip": null }))),
                _ => Ok(Some(json!({ "grip": { "x": 40 + i, "y": "55", "confidence": "medium" } }))),
            }
        }
    }

    #[test]
    fn parses_the_accepted_shapes() {
        let p = CandidateParams::default();
        let (pos, conf) = parse_grip_response(&json!({"grip": [0.3, 0.4]}), &p).expect("array");
        assert_eq!((pos.x, pos.y, conf), (0.3, 0.4, 1.0));
        let (_, conf) =
            parse_grip_response(&json!({"x": 0.3, "y": 0.4, "confidence": "low"}), &p).expect("bare");
        assert_eq!(conf, 0.6);
        let (_, conf) =
            parse_grip_response(&json!({"grip": {"x": 0.3, "y": 0.4, "confidence": 0.5}}), &p)
                .expect("numeric");
        assert_eq!(conf, 0.5);
        assert!(parse_grip_response(&json!({"grip": null}), &p).is_none());
        assert!(parse_grip_response(&json!({"grip": {"x": "left"}}), &p).is_none());
        assert!(parse_grip_response(&json!("nope"), &p).is_none());
    }

    #[test]
    fn failed_queries_are_holes() {
        let frames: Vec<Frame> = (1..=4)
            .map(|i| Frame::new(i, Some((i - 1) as f32 / 30.0)).with_image(GrayImage::filled(4, 4, 0)))
            .collect();
        let metas: Vec<FrameMeta> = frames
            .iter()
            .map(|f| FrameMeta {
                index: f.index,
                timestamp_sec: f.timestamp_sec,
                phase: Phase::Backswing,
            })
            .collect();
        let c = grip_candidates(Some(&ByFrame), &frames, &metas, None, &CandidateParams::default());
        assert_eq!(c.len(), 4);
        let first = c[0].expect("frame 1");
        assert!((first.position.x - 0.41).abs() < 1e-6);
        assert!((first.position.y - 0.55).abs() < 1e-6);
        assert_eq!(first.confidence, 0.85);
        assert!(c[1].is_none() && c[2].is_none());
        assert!((c[3].expect("frame 4").position.x - 0.44).abs() < 1e-6);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let c = grip_candidates(Some(&ByFrame), &frames, &metas, Some(&cancel), &CandidateParams::default());
        assert!(c.iter().all(Option::is_none));
    }
}
