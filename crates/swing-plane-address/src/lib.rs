//! Clubhead, grip and ball localization in golf address frames.
//!
//! For each address frame the vision model is asked for the setup landmarks,
//! the pose fills in the body points it left out, and, when a grip and a ball
//! are known, a crop around the expected clubhead is searched by a set of
//! deterministic detectors plus a second, crop-level vision query. A scored
//! selector picks the clubhead and the per-frame zones are merged.

mod candidate;
mod detect;
mod observe;
mod params;
mod select;
mod shaft;
mod threshold;
mod zone;

use log::debug;
use serde::Serialize;
use swing_plane_core::{
    query_or_none, CancelFlag, ConfidenceTier, Frame, Handedness, ImageCrop, NormPoint, NormRect,
    PoseSnapshot, VisionPrompt, VisionQuery,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

pub use candidate::{CandidateSource, ClubheadCandidate};
pub use detect::{
    blob, darkest, hough, patch, pca_tip, run_detectors, shaft_scan, Detector, DetectorInput,
    DETECTORS,
};
pub use observe::{
    fill_from_pose, parse_address_response, parse_roi_response, read_tier, RoiObservation,
};
pub use params::AddressParams;
pub use select::{
    score_candidate, select_clubhead, ScoreRule, ScoreTerm, ScoredCandidate, Selection,
    SCORE_RULES,
};
pub use shaft::{CropView, ShaftModel};
pub use threshold::{otsu_threshold, DarkMask};
pub use zone::{merge_zones, AddressField, AddressZone, TieredPoint};

/// What was found in one address frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AddressFrameReport {
    pub frame_index: u32,
    pub zone: AddressZone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_clubhead: Option<NormPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi: Option<NormRect>,
    pub candidates: Vec<ScoredCandidate>,
}

/// Merged address zone plus the per-frame detail behind it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AddressReport {
    pub zone: AddressZone,
    pub frames: Vec<AddressFrameReport>,
}

/// Crop candidates: detectors plus the crop-level vision answer.
fn crop_candidates<V, C>(
    frame: &Frame,
    model: &ShaftModel,
    roi: NormRect,
    vision: Option<&V>,
    cropper: &C,
    cancel: Option<&CancelFlag>,
    params: &AddressParams,
) -> Vec<ClubheadCandidate>
where
    V: VisionQuery + ?Sized,
    C: ImageCrop + ?Sized,
{
    let Some(cropped) = cropper.crop(frame, &roi) else {
        debug!("frame {}: no crop for the clubhead search", frame.index);
        return Vec::new();
    };
    let mut out = cropped
        .image
        .as_ref()
        .and_then(|img| CropView::new(img, roi))
        .and_then(|view| DetectorInput::new(view, model, params))
        .map(|input| run_detectors(&input, params))
        .unwrap_or_default();

    if let Some(value) = query_or_none(
        vision,
        std::slice::from_ref(&cropped),
        VisionPrompt::ClubheadRoi,
        cancel,
    ) {
        let obs = parse_roi_response(&value, &roi);
        out.extend(
            obs.clubhead
                .map(|t| ClubheadCandidate::new(t.position(), CandidateSource::RoiMain, t.tier)),
        );
        out.extend(
            obs.ball_side
                .map(|t| ClubheadCandidate::new(t.position(), CandidateSource::RoiBall, t.tier)),
        );
    }
    out
}

/// Locate the setup landmarks in one address frame.
pub fn detect_address_frame<V, C>(
    frame: &Frame,
    pose: Option<&PoseSnapshot>,
    handedness: Option<Handedness>,
    vision: Option<&V>,
    cropper: &C,
    cancel: Option<&CancelFlag>,
    params: &AddressParams,
) -> AddressFrameReport
where
    V: VisionQuery + ?Sized,
    C: ImageCrop + ?Sized,
{
    let mut zone = query_or_none(
        vision,
        std::slice::from_ref(frame),
        VisionPrompt::Address,
        cancel,
    )
    .map(|v| parse_address_response(&v))
    .unwrap_or_default();
    if let Some(pose) = pose {
        fill_from_pose(&mut zone, pose, handedness, params.pose_tier);
    }

    let mut candidates: Vec<ClubheadCandidate> = zone
        .clubhead
        .map(|t| ClubheadCandidate::new(t.position(), CandidateSource::Vision, t.tier))
        .into_iter()
        .collect();
    let model = ShaftModel::from_zone(&zone, handedness, params);
    let mut roi = None;
    if let Some(model) = &model {
        candidates.push(ClubheadCandidate::new(
            model.expected,
            CandidateSource::Expected,
            ConfidenceTier::Low,
        ));
        roi = model.crop_rect(params);
        if let Some(rect) = roi {
            candidates.extend(crop_candidates(
                frame, model, rect, vision, cropper, cancel, params,
            ));
        }
    }

    let selection = select_clubhead(&candidates, model.as_ref(), params);
    // No winner: nothing was proposed, or with a shaft model every candidate
    // including the extrapolation was excluded.
    zone.clubhead = selection
        .winner
        .map(|w| TieredPoint::new(w.position(), w.tier));
    debug!(
        "frame {}: {} clubhead candidates, winner {:?}",
        frame.index,
        selection.scored.len(),
        selection.winner.map(|w| w.source)
    );

    AddressFrameReport {
        frame_index: frame.index,
        zone,
        expected_clubhead: model.map(|m| m.expected.into()),
        roi,
        candidates: selection.scored,
    }
}

/// Detect and merge the address zone over the given address frames.
///
/// `poses[i]` belongs to `frames[i]`; missing poses are treated as empty.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(frames = frames.len()))
)]
pub fn detect_address_zone<V, C>(
    frames: &[Frame],
    poses: &[PoseSnapshot],
    handedness: Option<Handedness>,
    vision: Option<&V>,
    cropper: &C,
    cancel: Option<&CancelFlag>,
    params: &AddressParams,
) -> AddressReport
where
    V: VisionQuery + ?Sized,
    C: ImageCrop + ?Sized,
{
    let reports: Vec<AddressFrameReport> = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            detect_address_frame(
                frame,
                poses.get(i),
                handedness,
                vision,
                cropper,
                cancel,
                params,
            )
        })
        .collect();
    let zones: Vec<AddressZone> = reports.iter().map(|r| r.zone).collect();
    AddressReport {
        zone: merge_zones(&zones),
        frames: reports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use serde_json::{json, Value};
    use swing_plane_core::{GrayCropper, GrayImage, Landmark, VisionError};

    const SIZE: usize = 200;

    /// Address answer with grip and ball; the clubhead answer is optional.
    struct Setup {
        grip: (f32, f32),
        ball: (f32, f32),
        clubhead: Option<Value>,
    }

    impl Setup {
        /// Right-handed layout: ball down and to the right of the grip.
        fn right(clubhead: Option<Value>) -> Self {
            Self {
                grip: (0.40, 0.50),
                ball: (0.70, 0.90),
                clubhead,
            }
        }
    }

    impl VisionQuery for Setup {
        fn query(&self, frames: &[Frame], prompt: &str) -> Result<Option<Value>, VisionError> {
            match VisionPrompt::from_prompt(prompt) {
                Some(VisionPrompt::Address) => {
                    let mut v = json!({
                        "grip": {"x": self.grip.0, "y": self.grip.1, "confidence": "high"},
                        "ball": {"x": self.ball.0, "y": self.ball.1, "confidence": "high"}
                    });
                    if let Some(c) = &self.clubhead {
                        v["clubhead"] = c.clone();
                    }
                    Ok(Some(v))
                }
                Some(VisionPrompt::ClubheadRoi) => {
                    assert!(frames[0].image.is_some());
                    Err(VisionError::Unavailable("offline".into()))
                }
                _ => Ok(None),
            }
        }
    }

    /// Shaft from the grip (0.40, 0.50) to a dark 7x7 head centred at `head`.
    fn address_image(head: (f32, f32)) -> GrayImage {
        let mut img = GrayImage::filled(SIZE, SIZE, 210);
        let s = SIZE as f32;
        let (gx, gy) = (0.40 * s, 0.50 * s);
        let (hx, hy) = (head.0 * s, head.1 * s);
        for k in 0..=200 {
            let t = k as f32 / 200.0;
            img.set((gx + t * (hx - gx)) as usize, (gy + t * (hy - gy)) as usize, 40);
        }
        let (hx, hy) = (hx as usize, hy as usize);
        for y in hy - 3..=hy + 3 {
            for x in hx - 3..=hx + 3 {
                img.set(x, y, 15);
            }
        }
        img
    }

    fn distance(p: NormPoint, x: f32, y: f32) -> f32 {
        ((p.x - x).powi(2) + (p.y - y).powi(2)).sqrt()
    }

    #[test]
    fn crop_detectors_refine_the_clubhead() {
        // Head about 0.03 short of the ball, close to the extrapolation.
        let frame = Frame::new(1, Some(0.0)).with_image(address_image((0.682, 0.876)));
        let vision = Setup::right(None);
        let report = detect_address_frame(
            &frame,
            None,
            Some(Handedness::Right),
            Some(&vision),
            &GrayCropper,
            None,
            &AddressParams::default(),
        );
        let head = report.zone.clubhead.expect("clubhead");
        assert!((head.point.x - 0.682).abs() < 0.03, "{:?}", head.point);
        assert!((head.point.y - 0.876).abs() < 0.03, "{:?}", head.point);
        assert!(report.roi.is_some());
        let sources: Vec<_> = report.candidates.iter().map(|c| c.candidate.source).collect();
        assert!(sources.contains(&CandidateSource::Expected));
        assert!(sources.contains(&CandidateSource::Darkest));
    }

    #[test]
    fn detectors_move_the_clubhead_off_the_extrapolation() {
        let frame = Frame::new(1, Some(0.0)).with_image(address_image((0.62, 0.88)));
        let vision = Setup::right(None);
        let report = detect_address_frame(
            &frame,
            None,
            Some(Handedness::Right),
            Some(&vision),
            &GrayCropper,
            None,
            &AddressParams::default(),
        );
        let expected = report.expected_clubhead.expect("expected point");
        assert!(distance(expected, 0.62, 0.88) > 0.05, "{expected:?}");
        let head = report.zone.clubhead.expect("clubhead");
        assert!(distance(head.point, 0.62, 0.88) < 0.03, "{:?}", head.point);
        assert!(distance(head.point, expected.x, expected.y) > 0.04);
    }

    #[test]
    fn left_handed_exclusion_mirrors_the_ball_side() {
        // Ball down and to the left of the grip; the reported head sits 0.08
        // left of the ball, which is beyond it for a left-handed golfer.
        let vision = Setup {
            grip: (0.60, 0.50),
            ball: (0.30, 0.90),
            clubhead: Some(json!({"x": 0.22, "y": 0.92, "confidence": "high"})),
        };
        let run = |hand| {
            detect_address_frame(
                &Frame::new(1, None),
                None,
                Some(hand),
                Some(&vision),
                &GrayCropper,
                None,
                &AddressParams::default(),
            )
        };

        let left = run(Handedness::Left);
        let vision_scored = left
            .candidates
            .iter()
            .find(|c| c.candidate.source == CandidateSource::Vision)
            .expect("vision candidate");
        assert!(vision_scored.excluded);
        let expected = left.expected_clubhead.expect("expected point");
        let head = left.zone.clubhead.expect("fallback clubhead");
        assert!(distance(head.point, expected.x, expected.y) < 1e-6);

        let right = run(Handedness::Right);
        assert!(right.candidates.iter().all(|c| !c.excluded));
        let head = right.zone.clubhead.expect("clubhead");
        assert!(distance(head.point, 0.22, 0.92) < 1e-6);
    }

    #[test]
    fn without_pixels_vision_beats_the_expected_point() {
        let frame = Frame::new(1, None);
        let vision = Setup::right(Some(json!({"x": 0.68, "y": 0.87, "confidence": "medium"})));
        let report = detect_address_frame(
            &frame,
            None,
            None,
            Some(&vision),
            &GrayCropper,
            None,
            &AddressParams::default(),
        );
        assert_eq!(report.candidates.len(), 2);
        let head = report.zone.clubhead.expect("clubhead");
        assert!(distance(head.point, 0.68, 0.87) < 1e-6);
    }

    #[test]
    fn no_vision_uses_the_pose_only() {
        let pose = PoseSnapshot::new()
            .with(Landmark::LeftShoulder, Point2::new(0.4, 0.3))
            .with(Landmark::RightShoulder, Point2::new(0.6, 0.3));
        let frames = [Frame::new(1, None), Frame::new(2, None)];
        let report = detect_address_zone::<Setup, _>(
            &frames,
            &[pose],
            Some(Handedness::Right),
            None,
            &GrayCropper,
            None,
            &AddressParams::default(),
        );
        assert_eq!(report.frames.len(), 2);
        assert!(report.zone.clubhead.is_none());
        assert!(report.zone.ball.is_none());
        let shoulder = report.zone.shoulder.expect("lead shoulder");
        assert!((shoulder.point.x - 0.4).abs() < 1e-6);
    }

    #[test]
    fn cancelled_runs_skip_vision() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let vision = Setup::right(None);
        let report = detect_address_zone(
            &[Frame::new(1, None)],
            &[],
            None,
            Some(&vision),
            &GrayCropper,
            Some(&cancel),
            &AddressParams::default(),
        );
        assert!(report.zone.is_empty());
    }
}
