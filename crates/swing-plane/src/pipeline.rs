//! End-to-end swing analysis.

use std::borrow::Cow;

use log::{debug, warn};
use nalgebra::Point2;
use swing_plane_address::{detect_address_zone, AddressZone};
use swing_plane_core::{
    CancelFlag, Frame, GrayCropper, Handedness, ImageCrop, Phase, PhaseBoundaries, PoseSnapshot,
    VisionQuery,
};
use swing_plane_trace::{arbitrate, grip_trace, phase_points, pose_traces, FrameMeta, HandPoints};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::params::AnalyzerParams;
use crate::plane::{fit_plane, PlaneFit, PlaneInputs};
use crate::report::SwingReport;
use crate::zone::evaluate_zone;

/// One swing: frames in capture order with their poses.
///
/// `poses[i]` belongs to `frames[i]`; frames without a pose are treated as
/// having no landmarks.
#[derive(Clone, Copy, Debug)]
pub struct SwingInput<'a> {
    pub frames: &'a [Frame],
    pub poses: &'a [PoseSnapshot],
    pub phases: PhaseBoundaries,
    pub handedness: Option<Handedness>,
}

/// Runs every stage over one swing.
///
/// The analyzer holds no state between runs; the same input always gives the
/// same report for a deterministic vision capability.
pub struct SwingAnalyzer<'a> {
    params: AnalyzerParams,
    vision: Option<&'a dyn VisionQuery>,
    cropper: &'a dyn ImageCrop,
    cancel: Option<CancelFlag>,
}

impl<'a> SwingAnalyzer<'a> {
    pub fn new(params: AnalyzerParams) -> Self {
        Self {
            params,
            vision: None,
            cropper: &GrayCropper,
            cancel: None,
        }
    }

    pub fn with_vision(mut self, vision: &'a dyn VisionQuery) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_cropper(mut self, cropper: &'a dyn ImageCrop) -> Self {
        self.cropper = cropper;
        self
    }

    /// Skip the remaining vision calls once `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn params(&self) -> &AnalyzerParams {
        &self.params
    }

    /// Run the analysis.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(frames = input.frames.len()))
    )]
    pub fn analyze(&self, input: &SwingInput<'_>) -> SwingReport {
        let params = &self.params;
        let cancel = self.cancel.as_ref();
        let hand = input.handedness;
        let (frames, poses) = in_capture_order(input);
        let metas = FrameMeta::from_frames(&frames, &input.phases);

        let traces = pose_traces(&poses, &metas, hand, &params.trace);
        let grip = grip_trace(self.vision, &frames, &metas, &poses, cancel, &params.trace);
        let arbitration = arbitrate(
            &traces.selected_trace().trace,
            grip.as_ref().map(|(t, _)| t.as_slice()),
            &params.trace.arbiter,
        );

        let k = params.address_frames.min(frames.len());
        let address = (k > 0).then(|| {
            detect_address_zone(
                &frames[..k],
                &poses[..k.min(poses.len())],
                hand,
                self.vision,
                self.cropper,
                cancel,
                &params.address,
            )
        });
        let zone = address.as_ref().map(|a| &a.zone).filter(|z| !z.is_empty());

        let planes = fit_plane(
            &PlaneInputs {
                trace: &arbitration.trace,
                hand_points: &arbitration.hand_points,
                address: zone,
            },
            &params.plane,
        );
        let evaluation = planes.reference.as_ref().and_then(|fit| {
            let points = phase_points(&arbitration.trace, Phase::Downswing);
            let anchor = zone_anchor(zone, &arbitration.hand_points, fit);
            let shoulder = zone.and_then(|z| z.shoulder).map(|t| t.position());
            evaluate_zone(anchor, &fit.line, &points, shoulder, hand, &params.zone)
        });
        if planes.reference.is_none() {
            warn!("no swing plane could be fit");
        }
        debug!(
            "analysis: {} trace points, plane {:?}, rating {:?}",
            arbitration.trace.len(),
            planes.reference.map(|f| f.source),
            evaluation.as_ref().map(|z| z.rating)
        );

        SwingReport::assemble(
            arbitration,
            &traces,
            grip.map(|(_, summary)| summary),
            address,
            planes,
            evaluation,
        )
    }
}

/// Frames and poses sorted by frame index; borrowed when already in order.
fn in_capture_order<'b>(input: &SwingInput<'b>) -> (Cow<'b, [Frame]>, Cow<'b, [PoseSnapshot]>) {
    let sorted = input.frames.windows(2).all(|w| w[0].index <= w[1].index);
    if sorted {
        return (Cow::Borrowed(input.frames), Cow::Borrowed(input.poses));
    }
    debug!("reordering {} frames by index", input.frames.len());
    let mut order: Vec<usize> = (0..input.frames.len()).collect();
    order.sort_by_key(|&i| input.frames[i].index);
    let frames = order.iter().map(|&i| input.frames[i].clone()).collect();
    let poses = order
        .iter()
        .map(|&i| input.poses.get(i).cloned().unwrap_or_default())
        .collect();
    (Cow::Owned(frames), Cow::Owned(poses))
}

/// Zone anchor: address clubhead or ball, else the impact hands, else the
/// start of the plane evidence.
fn zone_anchor(zone: Option<&AddressZone>, hands: &HandPoints, fit: &PlaneFit) -> Point2<f32> {
    zone.and_then(AddressZone::anchor)
        .map(|t| t.position())
        .or_else(|| hands.get(Phase::Impact))
        .or_else(|| fit.evidence.map(|s| Point2::from(s.start)))
        .unwrap_or_else(|| fit.line.start())
}
