//! Per-frame hand candidates from raw pose landmarks.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use swing_plane_core::{Frame, Handedness, Landmark, Phase, PhaseBoundaries, PoseSnapshot};

use crate::params::CandidateParams;

/// Which heuristic the hand position is extracted with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandVariant {
    /// Scored fallback chain: both wrists, lead wrist, lone wrist, nudged trail wrist.
    Grip,
    /// Lead-hand wrist only.
    Lead,
    /// Mean of the visible wrists, then elbow/shoulder/hip pair midpoints.
    Average,
}

/// Rule of the fallback chain that produced a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandSource {
    BothWrists,
    LeadWrist,
    SingleWrist,
    NudgedWrist,
    ElbowPair,
    ShoulderPair,
    HipPair,
    /// Grip point reported by the vision model.
    Vision,
}

/// Frame bookkeeping shared by every per-frame sequence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    pub index: u32,
    pub timestamp_sec: Option<f32>,
    pub phase: Phase,
}

impl FrameMeta {
    pub fn from_frames(frames: &[Frame], phases: &PhaseBoundaries) -> Vec<FrameMeta> {
        frames
            .iter()
            .map(|f| FrameMeta {
                index: f.index,
                timestamp_sec: f.timestamp_sec.filter(|t| t.is_finite()),
                phase: phases.phase_of(f.index),
            })
            .collect()
    }

    /// Time in seconds, falling back to the frame index at `fps`.
    pub fn time(&self, fps: f32) -> f32 {
        self.timestamp_sec
            .unwrap_or_else(|| self.index.saturating_sub(1) as f32 / fps.max(1e-3))
    }
}

/// One frame's best guess of the hand position before filtering.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub position: Point2<f32>,
    /// In `(0, 1]`.
    pub confidence: f32,
    pub phase: Phase,
    pub frame_index: u32,
    pub timestamp_sec: Option<f32>,
    pub source: HandSource,
}

/// Position, confidence and rule of one hand estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandEstimate {
    pub position: Point2<f32>,
    pub confidence: f32,
    pub source: HandSource,
}

fn estimate(position: Point2<f32>, confidence: f32, source: HandSource) -> Option<HandEstimate> {
    (position.x.is_finite() && position.y.is_finite() && confidence > 0.0).then_some(
        HandEstimate {
            position,
            confidence: confidence.min(1.0),
            source,
        },
    )
}

fn lerp(a: Point2<f32>, b: Point2<f32>, t: f32) -> Point2<f32> {
    a + (b - a) * t
}

/// Mean of whichever wrists are visible, with the confidence that implies.
fn mean_wrists(pose: &PoseSnapshot, params: &CandidateParams) -> Option<HandEstimate> {
    if let Some(mid) = pose.midpoint(Landmark::LeftWrist, Landmark::RightWrist) {
        return estimate(mid, params.both_wrists_confidence, HandSource::BothWrists);
    }
    let single = pose
        .get(Landmark::LeftWrist)
        .or_else(|| pose.get(Landmark::RightWrist))?;
    estimate(single, params.single_wrist_confidence, HandSource::SingleWrist)
}

/// Best-guess hand position for one frame.
///
/// Returns `None` when the chain of the requested variant finds nothing.
pub fn extract_hand(
    pose: &PoseSnapshot,
    handedness: Option<Handedness>,
    variant: HandVariant,
    params: &CandidateParams,
) -> Option<HandEstimate> {
    match variant {
        HandVariant::Grip => grip_chain(pose, handedness, params),
        HandVariant::Lead => match handedness {
            Some(h) => pose
                .get(Landmark::lead_wrist(h))
                .and_then(|p| estimate(p, params.lead_wrist_confidence, HandSource::LeadWrist)),
            None => mean_wrists(pose, params),
        },
        HandVariant::Average => mean_wrists(pose, params)
            .or_else(|| {
                pose.midpoint(Landmark::LeftElbow, Landmark::RightElbow)
                    .and_then(|p| estimate(p, params.elbow_pair_confidence, HandSource::ElbowPair))
            })
            .or_else(|| {
                pose.shoulder_mid().and_then(|p| {
                    estimate(p, params.shoulder_pair_confidence, HandSource::ShoulderPair)
                })
            })
            .or_else(|| {
                pose.hip_mid()
                    .and_then(|p| estimate(p, params.hip_pair_confidence, HandSource::HipPair))
            }),
    }
}

fn grip_chain(
    pose: &PoseSnapshot,
    handedness: Option<Handedness>,
    params: &CandidateParams,
) -> Option<HandEstimate> {
    if let Some(mid) = pose.midpoint(Landmark::LeftWrist, Landmark::RightWrist) {
        return estimate(mid, params.both_wrists_confidence, HandSource::BothWrists);
    }
    let Some(h) = handedness else {
        // Unknown handedness: the lead hand is undefined, use whichever wrist is there.
        return mean_wrists(pose, params);
    };
    if let Some(lead) = pose.get(Landmark::lead_wrist(h)) {
        return estimate(lead, params.lead_wrist_confidence, HandSource::LeadWrist);
    }
    let trail = pose.get(Landmark::trail_wrist(h))?;
    let nudged = match pose.shoulder_mid() {
        Some(shoulders) => lerp(trail, shoulders, params.nudge_fraction),
        None => trail,
    };
    estimate(nudged, params.nudged_wrist_confidence, HandSource::NudgedWrist)
}

/// Extract one optional candidate per frame.
///
/// `poses` and `frames` are paired by position; a shorter `poses` slice leaves
/// the remaining frames without a candidate.
pub fn extract_candidates(
    poses: &[PoseSnapshot],
    frames: &[FrameMeta],
    handedness: Option<Handedness>,
    variant: HandVariant,
    params: &CandidateParams,
) -> Vec<Option<Candidate>> {
    frames
        .iter()
        .enumerate()
        .map(|(i, meta)| {
            let pose = poses.get(i)?;
            let hand = extract_hand(pose, handedness, variant, params)?;
            Some(Candidate {
                position: hand.position,
                confidence: hand.confidence,
                phase: meta.phase,
                frame_index: meta.index,
                timestamp_sec: meta.timestamp_sec,
                source: hand.source,
            })
        })
        .collect()
}
