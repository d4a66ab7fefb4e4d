//! Body-relative coordinates: every candidate is expressed relative to the
//! shoulder midpoint in units of shoulder width before filtering.

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use swing_plane_core::PoseSnapshot;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::candidate::{Candidate, FrameMeta};
use crate::params::{FilterParams, RoiParams};
use crate::roi::{track_roi, RoiState};

/// Per-frame body-relative transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Shoulder midpoint.
    pub origin: Point2<f32>,
    /// Shoulder width; always above the configured minimum.
    pub scale: f32,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            origin: Point2::origin(),
            scale: 1.0,
        }
    }

    /// Transform defined by this frame's own shoulders.
    pub fn from_pose(pose: &PoseSnapshot, min_scale: f32) -> Option<Self> {
        let origin = pose.shoulder_mid()?;
        let scale = pose.shoulder_width()?;
        (scale.is_finite() && scale > min_scale).then_some(Self { origin, scale })
    }

    pub fn to_local(&self, p: Point2<f32>) -> Point2<f32> {
        Point2::from((p - self.origin) / self.scale)
    }

    pub fn to_image(&self, p: Point2<f32>) -> Point2<f32> {
        self.origin + p.coords * self.scale
    }
}

/// One transform per frame.
///
/// Frames without usable shoulders reuse the previous valid transform; frames
/// before the first valid one reuse that first one. With no valid frame at all
/// every frame gets [`Transform::identity`].
pub fn resolve_transforms(poses: &[PoseSnapshot], frames: usize, min_scale: f32) -> Vec<Transform> {
    let own: Vec<Option<Transform>> = (0..frames)
        .map(|i| poses.get(i).and_then(|p| Transform::from_pose(p, min_scale)))
        .collect();
    let Some(first) = own.iter().flatten().next().copied() else {
        if frames > 0 {
            debug!("no frame has usable shoulders; using identity transforms");
        }
        return vec![Transform::identity(); frames];
    };
    let mut last = first;
    own.into_iter()
        .map(|t| {
            if let Some(t) = t {
                last = t;
            }
            last
        })
        .collect()
}

/// Candidates expressed in their frame's body-relative coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedCandidates {
    pub frames: Vec<FrameMeta>,
    pub transforms: Vec<Transform>,
    /// Same layout as the input candidates, positions in local coordinates.
    pub local: Vec<Option<Candidate>>,
    /// ROI gate per frame; `None` runs the filter without a spatial gate.
    pub roi: Option<Vec<RoiState>>,
}

impl NormalizedCandidates {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Convert candidates to local coordinates and, when `roi` is given, track the
/// ROI gate alongside.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(frames = frames.len()))
)]
pub fn normalize_candidates(
    candidates: &[Option<Candidate>],
    frames: &[FrameMeta],
    poses: &[PoseSnapshot],
    filter: &FilterParams,
    roi: Option<&RoiParams>,
) -> NormalizedCandidates {
    let transforms = resolve_transforms(poses, frames.len(), filter.min_transform_scale);
    let local = (0..frames.len())
        .map(|i| {
            let c = candidates.get(i).copied().flatten()?;
            Some(Candidate {
                position: transforms[i].to_local(c.position),
                ..c
            })
        })
        .collect();
    let roi = roi.map(|params| track_roi(poses, &transforms, frames.len(), params));
    NormalizedCandidates {
        frames: frames.to_vec(),
        transforms,
        local,
        roi,
    }
}
