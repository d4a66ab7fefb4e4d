//! Pose-based hand traces: the gated reconstruction plus the plain lead and
//! averaged variants, and the choice between them.

use log::debug;
use serde::{Deserialize, Serialize};
use swing_plane_core::{Handedness, PoseSnapshot};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::candidate::{extract_candidates, Candidate, FrameMeta, HandVariant};
use crate::normalize::normalize_candidates;
use crate::outlier::{filter_candidates, FilterSummary};
use crate::params::{ArbiterParams, TraceParams};
use crate::reconstruct::reconstruct;
use crate::trace::{Trace, TraceQuality};

/// One trace run through normalize, filter and reconstruct.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantTrace {
    pub variant: HandVariant,
    pub roi_gated: bool,
    pub trace: Trace,
    pub quality: TraceQuality,
    pub filter: FilterSummary,
}

impl VariantTrace {
    pub fn is_collapsed(&self, params: &ArbiterParams) -> bool {
        !self
            .quality
            .meets(params.collapsed_min_unique, params.collapsed_min_spread)
    }
}

/// Normalize, filter and reconstruct an arbitrary candidate sequence.
pub fn trace_from_candidates(
    candidates: &[Option<Candidate>],
    frames: &[FrameMeta],
    poses: &[PoseSnapshot],
    roi_gated: bool,
    params: &TraceParams,
) -> (Trace, FilterSummary) {
    let roi = roi_gated.then_some(&params.roi);
    let normalized = normalize_candidates(candidates, frames, poses, &params.filter, roi);
    let filtered = filter_candidates(&normalized, &params.filter);
    (reconstruct(&filtered, &params.reconstruct), filtered.summary())
}

/// Run one hand variant end to end.
pub fn variant_trace(
    poses: &[PoseSnapshot],
    frames: &[FrameMeta],
    handedness: Option<Handedness>,
    variant: HandVariant,
    roi_gated: bool,
    params: &TraceParams,
) -> VariantTrace {
    let candidates = extract_candidates(poses, frames, handedness, variant, &params.candidate);
    let (trace, filter) = trace_from_candidates(&candidates, frames, poses, roi_gated, params);
    VariantTrace {
        variant,
        roi_gated,
        quality: TraceQuality::of(&trace, params.arbiter.unique_quantum),
        trace,
        filter,
    }
}

/// All pose variants and the one chosen to represent the pose trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseTraces {
    /// Scored grip chain behind the ROI gate.
    pub reconstructed: VariantTrace,
    pub lead: VariantTrace,
    pub average: VariantTrace,
    pub selected: HandVariant,
}

impl PoseTraces {
    pub fn selected_trace(&self) -> &VariantTrace {
        match self.selected {
            HandVariant::Grip => &self.reconstructed,
            HandVariant::Lead => &self.lead,
            HandVariant::Average => &self.average,
        }
    }
}

/// Reconstructed when not collapsed, else the widest non-collapsed variant,
/// else the longest.
pub fn select_variant(
    reconstructed: &VariantTrace,
    lead: &VariantTrace,
    average: &VariantTrace,
    params: &ArbiterParams,
) -> HandVariant {
    if !reconstructed.is_collapsed(params) {
        return HandVariant::Grip;
    }
    let all = [reconstructed, lead, average];
    let widest = all
        .iter()
        .filter(|v| !v.is_collapsed(params))
        .max_by(|a, b| a.quality.spread.total_cmp(&b.quality.spread));
    if let Some(v) = widest {
        return v.variant;
    }
    // Ties keep the earlier entry so the reconstruction wins equal lengths.
    all.iter()
        .rev()
        .max_by_key(|v| v.quality.len)
        .map(|v| v.variant)
        .unwrap_or(HandVariant::Grip)
}

/// Build every pose variant and pick the pose trace.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(frames = frames.len()))
)]
pub fn pose_traces(
    poses: &[PoseSnapshot],
    frames: &[FrameMeta],
    handedness: Option<Handedness>,
    params: &TraceParams,
) -> PoseTraces {
    let reconstructed = variant_trace(poses, frames, handedness, HandVariant::Grip, true, params);
    let lead = variant_trace(poses, frames, handedness, HandVariant::Lead, false, params);
    let average = variant_trace(poses, frames, handedness, HandVariant::Average, false, params);
    let selected = select_variant(&reconstructed, &lead, &average, &params.arbiter);
    debug!(
        "pose variants: reconstructed {:?}, lead {:?}, average {:?} -> {:?}",
        reconstructed.quality, lead.quality, average.quality, selected
    );
    PoseTraces {
        reconstructed,
        lead,
        average,
        selected,
    }
}
