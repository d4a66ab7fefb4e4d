//! Hand-trace reconstruction from noisy per-frame pose landmarks.
//!
//! The stages are pure functions over immutable records:
//!
//! 1. [`extract_candidates`]: one optional hand candidate per frame.
//! 2. [`normalize_candidates`]: body-relative coordinates plus the ROI gate.
//! 3. [`filter_candidates`]: confidence streak, ROI, speed and acceleration tests.
//! 4. [`reconstruct`]: dense, smoothed trace in image coordinates.
//! 5. [`arbitrate`]: choice between the pose trace and the vision grip trace.
//!
//! ```
//! use nalgebra::Point2;
//! use swing_plane_core::{Handedness, Landmark, Phase, PoseSnapshot};
//! use swing_plane_trace::{pose_traces, FrameMeta, TraceParams};
//!
//! let frames: Vec<FrameMeta> = (1..=3)
//!     .map(|i| FrameMeta { index: i, timestamp_sec: None, phase: Phase::Backswing })
//!     .collect();
//! let pose = PoseSnapshot::new()
//!     .with(Landmark::LeftShoulder, Point2::new(0.4, 0.3))
//!     .with(Landmark::RightShoulder, Point2::new(0.6, 0.3))
//!     .with(Landmark::LeftWrist, Point2::new(0.5, 0.6));
//! let traces = pose_traces(&vec![pose; 3], &frames, Some(Handedness::Right), &TraceParams::default());
//! assert_eq!(traces.reconstructed.trace.len(), 3);
//! ```

mod arbiter;
mod candidate;
mod grip;
mod normalize;
mod outlier;
mod params;
mod pose_trace;
mod reconstruct;
mod roi;
mod trace;

pub use arbiter::{
    arbitrate, decide, phase_mix, synthesize_top, ArbiterContext, ArbiterDecision, ArbiterRule,
    Arbitration, HandPoints, TraceChoice, ARBITER_RULES,
};
pub use candidate::{
    extract_candidates, extract_hand, Candidate, FrameMeta, HandEstimate, HandSource, HandVariant,
};
pub use grip::{grip_candidates, grip_trace, parse_grip_response};
pub use normalize::{normalize_candidates, resolve_transforms, NormalizedCandidates, Transform};
pub use outlier::{
    estimate_fps, filter_candidates, FilterSummary, FilterVerdict, FilteredCandidates,
};
pub use params::{
    ArbiterParams, CandidateParams, FilterParams, ReconstructParams, RoiParams, TraceParams,
};
pub use pose_trace::{
    pose_traces, select_variant, trace_from_candidates, variant_trace, PoseTraces, VariantTrace,
};
pub use reconstruct::reconstruct;
pub use roi::{growth_factor, track_roi, RoiAnchor, RoiState};
pub use trace::{
    is_time_ordered, phase_median, phase_points, trace_points, Trace, TracePoint, TraceQuality,
};
