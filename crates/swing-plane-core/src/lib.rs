//! Core types and utilities for golf swing-plane analysis.
//!
//! This crate is intentionally small and purely geometric. It holds the value
//! types every stage passes around (frames, pose snapshots, plane lines), the
//! 2-D helpers they share, the boundary validation used on untrusted JSON, and
//! the capability traits behind which the vision model and image cropping live.
//! All coordinates are normalized image coordinates in `[0, 1] x [0, 1]`
//! with `y` pointing down.

mod capability;
mod geometry;
mod image;
mod logger;
mod plane;
mod pose;
mod types;
pub mod validate;

pub use capability::{
    query_or_none, CancelFlag, GrayCropper, ImageCrop, VisionError, VisionPrompt, VisionQuery,
};
pub use geometry::{
    angle_between_lines, catmull_rom, clamp_unit, clip_line_to_unit_box, cross, fit_line_pca,
    median, median_point, spread, unique_count, wrap_angle, LineFit, MIN_LINE_LENGTH,
};
pub use image::GrayImage;
pub use plane::{PlaneLine, Segment};
pub use pose::{Landmark, PoseSnapshot};
pub use types::{ConfidenceTier, Frame, Handedness, NormPoint, NormRect, Phase, PhaseBoundaries};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
