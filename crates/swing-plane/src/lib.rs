//! High-level facade for the `swing-plane-*` workspace.
//!
//! This crate provides:
//! - re-exports of the underlying stage crates
//! - the swing-plane fitter and the downswing zone evaluator
//! - [`SwingAnalyzer`], which runs hand tracing, address detection, plane
//!   fitting and zone scoring end to end and returns a [`SwingReport`]
//! - JSON configuration and input helpers, and [`RecordedVision`] for replaying
//!   recorded vision-model answers
//!
//! ## Quickstart
//!
//! ```
//! use nalgebra::Point2;
//! use swing_plane::core::{Frame, Handedness, Landmark, PhaseBoundaries, PoseSnapshot};
//! use swing_plane::{AnalyzerParams, SwingAnalyzer, SwingInput};
//!
//! let frames: Vec<Frame> = (1..=12).map(|i| Frame::new(i, Some(i as f32 / 30.0))).collect();
//! let poses: Vec<PoseSnapshot> = (0..12)
//!     .map(|i| {
//!         let t = i as f32 / 11.0;
//!         PoseSnapshot::new()
//!             .with(Landmark::LeftShoulder, Point2::new(0.45, 0.35))
//!             .with(Landmark::RightShoulder, Point2::new(0.55, 0.35))
//!             .with(Landmark::LeftWrist, Point2::new(0.3 + 0.3 * t, 0.3 + 0.35 * t))
//!     })
//!     .collect();
//!
//! let analyzer = SwingAnalyzer::new(AnalyzerParams::default());
//! let report = analyzer.analyze(&SwingInput {
//!     frames: &frames,
//!     poses: &poses,
//!     phases: PhaseBoundaries::new(4, 10),
//!     handedness: Some(Handedness::Right),
//! });
//! assert!(!report.hand_trace.is_empty());
//! ```
//!
//! ## API map
//! - `swing_plane::core`: value types, geometry, validation and capability traits.
//! - `swing_plane::trace`: hand-trace extraction, filtering, reconstruction and arbitration.
//! - `swing_plane::address`: address-zone detection.
//! - `swing_plane::plane` / `swing_plane::zone`: plane fitting and zone scoring.

pub use swing_plane_address as address;
pub use swing_plane_core as core;
pub use swing_plane_trace as trace;

pub mod io;
mod params;
mod pipeline;
pub mod plane;
mod recorded;
mod report;
pub mod zone;

pub use io::{AnalysisConfig, PoseSequence, SwingIoError};
pub use params::AnalyzerParams;
pub use pipeline::{SwingAnalyzer, SwingInput};
pub use plane::{fit_plane, PlaneFit, PlaneParams, PlaneResult, PlaneSource};
pub use recorded::RecordedVision;
pub use report::{SwingDebug, SwingReport, VariantSummary};
pub use zone::{evaluate_zone, Deviation, Rating, ZoneEvaluation, ZoneParams};
