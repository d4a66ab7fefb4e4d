use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use swing_plane_core::{median_point, spread, unique_count, Phase};

/// One point of a finished hand trace, in image-normalized coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub x: f32,
    pub y: f32,
    pub phase: Phase,
    pub frame_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_sec: Option<f32>,
}

impl TracePoint {
    pub fn point(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }
}

/// Ordered hand positions through the swing.
pub type Trace = Vec<TracePoint>;

pub fn trace_points(trace: &[TracePoint]) -> Vec<Point2<f32>> {
    trace.iter().map(TracePoint::point).collect()
}

pub fn phase_points(trace: &[TracePoint], phase: Phase) -> Vec<Point2<f32>> {
    trace
        .iter()
        .filter(|p| p.phase == phase)
        .map(TracePoint::point)
        .collect()
}

/// Median point of one phase, if the trace has any.
pub fn phase_median(trace: &[TracePoint], phase: Phase) -> Option<Point2<f32>> {
    median_point(&phase_points(trace, phase))
}

/// Degeneracy metrics of a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceQuality {
    pub len: usize,
    pub unique: usize,
    pub spread: f32,
}

impl TraceQuality {
    pub fn of(trace: &[TracePoint], quantum: f32) -> Self {
        let points = trace_points(trace);
        Self {
            len: points.len(),
            unique: unique_count(&points, quantum),
            spread: spread(&points),
        }
    }

    pub fn meets(&self, min_unique: usize, min_spread: f32) -> bool {
        self.unique >= min_unique && self.spread >= min_spread
    }
}

/// `true` when adjacent points never go backwards in time (or frame index
/// when either timestamp is missing).
pub fn is_time_ordered(trace: &[TracePoint]) -> bool {
    trace.windows(2).all(|w| match (w[0].timestamp_sec, w[1].timestamp_sec) {
        (Some(a), Some(b)) => a <= b,
        _ => w[0].frame_index <= w[1].frame_index,
    })
}
