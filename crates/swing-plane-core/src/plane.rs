use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::geometry::{clip_line_to_unit_box, MIN_LINE_LENGTH};
use crate::types::NormPoint;

/// Reference line spanning the unit image box.
///
/// Both endpoints lie on the box boundary. Instances are only produced by the
/// constructors below, which reject degenerate lines.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneLine {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl PlaneLine {
    /// Line through `anchor` along `dir`, clipped to the unit box.
    pub fn through(anchor: Point2<f32>, dir: Vector2<f32>) -> Option<Self> {
        let (a, b) = clip_line_to_unit_box(anchor, dir)?;
        Some(Self {
            x1: a.x,
            y1: a.y,
            x2: b.x,
            y2: b.y,
        })
    }

    /// Line through two points, extended to the unit box.
    pub fn through_points(a: Point2<f32>, b: Point2<f32>) -> Option<Self> {
        let d = b - a;
        if d.norm() <= MIN_LINE_LENGTH {
            return None;
        }
        Self::through(a, d)
    }

    /// Accept a line read from an untrusted source: finite, non-degenerate,
    /// re-clipped to the unit box.
    pub fn sanitized(x1: f32, y1: f32, x2: f32, y2: f32) -> Option<Self> {
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return None;
        }
        Self::through_points(Point2::new(x1, y1), Point2::new(x2, y2))
    }

    pub fn start(&self) -> Point2<f32> {
        Point2::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point2<f32> {
        Point2::new(self.x2, self.y2)
    }

    pub fn length(&self) -> f32 {
        (self.end() - self.start()).norm()
    }

    /// Unit direction from `start` to `end`.
    pub fn direction(&self) -> Vector2<f32> {
        let d = self.end() - self.start();
        let n = d.norm();
        if n > f32::EPSILON {
            d / n
        } else {
            Vector2::new(1.0, 0.0)
        }
    }

    /// Perpendicular distance from `p` to the infinite line.
    pub fn distance_to(&self, p: Point2<f32>) -> f32 {
        let d = self.direction();
        let v = p - self.start();
        (d.x * v.y - d.y * v.x).abs()
    }

    /// Signed position of the projection of `p` along the line, measured from `start`.
    pub fn project(&self, p: Point2<f32>) -> f32 {
        (p - self.start()).dot(&self.direction())
    }

    pub fn point_at(&self, t: f32) -> Point2<f32> {
        self.start() + self.direction() * t
    }
}

/// Finite two-point segment, used for the rendered "evidence" part of a plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: NormPoint,
    pub end: NormPoint,
}

impl Segment {
    pub fn new(a: Point2<f32>, b: Point2<f32>) -> Option<Self> {
        ((b - a).norm() > MIN_LINE_LENGTH).then(|| Self {
            start: a.into(),
            end: b.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_boundary(v: f32) -> bool {
        v.abs() < 1e-5 || (v - 1.0).abs() < 1e-5
    }

    #[test]
    fn endpoints_lie_on_box_boundary() {
        let line = PlaneLine::through(Point2::new(0.4, 0.7), Vector2::new(-0.6, -0.8)).expect("line");
        for p in [line.start(), line.end()] {
            assert!(on_boundary(p.x) || on_boundary(p.y), "{p:?}");
        }
        assert!(line.length() > 0.5);
        assert!(line.distance_to(Point2::new(0.4, 0.7)) < 1e-5);
    }

    #[test]
    fn degenerate_lines_are_rejected() {
        let p = Point2::new(0.3, 0.3);
        assert!(PlaneLine::through_points(p, p).is_none());
        assert!(PlaneLine::sanitized(0.1, f32::NAN, 0.5, 0.5).is_none());
        assert!(PlaneLine::through(Point2::new(2.0, 2.0), Vector2::new(1.0, 0.0)).is_none());
    }
}
