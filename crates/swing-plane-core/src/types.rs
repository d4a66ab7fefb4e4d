use std::fmt;
use std::str::FromStr;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::image::GrayImage;

/// Swing phase bucket assigned by the caller from phase-boundary indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Backswing,
    Top,
    Downswing,
    Impact,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Backswing, Phase::Top, Phase::Downswing, Phase::Impact];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Backswing => "backswing",
            Phase::Top => "top",
            Phase::Downswing => "downswing",
            Phase::Impact => "impact",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backswing" => Ok(Phase::Backswing),
            "top" => Ok(Phase::Top),
            "downswing" => Ok(Phase::Downswing),
            "impact" => Ok(Phase::Impact),
            _ => Err(()),
        }
    }
}

/// Frame indices (1-based) of the top of the backswing and of impact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBoundaries {
    pub top_frame: u32,
    pub impact_frame: u32,
}

impl PhaseBoundaries {
    pub fn new(top_frame: u32, impact_frame: u32) -> Self {
        Self {
            top_frame,
            impact_frame: impact_frame.max(top_frame),
        }
    }

    /// Phase of a 1-based frame index.
    pub fn phase_of(&self, frame_index: u32) -> Phase {
        if frame_index < self.top_frame {
            Phase::Backswing
        } else if frame_index == self.top_frame {
            Phase::Top
        } else if frame_index < self.impact_frame {
            Phase::Downswing
        } else {
            Phase::Impact
        }
    }
}

/// Which side the golfer swings from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

impl FromStr for Handedness {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "lefty" | "left_handed" => Ok(Handedness::Left),
            "right" | "righty" | "right_handed" => Ok(Handedness::Right),
            _ => Err(()),
        }
    }
}

/// Coarse confidence attached to detected positions.
///
/// Ordering is by reliability: `Low < Medium < High`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for ConfidenceTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(ConfidenceTier::High),
            "medium" | "mid" => Ok(ConfidenceTier::Medium),
            "low" => Ok(ConfidenceTier::Low),
            _ => Err(()),
        }
    }
}

/// Serializable `{x, y}` point used in reports and wire formats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormPoint {
    pub x: f32,
    pub y: f32,
}

impl From<Point2<f32>> for NormPoint {
    fn from(p: Point2<f32>) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<NormPoint> for Point2<f32> {
    fn from(p: NormPoint) -> Self {
        Point2::new(p.x, p.y)
    }
}

/// Axis-aligned rectangle in normalized image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl NormRect {
    /// Square of half-size `half` centred on `center`, clipped to the unit box.
    ///
    /// Returns `None` when nothing of the square remains inside the image.
    pub fn around(center: Point2<f32>, half: f32) -> Option<Self> {
        if !center.x.is_finite() || !center.y.is_finite() || !half.is_finite() || half <= 0.0 {
            return None;
        }
        let x0 = (center.x - half).max(0.0);
        let y0 = (center.y - half).max(0.0);
        let x1 = (center.x + half).min(1.0);
        let y1 = (center.y + half).min(1.0);
        if x1 - x0 <= 1e-4 || y1 - y0 <= 1e-4 {
            return None;
        }
        Some(Self {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }

    /// Map a point expressed in `[0,1]` coordinates of this rectangle back
    /// into full-image coordinates.
    pub fn to_image(&self, local: Point2<f32>) -> Point2<f32> {
        Point2::new(self.x + local.x * self.w, self.y + local.y * self.h)
    }

    /// Inverse of [`NormRect::to_image`].
    pub fn to_local(&self, p: Point2<f32>) -> Point2<f32> {
        Point2::new((p.x - self.x) / self.w, (p.y - self.y) / self.h)
    }

    pub fn contains(&self, p: Point2<f32>) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    /// Pixel bounds `[x0, x1) x [y0, y1)` for an image of the given size.
    pub fn to_pixels(&self, width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
        let x0 = (self.x * width as f32).floor().max(0.0) as usize;
        let y0 = (self.y * height as f32).floor().max(0.0) as usize;
        let x1 = ((self.x + self.w) * width as f32).ceil().max(0.0) as usize;
        let y1 = ((self.y + self.h) * height as f32).ceil().max(0.0) as usize;
        let x1 = x1.min(width);
        let y1 = y1.min(height);
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }
}

/// One sampled video frame.
///
/// Pixel data is optional: most stages only need the index and timestamp,
/// and the address-zone detectors skip frames without an image.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    /// 1-based position in the source sequence.
    pub index: u32,
    pub timestamp_sec: Option<f32>,
    pub image: Option<GrayImage>,
}

impl Frame {
    pub fn new(index: u32, timestamp_sec: Option<f32>) -> Self {
        Self {
            index,
            timestamp_sec: timestamp_sec.filter(|t| t.is_finite()),
            image: None,
        }
    }

    pub fn with_image(mut self, image: GrayImage) -> Self {
        self.image = Some(image);
        self
    }
}
