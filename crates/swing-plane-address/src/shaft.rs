//! Club-shaft model of an address frame and the crop it is searched in.

use nalgebra::{Point2, Vector2};
use swing_plane_core::{clip_line_to_unit_box, cross, GrayImage, Handedness, NormRect};

use crate::params::AddressParams;
use crate::zone::AddressZone;

/// Shaft line and expected clubhead position derived from the grip and ball.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShaftModel {
    pub grip: Point2<f32>,
    pub ball: Point2<f32>,
    /// Unit vector from the grip toward the clubhead.
    pub direction: Vector2<f32>,
    pub expected: Point2<f32>,
    pub handedness: Handedness,
}

impl ShaftModel {
    /// Needs a grip and a ball. The direction follows the reported clubhead
    /// when there is one, otherwise the grip-to-ball line.
    pub fn from_zone(
        zone: &AddressZone,
        handedness: Option<Handedness>,
        params: &AddressParams,
    ) -> Option<Self> {
        let grip = zone.grip?.position();
        let ball = zone.ball?.position();
        let toward = zone
            .clubhead
            .map(|c| c.position() - grip)
            .filter(|v| v.norm() > 1e-3)
            .unwrap_or(ball - grip);
        let norm = toward.norm();
        if !norm.is_finite() || norm <= 1e-3 {
            return None;
        }
        let direction = toward / norm;
        let along = (ball - grip).dot(&direction) - params.expected_ball_offset;
        Some(Self {
            grip,
            ball,
            direction,
            expected: grip + direction * along.max(0.0),
            handedness: handedness.unwrap_or(Handedness::Right),
        })
    }

    /// Perpendicular distance from `p` to the shaft line.
    pub fn line_distance(&self, p: Point2<f32>) -> f32 {
        cross(self.direction, p - self.grip).abs()
    }

    /// Square search window around the expected clubhead.
    pub fn crop_rect(&self, params: &AddressParams) -> Option<NormRect> {
        let half = ((self.ball - self.grip).norm() * params.crop_half_scale)
            .clamp(params.crop_half_min, params.crop_half_max);
        NormRect::around(self.expected, half)
    }

    /// `true` when `p` is more than `margin` above the ball or beyond it on the
    /// target side.
    pub fn implausible(&self, p: Point2<f32>, margin: f32) -> bool {
        let above = p.y < self.ball.y - margin;
        let beyond = match self.handedness {
            Handedness::Right => p.x > self.ball.x + margin,
            Handedness::Left => p.x < self.ball.x - margin,
        };
        above || beyond
    }
}

/// Pixel-space view of a crop and the shaft model inside it.
#[derive(Clone, Copy, Debug)]
pub struct CropView<'a> {
    pub image: &'a GrayImage,
    pub roi: NormRect,
}

impl<'a> CropView<'a> {
    pub fn new(image: &'a GrayImage, roi: NormRect) -> Option<Self> {
        (image.width > 0 && image.height > 0 && roi.w > 0.0 && roi.h > 0.0)
            .then_some(Self { image, roi })
    }

    /// Pixel centre to image coordinates.
    pub fn to_image(&self, px: f32, py: f32) -> Point2<f32> {
        self.roi.to_image(Point2::new(
            (px + 0.5) / self.image.width as f32,
            (py + 0.5) / self.image.height as f32,
        ))
    }

    /// Image coordinates to (possibly out-of-crop) pixel coordinates.
    pub fn to_pixel(&self, p: Point2<f32>) -> Point2<f32> {
        let l = self.roi.to_local(p);
        Point2::new(
            l.x * self.image.width as f32 - 0.5,
            l.y * self.image.height as f32 - 0.5,
        )
    }

    /// Image-space direction expressed in unit pixel steps.
    pub fn to_pixel_dir(&self, d: Vector2<f32>) -> Option<Vector2<f32>> {
        let v = Vector2::new(
            d.x * self.image.width as f32 / self.roi.w,
            d.y * self.image.height as f32 / self.roi.h,
        );
        let n = v.norm();
        (n.is_finite() && n > f32::EPSILON).then(|| v / n)
    }

    /// Part of the line `origin + t * dir` (image coordinates) inside the
    /// crop, as pixel coordinates ordered along `dir`.
    pub fn clip_line(
        &self,
        origin: Point2<f32>,
        dir: Vector2<f32>,
    ) -> Option<(Point2<f32>, Point2<f32>)> {
        let o = self.roi.to_local(origin);
        let d = Vector2::new(dir.x / self.roi.w, dir.y / self.roi.h);
        let (a, b) = clip_line_to_unit_box(o, d)?;
        let px = |p: Point2<f32>| {
            Point2::new(
                p.x * self.image.width as f32 - 0.5,
                p.y * self.image.height as f32 - 0.5,
            )
        };
        Some((px(a), px(b)))
    }

    pub fn scale(&self) -> f32 {
        self.image.width.max(self.image.height) as f32
    }
}
