//! Deterministic clubhead detectors run inside the address crop.
//!
//! Every detector works in crop pixel coordinates and reports its answer in
//! image coordinates. None of them is trusted alone; the selector weighs them
//! against the shaft model.

use std::collections::VecDeque;

use log::debug;
use nalgebra::{Point2, Vector2};
use swing_plane_core::{cross, fit_line_pca, ConfidenceTier, GrayImage};

use crate::candidate::{CandidateSource, ClubheadCandidate};
use crate::params::AddressParams;
use crate::shaft::{CropView, ShaftModel};
use crate::threshold::DarkMask;

/// Crop, dark mask and the shaft model expressed in crop pixels.
#[derive(Debug)]
pub struct DetectorInput<'a> {
    pub view: CropView<'a>,
    pub mask: DarkMask,
    pub grip: Point2<f32>,
    pub ball: Point2<f32>,
    pub expected: Point2<f32>,
    /// Unit shaft direction in pixel space.
    pub dir: Vector2<f32>,
    model: &'a ShaftModel,
}

impl<'a> DetectorInput<'a> {
    /// `None` when the crop has no usable contrast.
    pub fn new(view: CropView<'a>, model: &'a ShaftModel, params: &AddressParams) -> Option<Self> {
        let mask = DarkMask::from_image(view.image, params.min_contrast)?;
        let dir = view.to_pixel_dir(model.direction)?;
        Some(Self {
            grip: view.to_pixel(model.grip),
            ball: view.to_pixel(model.ball),
            expected: view.to_pixel(model.expected),
            dir,
            mask,
            view,
            model,
        })
    }

    fn image(&self) -> &GrayImage {
        self.view.image
    }

    fn min_side(&self) -> f32 {
        self.image().width.min(self.image().height) as f32
    }

    /// Distance in pixels from `p` to the shaft line.
    fn line_distance(&self, p: Point2<f32>) -> f32 {
        cross(self.dir, p - self.grip).abs()
    }

    /// Position of `p` along the shaft, measured from the grip.
    fn along(&self, p: Point2<f32>) -> f32 {
        (p - self.grip).dot(&self.dir)
    }

    fn candidate(
        &self,
        px: Point2<f32>,
        source: CandidateSource,
        tier: ConfidenceTier,
    ) -> ClubheadCandidate {
        ClubheadCandidate::new(self.view.to_image(px.x, px.y), source, tier)
    }

    /// The shaft model this input was built from.
    pub fn model(&self) -> &ShaftModel {
        self.model
    }
}

fn pixel(x: usize, y: usize) -> Point2<f32> {
    Point2::new(x as f32, y as f32)
}

/// Dark pixel minimizing intensity plus a penalty for distance to the ball.
pub fn darkest(input: &DetectorInput<'_>, params: &AddressParams) -> Option<ClubheadCandidate> {
    let img = input.image();
    let scale = input.view.scale();
    let mut best: Option<(f32, Point2<f32>)> = None;
    for (x, y) in input.mask.dark_pixels() {
        let p = pixel(x, y);
        let v = img.get(x, y)? as f32;
        let score = v + params.darkest_ball_bias * (p - input.ball).norm() / scale;
        if best.is_none_or(|(s, _)| score < s) {
            best = Some((score, p));
        }
    }
    best.map(|(_, p)| input.candidate(p, CandidateSource::Darkest, ConfidenceTier::Medium))
}

/// Darkest value in the 3x3 neighbourhood of the pixel nearest `p`.
fn local_min(img: &GrayImage, p: Point2<f32>) -> Option<u8> {
    let cx = p.x.round() as i64;
    let cy = p.y.round() as i64;
    let mut out: Option<u8> = None;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let (x, y) = (cx + dx, cy + dy);
            if x < 0 || y < 0 {
                continue;
            }
            if let Some(v) = img.get(x as usize, y as usize) {
                out = Some(out.map_or(v, |o| o.min(v)));
            }
        }
    }
    out
}

/// Walk the shaft line through the crop and keep the last dark sample that is
/// not past the ball.
pub fn shaft_scan(input: &DetectorInput<'_>, _params: &AddressParams) -> Option<ClubheadCandidate> {
    let (a, b) = input.view.clip_line(input.model.grip, input.model.direction)?;
    let len = (b - a).norm();
    let step = (b - a) / len.max(f32::EPSILON);
    let ball_t = input.along(input.ball);
    let mut tip = None;
    let mut t = 0.0f32;
    while t <= len {
        let p = a + step * t;
        if input.along(p) > ball_t {
            break;
        }
        if local_min(input.image(), p).is_some_and(|v| v <= input.mask.threshold) {
            tip = Some(p);
        }
        t += 1.0;
    }
    tip.map(|p| input.candidate(p, CandidateSource::ShaftScan, ConfidenceTier::Medium))
}

/// Strongest straight line of dark pixels within the angular tolerance of the
/// shaft; its far end is the clubhead.
pub fn hough(input: &DetectorInput<'_>, params: &AddressParams) -> Option<ClubheadCandidate> {
    let img = input.image();
    let dark: Vec<Point2<f32>> = input.mask.dark_pixels().map(|(x, y)| pixel(x, y)).collect();
    if dark.is_empty() {
        return None;
    }
    let tol = params.hough_angle_tolerance_deg.to_radians();
    let span = 2.0 * tol;
    let n_theta = ((params.hough_angle_bins as f32 * span / std::f32::consts::PI).round() as usize)
        .max(1)
        + 1;
    let phi = input.dir.y.atan2(input.dir.x);
    let thetas: Vec<f32> = (0..n_theta)
        .map(|k| phi - tol + span * k as f32 / (n_theta - 1) as f32)
        .collect();

    let diag = ((img.width * img.width + img.height * img.height) as f32).sqrt().ceil() as i64;
    let n_rho = (2 * diag + 1) as usize;
    let mut acc = vec![0u32; thetas.len() * n_rho];
    for p in &dark {
        for (k, theta) in thetas.iter().enumerate() {
            let rho = -p.x * theta.sin() + p.y * theta.cos();
            let bin = rho.round() as i64 + diag;
            if (0..n_rho as i64).contains(&bin) {
                acc[k * n_rho + bin as usize] += 1;
            }
        }
    }
    let (best, votes) = acc
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))?;
    let min_votes = 5u32.max((input.min_side() / 4.0) as u32);
    if *votes < min_votes {
        debug!("hough: best line has {votes} votes, need {min_votes}");
        return None;
    }
    let theta = thetas[best / n_rho];
    let rho = (best % n_rho) as f32 - diag as f32;
    let mut line_dir = Vector2::new(theta.cos(), theta.sin());
    if line_dir.dot(&input.dir) < 0.0 {
        line_dir = -line_dir;
    }
    let normal = Vector2::new(-theta.sin(), theta.cos());
    let tip = dark
        .iter()
        .filter(|p| (p.coords.dot(&normal) - rho).abs() <= 1.5)
        .max_by(|a, b| a.coords.dot(&line_dir).total_cmp(&b.coords.dot(&line_dir)))?;
    Some(input.candidate(*tip, CandidateSource::Hough, ConfidenceTier::Low))
}

/// Dark pixels whose four neighbours are also dark. Thin shaft pixels drop
/// out, the bulk of the clubhead stays.
fn core_mask(mask: &DarkMask) -> Vec<bool> {
    let (w, h) = (mask.width, mask.height);
    let mut core = vec![false; w * h];
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            core[y * w + x] = mask.is_dark(x, y)
                && mask.is_dark(x - 1, y)
                && mask.is_dark(x + 1, y)
                && mask.is_dark(x, y - 1)
                && mask.is_dark(x, y + 1);
        }
    }
    core
}

/// 4-connected components of `mask`, as pixel lists.
fn components(mask: &[bool], w: usize, h: usize) -> Vec<Vec<(usize, usize)>> {
    let mut seen = vec![false; w * h];
    let mut out = Vec::new();
    let mut queue = VecDeque::new();
    for start in 0..w * h {
        if !mask[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        queue.push_back(start);
        let mut comp = Vec::new();
        while let Some(i) = queue.pop_front() {
            let (x, y) = (i % w, i / w);
            comp.push((x, y));
            let mut visit = |j: usize| {
                if mask[j] && !seen[j] {
                    seen[j] = true;
                    queue.push_back(j);
                }
            };
            if x > 0 {
                visit(i - 1);
            }
            if x + 1 < w {
                visit(i + 1);
            }
            if y > 0 {
                visit(i - w);
            }
            if y + 1 < h {
                visit(i + w);
            }
        }
        out.push(comp);
    }
    out
}

/// Dark blob near the shaft line that lies furthest along the shaft.
pub fn blob(input: &DetectorInput<'_>, params: &AddressParams) -> Option<ClubheadCandidate> {
    let (w, h) = (input.mask.width, input.mask.height);
    let core = core_mask(&input.mask);
    let max_offset = 0.25 * input.min_side();
    components(&core, w, h)
        .into_iter()
        .filter(|c| c.len() >= params.blob_min_area)
        .map(|c| {
            let n = c.len() as f32;
            let (sx, sy) = c
                .iter()
                .fold((0.0f32, 0.0f32), |(sx, sy), &(x, y)| (sx + x as f32, sy + y as f32));
            Point2::new(sx / n, sy / n)
        })
        .filter(|c| input.line_distance(*c) <= max_offset)
        .max_by(|a, b| input.along(*a).total_cmp(&input.along(*b)))
        .map(|c| input.candidate(c, CandidateSource::Blob, ConfidenceTier::Medium))
}

/// Summed-area table with a zero first row and column.
fn integral(img: &GrayImage) -> Vec<u64> {
    let (w, h) = (img.width, img.height);
    let mut table = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row = 0u64;
        for x in 0..w {
            row += img.data[y * w + x] as u64;
            table[(y + 1) * (w + 1) + x + 1] = table[y * (w + 1) + x + 1] + row;
        }
    }
    table
}

/// Square patch with the lowest mean intensity, biased toward the expected
/// clubhead position.
pub fn patch(input: &DetectorInput<'_>, params: &AddressParams) -> Option<ClubheadCandidate> {
    let img = input.image();
    let (w, h) = (img.width, img.height);
    let size = params.patch_size.clamp(1, w.min(h));
    let table = integral(img);
    let stride = w + 1;
    let area = (size * size) as f32;
    let scale = input.view.scale();
    let half = (size as f32 - 1.0) / 2.0;
    let mut best: Option<(f32, Point2<f32>)> = None;
    for y in 0..=h - size {
        for x in 0..=w - size {
            let sum = table[(y + size) * stride + x + size] + table[y * stride + x]
                - table[y * stride + x + size]
                - table[(y + size) * stride + x];
            let centre = Point2::new(x as f32 + half, y as f32 + half);
            let score = sum as f32 / area
                + 0.5 * params.darkest_ball_bias * (centre - input.expected).norm() / scale;
            if best.is_none_or(|(s, _)| score < s) {
                best = Some((score, centre));
            }
        }
    }
    let (_, centre) = best?;
    // A bright patch is no clubhead.
    let value = img.get(centre.x.round() as usize, centre.y.round() as usize)?;
    (value <= input.mask.threshold)
        .then(|| input.candidate(centre, CandidateSource::Patch, ConfidenceTier::Low))
}

/// Principal axis of the dark pixels along the shaft; the clubhead is its far
/// end.
pub fn pca_tip(input: &DetectorInput<'_>, params: &AddressParams) -> Option<ClubheadCandidate> {
    let band = 0.2 * input.min_side();
    let pts: Vec<Point2<f32>> = input
        .mask
        .dark_pixels()
        .map(|(x, y)| pixel(x, y))
        .filter(|p| input.line_distance(*p) <= band)
        .collect();
    if pts.len() < params.pca_min_pixels {
        return None;
    }
    let fit = fit_line_pca(&pts, 1.0)?;
    let dir = if fit.direction.dot(&input.dir) < 0.0 {
        -fit.direction
    } else {
        fit.direction
    };
    let reach = pts
        .iter()
        .map(|p| (p - fit.centroid).dot(&dir))
        .fold(f32::NEG_INFINITY, f32::max);
    let tip = fit.centroid + dir * reach;
    Some(input.candidate(tip, CandidateSource::PcaTip, ConfidenceTier::Medium))
}

/// Signature shared by the crop detectors.
pub type Detector = fn(&DetectorInput<'_>, &AddressParams) -> Option<ClubheadCandidate>;

/// Crop detectors in evaluation order.
pub const DETECTORS: [(&str, Detector); 6] = [
    ("darkest", darkest),
    ("shaft_scan", shaft_scan),
    ("hough", hough),
    ("blob", blob),
    ("patch", patch),
    ("pca_tip", pca_tip),
];

/// Run every crop detector and collect their answers.
pub fn run_detectors(input: &DetectorInput<'_>, params: &AddressParams) -> Vec<ClubheadCandidate> {
    DETECTORS
        .iter()
        .filter_map(|(name, detect)| {
            let found = detect(input, params);
            if found.is_none() {
                debug!("{name}: no clubhead candidate");
            }
            found
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::{AddressZone, TieredPoint};
    use swing_plane_core::NormRect;

    const SIZE: usize = 60;

    /// Diagonal one-pixel shaft ending in a 6x6 clubhead, ball further down.
    fn scene() -> GrayImage {
        let mut img = GrayImage::filled(SIZE, SIZE, 220);
        for i in 5..40 {
            img.set(i, i, 30);
        }
        for y in 38..44 {
            for x in 38..44 {
                img.set(x, y, 10);
            }
        }
        img
    }

    fn norm(px: f32) -> f32 {
        (px + 0.5) / SIZE as f32
    }

    fn model() -> ShaftModel {
        let zone = AddressZone {
            grip: Some(TieredPoint::new(Point2::new(norm(5.0), norm(5.0)), ConfidenceTier::High)),
            ball: Some(TieredPoint::new(Point2::new(norm(50.0), norm(50.0)), ConfidenceTier::High)),
            ..AddressZone::default()
        };
        ShaftModel::from_zone(&zone, None, &AddressParams::default()).expect("model")
    }

    fn full() -> NormRect {
        NormRect {
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
        }
    }

    fn near_head(c: &ClubheadCandidate) -> bool {
        let head = Point2::new(norm(41.0), norm(41.0));
        (c.position() - head).norm() < 5.0 / SIZE as f32
    }

    #[test]
    fn every_detector_finds_the_head() {
        let img = scene();
        let model = model();
        let params = AddressParams::default();
        let view = CropView::new(&img, full()).expect("view");
        let input = DetectorInput::new(view, &model, &params).expect("contrast");
        for (name, detect) in DETECTORS {
            let c = detect(&input, &params).unwrap_or_else(|| panic!("{name} found nothing"));
            assert!(near_head(&c), "{name} answered {:?}", c.point);
        }
        assert_eq!(run_detectors(&input, &params).len(), DETECTORS.len());
    }

    #[test]
    fn flat_crop_yields_no_input() {
        let img = GrayImage::filled(SIZE, SIZE, 128);
        let model = model();
        let view = CropView::new(&img, full()).expect("view");
        assert!(DetectorInput::new(view, &model, &AddressParams::default()).is_none());
    }

    #[test]
    fn thin_lines_make_no_blob() {
        let mut img = GrayImage::filled(SIZE, SIZE, 220);
        for i in 5..50 {
            img.set(i, i, 20);
        }
        let model = model();
        let params = AddressParams::default();
        let view = CropView::new(&img, full()).expect("view");
        let input = DetectorInput::new(view, &model, &params).expect("contrast");
        assert!(blob(&input, &params).is_none());
        assert!(hough(&input, &params).is_some());
    }

    #[test]
    fn components_are_four_connected() {
        #[rustfmt::skip]
        let mask = vec![
            true, false, false,
            false, true, true,
            false, false, true,
        ];
        let comps = components(&mask, 3, 3);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[1].len(), 3);
    }
}
