//! Small 2-D helpers shared by the trace, plane and address stages.

use std::collections::BTreeSet;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use nalgebra::{Matrix2, Point2, SymmetricEigen, Vector2};

/// Lines shorter than this (in normalized units) are treated as degenerate.
pub const MIN_LINE_LENGTH: f32 = 1e-3;

/// Bounding-box diagonal of a point set. Empty sets have zero spread.
pub fn spread(points: &[Point2<f32>]) -> f32 {
    let mut it = points.iter();
    let Some(first) = it.next() else {
        return 0.0;
    };
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in it {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    ((max_x - min_x).powi(2) + (max_y - min_y).powi(2)).sqrt()
}

/// Number of distinct points after snapping to a `quantum`-sized grid.
pub fn unique_count(points: &[Point2<f32>], quantum: f32) -> usize {
    let q = if quantum > 0.0 { quantum } else { 0.01 };
    points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| ((p.x / q).round() as i64, (p.y / q).round() as i64))
        .collect::<BTreeSet<_>>()
        .len()
}

/// Median of finite values; even-length inputs average the two middle values.
pub fn median(values: impl IntoIterator<Item = f32>) -> Option<f32> {
    let mut v: Vec<f32> = values.into_iter().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(f32::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        Some(v[mid])
    } else {
        Some(0.5 * (v[mid - 1] + v[mid]))
    }
}

/// Component-wise median of a point set.
pub fn median_point(points: &[Point2<f32>]) -> Option<Point2<f32>> {
    let x = median(points.iter().map(|p| p.x))?;
    let y = median(points.iter().map(|p| p.y))?;
    Some(Point2::new(x, y))
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_angle(a: f32) -> f32 {
    let mut r = (a + PI).rem_euclid(TAU) - PI;
    if r <= -PI {
        r += TAU;
    }
    r
}

/// Z component of the 2-D cross product `a x b`.
#[inline]
pub fn cross(a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Angle in `[0, π/2]` between two undirected lines.
pub fn angle_between_lines(a: Vector2<f32>, b: Vector2<f32>) -> Option<f32> {
    let na = a.norm();
    let nb = b.norm();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return None;
    }
    let ang = wrap_angle(cross(a, b).atan2(a.dot(&b))).abs();
    Some(if ang > FRAC_PI_2 { PI - ang } else { ang })
}

/// Clamp a point into the unit image box.
#[inline]
pub fn clamp_unit(p: Point2<f32>) -> Point2<f32> {
    Point2::new(p.x.clamp(0.0, 1.0), p.y.clamp(0.0, 1.0))
}

/// Uniform Catmull–Rom interpolation between `p1` (t = 0) and `p2` (t = 1).
pub fn catmull_rom(
    p0: Point2<f32>,
    p1: Point2<f32>,
    p2: Point2<f32>,
    p3: Point2<f32>,
    t: f32,
) -> Point2<f32> {
    let t2 = t * t;
    let t3 = t2 * t;
    let blend = |a: f32, b: f32, c: f32, d: f32| {
        0.5 * ((2.0 * b)
            + (-a + c) * t
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
            + (-a + 3.0 * b - 3.0 * c + d) * t3)
    };
    Point2::new(
        blend(p0.x, p1.x, p2.x, p3.x),
        blend(p0.y, p1.y, p2.y, p3.y),
    )
}

/// Intersect the infinite line `origin + t * dir` with the unit box.
///
/// Returns the entry and exit points ordered along `dir`, or `None` when the
/// line misses the box or the clipped segment is degenerate.
pub fn clip_line_to_unit_box(
    origin: Point2<f32>,
    dir: Vector2<f32>,
) -> Option<(Point2<f32>, Point2<f32>)> {
    let n = dir.norm();
    if !n.is_finite() || n <= f32::EPSILON || !origin.x.is_finite() || !origin.y.is_finite() {
        return None;
    }
    let d = dir / n;
    let mut t0 = f32::NEG_INFINITY;
    let mut t1 = f32::INFINITY;
    for (o, v) in [(origin.x, d.x), (origin.y, d.y)] {
        if v.abs() <= 1e-9 {
            if !(0.0..=1.0).contains(&o) {
                return None;
            }
            continue;
        }
        let a = (0.0 - o) / v;
        let b = (1.0 - o) / v;
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }
    let span = t1 - t0;
    if !span.is_finite() || span <= MIN_LINE_LENGTH {
        return None;
    }
    let p = clamp_unit(origin + d * t0);
    let q = clamp_unit(origin + d * t1);
    ((q - p).norm() > MIN_LINE_LENGTH).then_some((p, q))
}

/// Total-least-squares line fit result.
#[derive(Clone, Copy, Debug)]
pub struct LineFit {
    pub centroid: Point2<f32>,
    /// Unit direction of the major axis.
    pub direction: Vector2<f32>,
    /// Standard deviation along the major axis.
    pub major_sd: f32,
    /// Standard deviation across the line (residual spread).
    pub minor_sd: f32,
}

/// Fit a line through the points via 2x2 covariance eigen-decomposition.
///
/// Returns `None` for fewer than two points or when the major standard
/// deviation is below `min_major_sd`.
pub fn fit_line_pca(points: &[Point2<f32>], min_major_sd: f32) -> Option<LineFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f32;
    let mut cx = 0.0f32;
    let mut cy = 0.0f32;
    for p in points {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut sxx = 0.0f32;
    let mut sxy = 0.0f32;
    let mut syy = 0.0f32;
    for p in points {
        let dx = p.x - cx;
        let dy = p.y - cy;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let cov = Matrix2::new(sxx / n, sxy / n, sxy / n, syy / n);
    let eig = SymmetricEigen::new(cov);
    let (major, minor) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };
    let major_sd = eig.eigenvalues[major].max(0.0).sqrt();
    if !major_sd.is_finite() || major_sd < min_major_sd {
        return None;
    }
    let v = eig.eigenvectors.column(major);
    let direction = Vector2::new(v[0], v[1]);
    let norm = direction.norm();
    if norm <= f32::EPSILON {
        return None;
    }
    Some(LineFit {
        centroid: Point2::new(cx, cy),
        direction: direction / norm,
        major_sd,
        minor_sd: eig.eigenvalues[minor].max(0.0).sqrt(),
    })
}
