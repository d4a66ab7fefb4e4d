//! Downswing zone conformance: how tightly the hands track the plane.

use std::fmt;

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use swing_plane_core::{angle_between_lines, cross, wrap_angle, Handedness, PlaneLine};

/// Zone evaluation thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneParams {
    /// Tolerance half-angle used when no shoulder calibration is possible.
    pub theta_deg: f32,
    pub theta_min_deg: f32,
    pub theta_max_deg: f32,
    /// Calibrate the tolerance from the anchor-to-shoulder line.
    pub shoulder_calibration: bool,
    /// Fraction of the shaft-to-shoulder wedge used as the half-angle.
    pub shoulder_fraction: f32,
    /// Mid-downswing window, as fractions of the point sequence.
    pub mid_start: f32,
    pub mid_end: f32,
    pub rating_a_mid: f32,
    pub rating_b_mid: f32,
}

impl Default for ZoneParams {
    fn default() -> Self {
        Self {
            theta_deg: 10.0,
            theta_min_deg: 4.0,
            theta_max_deg: 20.0,
            shoulder_calibration: true,
            shoulder_fraction: 0.5,
            mid_start: 0.5,
            mid_end: 0.8,
            rating_a_mid: 0.75,
            rating_b_mid: 0.55,
        }
    }
}

/// Letter grade of the downswing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    A,
    B,
    C,
    D,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
        };
        f.write_str(s)
    }
}

/// Side of the plane a deviation falls on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deviation {
    Outside,
    Inside,
    None,
}

impl Deviation {
    pub fn as_str(self) -> &'static str {
        match self {
            Deviation::Outside => "outside",
            Deviation::Inside => "inside",
            Deviation::None => "none",
        }
    }
}

/// Tolerance half-angle in degrees.
///
/// With a shoulder point the half-angle is a fraction of the wedge between the
/// plane and the anchor-to-shoulder line; the result is always clamped.
pub fn zone_theta_deg(
    anchor: Point2<f32>,
    plane: &PlaneLine,
    shoulder: Option<Point2<f32>>,
    params: &ZoneParams,
) -> f32 {
    let calibrated = shoulder
        .filter(|_| params.shoulder_calibration)
        .and_then(|s| angle_between_lines(s - anchor, plane.direction()))
        .map(|a| a.to_degrees() * params.shoulder_fraction);
    calibrated
        .unwrap_or(params.theta_deg)
        .clamp(params.theta_min_deg, params.theta_max_deg)
}

/// Side of the plane for a point on the `cross(d, v)` side given by `sign`.
fn side(sign: f32, handedness: Option<Handedness>) -> Deviation {
    if sign == 0.0 {
        return Deviation::None;
    }
    let positive_is_outside = handedness != Some(Handedness::Left);
    if (sign > 0.0) == positive_is_outside {
        Deviation::Outside
    } else {
        Deviation::Inside
    }
}

/// Inputs of the rating table.
#[derive(Clone, Copy, Debug)]
pub struct RatingContext<'a> {
    pub mid_ratio: f32,
    pub bias: Deviation,
    pub params: &'a ZoneParams,
}

/// One row of the rating table.
#[derive(Clone, Copy)]
pub struct RatingRule {
    pub applies: fn(&RatingContext<'_>) -> bool,
    pub rating: Rating,
}

fn tight_without_outside_bias(c: &RatingContext<'_>) -> bool {
    c.mid_ratio >= c.params.rating_a_mid && c.bias != Deviation::Outside
}

fn outside_but_mostly_in(c: &RatingContext<'_>) -> bool {
    c.bias == Deviation::Outside && c.mid_ratio >= c.params.rating_b_mid
}

fn outside_bias(c: &RatingContext<'_>) -> bool {
    c.bias == Deviation::Outside
}

fn always(_: &RatingContext<'_>) -> bool {
    true
}

/// First matching row wins.
pub const RATING_RULES: [RatingRule; 4] = [
    RatingRule {
        applies: tight_without_outside_bias,
        rating: Rating::A,
    },
    RatingRule {
        applies: outside_but_mostly_in,
        rating: Rating::B,
    },
    RatingRule {
        applies: outside_bias,
        rating: Rating::C,
    },
    RatingRule {
        applies: always,
        rating: Rating::D,
    },
];

pub fn rate(ctx: &RatingContext<'_>) -> Rating {
    RATING_RULES
        .iter()
        .find(|r| (r.applies)(ctx))
        .map_or(Rating::D, |r| r.rating)
}

/// Zone conformance of one downswing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneEvaluation {
    pub rating: Rating,
    pub zone_stay_ratio: f32,
    pub mid_ratio: f32,
    pub primary_deviation: Deviation,
    pub bias: Deviation,
    pub theta_deg: f32,
    pub evaluated: usize,
    pub in_zone: usize,
    pub outside: usize,
    pub inside: usize,
    /// Largest absolute deviation from the plane, degrees.
    pub max_deviation_deg: f32,
    pub observation: String,
    pub coaching: String,
}

/// Measure the downswing points against the plane.
///
/// Returns `None` without points. Deviations are angles at `anchor` between
/// the plane direction and the direction to each point, with the plane
/// oriented toward the points.
pub fn evaluate_zone(
    anchor: Point2<f32>,
    plane: &PlaneLine,
    points: &[Point2<f32>],
    shoulder: Option<Point2<f32>>,
    handedness: Option<Handedness>,
    params: &ZoneParams,
) -> Option<ZoneEvaluation> {
    if points.is_empty() {
        return None;
    }
    let n = points.len();
    let centroid = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n as f32;
    let mut dir = plane.direction();
    if (Point2::from(centroid) - anchor).dot(&dir) < 0.0 {
        dir = -dir;
    }
    let theta_deg = zone_theta_deg(anchor, plane, shoulder, params);
    let theta = theta_deg.to_radians();

    let deviations: Vec<f32> = points
        .iter()
        .map(|p| {
            let v = p - anchor;
            if v.norm() <= f32::EPSILON {
                0.0
            } else {
                wrap_angle(cross(dir, v).atan2(dir.dot(&v)))
            }
        })
        .collect();
    let in_zone_at = |i: usize| deviations[i].abs() <= theta;

    let in_zone = (0..n).filter(|&i| in_zone_at(i)).count();
    let (mut outside, mut inside) = (0usize, 0usize);
    for (i, d) in deviations.iter().enumerate() {
        if in_zone_at(i) {
            continue;
        }
        match side(d.signum(), handedness) {
            Deviation::Outside => outside += 1,
            Deviation::Inside => inside += 1,
            Deviation::None => {}
        }
    }
    let bias = if outside > 0 && outside >= inside {
        Deviation::Outside
    } else if inside > outside {
        Deviation::Inside
    } else {
        Deviation::None
    };

    let lo = ((n as f32 * params.mid_start).floor() as usize).min(n - 1);
    let hi = ((n as f32 * params.mid_end).ceil() as usize).clamp(lo + 1, n);
    let mid_ratio = (lo..hi).filter(|&i| in_zone_at(i)).count() as f32 / (hi - lo) as f32;

    let (worst, max_dev) = deviations
        .iter()
        .enumerate()
        .fold((0usize, 0.0f32), |(wi, wd), (i, d)| {
            if d.abs() > wd {
                (i, d.abs())
            } else {
                (wi, wd)
            }
        });
    let primary_deviation = if max_dev <= theta {
        Deviation::None
    } else {
        side(deviations[worst].signum(), handedness)
    };

    let zone_stay_ratio = in_zone as f32 / n as f32;
    let rating = rate(&RatingContext {
        mid_ratio,
        bias,
        params,
    });
    Some(ZoneEvaluation {
        rating,
        zone_stay_ratio,
        mid_ratio,
        primary_deviation,
        bias,
        theta_deg,
        evaluated: n,
        in_zone,
        outside,
        inside,
        max_deviation_deg: max_dev.to_degrees(),
        observation: observation_text(zone_stay_ratio, theta_deg, primary_deviation),
        coaching: coaching_text(rating, primary_deviation).to_string(),
    })
}

/// Ratio formatted as a whole percent, e.g. `"80%"`.
pub fn percent(ratio: f32) -> String {
    format!("{:.0}%", (ratio.clamp(0.0, 1.0) * 100.0).round())
}

fn observation_text(ratio: f32, theta_deg: f32, deviation: Deviation) -> String {
    let stay = format!(
        "Your hands stayed within {theta_deg:.0}° of the plane for {} of the downswing.",
        percent(ratio)
    );
    match deviation {
        Deviation::None => stay,
        Deviation::Outside => format!("{stay} The biggest miss was outside (over the top)."),
        Deviation::Inside => format!("{stay} The biggest miss was inside (under the plane)."),
    }
}

fn coaching_text(rating: Rating, deviation: Deviation) -> &'static str {
    match (rating, deviation) {
        (Rating::A, _) => "Great delivery. Keep the same transition and let the arms fall on plane.",
        (_, Deviation::Outside) => {
            "Start the downswing with the lower body and let the hands drop before turning, \
             so the club does not move over the top."
        }
        (_, Deviation::Inside) => {
            "Keep the hands more in front of the chest in transition so the club does not \
             get stuck behind you."
        }
        (Rating::B, _) => {
            "Mostly on plane. Work on a smoother transition to tighten the middle of the downswing."
        }
        _ => "Rehearse slow downswings along the shaft line to build a consistent path.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn horizontal() -> PlaneLine {
        PlaneLine::through(Point2::new(0.5, 0.5), Vector2::new(1.0, 0.0)).expect("line")
    }

    /// Ten points to the right of the anchor; all in the zone except the
    /// first and last, which sit 20 degrees above the line.
    fn eighty_percent() -> Vec<Point2<f32>> {
        (0..10)
            .map(|i| {
                let r = 0.05 + 0.04 * i as f32;
                let deg: f32 = if i == 0 || i == 9 {
                    -20.0
                } else if i % 2 == 0 {
                    5.0
                } else {
                    -7.5
                };
                let a = deg.to_radians();
                Point2::new(0.5 + r * a.cos(), 0.5 + r * a.sin())
            })
            .collect()
    }

    #[test]
    fn eighty_percent_in_zone_rates_a() {
        let params = ZoneParams::default();
        let eval = evaluate_zone(
            Point2::new(0.5, 0.5),
            &horizontal(),
            &eighty_percent(),
            None,
            Some(Handedness::Right),
            &params,
        )
        .expect("evaluation");
        assert_relative_eq!(eval.theta_deg, 10.0);
        assert_relative_eq!(eval.zone_stay_ratio, 0.8);
        assert_relative_eq!(eval.mid_ratio, 1.0);
        assert_eq!(eval.rating, Rating::A);
        assert_eq!(eval.bias, Deviation::Inside);
        assert_eq!(eval.primary_deviation, Deviation::Inside);
        assert_eq!(percent(eval.zone_stay_ratio), "80%");
        assert!(eval.observation.contains("80%"));
    }

    #[test]
    fn outside_bias_grades_by_mid_window() {
        let params = ZoneParams::default();
        // Mirror below the line: the misses are now outside for a right-hander.
        let pts: Vec<_> = eighty_percent()
            .into_iter()
            .map(|p| Point2::new(p.x, 1.0 - p.y))
            .collect();
        let anchor = Point2::new(0.5, 0.5);
        let rh = evaluate_zone(anchor, &horizontal(), &pts, None, Some(Handedness::Right), &params)
            .expect("rh");
        assert_eq!(rh.bias, Deviation::Outside);
        assert_eq!(rh.rating, Rating::B);
        let lh = evaluate_zone(anchor, &horizontal(), &pts, None, Some(Handedness::Left), &params)
            .expect("lh");
        assert_eq!(lh.bias, Deviation::Inside);
        assert_eq!(lh.rating, Rating::A);
    }

    #[test]
    fn rating_table_order() {
        let p = ZoneParams::default();
        let ctx = |mid_ratio, bias| RatingContext {
            mid_ratio,
            bias,
            params: &p,
        };
        assert_eq!(rate(&ctx(0.8, Deviation::None)), Rating::A);
        assert_eq!(rate(&ctx(0.8, Deviation::Outside)), Rating::B);
        assert_eq!(rate(&ctx(0.3, Deviation::Outside)), Rating::C);
        assert_eq!(rate(&ctx(0.3, Deviation::Inside)), Rating::D);
        assert_eq!(rate(&ctx(0.5, Deviation::None)), Rating::D);
    }

    #[test]
    fn theta_is_calibrated_and_clamped() {
        let p = ZoneParams::default();
        let anchor = Point2::new(0.5, 0.5);
        let plane = horizontal();
        assert_relative_eq!(zone_theta_deg(anchor, &plane, None, &p), 10.0);
        // 30 degree wedge -> 15 degree half-angle.
        let s = anchor + Vector2::new(30f32.to_radians().cos(), -30f32.to_radians().sin()) * 0.3;
        assert_relative_eq!(zone_theta_deg(anchor, &plane, Some(s), &p), 15.0, epsilon = 1e-3);
        // 80 degree wedge clamps to 20.
        let s = anchor + Vector2::new(80f32.to_radians().cos(), -80f32.to_radians().sin()) * 0.3;
        assert_relative_eq!(zone_theta_deg(anchor, &plane, Some(s), &p), 20.0);
        let s = anchor + Vector2::new(0.3, -0.001);
        assert_relative_eq!(zone_theta_deg(anchor, &plane, Some(s), &p), 4.0);
    }

    #[test]
    fn no_points_no_evaluation() {
        let p = ZoneParams::default();
        assert!(evaluate_zone(Point2::new(0.5, 0.5), &horizontal(), &[], None, None, &p).is_none());
    }
}
