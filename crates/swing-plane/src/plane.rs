//! Reference swing-plane fitting.
//!
//! A fixed chain of fitters is tried in order and the first admissible line
//! wins. Every fit also carries the part of the line its evidence supports.

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use swing_plane_address::AddressZone;
use swing_plane_core::{
    fit_line_pca, spread, unique_count, ConfidenceTier, Phase, PlaneLine, Segment,
};
use swing_plane_trace::{phase_points, HandPoints, TracePoint};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Plane fitting thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneParams {
    pub downswing_min_points: usize,
    pub downswing_min_unique: usize,
    pub downswing_min_spread: f32,
    pub unique_quantum: f32,
    /// PCA fits whose major standard deviation is below this are degenerate.
    pub min_major_sd: f32,
    /// Evidence padding at `pad_few_points` or fewer supporting points.
    pub pad_max: f32,
    /// Evidence padding at `pad_many_points` or more supporting points.
    pub pad_min: f32,
    pub pad_few_points: usize,
    pub pad_many_points: usize,
}

impl Default for PlaneParams {
    fn default() -> Self {
        Self {
            downswing_min_points: 3,
            downswing_min_unique: 3,
            downswing_min_spread: 0.04,
            unique_quantum: 0.01,
            min_major_sd: 1e-3,
            pad_max: 0.12,
            pad_min: 0.06,
            pad_few_points: 2,
            pad_many_points: 12,
        }
    }
}

/// Which fitter produced a plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneSource {
    AddressShaft,
    DownswingFit,
    TopImpact,
    PooledFit,
}

/// A fitted plane with its provenance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneFit {
    pub line: PlaneLine,
    pub source: PlaneSource,
    pub confidence: ConfidenceTier,
    /// Supported sub-range of `line`, padded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Segment>,
    pub support: usize,
}

/// Everything the fitters may draw on.
#[derive(Clone, Copy, Debug)]
pub struct PlaneInputs<'a> {
    pub trace: &'a [TracePoint],
    pub hand_points: &'a HandPoints,
    pub address: Option<&'a AddressZone>,
}

/// Evidence padding fraction for `n` supporting points.
pub fn evidence_padding(n: usize, params: &PlaneParams) -> f32 {
    let few = params.pad_few_points;
    let many = params.pad_many_points.max(few + 1);
    if n <= few {
        return params.pad_max;
    }
    if n >= many {
        return params.pad_min;
    }
    let t = (n - few) as f32 / (many - few) as f32;
    params.pad_max + (params.pad_min - params.pad_max) * t
}

/// Part of `line` spanned by the projections of `points`, padded on both
/// ends and kept inside the line.
pub fn evidence_segment(
    line: &PlaneLine,
    points: &[Point2<f32>],
    params: &PlaneParams,
) -> Option<Segment> {
    let (lo, hi) = points
        .iter()
        .map(|p| line.project(*p))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let pad = (hi - lo) * evidence_padding(points.len(), params);
    let len = line.length();
    let a = (lo - pad).clamp(0.0, len);
    let b = (hi + pad).clamp(0.0, len);
    Segment::new(line.point_at(a), line.point_at(b))
}

fn finish(
    line: PlaneLine,
    source: PlaneSource,
    confidence: ConfidenceTier,
    support: &[Point2<f32>],
    params: &PlaneParams,
) -> PlaneFit {
    PlaneFit {
        line,
        source,
        confidence,
        evidence: evidence_segment(&line, support, params),
        support: support.len(),
    }
}

fn pca_line(points: &[Point2<f32>], params: &PlaneParams) -> Option<PlaneLine> {
    let fit = fit_line_pca(points, params.min_major_sd)?;
    PlaneLine::through(fit.centroid, fit.direction)
}

/// Line through the address anchor (clubhead, else ball) and the grip.
pub fn address_shaft(inputs: &PlaneInputs<'_>, params: &PlaneParams) -> Option<PlaneFit> {
    let zone = inputs.address?;
    let anchor = zone.anchor()?;
    let grip = zone.grip?;
    let (a, g) = (anchor.position(), grip.position());
    let line = PlaneLine::through_points(a, g)?;
    let confidence = if anchor.tier == ConfidenceTier::High && grip.tier == ConfidenceTier::High {
        ConfidenceTier::High
    } else {
        ConfidenceTier::Medium
    };
    Some(finish(line, PlaneSource::AddressShaft, confidence, &[a, g], params))
}

/// PCA line through the downswing points when they are numerous and spread.
pub fn downswing_fit(inputs: &PlaneInputs<'_>, params: &PlaneParams) -> Option<PlaneFit> {
    let pts = phase_points(inputs.trace, Phase::Downswing);
    if pts.len() < params.downswing_min_points
        || unique_count(&pts, params.unique_quantum) < params.downswing_min_unique
        || spread(&pts) < params.downswing_min_spread
    {
        return None;
    }
    let line = pca_line(&pts, params)?;
    Some(finish(line, PlaneSource::DownswingFit, ConfidenceTier::Medium, &pts, params))
}

/// Line through the median top and impact hand positions.
pub fn top_impact(inputs: &PlaneInputs<'_>, params: &PlaneParams) -> Option<PlaneFit> {
    let top = inputs.hand_points.get(Phase::Top)?;
    let impact = inputs.hand_points.get(Phase::Impact)?;
    let line = PlaneLine::through_points(top, impact)?;
    Some(finish(line, PlaneSource::TopImpact, ConfidenceTier::Low, &[top, impact], params))
}

/// PCA line through the top, downswing and impact points together.
pub fn pooled_fit(inputs: &PlaneInputs<'_>, params: &PlaneParams) -> Option<PlaneFit> {
    let pts: Vec<Point2<f32>> = [Phase::Top, Phase::Downswing, Phase::Impact]
        .into_iter()
        .flat_map(|phase| phase_points(inputs.trace, phase))
        .collect();
    let line = pca_line(&pts, params)?;
    Some(finish(line, PlaneSource::PooledFit, ConfidenceTier::Low, &pts, params))
}

/// Signature shared by the plane fitters.
pub type PlaneFitter = fn(&PlaneInputs<'_>, &PlaneParams) -> Option<PlaneFit>;

/// Fitters in priority order.
pub const PLANE_FITTERS: [(PlaneSource, PlaneFitter); 4] = [
    (PlaneSource::AddressShaft, address_shaft),
    (PlaneSource::DownswingFit, downswing_fit),
    (PlaneSource::TopImpact, top_impact),
    (PlaneSource::PooledFit, pooled_fit),
];

/// Reference plane plus the downswing fit reported alongside it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaneResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<PlaneFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downswing: Option<PlaneFit>,
}

/// Run the fitter chain; the first admissible line is the reference plane.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(points = inputs.trace.len()))
)]
pub fn fit_plane(inputs: &PlaneInputs<'_>, params: &PlaneParams) -> PlaneResult {
    let reference = PLANE_FITTERS.iter().find_map(|(source, fit)| {
        let found = fit(inputs, params);
        if found.is_none() {
            debug!("plane fitter {source:?}: not admissible");
        }
        found
    });
    let downswing = match reference {
        Some(fit) if fit.source == PlaneSource::DownswingFit => Some(fit),
        _ => downswing_fit(inputs, params),
    };
    PlaneResult {
        reference,
        downswing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use swing_plane_address::TieredPoint;

    fn tp(x: f32, y: f32, phase: Phase, i: u32) -> TracePoint {
        TracePoint {
            x,
            y,
            phase,
            frame_index: i,
            timestamp_sec: None,
        }
    }

    fn downswing_trace() -> Vec<TracePoint> {
        vec![
            tp(0.30, 0.30, Phase::Top, 1),
            tp(0.35, 0.40, Phase::Downswing, 2),
            tp(0.40, 0.50, Phase::Downswing, 3),
            tp(0.45, 0.60, Phase::Downswing, 4),
            tp(0.50, 0.70, Phase::Impact, 5),
        ]
    }

    #[test]
    fn padding_shrinks_with_support() {
        let p = PlaneParams::default();
        assert_relative_eq!(evidence_padding(1, &p), 0.12);
        assert_relative_eq!(evidence_padding(2, &p), 0.12);
        assert_relative_eq!(evidence_padding(7, &p), 0.09, epsilon = 1e-6);
        assert_relative_eq!(evidence_padding(40, &p), 0.06);
    }

    #[test]
    fn address_shaft_wins_when_anchored() {
        let trace = downswing_trace();
        let hp = HandPoints::from_trace(&trace);
        let zone = AddressZone {
            ball: Some(TieredPoint::new(Point2::new(0.7, 0.9), ConfidenceTier::High)),
            grip: Some(TieredPoint::new(Point2::new(0.4, 0.5), ConfidenceTier::High)),
            ..AddressZone::default()
        };
        let inputs = PlaneInputs {
            trace: &trace,
            hand_points: &hp,
            address: Some(&zone),
        };
        let res = fit_plane(&inputs, &PlaneParams::default());
        let reference = res.reference.expect("reference");
        assert_eq!(reference.source, PlaneSource::AddressShaft);
        assert_eq!(reference.confidence, ConfidenceTier::High);
        assert!(reference.line.distance_to(Point2::new(0.55, 0.7)) < 1e-5);
        assert_eq!(res.downswing.expect("downswing").source, PlaneSource::DownswingFit);
    }

    #[test]
    fn downswing_fit_follows_the_points() {
        let trace = downswing_trace();
        let hp = HandPoints::from_trace(&trace);
        let inputs = PlaneInputs {
            trace: &trace,
            hand_points: &hp,
            address: None,
        };
        let res = fit_plane(&inputs, &PlaneParams::default());
        let fit = res.reference.expect("fit");
        assert_eq!(fit.source, PlaneSource::DownswingFit);
        assert!(fit.line.distance_to(Point2::new(0.40, 0.50)) < 1e-4);
        let ev = fit.evidence.expect("evidence");
        let span = (Point2::from(ev.end) - Point2::from(ev.start)).norm();
        // 0.2236 supported by three points, padded 11.4% on each end.
        assert_relative_eq!(span, 0.2236 * 1.228, epsilon = 1e-3);
        assert_eq!(res.downswing, res.reference);
    }

    #[test]
    fn chain_falls_back_to_top_impact_then_pooled() {
        let mut trace = vec![
            tp(0.30, 0.30, Phase::Top, 1),
            tp(0.40, 0.50, Phase::Downswing, 2),
            tp(0.50, 0.70, Phase::Impact, 3),
        ];
        let hp = HandPoints::from_trace(&trace);
        let inputs = PlaneInputs {
            trace: &trace,
            hand_points: &hp,
            address: None,
        };
        let res = fit_plane(&inputs, &PlaneParams::default());
        assert_eq!(res.reference.expect("fit").source, PlaneSource::TopImpact);
        assert!(res.downswing.is_none());

        trace.retain(|p| p.phase != Phase::Impact);
        trace.push(tp(0.45, 0.62, Phase::Downswing, 3));
        let hp = HandPoints::from_trace(&trace);
        let inputs = PlaneInputs {
            trace: &trace,
            hand_points: &hp,
            address: None,
        };
        let res = fit_plane(&inputs, &PlaneParams::default());
        assert_eq!(res.reference.expect("fit").source, PlaneSource::PooledFit);
    }

    #[test]
    fn no_points_no_plane() {
        let hp = HandPoints::default();
        let inputs = PlaneInputs {
            trace: &[],
            hand_points: &hp,
            address: None,
        };
        assert_eq!(fit_plane(&inputs, &PlaneParams::default()), PlaneResult::default());
        let same = [tp(0.5, 0.5, Phase::Downswing, 1), tp(0.5, 0.5, Phase::Impact, 2)];
        let hp = HandPoints::from_trace(&same);
        let inputs = PlaneInputs {
            trace: &same,
            hand_points: &hp,
            address: None,
        };
        assert!(fit_plane(&inputs, &PlaneParams::default()).reference.is_none());
    }
}
