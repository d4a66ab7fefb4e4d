//! Choice between the grip-direct and pose-reconstructed traces.
//!
//! The policy is an ordered rule table evaluated top to bottom; the first rule
//! whose predicate holds decides, and its name is reported.

use std::collections::BTreeMap;

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use swing_plane_core::{median_point, spread, NormPoint, Phase};

use crate::params::ArbiterParams;
use crate::trace::{phase_median, phase_points, Trace, TracePoint, TraceQuality};

/// Which trace the arbiter returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceChoice {
    Pose,
    Grip,
    PhaseMix,
    Empty,
}

/// Inputs every rule predicate sees.
#[derive(Clone, Copy, Debug)]
pub struct ArbiterContext<'a> {
    pub pose: &'a [TracePoint],
    pub grip: Option<&'a [TracePoint]>,
    pub pose_quality: TraceQuality,
    pub grip_quality: Option<TraceQuality>,
    pub params: &'a ArbiterParams,
}

impl ArbiterContext<'_> {
    fn pose_collapsed(&self) -> bool {
        !self
            .pose_quality
            .meets(self.params.collapsed_min_unique, self.params.collapsed_min_spread)
    }

    fn grip_collapsed(&self) -> bool {
        self.grip_quality.is_none_or(|q| {
            !q.meets(self.params.collapsed_min_unique, self.params.collapsed_min_spread)
        })
    }

    fn has_pose(&self) -> bool {
        !self.pose.is_empty()
    }

    fn has_grip(&self) -> bool {
        self.grip.is_some_and(|g| !g.is_empty())
    }
}

pub struct ArbiterRule {
    pub name: &'static str,
    pub applies: fn(&ArbiterContext<'_>) -> bool,
    pub decision: TraceChoice,
}

fn neither(ctx: &ArbiterContext<'_>) -> bool {
    !ctx.has_pose() && !ctx.has_grip()
}

fn pose_preferred(ctx: &ArbiterContext<'_>) -> bool {
    if ctx.pose_collapsed() {
        return false;
    }
    match ctx.grip_quality {
        Some(g) if !ctx.grip_collapsed() => {
            ctx.pose_quality.spread >= g.spread * ctx.params.pose_spread_margin
        }
        _ => true,
    }
}

fn grip_high_quality(ctx: &ArbiterContext<'_>) -> bool {
    ctx.grip_quality.is_some_and(|q| {
        q.meets(
            ctx.params.high_quality_min_unique,
            ctx.params.high_quality_min_spread,
        )
    })
}

fn both_present(ctx: &ArbiterContext<'_>) -> bool {
    ctx.has_pose() && ctx.has_grip()
}

fn pose_present(ctx: &ArbiterContext<'_>) -> bool {
    ctx.has_pose()
}

fn grip_present(ctx: &ArbiterContext<'_>) -> bool {
    ctx.has_grip()
}

pub const ARBITER_RULES: &[ArbiterRule] = &[
    ArbiterRule {
        name: "empty",
        applies: neither,
        decision: TraceChoice::Empty,
    },
    ArbiterRule {
        name: "pose_preferred",
        applies: pose_preferred,
        decision: TraceChoice::Pose,
    },
    ArbiterRule {
        name: "grip_high_quality",
        applies: grip_high_quality,
        decision: TraceChoice::Grip,
    },
    ArbiterRule {
        name: "phase_mix",
        applies: both_present,
        decision: TraceChoice::PhaseMix,
    },
    ArbiterRule {
        name: "pose_only",
        applies: pose_present,
        decision: TraceChoice::Pose,
    },
    ArbiterRule {
        name: "grip_only",
        applies: grip_present,
        decision: TraceChoice::Grip,
    },
];

/// First matching rule.
pub fn decide(ctx: &ArbiterContext<'_>) -> (&'static str, TraceChoice) {
    ARBITER_RULES
        .iter()
        .find(|r| (r.applies)(ctx))
        .map(|r| (r.name, r.decision))
        .unwrap_or(("empty", TraceChoice::Empty))
}

fn time_key(p: &TracePoint) -> (u32, f32) {
    (p.frame_index, p.timestamp_sec.unwrap_or(f32::NEG_INFINITY))
}

/// Per-phase pick between grip and pose points.
///
/// Grip keeps a phase when it has points and its spread is at least the
/// phase ratio times the pose spread, or pose has no points there.
pub fn phase_mix(
    pose: &[TracePoint],
    grip: &[TracePoint],
    params: &ArbiterParams,
) -> (Trace, BTreeMap<Phase, TraceChoice>) {
    let mut sources = BTreeMap::new();
    let mut out: Trace = Vec::with_capacity(pose.len().max(grip.len()));
    for phase in Phase::ALL {
        let g = phase_points(grip, phase);
        let p = phase_points(pose, phase);
        let ratio = if phase == Phase::Top {
            params.top_grip_ratio
        } else {
            params.phase_grip_ratio
        };
        let grip_wins = !g.is_empty() && (p.is_empty() || spread(&g) >= ratio * spread(&p));
        let (choice, src) = if grip_wins {
            (TraceChoice::Grip, grip)
        } else {
            (TraceChoice::Pose, pose)
        };
        if grip_wins || !p.is_empty() {
            sources.insert(phase, choice);
        }
        out.extend(src.iter().filter(|t| t.phase == phase).copied());
    }
    out.sort_by(|a, b| {
        let (fa, ta) = time_key(a);
        let (fb, tb) = time_key(b);
        fa.cmp(&fb).then(ta.total_cmp(&tb))
    });
    (out, sources)
}

/// Insert a top point when the chosen trace has none.
///
/// The position is the median of the top points of the other traces, or the
/// midpoint of the backswing and downswing medians. It is placed between the
/// last backswing and the first downswing sample.
pub fn synthesize_top(trace: &mut Trace, others: &[&[TracePoint]]) -> bool {
    if trace.iter().any(|p| p.phase == Phase::Top) {
        return false;
    }
    let Some(last_back) = trace.iter().rposition(|p| p.phase == Phase::Backswing) else {
        return false;
    };
    let Some(first_down) = trace.iter().position(|p| p.phase == Phase::Downswing) else {
        return false;
    };
    if first_down <= last_back {
        return false;
    }
    let pooled: Vec<Point2<f32>> = others
        .iter()
        .flat_map(|t| phase_points(t, Phase::Top))
        .collect();
    let position = median_point(&pooled).or_else(|| {
        let b = phase_median(trace, Phase::Backswing)?;
        let d = phase_median(trace, Phase::Downswing)?;
        Some(nalgebra::center(&b, &d))
    });
    let Some(position) = position else {
        return false;
    };
    let (before, after) = (trace[last_back], trace[first_down]);
    let timestamp_sec = match (before.timestamp_sec, after.timestamp_sec) {
        (Some(a), Some(b)) => Some(0.5 * (a + b)),
        _ => None,
    };
    trace.insert(
        last_back + 1,
        TracePoint {
            x: position.x.clamp(0.0, 1.0),
            y: position.y.clamp(0.0, 1.0),
            phase: Phase::Top,
            frame_index: before.frame_index,
            timestamp_sec,
        },
    );
    true
}

/// Per-phase median hand positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HandPoints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backswing: Option<NormPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<NormPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downswing: Option<NormPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<NormPoint>,
}

impl HandPoints {
    pub fn from_trace(trace: &[TracePoint]) -> Self {
        let m = |phase| phase_median(trace, phase).map(NormPoint::from);
        Self {
            backswing: m(Phase::Backswing),
            top: m(Phase::Top),
            downswing: m(Phase::Downswing),
            impact: m(Phase::Impact),
        }
    }

    pub fn get(&self, phase: Phase) -> Option<Point2<f32>> {
        let p = match phase {
            Phase::Backswing => self.backswing,
            Phase::Top => self.top,
            Phase::Downswing => self.downswing,
            Phase::Impact => self.impact,
        };
        p.map(Point2::from)
    }
}

/// Explainability record of one arbitration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArbiterDecision {
    pub rule: String,
    pub choice: TraceChoice,
    pub pose_quality: TraceQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grip_quality: Option<TraceQuality>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub phase_sources: BTreeMap<Phase, TraceChoice>,
    pub synthesized_top: bool,
}

/// Final trace and the decision that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arbitration {
    pub trace: Trace,
    pub hand_points: HandPoints,
    pub decision: ArbiterDecision,
}

/// Arbitrate between the pose trace and the optional grip trace.
pub fn arbitrate(pose: &[TracePoint], grip: Option<&[TracePoint]>, params: &ArbiterParams) -> Arbitration {
    let ctx = ArbiterContext {
        pose,
        grip,
        pose_quality: TraceQuality::of(pose, params.unique_quantum),
        grip_quality: grip.map(|g| TraceQuality::of(g, params.unique_quantum)),
        params,
    };
    let (rule, choice) = decide(&ctx);
    let grip = grip.unwrap_or(&[]);
    let (mut trace, phase_sources) = match choice {
        TraceChoice::Pose => (pose.to_vec(), BTreeMap::new()),
        TraceChoice::Grip => (grip.to_vec(), BTreeMap::new()),
        TraceChoice::PhaseMix => phase_mix(pose, grip, params),
        TraceChoice::Empty => (Vec::new(), BTreeMap::new()),
    };
    let synthesized_top = synthesize_top(&mut trace, &[grip, pose]);
    debug!(
        "arbiter rule {rule}: {:?} with {} points{}",
        choice,
        trace.len(),
        if synthesized_top { " (top synthesized)" } else { "" }
    );
    Arbitration {
        hand_points: HandPoints::from_trace(&trace),
        trace,
        decision: ArbiterDecision {
            rule: rule.to_string(),
            choice,
            pose_quality: ctx.pose_quality,
            grip_quality: ctx.grip_quality,
            phase_sources,
            synthesized_top,
        },
    }
}
