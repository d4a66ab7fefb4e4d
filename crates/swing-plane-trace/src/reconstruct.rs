//! Dense trace from the filtered candidates: smoothing, spline gap filling,
//! flat extrapolation, denormalization, EMA and event densification.

use log::debug;
use nalgebra::{Point2, Vector2};
use swing_plane_core::{catmull_rom, clamp_unit, Phase};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::candidate::FrameMeta;
use crate::outlier::FilteredCandidates;
use crate::params::ReconstructParams;
use crate::trace::{Trace, TracePoint};

#[derive(Clone, Copy, Debug)]
struct Sample {
    frame: usize,
    position: Point2<f32>,
    confidence: f32,
}

/// Confidence-weighted average of each sample with its valid neighbours.
fn smooth(samples: &[Sample]) -> Vec<Point2<f32>> {
    (0..samples.len())
        .map(|k| {
            let lo = k.saturating_sub(1);
            let hi = (k + 1).min(samples.len() - 1);
            let mut acc = Vector2::zeros();
            let mut weight = 0.0;
            for s in &samples[lo..=hi] {
                acc += s.position.coords * s.confidence;
                weight += s.confidence;
            }
            if weight > 0.0 {
                Point2::from(acc / weight)
            } else {
                samples[k].position
            }
        })
        .collect()
}

/// Local position for every frame between the first and last sample, with the
/// ends flat-extrapolated.
fn fill_gaps(samples: &[Sample], smoothed: &[Point2<f32>], frames: usize) -> Vec<Point2<f32>> {
    let mut out = vec![Point2::origin(); frames];
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return out;
    };
    for slot in out.iter_mut().take(first.frame) {
        *slot = smoothed[0];
    }
    for slot in out.iter_mut().skip(last.frame) {
        *slot = smoothed[samples.len() - 1];
    }
    for k in 0..samples.len() {
        out[samples[k].frame] = smoothed[k];
        if k + 1 == samples.len() {
            break;
        }
        let (a, b) = (samples[k].frame, samples[k + 1].frame);
        if b - a <= 1 {
            continue;
        }
        let p0 = smoothed[k.saturating_sub(1)];
        let p1 = smoothed[k];
        let p2 = smoothed[k + 1];
        let p3 = smoothed[(k + 2).min(samples.len() - 1)];
        for (f, slot) in out.iter_mut().enumerate().take(b).skip(a + 1) {
            let t = (f - a) as f32 / (b - a) as f32;
            *slot = catmull_rom(p0, p1, p2, p3, t);
        }
    }
    out
}

fn ema(points: &mut [TracePoint], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    for i in 1..points.len() {
        let prev = points[i - 1];
        let p = &mut points[i];
        p.x = alpha * p.x + (1.0 - alpha) * prev.x;
        p.y = alpha * p.y + (1.0 - alpha) * prev.y;
    }
}

fn event_time(frames: &[FrameMeta], phase: Phase, fps: f32) -> Option<f32> {
    frames.iter().find(|f| f.phase == phase).map(|f| f.time(fps))
}

/// Insert spline points in gaps that overlap a window around Top or Impact.
fn densify(
    trace: &[TracePoint],
    times: &[f32],
    events: &[f32],
    params: &ReconstructParams,
) -> Trace {
    let n = trace.len();
    let mut out = Vec::with_capacity(n + events.len() * params.densify_points * 4);
    for i in 0..n {
        out.push(trace[i]);
        if i + 1 == n {
            break;
        }
        let (t0, t1) = (times[i], times[i + 1]);
        let hit = events.iter().any(|e| {
            t0 <= e + params.densify_window_sec && t1 >= e - params.densify_window_sec
        });
        if !hit || t1 <= t0 {
            continue;
        }
        let p0 = trace[i.saturating_sub(1)].point();
        let p1 = trace[i].point();
        let p2 = trace[i + 1].point();
        let p3 = trace[(i + 2).min(n - 1)].point();
        let steps = params.densify_points;
        for k in 1..=steps {
            let u = k as f32 / (steps + 1) as f32;
            let p = clamp_unit(catmull_rom(p0, p1, p2, p3, u));
            let timestamp_sec = match (trace[i].timestamp_sec, trace[i + 1].timestamp_sec) {
                (Some(a), Some(b)) => Some(a + (b - a) * u),
                _ => None,
            };
            out.push(TracePoint {
                x: p.x,
                y: p.y,
                phase: trace[i].phase,
                frame_index: trace[i].frame_index,
                timestamp_sec,
            });
        }
    }
    out
}

/// Build the dense image-space trace from filtered candidates.
///
/// With fewer than two kept samples the result is exactly the kept samples.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(frames = filtered.frames.len()))
)]
pub fn reconstruct(filtered: &FilteredCandidates, params: &ReconstructParams) -> Trace {
    let samples: Vec<Sample> = filtered
        .kept
        .iter()
        .enumerate()
        .filter_map(|(frame, c)| {
            c.map(|c| Sample {
                frame,
                position: c.position,
                confidence: c.confidence,
            })
        })
        .collect();

    let to_point = |frame: usize, local: Point2<f32>| {
        let meta = filtered.frames[frame];
        let p = clamp_unit(filtered.transforms[frame].to_image(local));
        TracePoint {
            x: p.x,
            y: p.y,
            phase: meta.phase,
            frame_index: meta.index,
            timestamp_sec: meta.timestamp_sec,
        }
    };

    if samples.len() < 2 {
        return samples
            .iter()
            .map(|s| to_point(s.frame, s.position))
            .collect();
    }

    let smoothed = smooth(&samples);
    let local = fill_gaps(&samples, &smoothed, filtered.frames.len());
    let mut trace: Trace = local
        .iter()
        .enumerate()
        .map(|(frame, p)| to_point(frame, *p))
        .collect();
    ema(&mut trace, params.ema_alpha);

    if !params.densify || params.densify_points == 0 {
        return trace;
    }
    let events: Vec<f32> = [Phase::Top, Phase::Impact]
        .into_iter()
        .filter_map(|phase| event_time(&filtered.frames, phase, filtered.fps))
        .collect();
    if events.is_empty() {
        return trace;
    }
    let times: Vec<f32> = filtered.frames.iter().map(|f| f.time(filtered.fps)).collect();
    let dense = densify(&trace, &times, &events, params);
    debug!(
        "reconstructed {} samples into {} points ({} densified)",
        samples.len(),
        dense.len(),
        dense.len() - trace.len()
    );
    dense
}
