use nalgebra::Point2;
use serde_json::json;
use swing_plane::core::{
    CancelFlag, Frame, Handedness, Landmark, PhaseBoundaries, PoseSnapshot, VisionPrompt,
};
use swing_plane::trace::{is_time_ordered, TraceChoice};
use swing_plane::{
    AnalyzerParams, Deviation, PlaneSource, Rating, RecordedVision, SwingAnalyzer, SwingInput,
    SwingReport,
};

const TOP: u32 = 10;
const IMPACT: u32 = 20;
const FRAMES: u32 = 22;

/// Hand centre on frame `i`: up one line to the top, back down nearly the same line.
fn hand(i: u32) -> Point2<f32> {
    if i < TOP {
        let k = (i - 1) as f32 / 8.0;
        Point2::new(0.50 - 0.14 * k, 0.66 - 0.40 * k)
    } else if i == TOP {
        Point2::new(0.35, 0.23)
    } else {
        let u = (i - TOP - 1) as f32 / 8.0;
        Point2::new(0.37 + 0.12 * u, 0.28 + 0.34 * u)
    }
}

fn body(i: u32) -> PoseSnapshot {
    let h = hand(i);
    PoseSnapshot::new()
        .with(Landmark::LeftShoulder, Point2::new(0.4, 0.3))
        .with(Landmark::RightShoulder, Point2::new(0.6, 0.3))
        .with(Landmark::LeftHip, Point2::new(0.45, 0.55))
        .with(Landmark::RightHip, Point2::new(0.55, 0.55))
        .with(Landmark::LeftWrist, Point2::new(h.x - 0.01, h.y))
        .with(Landmark::RightWrist, Point2::new(h.x + 0.01, h.y))
}

fn swing() -> (Vec<Frame>, Vec<PoseSnapshot>) {
    let frames = (1..=FRAMES)
        .map(|i| Frame::new(i, Some((i - 1) as f32 / 30.0)))
        .collect();
    let poses = (1..=FRAMES).map(body).collect();
    (frames, poses)
}

fn run(analyzer: &SwingAnalyzer<'_>, frames: &[Frame], poses: &[PoseSnapshot]) -> SwingReport {
    analyzer.analyze(&SwingInput {
        frames,
        poses,
        phases: PhaseBoundaries::new(TOP, IMPACT),
        handedness: Some(Handedness::Right),
    })
}

fn fixed_theta() -> AnalyzerParams {
    let mut params = AnalyzerParams::default();
    params.zone.shoulder_calibration = false;
    params
}

#[test]
fn on_plane_downswing_is_rated_a() {
    let (frames, poses) = swing();
    let report = run(&SwingAnalyzer::new(fixed_theta()), &frames, &poses);

    assert_eq!(report.plane_source, Some(PlaneSource::DownswingFit));
    assert!(report.reference_plane.is_some());
    assert_eq!(report.reference_plane, report.downswing_plane);
    assert_eq!(report.on_plane_rating, Some(Rating::A));
    assert_eq!(report.zone_stay_ratio.as_deref(), Some("100%"));
    assert_eq!(report.primary_deviation, Some(Deviation::None));
    assert_eq!(report.zone_theta_deg, Some(10.0));
    assert!(report.hand_points.top.is_some());
    assert!(report.hand_points.impact.is_some());
    assert_eq!(report.debug.arbiter.choice, TraceChoice::Pose);
}

#[test]
fn repeated_runs_are_identical() {
    let (frames, poses) = swing();
    let analyzer = SwingAnalyzer::new(AnalyzerParams::default());
    let a = run(&analyzer, &frames, &poses);
    let b = run(&analyzer, &frames, &poses);
    assert_eq!(a, b);
    assert_eq!(a.to_json().expect("json"), b.to_json().expect("json"));
}

#[test]
fn outputs_stay_in_the_unit_box_and_in_time_order() {
    let (frames, mut poses) = swing();
    // A wild frame and a percent-scale frame.
    poses[5] = body(6).with(Landmark::LeftWrist, Point2::new(0.98, 0.02));
    poses[14] = PoseSnapshot::from_json(&json!({
        "leftWrist": {"x": 42.0, "y": 55.0},
        "rightWrist": {"x": 44.0, "y": 55.0},
        "leftShoulder": {"x": 40, "y": 30},
        "rightShoulder": {"x": 60, "y": 30}
    }));
    let report = run(&SwingAnalyzer::new(AnalyzerParams::default()), &frames, &poses);

    assert!(!report.hand_trace.is_empty());
    for p in &report.hand_trace {
        assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y), "{p:?}");
    }
    assert!(is_time_ordered(&report.hand_trace));
    for line in [report.reference_plane, report.downswing_plane].into_iter().flatten() {
        for p in [line.start(), line.end()] {
            let edge = p.x.min(1.0 - p.x).min(p.y).min(1.0 - p.y);
            assert!(edge.abs() < 1e-4, "{p:?} is not on the unit box");
        }
        assert!(line.length() > 1e-3);
    }
}

#[test]
fn empty_poses_give_an_empty_trace() {
    let frames: Vec<Frame> = (1..=8).map(|i| Frame::new(i, None)).collect();
    let poses = vec![PoseSnapshot::new(); 8];
    let report = run(&SwingAnalyzer::new(AnalyzerParams::default()), &frames, &poses);
    assert!(report.hand_trace.is_empty());
    assert!(report.reference_plane.is_none());
    assert!(report.on_plane_rating.is_none());
    let value = report.to_value().expect("json");
    assert_eq!(value["hand_trace"], json!([]));
    assert!(value.get("on_plane_rating").is_none());
}

#[test]
fn a_single_landmark_gives_a_single_point() {
    let frames: Vec<Frame> = (1..=5).map(|i| Frame::new(i, None)).collect();
    let mut poses = vec![PoseSnapshot::new(); 5];
    poses[2] = PoseSnapshot::new().with(Landmark::LeftWrist, Point2::new(0.5, 0.6));
    let report = SwingAnalyzer::new(AnalyzerParams::default()).analyze(&SwingInput {
        frames: &frames,
        poses: &poses,
        phases: PhaseBoundaries::new(2, 4),
        handedness: None,
    });
    assert_eq!(report.hand_trace.len(), 1);
    assert_eq!(report.hand_trace[0].frame_index, 3);
    assert!(report.reference_plane.is_none());
}

fn recorded_grip() -> RecordedVision {
    (1..=FRAMES).fold(RecordedVision::new(), |rec, i| {
        let h = hand(i);
        rec.with(VisionPrompt::Grip, i, json!({"grip": {"x": h.x, "y": h.y}}))
    })
}

#[test]
fn recorded_grip_trace_is_arbitrated() {
    let (frames, poses) = swing();
    let vision = recorded_grip();
    let analyzer = SwingAnalyzer::new(AnalyzerParams::default()).with_vision(&vision);
    let report = run(&analyzer, &frames, &poses);

    assert!(report.debug.grip_filter.is_some());
    assert!(report.debug.arbiter.grip_quality.is_some());
    assert_eq!(report.debug.arbiter.choice, TraceChoice::Grip);
    assert_eq!(report.debug.arbiter.rule, "grip_high_quality");
    assert!(is_time_ordered(&report.hand_trace));
}

#[test]
fn recorded_address_sets_the_reference_plane() {
    let (frames, poses) = swing();
    let address = json!({
        "clubhead": {"x": 0.62, "y": 0.9, "confidence": "high"},
        "grip": {"x": 0.50, "y": 0.66, "confidence": "high"},
        "ball": {"x": 0.64, "y": 0.92, "confidence": "high"}
    });
    let vision = RecordedVision::new()
        .with(VisionPrompt::Address, 1, address.clone())
        .with(VisionPrompt::Address, 2, address);
    let analyzer = SwingAnalyzer::new(AnalyzerParams::default()).with_vision(&vision);
    let report = run(&analyzer, &frames, &poses);

    assert_eq!(report.plane_source, Some(PlaneSource::AddressShaft));
    let zone = report.address_zone.expect("address zone");
    assert!(zone.grip.is_some() && zone.ball.is_some() && zone.shoulder.is_some());
    assert!(report.on_plane_rating.is_some());
    // The downswing fit is still reported next to the address shaft.
    assert!(report.downswing_plane.is_some());
    assert_ne!(report.reference_plane, report.downswing_plane);
}

#[test]
fn cancelled_runs_ignore_vision() {
    let (frames, poses) = swing();
    let vision = recorded_grip();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let analyzer = SwingAnalyzer::new(AnalyzerParams::default())
        .with_vision(&vision)
        .with_cancel(cancel);
    let report = run(&analyzer, &frames, &poses);
    assert!(report.debug.grip_filter.is_none());
    assert_eq!(report.debug.arbiter.choice, TraceChoice::Pose);
}
