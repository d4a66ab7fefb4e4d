use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use swing_plane_core::{ConfidenceTier, NormPoint};

/// Heuristic that proposed a clubhead position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Darkest pixel of the crop, biased toward the ball.
    Darkest,
    /// Extrapolated from ball, grip and shaft direction. Selected only when
    /// nothing observed is admissible.
    Expected,
    /// Last dark sample along the shaft line.
    ShaftScan,
    /// Clubhead from the full-frame address query.
    Vision,
    /// Tip of the dominant Hough line near the shaft direction.
    Hough,
    /// Dark connected component along the shaft.
    Blob,
    /// Darkest local patch near the expected point.
    Patch,
    /// Tip of a PCA fit over dark shaft pixels.
    PcaTip,
    /// Ball-adjacent point from the crop query.
    RoiBall,
    /// Clubhead from the crop query.
    RoiMain,
}

impl CandidateSource {
    /// Synthetic position rather than an observation.
    pub fn is_fallback(self) -> bool {
        self == CandidateSource::Expected
    }

    /// Tie-break preference; lower wins.
    pub fn rank(self) -> u8 {
        match self {
            CandidateSource::Darkest | CandidateSource::Expected | CandidateSource::ShaftScan => 0,
            CandidateSource::Vision
            | CandidateSource::Hough
            | CandidateSource::Blob
            | CandidateSource::Patch
            | CandidateSource::PcaTip => 1,
            CandidateSource::RoiBall => 2,
            CandidateSource::RoiMain => 3,
        }
    }
}

/// One proposed clubhead position in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClubheadCandidate {
    #[serde(flatten)]
    pub point: NormPoint,
    pub source: CandidateSource,
    pub tier: ConfidenceTier,
}

impl ClubheadCandidate {
    pub fn new(p: Point2<f32>, source: CandidateSource, tier: ConfidenceTier) -> Self {
        Self {
            point: p.into(),
            source,
            tier,
        }
    }

    pub fn position(&self) -> Point2<f32> {
        self.point.into()
    }
}
