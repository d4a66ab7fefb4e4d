//! Clubhead candidate scoring and selection.
//!
//! The policy is an ordered table of additive score terms plus one
//! comparator, so every term can be inspected and tested on its own.

use std::cmp::Ordering;

use serde::Serialize;

use crate::candidate::ClubheadCandidate;
use crate::params::AddressParams;
use crate::shaft::ShaftModel;

/// One additive score term; lower totals are better.
#[derive(Clone, Copy)]
pub struct ScoreRule {
    pub name: &'static str,
    pub score: fn(&ClubheadCandidate, Option<&ShaftModel>, &AddressParams) -> f32,
}

fn expected_distance(c: &ClubheadCandidate, m: Option<&ShaftModel>, p: &AddressParams) -> f32 {
    m.map_or(0.0, |m| p.weight_expected * (c.position() - m.expected).norm())
}

fn line_distance(c: &ClubheadCandidate, m: Option<&ShaftModel>, p: &AddressParams) -> f32 {
    m.map_or(0.0, |m| p.weight_line * m.line_distance(c.position()))
}

fn tier_penalty(c: &ClubheadCandidate, _: Option<&ShaftModel>, p: &AddressParams) -> f32 {
    p.tier_penalty(c.tier)
}

fn source_prior(c: &ClubheadCandidate, _: Option<&ShaftModel>, p: &AddressParams) -> f32 {
    c.source.rank() as f32 * p.source_prior_step
}

pub const SCORE_RULES: [ScoreRule; 4] = [
    ScoreRule {
        name: "expected_distance",
        score: expected_distance,
    },
    ScoreRule {
        name: "line_distance",
        score: line_distance,
    },
    ScoreRule {
        name: "tier_penalty",
        score: tier_penalty,
    },
    ScoreRule {
        name: "source_prior",
        score: source_prior,
    },
];

/// Value of one score term for one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoreTerm {
    pub rule: &'static str,
    pub value: f32,
}

/// A candidate with its score breakdown, as reported in the debug section.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: ClubheadCandidate,
    pub score: f32,
    pub terms: Vec<ScoreTerm>,
    /// Implausibly placed relative to the ball; never selected.
    pub excluded: bool,
}

pub fn score_candidate(
    candidate: &ClubheadCandidate,
    model: Option<&ShaftModel>,
    params: &AddressParams,
) -> ScoredCandidate {
    let terms: Vec<ScoreTerm> = SCORE_RULES
        .iter()
        .map(|r| ScoreTerm {
            rule: r.name,
            value: (r.score)(candidate, model, params),
        })
        .collect();
    let score = terms.iter().map(|t| t.value).sum();
    ScoredCandidate {
        candidate: *candidate,
        score,
        terms,
        excluded: model.is_some_and(|m| m.implausible(candidate.position(), params.exclusion_margin)),
    }
}

/// Outcome of [`select_clubhead`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Selection {
    pub winner: Option<ClubheadCandidate>,
    pub scored: Vec<ScoredCandidate>,
}

fn admissible(s: &&ScoredCandidate) -> bool {
    !s.excluded && s.score.is_finite()
}

/// Score every candidate and pick the clubhead.
///
/// The extrapolated point scores zero on both distance terms, so it only
/// competes when no observed candidate is admissible. Among the rest the best
/// score opens a tie window sized by that candidate's tier; inside the window
/// the source preference decides, then the score, then input order.
pub fn select_clubhead(
    candidates: &[ClubheadCandidate],
    model: Option<&ShaftModel>,
    params: &AddressParams,
) -> Selection {
    let scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|c| score_candidate(c, model, params))
        .collect();
    let observed = scored
        .iter()
        .filter(admissible)
        .any(|s| !s.candidate.source.is_fallback());
    let pool = || {
        scored
            .iter()
            .filter(admissible)
            .filter(move |s| !observed || !s.candidate.source.is_fallback())
    };
    let Some(best) = pool().min_by(|a, b| a.score.total_cmp(&b.score)) else {
        return Selection {
            winner: None,
            scored,
        };
    };
    let limit = best.score + params.tie_window(best.candidate.tier);
    let winner = pool()
        .filter(|s| s.score <= limit)
        .min_by(|a, b| preference(a, b))
        .map(|s| s.candidate);
    Selection { winner, scored }
}

fn preference(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    a.candidate
        .source
        .rank()
        .cmp(&b.candidate.source.rank())
        .then(a.score.total_cmp(&b.score))
}
