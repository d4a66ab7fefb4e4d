//! Analysis output: the presentation fields plus the explainability detail.

use std::fs;
use std::path::Path;

use serde::Serialize;
use swing_plane_address::{AddressReport, AddressZone};
use swing_plane_core::{ConfidenceTier, PlaneLine};
use swing_plane_trace::{
    ArbiterDecision, Arbitration, FilterSummary, HandPoints, HandVariant, PoseTraces, Trace,
    TraceQuality, VariantTrace,
};

use crate::io::SwingIoError;
use crate::plane::{PlaneResult, PlaneSource};
use crate::zone::{percent, Deviation, Rating, ZoneEvaluation};

/// Quality and filter counts of one pose variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VariantSummary {
    pub variant: HandVariant,
    pub roi_gated: bool,
    pub quality: TraceQuality,
    pub filter: FilterSummary,
}

impl From<&VariantTrace> for VariantSummary {
    fn from(v: &VariantTrace) -> Self {
        Self {
            variant: v.variant,
            roi_gated: v.roi_gated,
            quality: v.quality,
            filter: v.filter,
        }
    }
}

/// Intermediate results kept for explainability; consumers may ignore them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SwingDebug {
    pub arbiter: ArbiterDecision,
    pub selected_variant: HandVariant,
    pub pose_variants: Vec<VariantSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grip_filter: Option<FilterSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressReport>,
    pub planes: PlaneResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneEvaluation>,
}

/// Result of one swing analysis.
///
/// Absent stages leave their fields out of the JSON rather than failing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SwingReport {
    pub hand_trace: Trace,
    pub hand_points: HandPoints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_plane: Option<PlaneLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downswing_plane: Option<PlaneLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plane_source: Option<PlaneSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plane_confidence: Option<ConfidenceTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_plane_rating: Option<Rating>,
    /// Whole percent, e.g. `"80%"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_stay_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_deviation: Option<Deviation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_theta_deg: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coaching: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_zone: Option<AddressZone>,
    pub debug: SwingDebug,
}

impl SwingReport {
    pub(crate) fn assemble(
        arbitration: Arbitration,
        traces: &PoseTraces,
        grip_filter: Option<FilterSummary>,
        address: Option<AddressReport>,
        planes: PlaneResult,
        zone: Option<ZoneEvaluation>,
    ) -> Self {
        let reference = planes.reference;
        let address_zone = address.as_ref().map(|a| a.zone).filter(|z| !z.is_empty());
        Self {
            hand_trace: arbitration.trace,
            hand_points: arbitration.hand_points,
            reference_plane: reference.map(|f| f.line),
            downswing_plane: planes.downswing.map(|f| f.line),
            plane_source: reference.map(|f| f.source),
            plane_confidence: reference.map(|f| f.confidence),
            on_plane_rating: zone.as_ref().map(|z| z.rating),
            zone_stay_ratio: zone.as_ref().map(|z| percent(z.zone_stay_ratio)),
            primary_deviation: zone.as_ref().map(|z| z.primary_deviation),
            zone_theta_deg: zone.as_ref().map(|z| z.theta_deg),
            observation: zone.as_ref().map(|z| z.observation.clone()),
            coaching: zone.as_ref().map(|z| z.coaching.clone()),
            address_zone,
            debug: SwingDebug {
                arbiter: arbitration.decision,
                selected_variant: traces.selected,
                pose_variants: [&traces.reconstructed, &traces.lead, &traces.average]
                    .into_iter()
                    .map(VariantSummary::from)
                    .collect(),
                grip_filter,
                address,
                planes,
                zone,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, SwingIoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, SwingIoError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Write the report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SwingIoError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
