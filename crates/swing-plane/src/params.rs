use serde::{Deserialize, Serialize};
use swing_plane_address::AddressParams;
use swing_plane_trace::TraceParams;

use crate::plane::PlaneParams;
use crate::zone::ZoneParams;

/// Every tunable of one analysis run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerParams {
    pub trace: TraceParams,
    pub address: AddressParams,
    pub plane: PlaneParams,
    pub zone: ZoneParams,
    /// Leading frames searched for the address zone.
    pub address_frames: usize,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        Self {
            trace: TraceParams::default(),
            address: AddressParams::default(),
            plane: PlaneParams::default(),
            zone: ZoneParams::default(),
            address_frames: 2,
        }
    }
}
