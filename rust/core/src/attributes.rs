// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-building result attributes written to the feature's attribute row

use serde::{Deserialize, Serialize};

/// Classification of the detected roof shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofType {
    NoPoints,
    NoPlanes,
    Horizontal,
    MultipleHorizontal,
    Slanted,
}

impl Default for RoofType {
    fn default() -> Self {
        RoofType::NoPoints
    }
}

impl std::fmt::Display for RoofType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RoofType::NoPoints => "no points",
            RoofType::NoPlanes => "no planes",
            RoofType::Horizontal => "horizontal",
            RoofType::MultipleHorizontal => "multiple horizontal",
            RoofType::Slanted => "slanted",
        };
        f.write_str(s)
    }
}

/// How the output solids were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrusionMode {
    /// Full pipeline
    Standard,
    /// Budget exceeded; simple prism at the 70th-percentile roof height
    Lod11Fallback,
    /// Reconstruction skipped; no geometry or prism-only on request
    Skip,
}

/// Overall outcome of one reconstruction call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructStatus {
    /// Standard pipeline completed
    Ok,
    /// Not enough points or no detectable planes
    Insufficient,
    /// A budget was exceeded; prism fallback emitted
    Fallback,
    /// Skipped on request
    Skipped,
}

/// Attribute row of one reconstructed building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingAttributes {
    pub roof_type: RoofType,
    pub roof_elevation_min: Option<f32>,
    pub roof_elevation_max: Option<f32>,
    pub roof_elevation_50p: Option<f32>,
    pub roof_elevation_70p: Option<f32>,
    pub ridgeline_count: usize,
    pub highest_ridge_elevation: Option<f32>,
    pub rmse_lod12: Option<f32>,
    pub rmse_lod13: Option<f32>,
    pub rmse_lod22: Option<f32>,
    pub volume_lod12: Option<f32>,
    pub volume_lod13: Option<f32>,
    pub volume_lod22: Option<f32>,
    pub validity_lod12: Option<String>,
    pub validity_lod13: Option<String>,
    pub validity_lod22: Option<String>,
    pub extrusion_mode: ExtrusionMode,
}

impl Default for BuildingAttributes {
    fn default() -> Self {
        Self {
            roof_type: RoofType::NoPoints,
            roof_elevation_min: None,
            roof_elevation_max: None,
            roof_elevation_50p: None,
            roof_elevation_70p: None,
            ridgeline_count: 0,
            highest_ridge_elevation: None,
            rmse_lod12: None,
            rmse_lod13: None,
            rmse_lod22: None,
            volume_lod12: None,
            volume_lod13: None,
            volume_lod22: None,
            validity_lod12: None,
            validity_lod13: None,
            validity_lod22: None,
            extrusion_mode: ExtrusionMode::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roof_type_display() {
        assert_eq!(RoofType::NoPoints.to_string(), "no points");
        assert_eq!(RoofType::MultipleHorizontal.to_string(), "multiple horizontal");
    }
}
