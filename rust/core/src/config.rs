// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconstruction configuration. Coordinate units are assumed to be metres.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration parameters for single-building reconstruction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Data-vs-smoothness trade-off of the face labelling optimisation.
    /// `data_multiplier = lambda`, `smoothness_multiplier = 1 - lambda`.
    pub lambda: f32,

    /// Reserved complexity knob in `[0, 1]`. Carried and validated but not
    /// yet wired to the optimiser.
    pub complexity_factor: f32,

    /// Clip parts off the footprint wherever patches of ground points are
    /// detected. May cause irregular outlines in the result.
    pub clip_ground: bool,

    /// Step height used for LoD 1.3 generalisation: roof parts with a
    /// height discontinuity smaller than this value are merged.
    pub lod13_step_height: f32,

    /// Floor elevation used when the footprint does not provide one
    pub floor_elevation: f32,

    /// Force a flat floor instead of interpolating footprint elevations
    pub override_with_floor_elevation: bool,

    /// Number of neighbours in kNN queries during plane detection
    pub plane_detect_k: usize,

    /// Minimum number of inliers required for a detected plane
    pub plane_detect_min_points: usize,

    /// Maximum point-to-plane distance during plane growing
    pub plane_detect_epsilon: f32,

    /// Minimum dot product between a candidate normal and the region
    /// normal (0 = orthogonal, 1 = parallel)
    pub plane_detect_normal_angle: f32,

    /// |n·z| above which a detected plane counts as horizontal
    pub horiz_threshold: f32,

    /// Plane refit interval during region growing, in added points
    pub plane_refit_interval: usize,

    /// Maximum vertex-to-line distance during boundary line fitting
    pub line_detect_epsilon: f32,

    /// Alpha distance for the concave hull of each detected plane
    pub thres_alpha: f32,

    /// Grow alpha until the shape is connected (capped at 8x)
    pub optimise_alpha_if_needed: bool,

    /// Merge distance for approximately parallel lines during
    /// regularisation
    pub thres_reg_line_dist: f32,

    /// Extension applied to regularised lines to compensate for
    /// undetected roof-part boundaries
    pub thres_reg_line_ext: f32,

    /// Angle bucket width for line regularisation, radians on [0, pi)
    pub thres_reg_line_angle: f32,

    /// Minimum neighbouring inlier pairs before two planes are intersected
    pub min_neighb_pts: usize,

    /// Minimum accepted length of a plane-plane intersection segment
    pub intersect_min_length: f32,

    /// Maximum distance from an intersection line to the nearest inlier
    pub intersect_min_dist_to_line: f32,

    /// Angle (degrees) from the vertical below which a plane pair cannot
    /// form a ridgeline
    pub thres_horizontality: f32,

    /// Height raster cell size
    pub cellsize: f32,

    /// Window radius (cells) of the nodata moving-max fill
    pub fill_nodata_window: usize,

    /// Raster allocation cap in megapixels; larger extents are coarsened
    pub megapixel_limit: usize,

    /// Face-count ceiling of the planar subdivision; beyond it the
    /// building falls back to an LoD 1.1 prism
    pub max_arr_complexity: usize,

    /// Wall-clock budget (ms) for arrangement build + optimisation;
    /// 0 disables the budget
    pub max_time_ms: u32,

    /// Merge arrangement vertices closer than this during snapping
    pub snap_dist: f32,

    /// Elevation above the floor assumed for faces without any height
    /// data during extrusion
    pub nodata_elevation: f32,

    /// Skip reconstruction and emit the prism extrusion only
    pub skip: bool,

    /// PRNG seed for region-growing seed order; fixed default keeps runs
    /// reproducible
    pub seed: u64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            lambda: 1.0 / 9.0,
            complexity_factor: 0.888,
            clip_ground: true,
            lod13_step_height: 3.0,
            floor_elevation: 0.0,
            override_with_floor_elevation: false,
            plane_detect_k: 15,
            plane_detect_min_points: 15,
            plane_detect_epsilon: 0.3,
            plane_detect_normal_angle: 0.75,
            horiz_threshold: 0.995,
            plane_refit_interval: 5,
            line_detect_epsilon: 0.4,
            thres_alpha: 0.25,
            optimise_alpha_if_needed: true,
            thres_reg_line_dist: 0.5,
            thres_reg_line_ext: 1.0,
            thres_reg_line_angle: 0.15,
            min_neighb_pts: 5,
            intersect_min_length: 0.5,
            intersect_min_dist_to_line: 1.0,
            thres_horizontality: 5.0,
            cellsize: 0.05,
            fill_nodata_window: 5,
            megapixel_limit: 600,
            max_arr_complexity: 400,
            max_time_ms: 30_000,
            snap_dist: 0.005,
            nodata_elevation: 3.0,
            skip: false,
            seed: 0x726f_6f66,
        }
    }
}

impl ReconstructionConfig {
    /// Validate parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(Error::InvalidConfig(format!(
                "lambda must lie in [0, 1], got {}",
                self.lambda
            )));
        }
        if !(0.0..=1.0).contains(&self.complexity_factor) {
            return Err(Error::InvalidConfig(format!(
                "complexity_factor must lie in [0, 1], got {}",
                self.complexity_factor
            )));
        }
        if self.lod13_step_height <= 0.0 {
            return Err(Error::InvalidConfig(
                "lod13_step_height must be positive".into(),
            ));
        }
        if self.plane_detect_k < 3 {
            return Err(Error::InvalidConfig(
                "plane_detect_k must be at least 3".into(),
            ));
        }
        if self.cellsize <= 0.0 {
            return Err(Error::InvalidConfig("cellsize must be positive".into()));
        }
        if self.thres_alpha <= 0.0 {
            return Err(Error::InvalidConfig("thres_alpha must be positive".into()));
        }
        if self.max_arr_complexity == 0 {
            return Err(Error::InvalidConfig(
                "max_arr_complexity must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ReconstructionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_lambda() {
        let cfg = ReconstructionConfig {
            lambda: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let cfg = ReconstructionConfig {
            lod13_step_height: 2.0,
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ReconstructionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.lod13_step_height, 2.0);
        assert_eq!(back.seed, cfg.seed);
    }
}
