// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor elevation providers
//!
//! A small capability consumed by the extruders: either one constant floor
//! height, or interpolation over a TIN of the footprint's 3D vertices. The
//! extruder is generic over this trait, so the hot loop stays free of
//! dynamic dispatch.

use nalgebra::Point2;
use roofline_core::LinearRing;
use roofline_geometry::Triangulation2;

/// How the caller wants floor elevations sourced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloorSource {
    /// One constant floor height
    Constant(f32),
    /// Interpolate the footprint's per-vertex elevations
    Interpolated,
}

/// Per-location floor elevation
pub trait FloorElevation {
    /// Floor height at a location
    fn elevation_at(&self, x: f64, y: f64) -> f32;

    /// The given percentile of the provider's height distribution
    fn percentile(&self, p: f64) -> f32;
}

/// Flat floor
#[derive(Debug, Clone, Copy)]
pub struct ConstantElevation(pub f32);

impl FloorElevation for ConstantElevation {
    #[inline]
    fn elevation_at(&self, _x: f64, _y: f64) -> f32 {
        self.0
    }

    fn percentile(&self, _p: f64) -> f32 {
        self.0
    }
}

/// Floor heights interpolated from a triangulation of the footprint's
/// vertices; outside the hull the nearest vertex height applies.
#[derive(Debug, Clone)]
pub struct TinElevation {
    tin: Triangulation2,
    heights: Vec<f64>,
}

impl TinElevation {
    /// Triangulate the footprint's vertices (outer ring and holes).
    /// None when the vertices are degenerate (collinear or too few); the
    /// caller falls back to a constant floor.
    pub fn from_footprint(footprint: &LinearRing) -> Option<Self> {
        let mut points = Vec::new();
        let mut heights = Vec::new();
        for p in footprint.all_points() {
            points.push(Point2::new(p.x as f64, p.y as f64));
            heights.push(p.z as f64);
        }
        let tin = Triangulation2::build(&points)?;
        Some(Self { tin, heights })
    }
}

impl FloorElevation for TinElevation {
    #[inline]
    fn elevation_at(&self, x: f64, y: f64) -> f32 {
        self.tin.interpolate(x, y, &self.heights) as f32
    }

    fn percentile(&self, p: f64) -> f32 {
        let mut zs = self.heights.clone();
        zs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if zs.is_empty() {
            return 0.0;
        }
        zs[(p.clamp(0.0, 1.0) * (zs.len() - 1) as f64).floor() as usize] as f32
    }
}
