// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Semantic surface meshes and multi-part solids

use crate::ring::LinearRing;
use std::collections::BTreeMap;

/// Semantic class of a solid's boundary surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SurfaceType {
    Ground = 0,
    Roof = 1,
    WallOuter = 2,
    WallInner = 3,
}

impl SurfaceType {
    /// CityJSON semantic surface name
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceType::Ground => "GroundSurface",
            SurfaceType::Roof => "RoofSurface",
            SurfaceType::WallOuter => "WallSurface",
            SurfaceType::WallInner => "InnerWallSurface",
        }
    }
}

/// Boundary representation of one building part: an ordered list of
/// labelled polygons forming a closed shell after triangulation.
#[derive(Debug, Clone, Default)]
pub struct SemanticMesh {
    polygons: Vec<(LinearRing, SurfaceType)>,
}

impl SemanticMesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a labelled polygon, dropping degenerate rings
    #[inline]
    pub fn push(&mut self, ring: LinearRing, surface: SurfaceType) {
        if ring.len() >= 3 {
            self.polygons.push((ring, surface));
        }
    }

    /// Number of polygons
    #[inline]
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Check if the mesh has no polygons
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// The labelled polygons
    #[inline]
    pub fn polygons(&self) -> &[(LinearRing, SurfaceType)] {
        &self.polygons
    }

    /// Iterate over polygons of one surface type
    pub fn surfaces(&self, surface: SurfaceType) -> impl Iterator<Item = &LinearRing> {
        self.polygons
            .iter()
            .filter(move |(_, s)| *s == surface)
            .map(|(r, _)| r)
    }

    /// Count polygons of one surface type
    pub fn count(&self, surface: SurfaceType) -> usize {
        self.polygons.iter().filter(|(_, s)| *s == surface).count()
    }

    /// Merge another mesh into this one
    pub fn merge(&mut self, other: SemanticMesh) {
        self.polygons.extend(other.polygons);
    }
}

/// One mesh per disconnected building part, keyed by part id.
/// A BTreeMap keeps part iteration deterministic.
pub type MultiSolid = BTreeMap<i32, SemanticMesh>;

/// The three solids produced by one reconstruction
#[derive(Debug, Clone, Default)]
pub struct LodSolids {
    pub lod12: MultiSolid,
    pub lod13: MultiSolid,
    pub lod22: MultiSolid,
}

impl LodSolids {
    /// True when no LoD holds any geometry
    pub fn is_empty(&self) -> bool {
        self.lod12.is_empty() && self.lod13.is_empty() && self.lod22.is_empty()
    }
}
