// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar arrangements as a doubly-connected edge list
//!
//! The subdivision induced by the footprint boundary and the regularised
//! roof-part edges. Stored as an index arena: three vectors of vertices,
//! half-edges, and faces whose relations are `u32` indices, which keeps the
//! cyclic structure free of lifetime knots and trivially cloneable per LoD.
//!
//! Coordinates are exact rationals; f64 leaves this module only through the
//! explicit `*_f64` accessors.

mod build;
mod ops;

pub use build::{build, SegmentInput};
pub use ops::{face_contains, interior_witness, locate_face, snap_vertices};

use crate::exact::{rational_to_f64, signed_area2, ExactPoint2, Rational};
use roofline_core::Plane;
use smallvec::SmallVec;

/// Sentinel for an absent index
pub const INVALID: u32 = u32::MAX;

/// A vertex of the subdivision
#[derive(Debug, Clone)]
pub struct Vertex {
    pub point: ExactPoint2,
    /// Outgoing half-edges, counter-clockwise by direction
    pub out: SmallVec<[u32; 4]>,
}

/// A directed half-edge; its face lies to the left
#[derive(Debug, Clone)]
pub struct HalfEdge {
    pub origin: u32,
    pub twin: u32,
    pub next: u32,
    pub prev: u32,
    pub face: u32,
    /// Forbids dissolving across this edge (footprint boundary)
    pub blocks: bool,
    /// Smoothness weight cached by the optimiser
    pub weight: f64,
}

/// Per-face elevation statistics sampled from the height raster
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElevationStats {
    pub p50: Option<f32>,
    pub p70: Option<f32>,
    pub p97: Option<f32>,
    pub min: Option<f32>,
    pub max: Option<f32>,
}

/// Semantic payload of a face
#[derive(Debug, Clone, Default)]
pub struct FaceData {
    /// Strictly inside the footprint's outer ring and outside every hole
    pub in_footprint: bool,
    /// Bounded face lying inside a footprint hole
    pub is_footprint_hole: bool,
    /// Labelled as terrain by the optimiser
    pub is_ground: bool,
    /// Roof plane assigned by the optimiser
    pub plane: Option<Plane>,
    /// Transient label index during optimisation
    pub label: u32,
    pub elevation: ElevationStats,
    pub pixel_count: usize,
    pub data_coverage: f32,
    /// Connected building part, set during dissolution; -1 = unassigned
    pub part_id: i32,
}

impl FaceData {
    pub fn new() -> Self {
        Self {
            part_id: -1,
            ..Default::default()
        }
    }
}

/// A face of the subdivision
#[derive(Debug, Clone)]
pub struct Face {
    /// One half-edge of the outer boundary; None for the unbounded face
    pub outer: Option<u32>,
    /// One half-edge per inner component (holes, antennas)
    pub inners: Vec<u32>,
    pub data: FaceData,
}

impl Face {
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.outer.is_none()
    }
}

/// The arrangement arena
#[derive(Debug, Clone)]
pub struct Arrangement {
    pub vertices: Vec<Vertex>,
    pub half_edges: Vec<HalfEdge>,
    pub faces: Vec<Face>,
    /// Index of the unbounded face
    pub unbounded: u32,
}

impl Arrangement {
    /// Create an empty arrangement holding only the unbounded face
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            half_edges: Vec::new(),
            faces: vec![Face {
                outer: None,
                inners: Vec::new(),
                data: FaceData::new(),
            }],
            unbounded: 0,
        }
    }

    /// Source vertex of a half-edge
    #[inline]
    pub fn source(&self, h: u32) -> u32 {
        self.half_edges[h as usize].origin
    }

    /// Target vertex of a half-edge
    #[inline]
    pub fn target(&self, h: u32) -> u32 {
        let twin = self.half_edges[h as usize].twin;
        self.half_edges[twin as usize].origin
    }

    /// Number of bounded faces
    pub fn num_bounded_faces(&self) -> usize {
        self.faces.iter().filter(|f| !f.is_unbounded()).count()
    }

    /// Half-edge ids of the connected boundary cycle through `start`
    pub fn ccb(&self, start: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut h = start;
        loop {
            out.push(h);
            h = self.half_edges[h as usize].next;
            if h == start || out.len() > self.half_edges.len() {
                break;
            }
        }
        out
    }

    /// Vertex loop of a boundary cycle (source of every half-edge)
    pub fn ccb_points(&self, start: u32) -> Vec<ExactPoint2> {
        self.ccb(start)
            .into_iter()
            .map(|h| self.vertices[self.source(h) as usize].point.clone())
            .collect()
    }

    /// Exact twice-area of the cycle through `start`
    pub fn ccb_area2(&self, start: u32) -> Rational {
        signed_area2(&self.ccb_points(start))
    }

    /// Outer ring and inner rings of a bounded face, in f64
    pub fn face_polygon_f64(&self, f: u32) -> (Vec<(f64, f64)>, Vec<Vec<(f64, f64)>>) {
        let face = &self.faces[f as usize];
        let to_f64 = |ring: Vec<ExactPoint2>| -> Vec<(f64, f64)> {
            ring.iter().map(|p| p.to_f64()).collect()
        };
        let outer = face
            .outer
            .map(|h| to_f64(self.ccb_points(h)))
            .unwrap_or_default();
        let inners = face
            .inners
            .iter()
            .map(|&h| to_f64(self.ccb_points(h)))
            .collect();
        (outer, inners)
    }

    /// Euclidean length of a half-edge, in f64
    pub fn edge_length_f64(&self, h: u32) -> f64 {
        let (sx, sy) = self.vertices[self.source(h) as usize].point.to_f64();
        let (tx, ty) = self.vertices[self.target(h) as usize].point.to_f64();
        ((tx - sx) * (tx - sx) + (ty - sy) * (ty - sy)).sqrt()
    }

    /// Iterate over one half-edge per undirected edge (the even-indexed
    /// half of every twin pair)
    pub fn edges(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.half_edges.len() as u32).step_by(2)
    }

    /// Both incident faces of an undirected edge
    #[inline]
    pub fn edge_faces(&self, h: u32) -> (u32, u32) {
        let he = &self.half_edges[h as usize];
        (he.face, self.half_edges[he.twin as usize].face)
    }

    /// True when both sides of the edge see the same face (dangling)
    #[inline]
    pub fn is_dangling(&self, h: u32) -> bool {
        let (a, b) = self.edge_faces(h);
        a == b
    }

    /// Segment endpoints of an undirected edge as exact points
    pub fn edge_segment(&self, h: u32) -> (ExactPoint2, ExactPoint2) {
        (
            self.vertices[self.source(h) as usize].point.clone(),
            self.vertices[self.target(h) as usize].point.clone(),
        )
    }

    /// xy-extent of all vertices (f64), or None when empty
    pub fn bounds_f64(&self) -> Option<(f64, f64, f64, f64)> {
        if self.vertices.is_empty() {
            return None;
        }
        let mut bb = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for v in &self.vertices {
            let x = rational_to_f64(&v.point.x);
            let y = rational_to_f64(&v.point.y);
            bb.0 = bb.0.min(x);
            bb.1 = bb.1.min(y);
            bb.2 = bb.2.max(x);
            bb.3 = bb.3.max(y);
        }
        Some(bb)
    }

    /// Consistency check used by debug assertions and tests: every
    /// half-edge has a valid twin/next/prev and every face's cycles close.
    pub fn check_consistency(&self) -> bool {
        for (i, he) in self.half_edges.iter().enumerate() {
            let i = i as u32;
            if self.half_edges[he.twin as usize].twin != i {
                return false;
            }
            if self.half_edges[he.next as usize].prev != i {
                return false;
            }
            if self.half_edges[he.next as usize].origin != self.target(i) {
                return false;
            }
            if self.half_edges[he.next as usize].face != he.face {
                return false;
            }
        }
        for (fi, face) in self.faces.iter().enumerate() {
            for &h in face.outer.iter().chain(face.inners.iter()) {
                if self.half_edges[h as usize].face != fi as u32 {
                    return false;
                }
            }
        }
        true
    }
}
