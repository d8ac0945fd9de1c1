// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Alpha shapes: 2.5D concave hulls of detected planes
//!
//! Each plane's inliers are projected to the plane's parameter space,
//! Delaunay-triangulated, and filtered by circumradius. When the filtered
//! triangle set falls apart and optimisation is enabled, alpha is grown by
//! binary search until a single component emerges (capped at 8x). The
//! boundary of the kept triangles is walked into closed rings; the longest
//! ring is the exterior.

use crate::plane_detector::PlanesWithPoints;
use nalgebra::{Point2, Point3};
use roofline_core::{Plane, ReconstructionConfig};
use roofline_geometry::delaunay::NO_EDGE;
use roofline_geometry::Triangulation2;
use rustc_hash::FxHashMap;

/// Alpha rings and triangles for all planes
#[derive(Debug, Clone, Default)]
pub struct AlphaShapes {
    /// Exterior ring per plane (closed, CCW seen from the plane normal),
    /// lifted to 3D; paired with the owning plane id
    pub rings: Vec<(u32, Vec<Point3<f64>>)>,
    /// Kept triangles of all planes, lifted to 3D
    pub triangles: Vec<[Point3<f64>; 3]>,
    /// Owning plane id per triangle, parallel to `triangles`
    pub triangle_plane_ids: Vec<u32>,
}

impl AlphaShapes {
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

/// Compute alpha shapes for every plane
pub fn compute(planes: &PlanesWithPoints, cfg: &ReconstructionConfig) -> AlphaShapes {
    let mut out = AlphaShapes::default();
    let alpha0 = cfg.thres_alpha as f64;

    for (&id, (plane, inliers)) in planes {
        if inliers.len() < 3 {
            continue;
        }
        let (u, v) = plane.basis();
        let projected: Vec<Point2<f64>> = inliers
            .iter()
            .map(|p| {
                let (x, y) = plane.project_2d(p, &u, &v);
                Point2::new(x, y)
            })
            .collect();

        let Some(tri) = Triangulation2::build(&projected) else {
            continue;
        };

        let mut alpha_sq = alpha0 * alpha0;
        let mut kept = keep_triangles(&tri, alpha_sq);
        if kept.iter().filter(|&&k| k).count() == 0 {
            // alpha smaller than the sampling density; grow to the cap
            alpha_sq = alpha0 * alpha0 * 64.0;
            kept = keep_triangles(&tri, alpha_sq);
        } else if cfg.optimise_alpha_if_needed && !is_connected(&tri, &kept) {
            // smallest connected alpha in (alpha0, 8 * alpha0]
            let mut lo = alpha0;
            let mut hi = alpha0 * 8.0;
            for _ in 0..12 {
                let mid = 0.5 * (lo + hi);
                if is_connected(&tri, &keep_triangles(&tri, mid * mid)) {
                    hi = mid;
                } else {
                    lo = mid;
                }
            }
            alpha_sq = hi * hi;
            kept = keep_triangles(&tri, alpha_sq);
        }
        if kept.iter().filter(|&&k| k).count() == 0 {
            continue;
        }

        // lift through the plane so triangles lie exactly on it
        let lift = |p: &Point2<f64>| -> Point3<f64> {
            Point3::new(
                p.x * u.x + p.y * v.x - plane.d * plane.a,
                p.x * u.y + p.y * v.y - plane.d * plane.b,
                p.x * u.z + p.y * v.z - plane.d * plane.c,
            )
        };

        for t in 0..tri.len() {
            if kept[t] {
                let [i, j, k] = tri.points_of_triangle(t);
                out.triangles.push([
                    lift(&tri.points[i]),
                    lift(&tri.points[j]),
                    lift(&tri.points[k]),
                ]);
                out.triangle_plane_ids.push(id);
            }
        }

        if let Some(ring) = exterior_ring(&tri, &kept) {
            out.rings
                .push((id, ring.iter().map(|p| lift(p)).collect()));
        }
    }

    out
}

fn keep_triangles(tri: &Triangulation2, alpha_sq: f64) -> Vec<bool> {
    (0..tri.len())
        .map(|t| tri.circumradius_sq(t) <= alpha_sq)
        .collect()
}

/// Connectivity of the kept triangles across shared edges
fn is_connected(tri: &Triangulation2, kept: &[bool]) -> bool {
    let Some(start) = kept.iter().position(|&k| k) else {
        return false;
    };
    let mut seen = vec![false; kept.len()];
    let mut stack = vec![start];
    seen[start] = true;
    while let Some(t) = stack.pop() {
        for nb in tri.adjacent_triangles(t) {
            if kept[nb] && !seen[nb] {
                seen[nb] = true;
                stack.push(nb);
            }
        }
    }
    kept.iter()
        .zip(&seen)
        .all(|(&k, &s)| !k || s)
}

/// Walk the boundary of the kept triangle set into closed rings and
/// return the longest one (by perimeter), counter-clockwise.
fn exterior_ring(tri: &Triangulation2, kept: &[bool]) -> Option<Vec<Point2<f64>>> {
    // boundary half-edges: kept triangle on the left, nothing kept across
    let mut from_vertex: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    let mut boundary = vec![false; tri.triangles.len()];
    for e in 0..tri.triangles.len() {
        if !kept[tri.triangle_of_edge(e)] {
            continue;
        }
        let opp = tri.halfedges[e];
        if opp == NO_EDGE || !kept[tri.triangle_of_edge(opp)] {
            boundary[e] = true;
            from_vertex.entry(tri.triangles[e]).or_default().push(e);
        }
    }
    for starts in from_vertex.values_mut() {
        starts.sort_unstable();
    }

    let mut used = vec![false; tri.triangles.len()];
    let mut best: Option<(f64, Vec<Point2<f64>>)> = None;

    for e0 in 0..tri.triangles.len() {
        if !boundary[e0] || used[e0] {
            continue;
        }
        let mut ring_vertices = Vec::new();
        let mut perimeter = 0.0;
        let mut e = e0;
        loop {
            used[e] = true;
            let a = tri.triangles[e];
            let b = tri.triangles[Triangulation2::next_halfedge(e)];
            ring_vertices.push(a);
            perimeter += (tri.points[b] - tri.points[a]).norm();
            // continue from the target vertex along an unused boundary edge
            let Some(candidates) = from_vertex.get(&b) else {
                break;
            };
            let Some(&next) = candidates.iter().find(|&&c| !used[c]) else {
                break;
            };
            e = next;
            if e == e0 {
                break;
            }
        }
        if ring_vertices.len() >= 3
            && best.as_ref().map_or(true, |(bp, _)| perimeter > *bp)
        {
            best = Some((
                perimeter,
                ring_vertices.iter().map(|&i| tri.points[i]).collect(),
            ));
        }
    }

    best.map(|(_, ring)| ring)
}
