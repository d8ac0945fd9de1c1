// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solid triangulation and derived properties
//!
//! Triangulates every boundary polygon (holes included) in its best-fit
//! plane, then derives the solid's volume by signed tetrahedra, the RMSE
//! from roof inliers to the nearest roof triangle, and a closed-2-manifold
//! validity report over quantised vertex keys.

use crate::error::Result;
use nalgebra::Point3;
use roofline_core::{MultiSolid, SurfaceType};
use roofline_geometry::triangulate_ring;
use rustc_hash::FxHashMap;

/// A triangulated multi-part solid with per-triangle surface labels
#[derive(Debug, Clone, Default)]
pub struct TriangulatedSolid {
    pub triangles: Vec<[Point3<f64>; 3]>,
    pub surfaces: Vec<SurfaceType>,
}

/// Triangulate every polygon of every part
pub fn triangulate_solid(solid: &MultiSolid) -> Result<TriangulatedSolid> {
    let mut out = TriangulatedSolid::default();
    for mesh in solid.values() {
        for (ring, surface) in mesh.polygons() {
            let outer: Vec<Point3<f64>> = ring
                .points
                .iter()
                .map(|p| Point3::new(p.x as f64, p.y as f64, p.z as f64))
                .collect();
            let holes: Vec<Vec<Point3<f64>>> = ring
                .interiors
                .iter()
                .map(|h| {
                    h.iter()
                        .map(|p| Point3::new(p.x as f64, p.y as f64, p.z as f64))
                        .collect()
                })
                .collect();
            for tri in triangulate_ring(&outer, &holes)? {
                out.triangles.push(tri);
                out.surfaces.push(*surface);
            }
        }
    }
    Ok(out)
}

/// Enclosed volume by the divergence theorem; positive for outward-facing
/// orientation
pub fn volume(solid: &TriangulatedSolid) -> f64 {
    solid
        .triangles
        .iter()
        .map(|t| t[0].coords.dot(&t[1].coords.cross(&t[2].coords)) / 6.0)
        .sum()
}

/// Root-mean-square distance from the points to the nearest roof triangle
pub fn rmse_to_roof(solid: &TriangulatedSolid, points: &[Point3<f64>]) -> Option<f32> {
    if points.is_empty() {
        return None;
    }
    let roofs: Vec<&[Point3<f64>; 3]> = solid
        .triangles
        .iter()
        .zip(&solid.surfaces)
        .filter(|(t, s)| {
            // skip the zero-area stitch triangles
            **s == SurfaceType::Roof
                && (t[1] - t[0]).cross(&(t[2] - t[0])).norm_squared() > 1e-20
        })
        .map(|(t, _)| t)
        .collect();
    if roofs.is_empty() {
        return None;
    }
    let sum_sq: f64 = points
        .iter()
        .map(|p| {
            roofs
                .iter()
                .map(|t| point_triangle_distance_sq(p, t))
                .fold(f64::MAX, f64::min)
        })
        .sum();
    Some((sum_sq / points.len() as f64).sqrt() as f32)
}

/// Squared distance from a point to a triangle
fn point_triangle_distance_sq(p: &Point3<f64>, t: &[Point3<f64>; 3]) -> f64 {
    let ab = t[1] - t[0];
    let ac = t[2] - t[0];
    let ap = p - t[0];

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return ap.norm_squared();
    }

    let bp = p - t[1];
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return bp.norm_squared();
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (ap - ab * v).norm_squared();
    }

    let cp = p - t[2];
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return cp.norm_squared();
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (ap - ac * w).norm_squared();
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (bp - (t[2] - t[1]) * w).norm_squared();
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (ap - (ab * v + ac * w)).norm_squared()
}

/// Topological validity of the triangulated shell: every undirected edge
/// shared by exactly two triangles with opposite directions. Returns "ok"
/// or a compact error summary.
pub fn validity(solid: &TriangulatedSolid) -> String {
    const Q: f64 = 1.0e4; // 0.1 mm quantisation
    let key = |p: &Point3<f64>| -> (i64, i64, i64) {
        (
            (p.x * Q).round() as i64,
            (p.y * Q).round() as i64,
            (p.z * Q).round() as i64,
        )
    };

    // per undirected edge: net orientation balance and total incidences
    let mut edges: FxHashMap<((i64, i64, i64), (i64, i64, i64)), (isize, usize)> =
        FxHashMap::default();
    let mut degenerate = 0usize;
    for t in &solid.triangles {
        let k = [key(&t[0]), key(&t[1]), key(&t[2])];
        if k[0] == k[1] || k[1] == k[2] || k[2] == k[0] {
            degenerate += 1;
            continue;
        }
        for i in 0..3 {
            let (a, b) = (k[i], k[(i + 1) % 3]);
            let entry = if a < b {
                edges.entry((a, b)).or_insert((0, 0))
            } else {
                edges.entry((b, a)).or_insert((0, 0))
            };
            entry.0 += if a < b { 1 } else { -1 };
            entry.1 += 1;
        }
    }

    let mut open = 0usize;
    let mut non_manifold = 0usize;
    for &(net, total) in edges.values() {
        if total < 2 {
            open += 1;
        } else if total > 2 || net != 0 {
            non_manifold += 1;
        }
    }

    if open == 0 && non_manifold == 0 && degenerate == 0 {
        "ok".to_string()
    } else {
        let mut parts = Vec::new();
        if open > 0 {
            parts.push(format!("open_edges({open})"));
        }
        if non_manifold > 0 {
            parts.push(format!("non_manifold_edges({non_manifold})"));
        }
        if degenerate > 0 {
            parts.push(format!("degenerate_triangles({degenerate})"));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prism_extruder::extrude_prism;
    use approx::assert_relative_eq;
    use roofline_core::LinearRing;

    fn unit_box() -> TriangulatedSolid {
        let fp = LinearRing::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], 0.0);
        triangulate_solid(&extrude_prism(&fp, 0.0, 1.0)).unwrap()
    }

    #[test]
    fn test_box_volume_and_validity() {
        let ts = unit_box();
        assert_relative_eq!(volume(&ts), 1.0, epsilon = 1e-9);
        assert_eq!(validity(&ts), "ok");
    }

    #[test]
    fn test_prism_volume_scales() {
        let fp = LinearRing::from_xy(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)], 0.0);
        let ts = triangulate_solid(&extrude_prism(&fp, 0.0, 3.0)).unwrap();
        assert_relative_eq!(volume(&ts), 150.0, epsilon = 1e-6);
        assert_eq!(validity(&ts), "ok");
    }

    #[test]
    fn test_hole_prism_watertight() {
        let mut fp = LinearRing::from_xy(&[(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0)], 0.0);
        fp.interiors.push(
            LinearRing::from_xy(&[(3.0, 3.0), (3.0, 5.0), (5.0, 5.0), (5.0, 3.0)], 0.0).points,
        );
        let ts = triangulate_solid(&extrude_prism(&fp, 0.0, 2.0)).unwrap();
        assert_eq!(validity(&ts), "ok");
        assert_relative_eq!(volume(&ts), (64.0 - 4.0) * 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rmse_measures_offset() {
        let ts = unit_box();
        // points 0.1 above the roof plane z = 1
        let points: Vec<Point3<f64>> = (0..10)
            .map(|i| Point3::new(0.1 + 0.08 * i as f64, 0.5, 1.1))
            .collect();
        let rmse = rmse_to_roof(&ts, &points).unwrap();
        assert_relative_eq!(rmse as f64, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_open_shell_detected() {
        let mut ts = unit_box();
        ts.triangles.pop();
        ts.surfaces.pop();
        assert!(validity(&ts).contains("open_edges"));
    }
}
