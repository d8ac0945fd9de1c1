// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for triangulating boundary polygons (with holes)
//! in their best-fit plane.

use crate::error::{Error, Result};
use nalgebra::{Point2, Point3, Vector3};

/// Calculate the normal of a polygon from its vertices using Newell's
/// method; robust for slightly non-planar rings.
#[inline]
pub fn polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();
    if n < 3 {
        return Vector3::z();
    }
    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    let len = normal.norm();
    if len > 1e-12 {
        normal / len
    } else {
        Vector3::z()
    }
}

/// An orthonormal basis on the plane orthogonal to `normal`
#[inline]
pub fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    // reference axis least parallel to the normal, for a stable cross
    let abs = normal.abs();
    let reference = if abs.x <= abs.y && abs.x <= abs.z {
        Vector3::x()
    } else if abs.y <= abs.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = normal.cross(&reference).normalize();
    let v = normal.cross(&u).normalize();
    (u, v)
}

/// Project 3D points onto the (u, v) plane through the origin
#[inline]
pub fn project_points(
    points: &[Point3<f64>],
    u: &Vector3<f64>,
    v: &Vector3<f64>,
) -> Vec<Point2<f64>> {
    points
        .iter()
        .map(|p| Point2::new(p.coords.dot(u), p.coords.dot(v)))
        .collect()
}

/// Triangulate a polygon with holes in its best-fit plane.
/// Returns triangles as vertex triples taken from the input rings
/// (outer first, then holes, in order).
///
/// Earcut prunes collinear boundary vertices; the pruned vertices are
/// stitched back in with zero-area fans so that every ring vertex appears
/// in the triangulation and shells stay free of T-vertex cracks against
/// neighbouring surfaces.
pub fn triangulate_ring(
    outer: &[Point3<f64>],
    holes: &[Vec<Point3<f64>>],
) -> Result<Vec<[Point3<f64>; 3]>> {
    if outer.len() < 3 {
        return Err(Error::Triangulation(
            "need at least 3 points in outer boundary".to_string(),
        ));
    }

    let normal = polygon_normal(outer);
    let (u, v) = plane_basis(&normal);

    let valid_holes: Vec<&Vec<Point3<f64>>> = holes.iter().filter(|h| h.len() >= 3).collect();
    let all: Vec<Point3<f64>> = outer
        .iter()
        .chain(valid_holes.iter().copied().flatten())
        .cloned()
        .collect();
    let projected = project_points(&all, &u, &v);

    let mut vertices = Vec::with_capacity(projected.len() * 2);
    for p in &projected {
        vertices.push(p.x);
        vertices.push(p.y);
    }
    let mut rings: Vec<(usize, usize)> = vec![(0, outer.len())];
    let mut hole_indices = Vec::with_capacity(valid_holes.len());
    let mut offset = outer.len();
    for hole in &valid_holes {
        hole_indices.push(offset);
        rings.push((offset, hole.len()));
        offset += hole.len();
    }

    let indices = earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::Triangulation(format!("{e:?}")))?;
    let mut triangles: Vec<[usize; 3]> = indices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]])
        .collect();
    stitch_pruned_vertices(&mut triangles, &rings, all.len());

    Ok(triangles
        .iter()
        .map(|t| [all[t[0]], all[t[1]], all[t[2]]])
        .collect())
}

/// Re-attach ring vertices that earcut pruned (collinear points) as fans
/// of zero-area triangles, so boundary edges stay split exactly at the
/// input vertices.
fn stitch_pruned_vertices(triangles: &mut Vec<[usize; 3]>, rings: &[(usize, usize)], n: usize) {
    let mut used = vec![false; n];
    for t in triangles.iter() {
        for &i in t {
            used[i] = true;
        }
    }

    for &(start, len) in rings {
        if len < 3 {
            continue;
        }
        let ring_used: Vec<usize> = (0..len).filter(|&i| used[start + i]).collect();
        if ring_used.len() == len || ring_used.len() < 2 {
            continue;
        }
        // walk gaps between consecutive used anchors; a fan of zero-area
        // triangles onto the far anchor restores the skipped boundary
        // vertices while keeping the shell combinatorially closed
        for (k, &a_rel) in ring_used.iter().enumerate() {
            let b_rel = ring_used[(k + 1) % ring_used.len()];
            let gap = (b_rel + len - a_rel) % len;
            if gap <= 1 {
                continue;
            }
            let b = start + b_rel;
            let mut prev = start + a_rel;
            for step in 1..gap {
                let vi = start + (a_rel + step) % len;
                triangles.push([prev, vi, b]);
                prev = vi;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle_area(t: &[Point3<f64>; 3]) -> f64 {
        (t[1] - t[0]).cross(&(t[2] - t[0])).norm() * 0.5
    }

    #[test]
    fn test_horizontal_square() {
        let outer = vec![
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(4.0, 0.0, 2.0),
            Point3::new(4.0, 4.0, 2.0),
            Point3::new(0.0, 4.0, 2.0),
        ];
        let tris = triangulate_ring(&outer, &[]).unwrap();
        assert_eq!(tris.len(), 2);
        let area: f64 = tris.iter().map(triangle_area).sum();
        assert_relative_eq!(area, 16.0, epsilon = 1e-9);
    }

    #[test]
    fn test_vertical_wall() {
        let outer = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 5.0),
        ];
        let tris = triangulate_ring(&outer, &[]).unwrap();
        let area: f64 = tris.iter().map(triangle_area).sum();
        assert_relative_eq!(area, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ring_with_hole() {
        let outer = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        let hole = vec![
            Point3::new(3.0, 3.0, 0.0),
            Point3::new(3.0, 7.0, 0.0),
            Point3::new(7.0, 7.0, 0.0),
            Point3::new(7.0, 3.0, 0.0),
        ];
        let tris = triangulate_ring(&outer, &[hole]).unwrap();
        let area: f64 = tris.iter().map(triangle_area).sum();
        assert_relative_eq!(area, 84.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_rejected() {
        let outer = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(triangulate_ring(&outer, &[]).is_err());
    }

    #[test]
    fn test_newell_normal() {
        let slanted = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let n = polygon_normal(&slanted);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(n.dot(&Vector3::new(0.0, -1.0, 1.0).normalize()).abs(), 1.0, epsilon = 1e-9);
    }
}
