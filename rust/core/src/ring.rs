// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linear rings: closed 3D polygons with optional interior rings (holes)

use nalgebra::Point3;

/// A closed polygon boundary. Vertices are stored without repeating the
/// first vertex at the end. Interior rings represent holes.
///
/// Orientation convention: exterior CCW, interiors CW, both as seen from +z
/// for horizontal rings (footprints, floors) and from outside the solid for
/// extruded surfaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearRing {
    /// Exterior boundary
    pub points: Vec<Point3<f32>>,
    /// Interior rings (holes)
    pub interiors: Vec<Vec<Point3<f32>>>,
}

/// Twice the signed area of a closed xy-loop (positive for CCW)
#[inline]
pub fn signed_area_2d(points: &[Point3<f32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    for i in 0..n {
        let p = &points[i];
        let q = &points[(i + 1) % n];
        sum += (p.x as f64) * (q.y as f64) - (q.x as f64) * (p.y as f64);
    }
    sum * 0.5
}

/// Even-odd point-in-polygon test in the xy-plane
#[inline]
pub fn point_in_loop_2d(x: f64, y: f64, points: &[Point3<f32>]) -> bool {
    let n = points.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (xi, yi) = (points[i].x as f64, points[i].y as f64);
        let (xj, yj) = (points[j].x as f64, points[j].y as f64);
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

impl LinearRing {
    /// Create a ring from exterior vertices
    pub fn new(points: Vec<Point3<f32>>) -> Self {
        Self {
            points,
            interiors: Vec::new(),
        }
    }

    /// Create a flat ring from xy pairs at the given elevation
    pub fn from_xy(coords: &[(f32, f32)], z: f32) -> Self {
        Self::new(
            coords
                .iter()
                .map(|&(x, y)| Point3::new(x, y, z))
                .collect(),
        )
    }

    /// Number of exterior vertices
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the ring has no exterior vertices
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Signed xy-area of the exterior minus the holes
    pub fn area(&self) -> f64 {
        let mut a = signed_area_2d(&self.points).abs();
        for hole in &self.interiors {
            a -= signed_area_2d(hole).abs();
        }
        a
    }

    /// True when the exterior is counter-clockwise seen from +z
    #[inline]
    pub fn is_ccw(&self) -> bool {
        signed_area_2d(&self.points) > 0.0
    }

    /// Force the exterior CCW and every hole CW (footprint convention)
    pub fn ensure_ccw(&mut self) {
        if signed_area_2d(&self.points) < 0.0 {
            self.points.reverse();
        }
        for hole in &mut self.interiors {
            if signed_area_2d(hole) > 0.0 {
                hole.reverse();
            }
        }
    }

    /// A copy with exterior and all holes reversed
    pub fn reversed(&self) -> LinearRing {
        let mut out = self.clone();
        out.points.reverse();
        for hole in &mut out.interiors {
            hole.reverse();
        }
        out
    }

    /// Set every vertex to the given elevation
    pub fn set_elevation(&mut self, z: f32) {
        for p in &mut self.points {
            p.z = z;
        }
        for hole in &mut self.interiors {
            for p in hole {
                p.z = z;
            }
        }
    }

    /// Even-odd containment in the xy-plane, holes excluded
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        if !point_in_loop_2d(x, y, &self.points) {
            return false;
        }
        !self
            .interiors
            .iter()
            .any(|hole| point_in_loop_2d(x, y, hole))
    }

    /// xy bounding box as (min_x, min_y, max_x, max_y)
    pub fn bbox_2d(&self) -> Option<(f64, f64, f64, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let mut bb = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for p in self.points.iter().chain(self.interiors.iter().flatten()) {
            bb.0 = bb.0.min(p.x as f64);
            bb.1 = bb.1.min(p.y as f64);
            bb.2 = bb.2.max(p.x as f64);
            bb.3 = bb.3.max(p.y as f64);
        }
        Some(bb)
    }

    /// All vertices, exterior first, then holes
    pub fn all_points(&self) -> impl Iterator<Item = &Point3<f32>> {
        self.points.iter().chain(self.interiors.iter().flatten())
    }

    /// Check the exterior loop for self-intersection (pairwise proper
    /// crossings of non-adjacent edges). Quadratic; rings are small.
    pub fn is_self_intersecting(&self) -> bool {
        let n = self.points.len();
        if n < 4 {
            return false;
        }
        let seg = |i: usize| {
            let a = &self.points[i];
            let b = &self.points[(i + 1) % n];
            (
                (a.x as f64, a.y as f64),
                (b.x as f64, b.y as f64),
            )
        };
        for i in 0..n {
            for j in (i + 2)..n {
                // skip adjacent edge pairs (shared vertex)
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (a, b) = seg(i);
                let (c, d) = seg(j);
                if segments_cross(a, b, c, d) {
                    return true;
                }
            }
        }
        false
    }
}

#[inline]
fn orient(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

#[inline]
fn segments_cross(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64)) -> bool {
    let d1 = orient(c, d, a);
    let d2 = orient(c, d, b);
    let d3 = orient(a, b, c);
    let d4 = orient(a, b, d);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> LinearRing {
        LinearRing::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], 0.0)
    }

    #[test]
    fn test_signed_area_orientation() {
        let mut ring = unit_square();
        assert!(ring.is_ccw());
        assert!((ring.area() - 1.0).abs() < 1e-9);

        ring.points.reverse();
        assert!(!ring.is_ccw());
        ring.ensure_ccw();
        assert!(ring.is_ccw());
    }

    #[test]
    fn test_contains_with_hole() {
        let mut ring = LinearRing::from_xy(
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            0.0,
        );
        ring.interiors.push(
            LinearRing::from_xy(&[(3.0, 3.0), (3.0, 7.0), (7.0, 7.0), (7.0, 3.0)], 0.0).points,
        );

        assert!(ring.contains_xy(1.0, 1.0));
        assert!(!ring.contains_xy(5.0, 5.0)); // inside the hole
        assert!(!ring.contains_xy(11.0, 5.0));
        assert!((ring.area() - 84.0).abs() < 1e-6);
    }

    #[test]
    fn test_self_intersection() {
        let bowtie = LinearRing::from_xy(
            &[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)],
            0.0,
        );
        assert!(bowtie.is_self_intersecting());
        assert!(!unit_square().is_self_intersecting());
    }
}
