// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Delaunay triangulation wrapper
//!
//! Thin layer over [delaunator](https://docs.rs/delaunator) exposing the
//! half-edge connectivity, per-triangle circumradii, and a TIN interpolator
//! used for footprint floor elevations.

use delaunator::{triangulate, Point as DPoint, EMPTY};
use nalgebra::Point2;

/// A 2D Delaunay triangulation with half-edge connectivity.
///
/// `triangles[e]` is the point index the half-edge `e` starts from;
/// `halfedges[e]` is the opposite half-edge in the adjacent triangle or
/// `EMPTY` on the hull. The half-edges of triangle `t` are `3t`, `3t+1`,
/// `3t+2`; all triangles wind counter-clockwise.
#[derive(Debug, Clone)]
pub struct Triangulation2 {
    pub points: Vec<Point2<f64>>,
    pub triangles: Vec<usize>,
    pub halfedges: Vec<usize>,
    pub hull: Vec<usize>,
}

/// Sentinel for a missing adjacent half-edge (hull boundary)
pub const NO_EDGE: usize = EMPTY;

impl Triangulation2 {
    /// Triangulate a point set. Returns None when fewer than three
    /// non-collinear points are given.
    pub fn build(points: &[Point2<f64>]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let dpoints: Vec<DPoint> = points.iter().map(|p| DPoint { x: p.x, y: p.y }).collect();
        let t = triangulate(&dpoints);
        if t.triangles.is_empty() {
            return None;
        }
        Some(Self {
            points: points.to_vec(),
            triangles: t.triangles,
            halfedges: t.halfedges,
            hull: t.hull,
        })
    }

    /// Number of triangles
    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Check if the triangulation is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Point indices of a triangle
    #[inline]
    pub fn points_of_triangle(&self, t: usize) -> [usize; 3] {
        [
            self.triangles[3 * t],
            self.triangles[3 * t + 1],
            self.triangles[3 * t + 2],
        ]
    }

    /// Triangle owning a half-edge
    #[inline]
    pub fn triangle_of_edge(&self, e: usize) -> usize {
        e / 3
    }

    /// Next half-edge within the same triangle
    #[inline]
    pub fn next_halfedge(e: usize) -> usize {
        if e % 3 == 2 {
            e - 2
        } else {
            e + 1
        }
    }

    /// Triangles sharing an edge with triangle `t` (up to three)
    pub fn adjacent_triangles(&self, t: usize) -> impl Iterator<Item = usize> + '_ {
        (3 * t..3 * t + 3).filter_map(move |e| {
            let opp = self.halfedges[e];
            (opp != EMPTY).then(|| self.triangle_of_edge(opp))
        })
    }

    /// Squared circumradius of a triangle
    pub fn circumradius_sq(&self, t: usize) -> f64 {
        let [i, j, k] = self.points_of_triangle(t);
        let (a, b, c) = (&self.points[i], &self.points[j], &self.points[k]);

        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let ex = c.x - a.x;
        let ey = c.y - a.y;
        let bl = dx * dx + dy * dy;
        let cl = ex * ex + ey * ey;
        let d = dx * ey - dy * ex;
        if d.abs() < f64::MIN_POSITIVE {
            return f64::INFINITY;
        }
        let x = (ey * bl - dy * cl) * 0.5 / d;
        let y = (dx * cl - ex * bl) * 0.5 / d;
        x * x + y * y
    }

    /// Signed area of a triangle (positive, CCW winding)
    pub fn area(&self, t: usize) -> f64 {
        let [i, j, k] = self.points_of_triangle(t);
        let (a, b, c) = (&self.points[i], &self.points[j], &self.points[k]);
        0.5 * ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x))
    }

    /// Index of the triangle containing (x, y), by orientation tests.
    /// Linear scan; footprint TINs are small.
    pub fn locate(&self, x: f64, y: f64) -> Option<usize> {
        let orient = |a: &Point2<f64>, b: &Point2<f64>| -> f64 {
            (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x)
        };
        (0..self.len()).find(|&t| {
            let [i, j, k] = self.points_of_triangle(t);
            let (a, b, c) = (&self.points[i], &self.points[j], &self.points[k]);
            orient(a, b) >= 0.0 && orient(b, c) >= 0.0 && orient(c, a) >= 0.0
        })
    }

    /// Interpolate a per-point scalar field at (x, y) by barycentric
    /// weights in the containing triangle; outside the hull the value of
    /// the nearest point is used.
    pub fn interpolate(&self, x: f64, y: f64, values: &[f64]) -> f64 {
        debug_assert_eq!(values.len(), self.points.len());
        if let Some(t) = self.locate(x, y) {
            let [i, j, k] = self.points_of_triangle(t);
            let (a, b, c) = (&self.points[i], &self.points[j], &self.points[k]);
            let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
            if det.abs() > 1e-30 {
                let w0 = ((b.y - c.y) * (x - c.x) + (c.x - b.x) * (y - c.y)) / det;
                let w1 = ((c.y - a.y) * (x - c.x) + (a.x - c.x) * (y - c.y)) / det;
                let w2 = 1.0 - w0 - w1;
                return w0 * values[i] + w1 * values[j] + w2 * values[k];
            }
        }
        // nearest-vertex fallback outside the hull
        let mut best = 0;
        let mut best_d = f64::MAX;
        for (i, p) in self.points.iter().enumerate() {
            let d = (p.x - x) * (p.x - x) + (p.y - y) * (p.y - y);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        values[best]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_square_two_triangles() {
        let t = Triangulation2::build(&square()).unwrap();
        assert_eq!(t.len(), 2);
        let total: f64 = (0..t.len()).map(|i| t.area(i)).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_circumradius() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ];
        let t = Triangulation2::build(&points).unwrap();
        // right triangle: circumradius = half the hypotenuse = sqrt(2)
        assert_relative_eq!(t.circumradius_sq(0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolation() {
        let t = Triangulation2::build(&square()).unwrap();
        let values = vec![0.0, 1.0, 2.0, 1.0]; // z = x + y
        assert_relative_eq!(t.interpolate(0.5, 0.5, &values), 1.0, epsilon = 1e-9);
        assert_relative_eq!(t.interpolate(0.25, 0.0, &values), 0.25, epsilon = 1e-9);
        // outside the hull: nearest vertex
        assert_relative_eq!(t.interpolate(-1.0, -1.0, &values), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_rejected() {
        let points: Vec<_> = (0..4).map(|i| Point2::new(i as f64, 0.0)).collect();
        assert!(Triangulation2::build(&points).is_none());
    }
}
