// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detected roof/ground planes

use nalgebra::{Point3, Vector3};

/// Plane id reserved for unsegmented points
pub const UNSEGMENTED: u32 = 0;

/// A detected plane in Hessian form `a·x + b·y + c·z + d = 0` with
/// `(a, b, c)` a unit normal oriented upward (+z dominant). Ids are unique
/// within one reconstruction; id 0 means "no plane".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub id: u32,
}

impl Plane {
    /// Build from a unit normal and a point on the plane, flipping the
    /// normal upward when needed.
    pub fn from_normal_point(normal: Vector3<f64>, point: Point3<f64>, id: u32) -> Self {
        let n = if normal.z < 0.0 { -normal } else { normal };
        let d = -(n.x * point.x + n.y * point.y + n.z * point.z);
        Self {
            a: n.x,
            b: n.y,
            c: n.z,
            d,
            id,
        }
    }

    /// The unit normal
    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        Vector3::new(self.a, self.b, self.c)
    }

    /// Signed distance from a point to the plane
    #[inline]
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.a * p.x + self.b * p.y + self.c * p.z + self.d
    }

    /// Absolute distance from a point to the plane
    #[inline]
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        self.signed_distance(p).abs()
    }

    /// Elevation of the plane at (x, y). Requires a non-vertical plane
    /// (|c| bounded away from zero, which holds for roof planes).
    #[inline]
    pub fn z_at(&self, x: f64, y: f64) -> f64 {
        -(self.a * x + self.b * y + self.d) / self.c
    }

    /// Horizontality test on the normal's z-component
    #[inline]
    pub fn is_horizontal(&self, threshold: f64) -> bool {
        self.c.abs() >= threshold
    }

    /// An orthonormal (u, v) basis spanning the plane, used to project
    /// inliers to the plane's 2D parameter space.
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>) {
        let n = self.normal();
        // reference axis least parallel to the normal, for a stable cross
        let reference = if self.a.abs() <= self.b.abs() && self.a.abs() <= self.c.abs() {
            Vector3::x()
        } else if self.b.abs() <= self.c.abs() {
            Vector3::y()
        } else {
            Vector3::z()
        };
        let u = n.cross(&reference).normalize();
        let v = n.cross(&u).normalize();
        (u, v)
    }

    /// Project a point into the plane's (u, v) parameter space
    #[inline]
    pub fn project_2d(&self, p: &Point3<f64>, u: &Vector3<f64>, v: &Vector3<f64>) -> (f64, f64) {
        (
            p.x * u.x + p.y * u.y + p.z * u.z,
            p.x * v.x + p.y * v.y + p.z * v.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_normal_flips_upward() {
        let p = Plane::from_normal_point(
            Vector3::new(0.0, 0.0, -1.0),
            Point3::new(0.0, 0.0, 3.0),
            1,
        );
        assert!(p.c > 0.0);
        assert_relative_eq!(p.z_at(5.0, 5.0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_and_horizontality() {
        let p = Plane::from_normal_point(Vector3::z(), Point3::new(0.0, 0.0, 2.0), 1);
        assert_relative_eq!(p.distance(&Point3::new(1.0, 1.0, 4.0)), 2.0);
        assert!(p.is_horizontal(0.995));

        let slanted = Plane::from_normal_point(
            Vector3::new(0.0, 1.0, 1.0).normalize(),
            Point3::origin(),
            2,
        );
        assert!(!slanted.is_horizontal(0.995));
    }

    #[test]
    fn test_basis_spans_plane() {
        let p = Plane::from_normal_point(
            Vector3::new(0.3, -0.2, 0.93).normalize(),
            Point3::new(1.0, 2.0, 3.0),
            1,
        );
        let (u, v) = p.basis();
        assert_relative_eq!(u.dot(&p.normal()), 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.dot(&p.normal()), 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.dot(&v), 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.norm(), 1.0, epsilon = 1e-12);
    }
}
