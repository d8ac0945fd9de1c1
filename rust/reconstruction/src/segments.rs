// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 3D line segments exchanged between the detection stages

use nalgebra::Point3;

/// Priority of segments detected along alpha-ring boundaries
pub const BOUNDARY_PRIORITY: u8 = 1;
/// Priority of plane-plane intersection segments; wins regularisation ties
pub const INTERSECTION_PRIORITY: u8 = 2;

/// A 3D segment with its origin metadata
#[derive(Debug, Clone)]
pub struct Segment3 {
    pub a: Point3<f64>,
    pub b: Point3<f64>,
    /// 1 = detected boundary, 2 = plane-plane intersection
    pub priority: u8,
    /// Lower incident plane id (equal to `plane_hi` for boundary segments)
    pub plane_lo: u32,
    /// Higher incident plane id
    pub plane_hi: u32,
    /// Intersection of two slanted planes running horizontally
    pub is_ridgeline: bool,
}

impl Segment3 {
    /// Euclidean length
    #[inline]
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    /// xy-plane length
    #[inline]
    pub fn length_2d(&self) -> f64 {
        let dx = self.b.x - self.a.x;
        let dy = self.b.y - self.a.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Direction angle in the xy-plane reduced to [0, pi)
    #[inline]
    pub fn angle_half_circle(&self) -> f64 {
        let a = (self.b.y - self.a.y).atan2(self.b.x - self.a.x);
        a.rem_euclid(std::f64::consts::PI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_angle_reduction() {
        let seg = |ax: f64, ay: f64, bx: f64, by: f64| Segment3 {
            a: Point3::new(ax, ay, 0.0),
            b: Point3::new(bx, by, 0.0),
            priority: BOUNDARY_PRIORITY,
            plane_lo: 1,
            plane_hi: 1,
            is_ridgeline: false,
        };
        // opposite directions map to the same half-circle angle
        assert_relative_eq!(
            seg(0.0, 0.0, 1.0, 1.0).angle_half_circle(),
            seg(1.0, 1.0, 0.0, 0.0).angle_half_circle(),
            epsilon = 1e-12
        );
        assert_relative_eq!(seg(0.0, 0.0, -1.0, 0.0).angle_half_circle(), 0.0, epsilon = 1e-12);
    }
}
