// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exact rational 2D kernel
//!
//! The planar arrangement stores vertex coordinates as arbitrary-precision
//! rationals. Predicates (orientation, containment) and constructions
//! (segment intersection) evaluated here are exact; f64 is only produced
//! when geometry is read back out.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

/// Arbitrary-precision rational scalar
pub type Rational = BigRational;

/// Convert an f64 into an exact rational. Returns None for non-finite
/// input.
pub fn rational_from_f64(v: f64) -> Option<Rational> {
    Rational::from_float(v)
}

/// Read a rational back as f64 (rounding)
pub fn rational_to_f64(v: &Rational) -> f64 {
    v.to_f64().unwrap_or_else(|| {
        // magnitudes beyond f64 range cannot appear for building-scale
        // coordinates; clamp defensively rather than panic
        if v.is_negative() {
            f64::MIN
        } else {
            f64::MAX
        }
    })
}

/// An exact 2D point
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExactPoint2 {
    pub x: Rational,
    pub y: Rational,
}

impl ExactPoint2 {
    /// Create from rational coordinates
    pub fn new(x: Rational, y: Rational) -> Self {
        Self { x, y }
    }

    /// Create from f64 coordinates; None when non-finite
    pub fn from_f64(x: f64, y: f64) -> Option<Self> {
        Some(Self {
            x: rational_from_f64(x)?,
            y: rational_from_f64(y)?,
        })
    }

    /// Read back as f64
    pub fn to_f64(&self) -> (f64, f64) {
        (rational_to_f64(&self.x), rational_to_f64(&self.y))
    }

    /// Midpoint of two points
    pub fn midpoint(&self, other: &ExactPoint2) -> ExactPoint2 {
        let two = Rational::from_integer(BigInt::from(2));
        ExactPoint2 {
            x: (&self.x + &other.x) / &two,
            y: (&self.y + &other.y) / &two,
        }
    }
}

/// Exact cross product (b - a) x (c - a)
pub fn cross(a: &ExactPoint2, b: &ExactPoint2, c: &ExactPoint2) -> Rational {
    (&b.x - &a.x) * (&c.y - &a.y) - (&b.y - &a.y) * (&c.x - &a.x)
}

/// Exact orientation of c relative to the directed line a->b:
/// `Greater` = left (CCW), `Less` = right (CW), `Equal` = collinear.
pub fn orient2d(a: &ExactPoint2, b: &ExactPoint2, c: &ExactPoint2) -> Ordering {
    cross(a, b, c).cmp(&Rational::zero())
}

/// True when p lies on the closed segment [a, b]
pub fn on_segment(a: &ExactPoint2, b: &ExactPoint2, p: &ExactPoint2) -> bool {
    if orient2d(a, b, p) != Ordering::Equal {
        return false;
    }
    let min_x = (&a.x).min(&b.x);
    let max_x = (&a.x).max(&b.x);
    let min_y = (&a.y).min(&b.y);
    let max_y = (&a.y).max(&b.y);
    &p.x >= min_x && &p.x <= max_x && &p.y >= min_y && &p.y <= max_y
}

/// Result of intersecting two closed segments
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentIntersection {
    Disjoint,
    /// A single point, possibly a shared endpoint
    Point(ExactPoint2),
    /// A collinear overlap with distinct endpoints
    Overlap(ExactPoint2, ExactPoint2),
}

/// Exact intersection of segments [a1, a2] and [b1, b2]
pub fn segment_intersection(
    a1: &ExactPoint2,
    a2: &ExactPoint2,
    b1: &ExactPoint2,
    b2: &ExactPoint2,
) -> SegmentIntersection {
    let d1x = &a2.x - &a1.x;
    let d1y = &a2.y - &a1.y;
    let d2x = &b2.x - &b1.x;
    let d2y = &b2.y - &b1.y;
    let denom = &d1x * &d2y - &d1y * &d2x;

    if !denom.is_zero() {
        let wx = &b1.x - &a1.x;
        let wy = &b1.y - &a1.y;
        let t = (&wx * &d2y - &wy * &d2x) / &denom;
        let u = (&wx * &d1y - &wy * &d1x) / &denom;
        let zero = Rational::zero();
        let one = Rational::from_integer(BigInt::from(1));
        if t >= zero && t <= one && u >= zero && u <= one {
            return SegmentIntersection::Point(ExactPoint2 {
                x: &a1.x + &t * &d1x,
                y: &a1.y + &t * &d1y,
            });
        }
        return SegmentIntersection::Disjoint;
    }

    // parallel: distinct supporting lines never meet
    if orient2d(a1, a2, b1) != Ordering::Equal {
        return SegmentIntersection::Disjoint;
    }

    // collinear: overlap along the dominant axis
    let use_x = (&a1.x - &a2.x).abs() >= (&a1.y - &a2.y).abs();
    let key = |p: &ExactPoint2| if use_x { p.x.clone() } else { p.y.clone() };

    let (mut a_lo, mut a_hi) = (a1.clone(), a2.clone());
    if key(&a_lo) > key(&a_hi) {
        std::mem::swap(&mut a_lo, &mut a_hi);
    }
    let (mut b_lo, mut b_hi) = (b1.clone(), b2.clone());
    if key(&b_lo) > key(&b_hi) {
        std::mem::swap(&mut b_lo, &mut b_hi);
    }

    let lo = if key(&a_lo) >= key(&b_lo) { a_lo } else { b_lo };
    let hi = if key(&a_hi) <= key(&b_hi) { a_hi } else { b_hi };
    match key(&lo).cmp(&key(&hi)) {
        Ordering::Greater => SegmentIntersection::Disjoint,
        Ordering::Equal => SegmentIntersection::Point(lo),
        Ordering::Less => SegmentIntersection::Overlap(lo, hi),
    }
}

/// Where a point lies relative to a closed ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Inside,
    Boundary,
    Outside,
}

/// Exact even-odd containment of p in the closed loop `ring`
/// (first vertex not repeated).
pub fn point_in_ring(p: &ExactPoint2, ring: &[ExactPoint2]) -> Containment {
    let n = ring.len();
    if n < 3 {
        return Containment::Outside;
    }
    let mut crossings = 0usize;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (&ring[j], &ring[i]);
        if on_segment(a, b, p) {
            return Containment::Boundary;
        }
        let a_above = a.y > p.y;
        let b_above = b.y > p.y;
        if a_above != b_above {
            // x of the edge at height p.y, exact
            let t = (&p.y - &a.y) / (&b.y - &a.y);
            let x_int = &a.x + &t * (&b.x - &a.x);
            if p.x < x_int {
                crossings += 1;
            }
        }
        j = i;
    }
    if crossings % 2 == 1 {
        Containment::Inside
    } else {
        Containment::Outside
    }
}

/// Twice the exact signed area of a closed loop (positive for CCW)
pub fn signed_area2(ring: &[ExactPoint2]) -> Rational {
    let n = ring.len();
    let mut sum = Rational::zero();
    if n < 3 {
        return sum;
    }
    for i in 0..n {
        let p = &ring[i];
        let q = &ring[(i + 1) % n];
        sum += &p.x * &q.y - &q.x * &p.y;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> ExactPoint2 {
        ExactPoint2::from_f64(x, y).unwrap()
    }

    #[test]
    fn test_orientation() {
        let a = pt(0.0, 0.0);
        let b = pt(1.0, 0.0);
        assert_eq!(orient2d(&a, &b, &pt(0.5, 1.0)), Ordering::Greater);
        assert_eq!(orient2d(&a, &b, &pt(0.5, -1.0)), Ordering::Less);
        assert_eq!(orient2d(&a, &b, &pt(2.0, 0.0)), Ordering::Equal);
    }

    #[test]
    fn test_proper_crossing() {
        let r = segment_intersection(&pt(0.0, 0.0), &pt(2.0, 2.0), &pt(0.0, 2.0), &pt(2.0, 0.0));
        assert_eq!(r, SegmentIntersection::Point(pt(1.0, 1.0)));
    }

    #[test]
    fn test_collinear_overlap() {
        let r = segment_intersection(&pt(0.0, 0.0), &pt(3.0, 0.0), &pt(1.0, 0.0), &pt(5.0, 0.0));
        assert_eq!(r, SegmentIntersection::Overlap(pt(1.0, 0.0), pt(3.0, 0.0)));

        let touch = segment_intersection(&pt(0.0, 0.0), &pt(1.0, 0.0), &pt(1.0, 0.0), &pt(2.0, 0.0));
        assert_eq!(touch, SegmentIntersection::Point(pt(1.0, 0.0)));
    }

    #[test]
    fn test_parallel_disjoint() {
        let r = segment_intersection(&pt(0.0, 0.0), &pt(1.0, 0.0), &pt(0.0, 1.0), &pt(1.0, 1.0));
        assert_eq!(r, SegmentIntersection::Disjoint);
    }

    #[test]
    fn test_containment() {
        let ring = vec![pt(0.0, 0.0), pt(4.0, 0.0), pt(4.0, 4.0), pt(0.0, 4.0)];
        assert_eq!(point_in_ring(&pt(2.0, 2.0), &ring), Containment::Inside);
        assert_eq!(point_in_ring(&pt(4.0, 2.0), &ring), Containment::Boundary);
        assert_eq!(point_in_ring(&pt(5.0, 2.0), &ring), Containment::Outside);
        // vertex ray degeneracy: query at a vertex height
        assert_eq!(point_in_ring(&pt(2.0, 0.0), &ring), Containment::Boundary);
    }

    #[test]
    fn test_signed_area() {
        let ccw = vec![pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)];
        assert!(signed_area2(&ccw) > Rational::zero());
        let cw: Vec<_> = ccw.iter().rev().cloned().collect();
        assert!(signed_area2(&cw) < Rational::zero());
    }
}
