// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ridge and valley lines between adjacent roof planes
//!
//! For every plane pair with enough neighbouring inlier pairs, the infinite
//! intersection line is clipped to the overlap of the two planes' inlier
//! extents along the line. Segments that end up too short, or too far from
//! the point cloud, are discarded. A segment is flagged as a ridgeline when
//! both planes are convincingly non-horizontal and the line itself runs
//! level.

use crate::plane_detector::{PlaneAdjacency, PlanesWithPoints};
use crate::segments::{Segment3, INTERSECTION_PRIORITY};
use nalgebra::{Point3, Vector3};
use roofline_core::{Plane, ReconstructionConfig};

/// Compute intersection segments for all sufficiently adjacent plane pairs
pub fn compute(
    planes: &PlanesWithPoints,
    adjacency: &PlaneAdjacency,
    cfg: &ReconstructionConfig,
) -> Vec<Segment3> {
    let mut out = Vec::new();
    let min_dist_sq =
        (cfg.intersect_min_dist_to_line as f64) * (cfg.intersect_min_dist_to_line as f64);
    let min_len_sq = (cfg.intersect_min_length as f64) * (cfg.intersect_min_length as f64);
    let horiz_rad = (cfg.thres_horizontality as f64).to_radians();

    for (&(id_hi, id_lo), &count) in adjacency {
        if count < cfg.min_neighb_pts {
            continue;
        }
        let (Some((plane_hi, pts_hi)), Some((plane_lo, pts_lo))) =
            (planes.get(&id_hi), planes.get(&id_lo))
        else {
            continue;
        };
        let Some((origin, dir)) = intersection_line(plane_hi, plane_lo) else {
            continue;
        };

        let Some((min_hi, max_hi)) = line_extent(&origin, &dir, pts_hi, min_dist_sq) else {
            continue;
        };
        let Some((min_lo, max_lo)) = line_extent(&origin, &dir, pts_lo, min_dist_sq) else {
            continue;
        };

        // overlap of the two per-plane extents
        let t0 = min_hi.max(min_lo);
        let t1 = max_hi.min(max_lo);
        if t1 <= t0 {
            continue;
        }
        let a = origin + dir * t0;
        let b = origin + dir * t1;
        if (b - a).norm_squared() < min_len_sq {
            continue;
        }

        let z_axis = Vector3::z();
        let steep = |p: &Plane| p.normal().angle(&z_axis) > horiz_rad;
        let level = dir.z.abs() <= horiz_rad.sin();
        out.push(Segment3 {
            a,
            b,
            priority: INTERSECTION_PRIORITY,
            plane_lo: id_lo,
            plane_hi: id_hi,
            is_ridgeline: steep(plane_hi) && steep(plane_lo) && level,
        });
    }
    out
}

/// Count ridgelines and return the highest ridge elevation
pub fn highest_ridgeline(segments: &[Segment3]) -> (usize, Option<f32>) {
    let mut count = 0;
    let mut high: Option<f32> = None;
    for s in segments {
        if !s.is_ridgeline {
            continue;
        }
        count += 1;
        let z = s.a.z.max(s.b.z) as f32;
        high = Some(high.map_or(z, |h| h.max(z)));
    }
    (count, high)
}

/// Intersection line of two planes: a point on the line and a unit
/// direction. None for (near-)parallel planes.
fn intersection_line(p1: &Plane, p2: &Plane) -> Option<(Point3<f64>, Vector3<f64>)> {
    let n1 = p1.normal();
    let n2 = p2.normal();
    let dir = n1.cross(&n2);
    let len_sq = dir.norm_squared();
    if len_sq < 1e-12 {
        return None;
    }
    // planes satisfy n . p = c with c = -d
    let c1 = -p1.d;
    let c2 = -p2.d;
    let origin = (n2 * c1 - n1 * c2).cross(&dir) / len_sq;
    Some((Point3::from(origin), dir / len_sq.sqrt()))
}

/// Extent of the points' projections onto the line, restricted to points
/// within the distance threshold. None when fewer than two points qualify.
fn line_extent(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    points: &[Point3<f64>],
    min_dist_sq: f64,
) -> Option<(f64, f64)> {
    let mut lo = f64::MAX;
    let mut hi = f64::MIN;
    let mut count = 0usize;
    for p in points {
        let v = p - origin;
        let t = v.dot(dir);
        let d_sq = (v - dir * t).norm_squared();
        if d_sq > min_dist_sq {
            continue;
        }
        lo = lo.min(t);
        hi = hi.max(t);
        count += 1;
    }
    (count > 1).then_some((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// gable: two slopes meeting at y = 2.5, z = 5
    fn gable_planes() -> PlanesWithPoints {
        let mut south = Vec::new();
        let mut north = Vec::new();
        for i in 0..20 {
            for j in 0..10 {
                let x = i as f64 * 0.5;
                let y = j as f64 * 0.25;
                south.push(Point3::new(x, y, 3.0 + 0.8 * y));
                north.push(Point3::new(x, 5.0 - y, 3.0 + 0.8 * y));
            }
        }
        let p_south = Plane::from_normal_point(
            Vector3::new(0.0, -0.8, 1.0).normalize(),
            Point3::new(0.0, 2.5, 5.0),
            1,
        );
        let p_north = Plane::from_normal_point(
            Vector3::new(0.0, 0.8, 1.0).normalize(),
            Point3::new(0.0, 2.5, 5.0),
            2,
        );
        let mut map = BTreeMap::new();
        map.insert(1, (p_south, south));
        map.insert(2, (p_north, north));
        map
    }

    fn adjacency(count: usize) -> PlaneAdjacency {
        let mut adj = BTreeMap::new();
        adj.insert((2u32, 1u32), count);
        adj
    }

    #[test]
    fn test_gable_ridgeline() {
        let cfg = ReconstructionConfig::default();
        let segs = compute(&gable_planes(), &adjacency(20), &cfg);
        assert_eq!(segs.len(), 1);
        let s = &segs[0];
        assert!(s.is_ridgeline);
        assert_eq!(s.priority, INTERSECTION_PRIORITY);
        // ridge at y = 2.5, z = 5, spanning x
        assert!((s.a.y - 2.5).abs() < 1e-6 && (s.b.y - 2.5).abs() < 1e-6);
        assert!((s.a.z - 5.0).abs() < 1e-6);
        assert!((s.b.x - s.a.x).abs() > 5.0);

        let (count, high) = highest_ridgeline(&segs);
        assert_eq!(count, 1);
        assert!((high.unwrap() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_below_neighbour_threshold() {
        let cfg = ReconstructionConfig::default();
        let segs = compute(&gable_planes(), &adjacency(2), &cfg);
        assert!(segs.is_empty());
    }

    #[test]
    fn test_parallel_planes_skipped() {
        let mut map = BTreeMap::new();
        let pts: Vec<Point3<f64>> = (0..20).map(|i| Point3::new(i as f64, 0.0, 1.0)).collect();
        map.insert(
            1,
            (Plane { a: 0.0, b: 0.0, c: 1.0, d: -1.0, id: 1 }, pts.clone()),
        );
        map.insert(
            2,
            (Plane { a: 0.0, b: 0.0, c: 1.0, d: -3.0, id: 2 }, pts),
        );
        let segs = compute(&map, &adjacency(20), &ReconstructionConfig::default());
        assert!(segs.is_empty());
    }

    #[test]
    fn test_flat_pair_not_ridge() {
        // one horizontal, one slanted: intersection exists but is no ridge
        let mut map = BTreeMap::new();
        let mut flat = Vec::new();
        let mut slope = Vec::new();
        for i in 0..15 {
            for j in 0..6 {
                flat.push(Point3::new(i as f64 * 0.5, j as f64 * 0.5, 3.0));
                slope.push(Point3::new(i as f64 * 0.5, 3.0 + j as f64 * 0.5, 3.0 - j as f64 * 0.25));
            }
        }
        map.insert(
            1,
            (Plane { a: 0.0, b: 0.0, c: 1.0, d: -3.0, id: 1 }, flat),
        );
        let n = Vector3::new(0.0, 0.5, 1.0).normalize();
        map.insert(
            2,
            (
                Plane::from_normal_point(n, Point3::new(0.0, 3.0, 3.0), 2),
                slope,
            ),
        );
        let segs = compute(&map, &adjacency(20), &ReconstructionConfig::default());
        assert_eq!(segs.len(), 1);
        assert!(!segs[0].is_ridgeline);
    }
}
