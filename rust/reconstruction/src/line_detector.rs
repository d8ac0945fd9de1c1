// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary line detection along alpha rings
//!
//! Walks each ring and grows vertex runs by incremental least-squares line
//! fitting: a run extends while the next vertex stays within the distance
//! tolerance of the current fit. Short runs are dropped, collinear
//! neighbouring runs are chained, and each surviving run is emitted as a 3D
//! segment slightly extended past its end vertices.

use crate::segments::{Segment3, BOUNDARY_PRIORITY};
use nalgebra::Point3;
use roofline_core::ReconstructionConfig;
use roofline_geometry::{fit_line, FittedLine};

/// Minimum vertices per accepted run
const MIN_RUN: usize = 5;
/// Angle below which neighbouring runs chain into one (radians)
const CHAIN_ANGLE: f64 = 0.087;

/// Detect boundary segments on all rings
pub fn detect(
    rings: &[(u32, Vec<Point3<f64>>)],
    cfg: &ReconstructionConfig,
) -> Vec<Segment3> {
    let mut out = Vec::new();
    for (plane_id, ring) in rings {
        detect_on_ring(*plane_id, ring, cfg, &mut out);
    }
    out
}

fn detect_on_ring(
    plane_id: u32,
    ring: &[Point3<f64>],
    cfg: &ReconstructionConfig,
    out: &mut Vec<Segment3>,
) {
    let n = ring.len();
    if n < MIN_RUN {
        return;
    }
    let dist_thres = cfg.line_detect_epsilon as f64;

    // grow runs of consecutive ring vertices
    let mut runs: Vec<(usize, usize)> = Vec::new(); // (start, len), indices mod n
    let mut start = 0usize;
    while start < n {
        let mut len = 2;
        let mut fitted = fit_run(ring, start, len);
        loop {
            if len >= n {
                break; // wrapped the whole ring
            }
            let candidate = ring[(start + len) % n];
            let ok = match &fitted {
                Some(line) => line.distance(&candidate) <= dist_thres,
                None => true,
            };
            if !ok {
                break;
            }
            len += 1;
            fitted = fit_run(ring, start, len);
        }
        if len >= MIN_RUN && fitted.is_some() {
            runs.push((start, len));
        }
        start += len.max(1);
    }

    // chain collinear neighbouring runs
    let mut chained: Vec<(usize, usize)> = Vec::new();
    for run in runs {
        if let Some(last) = chained.last_mut() {
            let gap = run.0 as i64 - (last.0 + last.1 - 1) as i64;
            if gap <= 1 {
                if let (Some(a), Some(b)) = (
                    fit_run(ring, last.0, last.1),
                    fit_run(ring, run.0, run.1),
                ) {
                    let angle = a.direction.dot(&b.direction).abs().clamp(0.0, 1.0).acos();
                    if angle <= CHAIN_ANGLE {
                        last.1 = run.0 + run.1 - last.0;
                        continue;
                    }
                }
            }
        }
        chained.push(run);
    }

    // one segment per run: run extremes projected onto the fitted line,
    // extended slightly to compensate for undershoot
    let extend = 0.05;
    for (s, len) in chained {
        let Some(line) = fit_run(ring, s, len) else {
            continue;
        };
        let t0 = line.parameter(&ring[s % n]);
        let t1 = line.parameter(&ring[(s + len - 1) % n]);
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        out.push(Segment3 {
            a: line.point_at(lo - extend),
            b: line.point_at(hi + extend),
            priority: BOUNDARY_PRIORITY,
            plane_lo: plane_id,
            plane_hi: plane_id,
            is_ridgeline: false,
        });
    }
}

fn fit_run(ring: &[Point3<f64>], start: usize, len: usize) -> Option<FittedLine> {
    let n = ring.len();
    let pts: Vec<Point3<f64>> = (0..len.min(n)).map(|i| ring[(start + i) % n]).collect();
    fit_line(&pts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_ring(w: f64, h: f64, per_edge: usize) -> Vec<Point3<f64>> {
        let mut ring = Vec::new();
        for i in 0..per_edge {
            ring.push(Point3::new(w * i as f64 / per_edge as f64, 0.0, 1.0));
        }
        for i in 0..per_edge {
            ring.push(Point3::new(w, h * i as f64 / per_edge as f64, 1.0));
        }
        for i in 0..per_edge {
            ring.push(Point3::new(w - w * i as f64 / per_edge as f64, h, 1.0));
        }
        for i in 0..per_edge {
            ring.push(Point3::new(0.0, h - h * i as f64 / per_edge as f64, 1.0));
        }
        ring
    }

    #[test]
    fn test_rectangle_four_segments() {
        let rings = vec![(1u32, rect_ring(10.0, 5.0, 10))];
        let segs = detect(&rings, &ReconstructionConfig::default());
        assert_eq!(segs.len(), 4);
        for s in &segs {
            assert_eq!(s.priority, BOUNDARY_PRIORITY);
            assert_eq!(s.plane_lo, 1);
        }
        // one horizontal segment near y = 0 spanning the full width
        let bottom = segs
            .iter()
            .find(|s| s.a.y.abs() < 0.2 && s.b.y.abs() < 0.2)
            .expect("bottom edge detected");
        assert!((bottom.b.x - bottom.a.x).abs() > 9.0);
    }

    #[test]
    fn test_short_ring_ignored() {
        let rings = vec![(1u32, vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])];
        let segs = detect(&rings, &ReconstructionConfig::default());
        assert!(segs.is_empty());
    }

    #[test]
    fn test_noisy_edge_single_segment() {
        // a single long edge with +-2 cm noise stays one segment
        let ring: Vec<Point3<f64>> = (0..30)
            .map(|i| {
                let dy = if i % 2 == 0 { 0.02 } else { -0.02 };
                Point3::new(i as f64 * 0.3, dy, 2.0)
            })
            .collect();
        let rings = vec![(3u32, ring)];
        let segs = detect(&rings, &ReconstructionConfig::default());
        assert_eq!(segs.len(), 1);
        assert!((segs[0].b - segs[0].a).norm() > 8.0);
    }
}
