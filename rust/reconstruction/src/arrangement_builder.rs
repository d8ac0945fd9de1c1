// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arrangement construction from footprint and regularised edges
//!
//! The footprint boundary goes in as blocking constraints, the regularised
//! edges as free ones. Faces are then classified against the exact
//! footprint polygon: strictly inside the outer ring and outside every hole
//! means `in_footprint`; inside a hole means `is_footprint_hole`.
//!
//! Two budgets guard this stage: a cheap f64 crossing-count estimate
//! rejects hopeless inputs before any exact arithmetic, and the exact face
//! count is checked after construction.

use crate::error::{Error, Result};
use roofline_core::LinearRing;
use roofline_geometry::arrangement::{self, Arrangement, SegmentInput};
use roofline_geometry::exact::{point_in_ring, Containment, ExactPoint2};
use std::time::Instant;

/// Build and classify the arrangement
pub fn build(
    footprint: &LinearRing,
    edges: &[(ExactPoint2, ExactPoint2)],
    max_arr_complexity: usize,
    deadline: Option<Instant>,
) -> Result<Arrangement> {
    let mut segments: Vec<SegmentInput> = Vec::new();

    let outer_exact = ring_to_exact(&footprint.points)?;
    push_ring(&outer_exact, true, &mut segments);
    let mut holes_exact = Vec::new();
    for hole in &footprint.interiors {
        let ring = ring_to_exact(hole)?;
        push_ring(&ring, true, &mut segments);
        holes_exact.push(ring);
    }
    for (a, b) in edges {
        segments.push(SegmentInput::new(a.clone(), b.clone(), false));
    }

    // crossing-count estimate; reject inputs that cannot stay under the
    // complexity ceiling before paying for exact arithmetic
    let estimate = estimate_crossings(&segments) + segments.len() + 1;
    if estimate > max_arr_complexity.saturating_mul(4) {
        return Err(Error::BudgetExceeded("arrangement pre-check"));
    }

    let mut arr = arrangement::build(&segments, deadline).map_err(budget_or_geometry)?;

    if arr.num_bounded_faces() > max_arr_complexity {
        return Err(Error::BudgetExceeded("arrangement complexity"));
    }

    // classify faces against the footprint
    for f in 0..arr.faces.len() as u32 {
        if arr.faces[f as usize].is_unbounded() {
            continue;
        }
        let Some(witness) = arrangement::interior_witness(&arr, f) else {
            continue;
        };
        let in_outer = point_in_ring(&witness, &outer_exact) == Containment::Inside;
        let in_hole = holes_exact
            .iter()
            .any(|h| point_in_ring(&witness, h) == Containment::Inside);
        let data = &mut arr.faces[f as usize].data;
        data.in_footprint = in_outer && !in_hole;
        data.is_footprint_hole = in_hole;
    }

    Ok(arr)
}

fn budget_or_geometry(e: roofline_geometry::Error) -> Error {
    match e {
        roofline_geometry::Error::DeadlineExceeded(_) => Error::BudgetExceeded("arrangement build"),
        roofline_geometry::Error::ComplexityExceeded { .. } => {
            Error::BudgetExceeded("arrangement complexity")
        }
        other => Error::Geometry(other),
    }
}

fn ring_to_exact(points: &[roofline_core::Point3<f32>]) -> Result<Vec<ExactPoint2>> {
    points
        .iter()
        .map(|p| {
            ExactPoint2::from_f64(p.x as f64, p.y as f64)
                .ok_or_else(|| Error::NumericFailure("non-finite footprint coordinate".into()))
        })
        .collect()
}

fn push_ring(ring: &[ExactPoint2], blocks: bool, out: &mut Vec<SegmentInput>) {
    let n = ring.len();
    for i in 0..n {
        out.push(SegmentInput::new(
            ring[i].clone(),
            ring[(i + 1) % n].clone(),
            blocks,
        ));
    }
}

/// Count pairwise proper crossings in f64, bounding-box gated
fn estimate_crossings(segments: &[SegmentInput]) -> usize {
    #[derive(Clone, Copy)]
    struct S {
        ax: f64,
        ay: f64,
        bx: f64,
        by: f64,
    }
    let segs: Vec<S> = segments
        .iter()
        .map(|s| {
            let (ax, ay) = s.a.to_f64();
            let (bx, by) = s.b.to_f64();
            S { ax, ay, bx, by }
        })
        .collect();
    let orient = |ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64| -> f64 {
        (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
    };
    let mut count = 0usize;
    for i in 0..segs.len() {
        let si = segs[i];
        for sj in segs.iter().skip(i + 1) {
            if si.ax.max(si.bx) < sj.ax.min(sj.bx)
                || sj.ax.max(sj.bx) < si.ax.min(si.bx)
                || si.ay.max(si.by) < sj.ay.min(sj.by)
                || sj.ay.max(sj.by) < si.ay.min(si.by)
            {
                continue;
            }
            let d1 = orient(sj.ax, sj.ay, sj.bx, sj.by, si.ax, si.ay);
            let d2 = orient(sj.ax, sj.ay, sj.bx, sj.by, si.bx, si.by);
            let d3 = orient(si.ax, si.ay, si.bx, si.by, sj.ax, sj.ay);
            let d4 = orient(si.ax, si.ay, si.bx, si.by, sj.bx, sj.by);
            if d1 * d2 <= 0.0 && d3 * d4 <= 0.0 {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_footprint() -> LinearRing {
        LinearRing::from_xy(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)], 0.0)
    }

    fn exact_edge(ax: f64, ay: f64, bx: f64, by: f64) -> (ExactPoint2, ExactPoint2) {
        (
            ExactPoint2::from_f64(ax, ay).unwrap(),
            ExactPoint2::from_f64(bx, by).unwrap(),
        )
    }

    #[test]
    fn test_bare_footprint_one_face() {
        let arr = build(&rect_footprint(), &[], 400, None).unwrap();
        assert_eq!(arr.num_bounded_faces(), 1);
        let in_fp: Vec<_> = arr
            .faces
            .iter()
            .filter(|f| f.data.in_footprint)
            .collect();
        assert_eq!(in_fp.len(), 1);
    }

    #[test]
    fn test_edge_splits_footprint() {
        let edges = vec![exact_edge(5.0, -1.0, 5.0, 6.0)];
        let arr = build(&rect_footprint(), &edges, 400, None).unwrap();
        let in_fp = arr.faces.iter().filter(|f| f.data.in_footprint).count();
        assert_eq!(in_fp, 2);
    }

    #[test]
    fn test_hole_classification() {
        let mut fp = rect_footprint();
        fp.interiors.push(
            LinearRing::from_xy(&[(4.0, 2.0), (4.0, 3.0), (6.0, 3.0), (6.0, 2.0)], 0.0).points,
        );
        let arr = build(&fp, &[], 400, None).unwrap();
        let in_fp = arr.faces.iter().filter(|f| f.data.in_footprint).count();
        let holes = arr
            .faces
            .iter()
            .filter(|f| f.data.is_footprint_hole)
            .count();
        assert_eq!(in_fp, 1);
        assert_eq!(holes, 1);
    }

    #[test]
    fn test_complexity_budget() {
        // a dense grid of lines blows the face ceiling
        let mut edges = Vec::new();
        for i in 0..40 {
            let c = 0.25 * i as f64;
            edges.push(exact_edge(c, -1.0, c, 6.0));
            edges.push(exact_edge(-1.0, c, 11.0, c));
        }
        let err = build(&rect_footprint(), &edges, 100, None).unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded(_)));
    }
}
