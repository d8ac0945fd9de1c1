// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arrangement queries and rewrites: interior witness points, point
//! location, and sub-tolerance vertex snapping.

use super::{build, Arrangement, SegmentInput};
use crate::error::Result;
use crate::exact::{point_in_ring, Containment, ExactPoint2, Rational};
use num_bigint::BigInt;
use num_traits::Zero;

/// Exact membership of a point in a bounded face (outer ring minus the
/// regions enclosed by its inner components).
pub fn face_contains(arr: &Arrangement, face: u32, p: &ExactPoint2) -> bool {
    let f = &arr.faces[face as usize];
    let outer = match f.outer {
        Some(h) => arr.ccb_points(h),
        None => return false,
    };
    if point_in_ring(p, &outer) != Containment::Inside {
        return false;
    }
    f.inners.iter().all(|&h| {
        let ring = arr.ccb_points(h);
        point_in_ring(p, &ring) == Containment::Outside
    })
}

/// The bounded face containing p, or the unbounded face. Intended for
/// points known not to lie on any edge (interior witnesses).
pub fn locate_face(arr: &Arrangement, p: &ExactPoint2) -> u32 {
    for f in 0..arr.faces.len() as u32 {
        if f == arr.unbounded {
            continue;
        }
        if face_contains(arr, f, p) {
            return f;
        }
    }
    arr.unbounded
}

/// A point strictly inside a bounded face, found by stepping off an edge
/// midpoint toward the face side and shrinking the step until the exact
/// membership test passes. Exact, so the witness survives relocation in a
/// rebuilt arrangement.
pub fn interior_witness(arr: &Arrangement, face: u32) -> Option<ExactPoint2> {
    let outer = arr.faces[face as usize].outer?;
    for h in arr.ccb(outer) {
        let src = &arr.vertices[arr.source(h) as usize].point;
        let dst = &arr.vertices[arr.target(h) as usize].point;
        let mid = src.midpoint(dst);
        // the face lies to the left of h
        let normal = ExactPoint2::new(&src.y - &dst.y, &dst.x - &src.x);
        if normal.x.is_zero() && normal.y.is_zero() {
            continue;
        }
        let mut eps = Rational::new(BigInt::from(1), BigInt::from(2));
        let half = Rational::new(BigInt::from(1), BigInt::from(2));
        for _ in 0..64 {
            let candidate = ExactPoint2::new(
                &mid.x + &eps * &normal.x,
                &mid.y + &eps * &normal.y,
            );
            if face_contains(arr, face, &candidate) {
                return Some(candidate);
            }
            eps *= &half;
        }
    }
    None
}

/// Merge vertex clusters closer than `dist`, drop collapsed edges, and
/// rebuild the arrangement. Repeats until no surviving edge is shorter
/// than `dist`. Face data is NOT carried over; relocate it via witnesses.
pub fn snap_vertices(arr: &Arrangement, dist: f64) -> Result<Arrangement> {
    let mut current = arr.clone();
    // each pass can create new short edges by moving endpoints; a few
    // passes always suffice at millimetre tolerances
    for _ in 0..8 {
        let n = current.vertices.len();
        let coords: Vec<(f64, f64)> = current.vertices.iter().map(|v| v.point.to_f64()).collect();

        // union-find clustering of near-coincident vertices
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut Vec<usize>, mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }
        let d2 = dist * dist;
        let mut merged_any = false;
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = coords[i].0 - coords[j].0;
                let dy = coords[i].1 - coords[j].1;
                if dx * dx + dy * dy < d2 {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    if ri != rj {
                        parent[ri.max(rj)] = ri.min(rj);
                        merged_any = true;
                    }
                }
            }
        }

        // representative point per cluster: the lowest-index member
        let reps: Vec<usize> = (0..n).map(|i| find(&mut parent, i)).collect();

        let mut segments = Vec::new();
        for h in current.edges() {
            let he = &current.half_edges[h as usize];
            let a = reps[current.source(h) as usize];
            let b = reps[current.target(h) as usize];
            if a == b {
                merged_any = true;
                continue; // edge collapsed
            }
            segments.push(SegmentInput::new(
                current.vertices[a].point.clone(),
                current.vertices[b].point.clone(),
                he.blocks,
            ));
        }

        let rebuilt = build(&segments, None)?;
        if !merged_any {
            return Ok(rebuilt);
        }
        current = rebuilt;
    }
    Ok(current)
}
