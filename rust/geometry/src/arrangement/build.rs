// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arrangement construction
//!
//! Inserts a batch of exact segments with arbitrary crossings: every pair is
//! intersected exactly, segments are split at intersection points and
//! collinear-overlap endpoints, and the resulting planar graph is assembled
//! into the DCEL by sorting half-edges around each vertex and tracing face
//! cycles. Inner components (holes, antennas) are nested by exact
//! containment.

use super::{Arrangement, Face, FaceData, HalfEdge, Vertex, INVALID};
use crate::error::{Error, Result};
use crate::exact::{
    cross, point_in_ring, segment_intersection, signed_area2, Containment, ExactPoint2, Rational,
    SegmentIntersection,
};
use num_traits::{Signed, Zero};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::time::Instant;

/// One input segment; `blocks` marks footprint-boundary edges that may
/// never be dissolved away.
#[derive(Debug, Clone)]
pub struct SegmentInput {
    pub a: ExactPoint2,
    pub b: ExactPoint2,
    pub blocks: bool,
}

impl SegmentInput {
    pub fn new(a: ExactPoint2, b: ExactPoint2, blocks: bool) -> Self {
        Self { a, b, blocks }
    }
}

/// Build the arrangement of a segment batch. The deadline, when given, is
/// checked during the quadratic splitting phase.
pub fn build(inputs: &[SegmentInput], deadline: Option<Instant>) -> Result<Arrangement> {
    let segments: Vec<&SegmentInput> = inputs.iter().filter(|s| s.a != s.b).collect();
    if segments.is_empty() {
        return Ok(Arrangement::empty());
    }

    // 1. split every segment at every intersection with every other
    let mut cut_points: Vec<Vec<ExactPoint2>> = segments
        .iter()
        .map(|s| vec![s.a.clone(), s.b.clone()])
        .collect();

    for i in 0..segments.len() {
        if let Some(d) = deadline {
            if Instant::now() > d {
                return Err(Error::DeadlineExceeded("arrangement build"));
            }
        }
        for j in (i + 1)..segments.len() {
            match segment_intersection(
                &segments[i].a,
                &segments[i].b,
                &segments[j].a,
                &segments[j].b,
            ) {
                SegmentIntersection::Disjoint => {}
                SegmentIntersection::Point(p) => {
                    cut_points[i].push(p.clone());
                    cut_points[j].push(p);
                }
                SegmentIntersection::Overlap(lo, hi) => {
                    cut_points[i].push(lo.clone());
                    cut_points[i].push(hi.clone());
                    cut_points[j].push(lo);
                    cut_points[j].push(hi);
                }
            }
        }
    }

    // 2. intern vertices and deduplicated sub-edges
    let mut vertex_ids: FxHashMap<ExactPoint2, u32> = FxHashMap::default();
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut intern = |p: ExactPoint2, vertices: &mut Vec<Vertex>| -> u32 {
        *vertex_ids.entry(p.clone()).or_insert_with(|| {
            vertices.push(Vertex {
                point: p,
                out: SmallVec::new(),
            });
            (vertices.len() - 1) as u32
        })
    };

    let mut edge_ids: FxHashMap<(u32, u32), u32> = FxHashMap::default();
    let mut edges: Vec<(u32, u32, bool)> = Vec::new();

    for (seg, mut cuts) in segments.iter().zip(cut_points) {
        // order the cut points along the segment's dominant axis
        let use_x = {
            let dx = (&seg.a.x - &seg.b.x).abs();
            let dy = (&seg.a.y - &seg.b.y).abs();
            dx >= dy
        };
        cuts.sort_by(|p, q| {
            if use_x {
                p.x.cmp(&q.x).then_with(|| p.y.cmp(&q.y))
            } else {
                p.y.cmp(&q.y).then_with(|| p.x.cmp(&q.x))
            }
        });
        cuts.dedup();

        for pair in cuts.windows(2) {
            let va = intern(pair[0].clone(), &mut vertices);
            let vb = intern(pair[1].clone(), &mut vertices);
            if va == vb {
                continue;
            }
            let key = (va.min(vb), va.max(vb));
            match edge_ids.get(&key) {
                Some(&e) => edges[e as usize].2 |= seg.blocks,
                None => {
                    edge_ids.insert(key, edges.len() as u32);
                    edges.push((key.0, key.1, seg.blocks));
                }
            }
        }
    }

    // 3. half-edge pairs
    let mut half_edges: Vec<HalfEdge> = Vec::with_capacity(edges.len() * 2);
    for (k, &(va, vb, blocks)) in edges.iter().enumerate() {
        let h0 = (2 * k) as u32;
        let h1 = h0 + 1;
        half_edges.push(HalfEdge {
            origin: va,
            twin: h1,
            next: INVALID,
            prev: INVALID,
            face: INVALID,
            blocks,
            weight: 0.0,
        });
        half_edges.push(HalfEdge {
            origin: vb,
            twin: h0,
            next: INVALID,
            prev: INVALID,
            face: INVALID,
            blocks,
            weight: 0.0,
        });
        vertices[va as usize].out.push(h0);
        vertices[vb as usize].out.push(h1);
    }

    // 4. sort outgoing edges counter-clockwise around every vertex
    let origin = ExactPoint2::new(Rational::zero(), Rational::zero());
    let dir_of = |h: u32, vertices: &[Vertex], half_edges: &[HalfEdge]| -> ExactPoint2 {
        let he = &half_edges[h as usize];
        let src = &vertices[he.origin as usize].point;
        let dst = &vertices[half_edges[he.twin as usize].origin as usize].point;
        ExactPoint2::new(&dst.x - &src.x, &dst.y - &src.y)
    };
    // angle class on the unit circle: [0, pi) before [pi, 2pi)
    let half_of = |d: &ExactPoint2| -> u8 {
        let zero = Rational::zero();
        if d.y > zero || (d.y == zero && d.x > zero) {
            0
        } else {
            1
        }
    };
    for v in 0..vertices.len() {
        let mut out = std::mem::take(&mut vertices[v].out);
        out.sort_by(|&h1, &h2| {
            let d1 = dir_of(h1, &vertices, &half_edges);
            let d2 = dir_of(h2, &vertices, &half_edges);
            half_of(&d1).cmp(&half_of(&d2)).then_with(|| {
                // within a half-circle, d1 precedes d2 iff d2 is CCW of d1
                match cross(&origin, &d1, &d2).cmp(&Rational::zero()) {
                    Ordering::Greater => Ordering::Less,
                    Ordering::Less => Ordering::Greater,
                    Ordering::Equal => Ordering::Equal,
                }
            })
        });
        vertices[v].out = out;
    }

    // 5. next/prev: continue from the clockwise neighbour of the twin
    for h in 0..half_edges.len() as u32 {
        let twin = half_edges[h as usize].twin;
        let target = half_edges[twin as usize].origin;
        let out = &vertices[target as usize].out;
        let pos = out
            .iter()
            .position(|&e| e == twin)
            .ok_or_else(|| Error::NumericFailure("twin missing from vertex fan".into()))?;
        let next = out[(pos + out.len() - 1) % out.len()];
        half_edges[h as usize].next = next;
        half_edges[next as usize].prev = h;
    }

    // 6. trace boundary cycles
    let mut cycle_of = vec![INVALID; half_edges.len()];
    let mut cycles: Vec<Vec<u32>> = Vec::new();
    for h0 in 0..half_edges.len() as u32 {
        if cycle_of[h0 as usize] != INVALID {
            continue;
        }
        let id = cycles.len() as u32;
        let mut cycle = Vec::new();
        let mut h = h0;
        loop {
            cycle_of[h as usize] = id;
            cycle.push(h);
            h = half_edges[h as usize].next;
            if h == h0 {
                break;
            }
        }
        cycles.push(cycle);
    }

    let cycle_area2: Vec<Rational> = cycles
        .iter()
        .map(|cycle| {
            let ring: Vec<ExactPoint2> = cycle
                .iter()
                .map(|&h| vertices[half_edges[h as usize].origin as usize].point.clone())
                .collect();
            signed_area2(&ring)
        })
        .collect();

    // 7. connected components of the underlying graph
    let mut comp = UnionFind::new(vertices.len());
    for &(va, vb, _) in &edges {
        comp.union(va as usize, vb as usize);
    }
    let cycle_comp: Vec<usize> = cycles
        .iter()
        .map(|cycle| comp.find(half_edges[cycle[0] as usize].origin as usize))
        .collect();

    // 8. faces: one per positive cycle, plus the unbounded face
    let mut faces = vec![Face {
        outer: None,
        inners: Vec::new(),
        data: FaceData::new(),
    }];
    let mut face_of_cycle = vec![INVALID; cycles.len()];
    let zero = Rational::zero();
    for (c, area2) in cycle_area2.iter().enumerate() {
        if *area2 > zero {
            face_of_cycle[c] = faces.len() as u32;
            faces.push(Face {
                outer: Some(cycles[c].iter().copied().min().unwrap_or_default()),
                inners: Vec::new(),
                data: FaceData::new(),
            });
        }
    }

    // rings of positive cycles, for containment queries
    let positive: Vec<usize> = (0..cycles.len())
        .filter(|&c| cycle_area2[c] > zero)
        .collect();
    let positive_rings: Vec<Vec<ExactPoint2>> = positive
        .iter()
        .map(|&c| {
            cycles[c]
                .iter()
                .map(|&h| vertices[half_edges[h as usize].origin as usize].point.clone())
                .collect()
        })
        .collect();

    // 9. nest every component's contour cycle into its containing face
    let mut comp_min_vertex: FxHashMap<usize, u32> = FxHashMap::default();
    for (v, vert) in vertices.iter().enumerate() {
        if vert.out.is_empty() {
            continue;
        }
        let root = comp.find(v);
        let e = comp_min_vertex.entry(root).or_insert(v as u32);
        if vertices[*e as usize].point > vert.point {
            *e = v as u32;
        }
    }

    for c in 0..cycles.len() {
        if cycle_area2[c] > zero {
            continue;
        }
        let witness = &vertices[comp_min_vertex[&cycle_comp[c]] as usize].point;
        let mut parent = 0u32; // unbounded
        let mut parent_area: Option<Rational> = None;
        for (pi, &pc) in positive.iter().enumerate() {
            if cycle_comp[pc] == cycle_comp[c] {
                continue; // cycles of the same component never nest
            }
            if point_in_ring(witness, &positive_rings[pi]) == Containment::Inside {
                let area = cycle_area2[pc].clone();
                if parent_area.as_ref().map_or(true, |pa| area < *pa) {
                    parent_area = Some(area);
                    parent = face_of_cycle[pc];
                }
            }
        }
        face_of_cycle[c] = parent;
        faces[parent as usize]
            .inners
            .push(cycles[c].iter().copied().min().unwrap_or_default());
    }

    // 10. write face assignments back onto the half-edges
    for (c, cycle) in cycles.iter().enumerate() {
        for &h in cycle {
            half_edges[h as usize].face = face_of_cycle[c];
        }
    }

    let arr = Arrangement {
        vertices,
        half_edges,
        faces,
        unbounded: 0,
    };
    debug_assert!(arr.check_consistency());
    Ok(arr)
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> ExactPoint2 {
        ExactPoint2::from_f64(x, y).unwrap()
    }

    fn ring_segments(coords: &[(f64, f64)], blocks: bool) -> Vec<SegmentInput> {
        let n = coords.len();
        (0..n)
            .map(|i| {
                SegmentInput::new(
                    pt(coords[i].0, coords[i].1),
                    pt(coords[(i + 1) % n].0, coords[(i + 1) % n].1),
                    blocks,
                )
            })
            .collect()
    }

    #[test]
    fn test_single_square() {
        let arr = build(
            &ring_segments(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], true),
            None,
        )
        .unwrap();
        assert_eq!(arr.num_bounded_faces(), 1);
        assert_eq!(arr.vertices.len(), 4);
        assert_eq!(arr.half_edges.len(), 8);
        assert!(arr.check_consistency());
        // the square's contour is an inner component of the unbounded face
        assert_eq!(arr.faces[arr.unbounded as usize].inners.len(), 1);
    }

    #[test]
    fn test_square_split_by_chord() {
        let mut segs = ring_segments(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], true);
        segs.push(SegmentInput::new(pt(2.0, -1.0), pt(2.0, 5.0), false));
        let arr = build(&segs, None).unwrap();
        // two halves inside, chord stubs outside add no faces
        assert_eq!(arr.num_bounded_faces(), 2);
        assert!(arr.check_consistency());
    }

    #[test]
    fn test_crossing_chords() {
        let mut segs = ring_segments(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], true);
        segs.push(SegmentInput::new(pt(2.0, 0.0), pt(2.0, 4.0), false));
        segs.push(SegmentInput::new(pt(0.0, 2.0), pt(4.0, 2.0), false));
        let arr = build(&segs, None).unwrap();
        assert_eq!(arr.num_bounded_faces(), 4);
        // the crossing created a vertex at (2, 2)
        assert!(arr
            .vertices
            .iter()
            .any(|v| v.point == pt(2.0, 2.0)));
    }

    #[test]
    fn test_hole_nesting() {
        let mut segs = ring_segments(&[(0.0, 0.0), (9.0, 0.0), (9.0, 9.0), (0.0, 9.0)], true);
        segs.extend(ring_segments(
            &[(3.0, 3.0), (6.0, 3.0), (6.0, 6.0), (3.0, 6.0)],
            true,
        ));
        let arr = build(&segs, None).unwrap();
        assert_eq!(arr.num_bounded_faces(), 2);

        // the big face carries the small square's contour as an inner CCB
        let big = arr
            .faces
            .iter()
            .position(|f| f.outer.is_some() && !f.inners.is_empty())
            .unwrap();
        assert_eq!(arr.faces[big].inners.len(), 1);
        let (outer, inners) = arr.face_polygon_f64(big as u32);
        assert_eq!(outer.len(), 4);
        assert_eq!(inners.len(), 1);
        assert_eq!(inners[0].len(), 4);
    }

    #[test]
    fn test_dangling_segment() {
        let mut segs = ring_segments(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], true);
        segs.push(SegmentInput::new(pt(1.0, 1.0), pt(2.0, 2.0), false));
        let arr = build(&segs, None).unwrap();
        assert_eq!(arr.num_bounded_faces(), 1);
        // the floating segment is dangling: same face on both sides
        let h = (0..arr.half_edges.len() as u32)
            .step_by(2)
            .find(|&h| {
                let (a, b) = arr.edge_segment(h);
                (a == pt(1.0, 1.0) || b == pt(1.0, 1.0))
                    && (a == pt(2.0, 2.0) || b == pt(2.0, 2.0))
            })
            .unwrap();
        assert!(arr.is_dangling(h));
    }

    #[test]
    fn test_overlapping_collinear_segments() {
        let segs = vec![
            SegmentInput::new(pt(0.0, 0.0), pt(3.0, 0.0), false),
            SegmentInput::new(pt(1.0, 0.0), pt(5.0, 0.0), false),
        ];
        let arr = build(&segs, None).unwrap();
        // split at 1 and 3: edges (0,1), (1,3), (3,5) without duplicates
        assert_eq!(arr.half_edges.len() / 2, 3);
        assert_eq!(arr.vertices.len(), 4);
    }
}
