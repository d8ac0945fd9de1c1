// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face dissolution: LoD generalisation of the labelled arrangement
//!
//! Three rewriting passes, applied to a clone of the optimised arrangement
//! per LoD: merge faces sharing a plane label, merge faces across small
//! height steps (LoD 1.3), or merge the whole interior (LoD 1.2). Each pass
//! rebuilds the arrangement from the surviving edges and re-attaches face
//! data through exact interior witnesses, so the DCEL never degrades.
//! Dangling edges, subdivisions outside the footprint, and redundant
//! collinear degree-2 vertices are cleaned up afterwards, and connected
//! in-footprint faces receive consecutive part ids.

use crate::error::Result;
use roofline_core::{HeightField, Plane};
use roofline_geometry::arrangement::{
    self, Arrangement, ElevationStats, FaceData, SegmentInput,
};
use roofline_geometry::exact::orient2d;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Which passes to run for the requested LoD
#[derive(Debug, Clone)]
pub struct DissolverConfig {
    /// Merge faces with the same plane label (all LoDs)
    pub dissolve_seg_edges: bool,
    /// Merge faces across height steps below the threshold (LoD 1.3)
    pub dissolve_step_edges: bool,
    /// Merge every interior face (LoD 1.2)
    pub dissolve_all_interior: bool,
    /// Remove subdivisions outside the footprint
    pub dissolve_outside_fp: bool,
    pub step_height_threshold: f32,
}

impl DissolverConfig {
    /// Pass selection for one LoD (12, 13 or 22)
    pub fn for_lod(lod: u8, step_height_threshold: f32) -> Self {
        Self {
            dissolve_seg_edges: true,
            dissolve_step_edges: lod == 13,
            dissolve_all_interior: lod == 12,
            dissolve_outside_fp: true,
            step_height_threshold,
        }
    }
}

/// How merged faces combine their payloads
#[derive(Debug, Clone, Copy, PartialEq)]
enum MergeMode {
    /// Pixel-weighted average of the members' elevation statistics
    WeightedStats,
    /// Adopt the member with the largest pixel count wholesale
    Representative,
}

/// Run the configured passes and return the generalised arrangement
pub fn dissolve(
    arr: &Arrangement,
    field: &HeightField,
    cfg: &DissolverConfig,
) -> Result<Arrangement> {
    let mut cur = arr.clone();
    compute_face_stats(&mut cur, field, false);

    if cfg.dissolve_seg_edges {
        cur = rebuild_merging(
            &cur,
            |a, h| !removable(a, h) || !same_plane(a, h),
            MergeMode::WeightedStats,
        )?;
    }

    if cfg.dissolve_step_edges {
        // elevations with plane fallback carry the LoD 2.2 -> 1.3 step test
        compute_face_stats(&mut cur, field, true);
        let thr = cfg.step_height_threshold;
        cur = rebuild_merging(
            &cur,
            move |a, h| !removable(a, h) || step_height(a, h) > thr,
            MergeMode::Representative,
        )?;
    }

    if cfg.dissolve_all_interior {
        cur = rebuild_merging(&cur, |a, h| !removable(a, h), MergeMode::Representative)?;
    }

    // dangling edges and out-of-footprint subdivisions, peeled to a fixed
    // point (removing a twig exposes the next)
    loop {
        let before = cur.half_edges.len();
        let outside = cfg.dissolve_outside_fp;
        cur = rebuild_merging(
            &cur,
            move |a, h| {
                if a.is_dangling(h) {
                    return false;
                }
                if outside {
                    let (fa, fb) = a.edge_faces(h);
                    let fa_in = a.faces[fa as usize].data.in_footprint;
                    let fb_in = a.faces[fb as usize].data.in_footprint;
                    if !fa_in && !fb_in {
                        return false;
                    }
                }
                true
            },
            MergeMode::Representative,
        )?;
        if cur.half_edges.len() == before {
            break;
        }
    }

    cur = suppress_redundant_vertices(&cur)?;

    label_building_parts(&mut cur);

    // every remaining bounded face outside the footprint is a hole
    for f in 0..cur.faces.len() {
        if f as u32 == cur.unbounded {
            continue;
        }
        let data = &mut cur.faces[f].data;
        if !data.in_footprint && !data.is_footprint_hole {
            data.is_footprint_hole = true;
        }
    }

    compute_face_stats(&mut cur, field, false);
    Ok(cur)
}

/// Interior in-footprint edge that is allowed to dissolve
fn removable(arr: &Arrangement, h: u32) -> bool {
    if arr.half_edges[h as usize].blocks {
        return false;
    }
    let (fa, fb) = arr.edge_faces(h);
    fa != fb
        && arr.faces[fa as usize].data.in_footprint
        && arr.faces[fb as usize].data.in_footprint
}

fn same_plane(arr: &Arrangement, h: u32) -> bool {
    let (fa, fb) = arr.edge_faces(h);
    let pa = arr.faces[fa as usize].data.plane.map(|p: Plane| p.id);
    let pb = arr.faces[fb as usize].data.plane.map(|p: Plane| p.id);
    pa == pb
}

/// 70th-percentile difference across an edge; merged when either side has
/// no data at all
fn step_height(arr: &Arrangement, h: u32) -> f32 {
    let (fa, fb) = arr.edge_faces(h);
    let za = arr.faces[fa as usize].data.elevation.p70;
    let zb = arr.faces[fb as usize].data.elevation.p70;
    match (za, zb) {
        (Some(a), Some(b)) => (a - b).abs(),
        _ => 0.0,
    }
}

/// Rebuild from the edges that `keep` retains and re-attach face data
fn rebuild_merging(
    arr: &Arrangement,
    keep: impl Fn(&Arrangement, u32) -> bool,
    mode: MergeMode,
) -> Result<Arrangement> {
    let mut segments: Vec<SegmentInput> = Vec::new();
    for h in arr.edges() {
        if keep(arr, h) {
            let (a, b) = arr.edge_segment(h);
            segments.push(SegmentInput::new(
                a,
                b,
                arr.half_edges[h as usize].blocks,
            ));
        }
    }
    let mut rebuilt = arrangement::build(&segments, None)?;
    transfer_face_data(arr, &mut rebuilt, mode);
    Ok(rebuilt)
}

/// Locate every old bounded face's witness in the new arrangement and
/// merge the groups' payloads onto the new faces.
fn transfer_face_data(old: &Arrangement, new: &mut Arrangement, mode: MergeMode) {
    let mut groups: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
    for f in 0..old.faces.len() as u32 {
        if old.faces[f as usize].is_unbounded() {
            continue;
        }
        if let Some(w) = arrangement::interior_witness(old, f) {
            let target = arrangement::locate_face(new, &w);
            if target != new.unbounded {
                groups.entry(target).or_default().push(f);
            }
        }
    }

    for (target, members) in groups {
        let rep = members
            .iter()
            .copied()
            .max_by(|&a, &b| {
                let pa = old.faces[a as usize].data.pixel_count;
                let pb = old.faces[b as usize].data.pixel_count;
                pa.cmp(&pb).then(b.cmp(&a)) // ties take the lowest id
            })
            .unwrap_or(members[0]);
        let rep_data = &old.faces[rep as usize].data;

        let mut merged = FaceData::new();
        merged.in_footprint = members
            .iter()
            .any(|&f| old.faces[f as usize].data.in_footprint);
        merged.is_footprint_hole = !merged.in_footprint
            && members
                .iter()
                .any(|&f| old.faces[f as usize].data.is_footprint_hole);
        merged.is_ground = !merged.in_footprint
            && members
                .iter()
                .any(|&f| old.faces[f as usize].data.is_ground);
        merged.plane = rep_data.plane;
        merged.label = rep_data.label;
        merged.pixel_count = members
            .iter()
            .map(|&f| old.faces[f as usize].data.pixel_count)
            .sum();

        merged.elevation = match mode {
            MergeMode::Representative => rep_data.elevation,
            MergeMode::WeightedStats => {
                let mut acc = ElevationStats::default();
                let mut weight_sum = 0.0f64;
                let mut sums = [0.0f64; 3];
                let mut min = f32::MAX;
                let mut max = f32::MIN;
                for &f in &members {
                    let d = &old.faces[f as usize].data;
                    let w = d.pixel_count as f64;
                    if let (Some(p50), Some(p70), Some(p97)) =
                        (d.elevation.p50, d.elevation.p70, d.elevation.p97)
                    {
                        if w > 0.0 {
                            sums[0] += w * p50 as f64;
                            sums[1] += w * p70 as f64;
                            sums[2] += w * p97 as f64;
                            weight_sum += w;
                        }
                    }
                    min = min.min(d.elevation.min.unwrap_or(f32::MAX));
                    max = max.max(d.elevation.max.unwrap_or(f32::MIN));
                }
                if weight_sum > 0.0 {
                    acc.p50 = Some((sums[0] / weight_sum) as f32);
                    acc.p70 = Some((sums[1] / weight_sum) as f32);
                    acc.p97 = Some((sums[2] / weight_sum) as f32);
                }
                if min != f32::MAX {
                    acc.min = Some(min);
                }
                if max != f32::MIN {
                    acc.max = Some(max);
                }
                acc
            }
        };

        let coverage_w: f64 = members
            .iter()
            .map(|&f| old.faces[f as usize].data.pixel_count as f64)
            .sum();
        if coverage_w > 0.0 {
            merged.data_coverage = (members
                .iter()
                .map(|&f| {
                    let d = &old.faces[f as usize].data;
                    d.data_coverage as f64 * d.pixel_count as f64
                })
                .sum::<f64>()
                / coverage_w) as f32;
        }

        new.faces[target as usize].data = merged;
    }
}

/// Merge the two edges of every degree-2 vertex whose incident edges are
/// exactly collinear, then rebuild once.
fn suppress_redundant_vertices(arr: &Arrangement) -> Result<Arrangement> {
    // segment-level contraction: vertex -> incident segment indices
    #[derive(Clone)]
    struct Seg {
        a: u32,
        b: u32,
        blocks: bool,
        alive: bool,
    }
    let mut segs: Vec<Seg> = arr
        .edges()
        .map(|h| Seg {
            a: arr.source(h),
            b: arr.target(h),
            blocks: arr.half_edges[h as usize].blocks,
            alive: true,
        })
        .collect();

    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); arr.vertices.len()];
    for (i, s) in segs.iter().enumerate() {
        incident[s.a as usize].push(i);
        incident[s.b as usize].push(i);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for v in 0..arr.vertices.len() {
            let alive: Vec<usize> = incident[v]
                .iter()
                .copied()
                .filter(|&i| segs[i].alive)
                .collect();
            if alive.len() != 2 {
                continue;
            }
            let (i, j) = (alive[0], alive[1]);
            let other = |s: &Seg| if s.a as usize == v { s.b } else { s.a };
            let (a, b) = (other(&segs[i]), other(&segs[j]));
            if a == b {
                continue; // two-edge loop
            }
            let pa = &arr.vertices[a as usize].point;
            let pv = &arr.vertices[v as usize].point;
            let pb = &arr.vertices[b as usize].point;
            if orient2d(pa, pv, pb) != Ordering::Equal {
                continue;
            }
            let blocks = segs[i].blocks || segs[j].blocks;
            segs[i].alive = false;
            segs[j].alive = false;
            segs.push(Seg {
                a,
                b,
                blocks,
                alive: true,
            });
            let k = segs.len() - 1;
            incident[a as usize].push(k);
            incident[b as usize].push(k);
            changed = true;
        }
    }

    let inputs: Vec<SegmentInput> = segs
        .iter()
        .filter(|s| s.alive)
        .map(|s| {
            SegmentInput::new(
                arr.vertices[s.a as usize].point.clone(),
                arr.vertices[s.b as usize].point.clone(),
                s.blocks,
            )
        })
        .collect();
    let mut rebuilt = arrangement::build(&inputs, None)?;
    transfer_face_data(arr, &mut rebuilt, MergeMode::Representative);
    Ok(rebuilt)
}

/// Breadth-first part labelling of connected in-footprint faces
fn label_building_parts(arr: &mut Arrangement) {
    // adjacency over shared edges
    let mut neighbours: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
    let edge_ids: Vec<u32> = arr.edges().collect();
    for h in edge_ids {
        let (fa, fb) = arr.edge_faces(h);
        if fa == fb {
            continue;
        }
        if arr.faces[fa as usize].data.in_footprint && arr.faces[fb as usize].data.in_footprint {
            neighbours.entry(fa).or_default().push(fb);
            neighbours.entry(fb).or_default().push(fa);
        }
    }

    let mut next_part = 0i32;
    for f in 0..arr.faces.len() as u32 {
        if !arr.faces[f as usize].data.in_footprint || arr.faces[f as usize].data.part_id >= 0 {
            continue;
        }
        let mut queue = VecDeque::from([f]);
        arr.faces[f as usize].data.part_id = next_part;
        while let Some(cur) = queue.pop_front() {
            if let Some(ns) = neighbours.get(&cur) {
                for &nb in ns {
                    if arr.faces[nb as usize].data.part_id < 0 {
                        arr.faces[nb as usize].data.part_id = next_part;
                        queue.push_back(nb);
                    }
                }
            }
        }
        next_part += 1;
    }
}

/// Sample the height raster inside every in-footprint face and refresh the
/// elevation statistics. With `plane_fallback`, empty cells take the
/// face's plane elevation instead of being skipped.
pub fn compute_face_stats(arr: &mut Arrangement, field: &HeightField, plane_fallback: bool) {
    use roofline_core::NODATA;

    for f in 0..arr.faces.len() as u32 {
        if !arr.faces[f as usize].data.in_footprint {
            continue;
        }
        let (outer, inners) = arr.face_polygon_f64(f);
        let cells = field.rasterise_polygon(&outer, &inners, true);
        let plane = arr.faces[f as usize].data.plane;
        let data = &mut arr.faces[f as usize].data;

        if cells.is_empty() {
            // face too small to cover a cell centre: plane elevation at a
            // boundary vertex keeps the stats usable
            if let (Some(p), Some(&(x, y))) = (plane, outer.first()) {
                let z = p.z_at(x, y) as f32;
                data.elevation = ElevationStats {
                    p50: Some(z),
                    p70: Some(z),
                    p97: Some(z),
                    min: Some(z),
                    max: Some(z),
                };
            } else {
                data.elevation = ElevationStats::default();
            }
            data.pixel_count = 0;
            data.data_coverage = 0.0;
            continue;
        }

        let mut zs: Vec<f32> = Vec::with_capacity(cells.len());
        let mut data_cnt = 0usize;
        for &(x, y, z) in &cells {
            if z != NODATA {
                data_cnt += 1;
                zs.push(z);
            } else if plane_fallback {
                if let Some(p) = plane {
                    zs.push(p.z_at(x, y) as f32);
                }
            }
        }
        if zs.is_empty() {
            data.elevation = ElevationStats::default();
            data.pixel_count = 0;
            data.data_coverage = 0.0;
            continue;
        }
        zs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let pick = |p: f64| zs[(p * (zs.len() - 1) as f64).floor() as usize];
        data.elevation = ElevationStats {
            p50: Some(pick(0.5)),
            p70: Some(pick(0.7)),
            p97: Some(pick(0.97)),
            min: Some(zs[0]),
            max: Some(zs[zs.len() - 1]),
        };
        data.pixel_count = if plane_fallback { cells.len() } else { data_cnt };
        data.data_coverage = data_cnt as f32 / cells.len() as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roofline_geometry::ExactPoint2;

    fn pt(x: f64, y: f64) -> ExactPoint2 {
        ExactPoint2::from_f64(x, y).unwrap()
    }

    /// 10 x 5 footprint split at x = 5 into two faces
    fn split_arrangement() -> Arrangement {
        let ring = [(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)];
        let mut segs: Vec<SegmentInput> = (0..4)
            .map(|i| {
                SegmentInput::new(
                    pt(ring[i].0, ring[i].1),
                    pt(ring[(i + 1) % 4].0, ring[(i + 1) % 4].1),
                    true,
                )
            })
            .collect();
        segs.push(SegmentInput::new(pt(5.0, 0.0), pt(5.0, 5.0), false));
        let mut arr = arrangement::build(&segs, None).unwrap();
        for f in 0..arr.faces.len() {
            if !arr.faces[f].is_unbounded() {
                arr.faces[f].data.in_footprint = true;
            }
        }
        arr
    }

    fn flat_field(z: f32) -> HeightField {
        let mut field = HeightField::new(0.5, -1.0, 11.0, -1.0, 6.0).unwrap();
        let (dx, dy) = field.dims();
        for r in 0..dy {
            for c in 0..dx {
                field.set(c, r, z);
            }
        }
        field
    }

    fn set_plane(arr: &mut Arrangement, id_by_centroid: impl Fn(f64) -> u32) {
        for f in 0..arr.faces.len() as u32 {
            if !arr.faces[f as usize].data.in_footprint {
                continue;
            }
            let (outer, _) = arr.face_polygon_f64(f);
            let cx = outer.iter().map(|p| p.0).sum::<f64>() / outer.len() as f64;
            let id = id_by_centroid(cx);
            arr.faces[f as usize].data.plane = Some(Plane {
                a: 0.0,
                b: 0.0,
                c: 1.0,
                d: -3.0,
                id,
            });
        }
    }

    #[test]
    fn test_same_label_faces_merge() {
        let mut arr = split_arrangement();
        set_plane(&mut arr, |_| 1);
        let field = flat_field(3.0);
        let cfg = DissolverConfig::for_lod(22, 3.0);
        let out = dissolve(&arr, &field, &cfg).unwrap();
        let in_fp = out.faces.iter().filter(|f| f.data.in_footprint).count();
        assert_eq!(in_fp, 1);
        // the split vertex chain is gone entirely
        assert_eq!(out.vertices.len(), 4);
    }

    #[test]
    fn test_different_labels_stay_split() {
        let mut arr = split_arrangement();
        set_plane(&mut arr, |cx| if cx < 5.0 { 1 } else { 2 });
        let field = flat_field(3.0);
        let cfg = DissolverConfig::for_lod(22, 3.0);
        let out = dissolve(&arr, &field, &cfg).unwrap();
        let in_fp = out.faces.iter().filter(|f| f.data.in_footprint).count();
        assert_eq!(in_fp, 2);
    }

    #[test]
    fn test_lod12_merges_everything() {
        let mut arr = split_arrangement();
        set_plane(&mut arr, |cx| if cx < 5.0 { 1 } else { 2 });
        let field = flat_field(3.0);
        let cfg = DissolverConfig::for_lod(12, 3.0);
        let out = dissolve(&arr, &field, &cfg).unwrap();
        let in_fp: Vec<_> = out
            .faces
            .iter()
            .filter(|f| f.data.in_footprint)
            .collect();
        assert_eq!(in_fp.len(), 1);
        assert_eq!(in_fp[0].data.part_id, 0);
    }

    #[test]
    fn test_lod13_small_step_merges() {
        let mut arr = split_arrangement();
        set_plane(&mut arr, |cx| if cx < 5.0 { 1 } else { 2 });
        // left side 3.0, right side 4.0: below the 3 m step threshold
        let mut field = flat_field(3.0);
        let (dx, dy) = field.dims();
        for r in 0..dy {
            for c in 0..dx {
                let (x, _) = field.cell_center(c, r);
                if x > 5.0 {
                    field.set(c, r, 4.0);
                }
            }
        }
        let cfg = DissolverConfig::for_lod(13, 3.0);
        let out = dissolve(&arr, &field, &cfg).unwrap();
        assert_eq!(
            out.faces.iter().filter(|f| f.data.in_footprint).count(),
            1
        );

        // a 5 m step survives LoD 1.3
        let mut tall = flat_field(3.0);
        for r in 0..dy {
            for c in 0..dx {
                let (x, _) = tall.cell_center(c, r);
                if x > 5.0 {
                    tall.set(c, r, 8.0);
                }
            }
        }
        let mut arr2 = split_arrangement();
        set_plane(&mut arr2, |cx| if cx < 5.0 { 1 } else { 2 });
        let out2 = dissolve(&arr2, &tall, &cfg).unwrap();
        assert_eq!(
            out2.faces.iter().filter(|f| f.data.in_footprint).count(),
            2
        );
    }

    #[test]
    fn test_stats_weighted_on_merge() {
        let mut arr = split_arrangement();
        set_plane(&mut arr, |_| 1);
        // left 3.0, right 5.0; merged 70p must land in between
        let mut field = flat_field(3.0);
        let (dx, dy) = field.dims();
        for r in 0..dy {
            for c in 0..dx {
                let (x, _) = field.cell_center(c, r);
                if x > 5.0 {
                    field.set(c, r, 5.0);
                }
            }
        }
        let cfg = DissolverConfig::for_lod(22, 3.0);
        let out = dissolve(&arr, &field, &cfg).unwrap();
        let face = out.faces.iter().find(|f| f.data.in_footprint).unwrap();
        let p70 = face.data.elevation.p70.unwrap();
        assert!(p70 > 3.0 && p70 < 5.01, "p70 = {p70}");
    }
}
