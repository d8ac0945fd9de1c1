// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion of the labelled arrangement to 3D solids
//!
//! Every in-footprint face contributes a roof polygon and wall quads; each
//! connected building part contributes a single floor polygon traced from
//! its boundary edges. Roofs follow the assigned plane at LoD 2.2 and the
//! face's 70th-percentile elevation otherwise. Walls against the outside
//! (or a footprint hole) run from floor to roof; walls between two roof
//! faces span only the height difference and are emitted from the higher
//! side. Wall corners reuse the adjacent roof/floor ring coordinates, so
//! the shell closes watertight after snapping.

use crate::elevation::FloorElevation;
use nalgebra::Point3;
use num_traits::Zero;
use roofline_core::{LinearRing, MultiSolid, SurfaceType};
use roofline_geometry::arrangement::{self, Arrangement, SegmentInput};
use roofline_geometry::exact::signed_area2;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// Extruder parameters
#[derive(Debug, Clone)]
pub struct ExtruderConfig {
    /// Lift roofs to their assigned plane (LoD 2.2) instead of the flat
    /// 70th-percentile elevation (LoD 1.2 / 1.3)
    pub lod2: bool,
    /// Roof height above the floor assumed for faces without height data
    pub nodata_elevation: f32,
}

/// Height differences below this merge into a shared roof edge
const STEP_EPS: f64 = 1e-4;

/// Extrude all in-footprint faces into per-part solids. Also returns the
/// flattened labelled polygon list for debugging.
pub fn extrude<E: FloorElevation>(
    arr: &Arrangement,
    elevation: &E,
    cfg: &ExtruderConfig,
) -> (MultiSolid, Vec<(LinearRing, SurfaceType)>) {
    let mut solids = MultiSolid::new();
    let mut flat = Vec::new();

    let mut parts: BTreeMap<i32, Vec<u32>> = BTreeMap::new();
    for f in 0..arr.faces.len() as u32 {
        let face = &arr.faces[f as usize];
        if face.data.in_footprint && face.outer.is_some() {
            parts.entry(face.data.part_id.max(0)).or_default().push(f);
        }
    }

    for (part, faces) in &parts {
        let mesh = solids.entry(*part).or_default();

        for &f in faces {
            let roof_z = face_roof_z(arr, f, elevation, cfg);

            // roof polygon: outer CCB (CCW) plus area-carrying inner CCBs (CW)
            let mut roof_ring = LinearRing::default();
            for (ci, cycle) in face_cycles(arr, f).iter().enumerate() {
                let pts = cycle
                    .iter()
                    .map(|&h| {
                        let (x, y) = arr.vertices[arr.source(h) as usize].point.to_f64();
                        Point3::new(x as f32, y as f32, roof_z(x, y))
                    })
                    .collect();
                if ci == 0 {
                    roof_ring.points = pts;
                } else {
                    roof_ring.interiors.push(pts);
                }
            }

            // wall quads along every boundary cycle
            for cycle in &face_cycles(arr, f) {
                for &h in cycle {
                    let neighbour =
                        arr.half_edges[arr.half_edges[h as usize].twin as usize].face;
                    let n_data = &arr.faces[neighbour as usize].data;
                    let (sx, sy) = arr.vertices[arr.source(h) as usize].point.to_f64();
                    let (tx, ty) = arr.vertices[arr.target(h) as usize].point.to_f64();

                    let quad = if !n_data.in_footprint {
                        // footprint boundary or hole ring: full-height wall
                        let fs = elevation.elevation_at(sx, sy);
                        let ft = elevation.elevation_at(tx, ty);
                        wall_quad(sx, sy, tx, ty, fs, ft, roof_z(sx, sy), roof_z(tx, ty))
                            .map(|r| (r, SurfaceType::WallOuter))
                    } else {
                        // between two roof faces: span the height
                        // difference, emitted from the higher side only
                        let other_z = face_roof_z(arr, neighbour, elevation, cfg);
                        let (mx, my) = ((sx + tx) * 0.5, (sy + ty) * 0.5);
                        if roof_z(mx, my) as f64 > other_z(mx, my) as f64 + STEP_EPS {
                            wall_quad(
                                sx,
                                sy,
                                tx,
                                ty,
                                other_z(sx, sy),
                                other_z(tx, ty),
                                roof_z(sx, sy),
                                roof_z(tx, ty),
                            )
                            .map(|r| (r, SurfaceType::WallInner))
                        } else {
                            None
                        }
                    };

                    if let Some((ring, surface)) = quad {
                        flat.push((ring.clone(), surface));
                        mesh.push(ring, surface);
                    }
                }
            }

            flat.push((roof_ring.clone(), SurfaceType::Roof));
            mesh.push(roof_ring, SurfaceType::Roof);
        }

        // one floor per part, traced from the part's boundary edges
        if let Some(floor) = part_floor(arr, faces, elevation) {
            flat.push((floor.clone(), SurfaceType::Ground));
            mesh.push(floor, SurfaceType::Ground);
        }
    }

    (solids, flat)
}

/// Boundary cycles of a face: the outer CCB first, then every inner CCB
/// that encloses area (antenna walks carry none)
fn face_cycles(arr: &Arrangement, f: u32) -> Vec<Vec<u32>> {
    let face = &arr.faces[f as usize];
    let mut cycles = Vec::new();
    if let Some(outer) = face.outer {
        cycles.push(arr.ccb(outer));
    }
    for &h in &face.inners {
        let pts = arr.ccb_points(h);
        if pts.len() >= 3 && !signed_area2(&pts).is_zero() {
            cycles.push(arr.ccb(h));
        }
    }
    cycles
}

/// The floor polygon of one part: the outline of the union of its faces,
/// reversed to face downward. Interior rings mark footprint holes.
fn part_floor<E: FloorElevation>(
    arr: &Arrangement,
    faces: &[u32],
    elevation: &E,
) -> Option<LinearRing> {
    let in_part: FxHashSet<u32> = faces.iter().copied().collect();

    let mut segments = Vec::new();
    for &f in faces {
        for cycle in face_cycles(arr, f) {
            for h in cycle {
                let neighbour = arr.half_edges[arr.half_edges[h as usize].twin as usize].face;
                if !in_part.contains(&neighbour) {
                    let (a, b) = arr.edge_segment(h);
                    segments.push(SegmentInput::new(a, b, false));
                }
            }
        }
    }
    let outline = arrangement::build(&segments, None).ok()?;

    // the outline face is the bounded face with the largest area
    let best = (0..outline.faces.len() as u32)
        .filter(|&f| !outline.faces[f as usize].is_unbounded())
        .max_by(|&a, &b| {
            let fa = outline.faces[a as usize].outer.map(|h| outline.ccb_area2(h));
            let fb = outline.faces[b as usize].outer.map(|h| outline.ccb_area2(h));
            fa.cmp(&fb)
        })?;

    let mut floor = LinearRing::default();
    for (ci, cycle) in face_cycles(&outline, best).iter().enumerate() {
        let mut pts: Vec<Point3<f32>> = cycle
            .iter()
            .map(|&h| {
                let (x, y) = outline.vertices[outline.source(h) as usize].point.to_f64();
                Point3::new(x as f32, y as f32, elevation.elevation_at(x, y))
            })
            .collect();
        pts.reverse(); // floor faces downward
        if ci == 0 {
            floor.points = pts;
        } else {
            floor.interiors.push(pts);
        }
    }
    Some(floor)
}

/// Roof elevation function of one face
fn face_roof_z<'a, E: FloorElevation>(
    arr: &Arrangement,
    f: u32,
    elevation: &'a E,
    cfg: &ExtruderConfig,
) -> impl Fn(f64, f64) -> f32 + 'a {
    let data = &arr.faces[f as usize].data;
    let plane = data.plane;
    let p70 = data.elevation.p70;
    let lod2 = cfg.lod2;
    let nodata = cfg.nodata_elevation;
    move |x: f64, y: f64| -> f32 {
        if lod2 {
            if let Some(p) = plane {
                return p.z_at(x, y) as f32;
            }
        }
        match p70 {
            Some(z) => z,
            None => elevation.elevation_at(x, y) + nodata,
        }
    }
}

/// A vertical quad between two height profiles over the edge (s, t);
/// None when it would be degenerate. Counter-clockwise seen from outside
/// the higher face.
#[allow(clippy::too_many_arguments)]
fn wall_quad(
    sx: f64,
    sy: f64,
    tx: f64,
    ty: f64,
    bottom_s: f32,
    bottom_t: f32,
    top_s: f32,
    top_t: f32,
) -> Option<LinearRing> {
    if (top_s - bottom_s).abs() < 1e-6 && (top_t - bottom_t).abs() < 1e-6 {
        return None;
    }
    let (sx, sy, tx, ty) = (sx as f32, sy as f32, tx as f32, ty as f32);
    let mut pts = vec![
        Point3::new(sx, sy, bottom_s),
        Point3::new(tx, ty, bottom_t),
        Point3::new(tx, ty, top_t),
        Point3::new(sx, sy, top_s),
    ];
    // collapse to a triangle when one side has zero height
    pts.dedup();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() < 3 {
        return None;
    }
    Some(LinearRing::new(pts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::ConstantElevation;
    use roofline_core::Plane;
    use roofline_geometry::arrangement::ElevationStats;
    use roofline_geometry::ExactPoint2;

    fn pt(x: f64, y: f64) -> ExactPoint2 {
        ExactPoint2::from_f64(x, y).unwrap()
    }

    fn ring_segs(coords: &[(f64, f64)]) -> Vec<SegmentInput> {
        let n = coords.len();
        (0..n)
            .map(|i| {
                SegmentInput::new(
                    pt(coords[i].0, coords[i].1),
                    pt(coords[(i + 1) % n].0, coords[(i + 1) % n].1),
                    true,
                )
            })
            .collect()
    }

    fn flat_faces(arr: &mut Arrangement, z: f32) {
        for f in 0..arr.faces.len() {
            if !arr.faces[f].is_unbounded() {
                let d = &mut arr.faces[f].data;
                d.in_footprint = true;
                d.part_id = 0;
                d.plane = Some(Plane { a: 0.0, b: 0.0, c: 1.0, d: -(z as f64), id: 1 });
                d.elevation = ElevationStats {
                    p50: Some(z),
                    p70: Some(z),
                    p97: Some(z),
                    min: Some(z),
                    max: Some(z),
                };
            }
        }
    }

    #[test]
    fn test_box_from_rectangle() {
        let mut arr = arrangement::build(
            &ring_segs(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]),
            None,
        )
        .unwrap();
        flat_faces(&mut arr, 3.0);

        let cfg = ExtruderConfig { lod2: true, nodata_elevation: 3.0 };
        let (solids, _) = extrude(&arr, &ConstantElevation(0.0), &cfg);
        assert_eq!(solids.len(), 1);
        let mesh = &solids[&0];
        assert_eq!(mesh.count(SurfaceType::Roof), 1);
        assert_eq!(mesh.count(SurfaceType::Ground), 1);
        assert_eq!(mesh.count(SurfaceType::WallOuter), 4);
        assert_eq!(mesh.count(SurfaceType::WallInner), 0);

        // orientation: roof CCW from above, floor CW
        let roof = mesh.surfaces(SurfaceType::Roof).next().unwrap();
        assert!(roof.is_ccw());
        assert!(roof.points.iter().all(|p| p.z == 3.0));
        let floor = mesh.surfaces(SurfaceType::Ground).next().unwrap();
        assert!(!floor.is_ccw());
        assert!(floor.points.iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn test_step_emits_inner_wall_and_single_floor() {
        // two faces split at x = 5, flat roofs at 3 and 6
        let mut segs = ring_segs(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]);
        segs.push(SegmentInput::new(pt(5.0, 0.0), pt(5.0, 5.0), false));
        let mut arr = arrangement::build(&segs, None).unwrap();
        for f in 0..arr.faces.len() as u32 {
            if arr.faces[f as usize].is_unbounded() {
                continue;
            }
            let (outer, _) = arr.face_polygon_f64(f);
            let cx = outer.iter().map(|p| p.0).sum::<f64>() / outer.len() as f64;
            let z = if cx < 5.0 { 3.0f32 } else { 6.0f32 };
            let d = &mut arr.faces[f as usize].data;
            d.in_footprint = true;
            d.part_id = 0;
            d.plane = Some(Plane {
                a: 0.0,
                b: 0.0,
                c: 1.0,
                d: -(z as f64),
                id: if cx < 5.0 { 1 } else { 2 },
            });
            d.elevation.p70 = Some(z);
        }

        let cfg = ExtruderConfig { lod2: true, nodata_elevation: 3.0 };
        let (solids, _) = extrude(&arr, &ConstantElevation(0.0), &cfg);
        let mesh = &solids[&0];
        assert_eq!(mesh.count(SurfaceType::Roof), 2);
        assert_eq!(mesh.count(SurfaceType::Ground), 1);
        assert_eq!(mesh.count(SurfaceType::WallInner), 1);
        let wall = mesh.surfaces(SurfaceType::WallInner).next().unwrap();
        let zs: Vec<f32> = wall.points.iter().map(|p| p.z).collect();
        assert!(zs.contains(&3.0) && zs.contains(&6.0));
        // the part floor spans the full footprint
        let floor = mesh.surfaces(SurfaceType::Ground).next().unwrap();
        let xs: Vec<f32> = floor.points.iter().map(|p| p.x).collect();
        assert!(xs.iter().any(|&x| x == 0.0) && xs.iter().any(|&x| x == 10.0));
    }

    #[test]
    fn test_hole_produces_inner_ring_walls() {
        let mut segs = ring_segs(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        segs.extend(ring_segs(&[(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)]));
        let mut arr = arrangement::build(&segs, None).unwrap();
        // mark only the annulus as footprint (the small square is a hole)
        for f in 0..arr.faces.len() as u32 {
            if arr.faces[f as usize].is_unbounded() {
                continue;
            }
            let has_inner = !arr.faces[f as usize].inners.is_empty();
            let d = &mut arr.faces[f as usize].data;
            if has_inner {
                d.in_footprint = true;
                d.part_id = 0;
                d.plane = Some(Plane { a: 0.0, b: 0.0, c: 1.0, d: -4.0, id: 1 });
                d.elevation.p70 = Some(4.0);
            } else {
                d.is_footprint_hole = true;
            }
        }

        let cfg = ExtruderConfig { lod2: false, nodata_elevation: 3.0 };
        let (solids, _) = extrude(&arr, &ConstantElevation(0.0), &cfg);
        let mesh = &solids[&0];
        let roof = mesh.surfaces(SurfaceType::Roof).next().unwrap();
        assert_eq!(roof.interiors.len(), 1);
        let floor = mesh.surfaces(SurfaceType::Ground).next().unwrap();
        assert_eq!(floor.interiors.len(), 1);
        // 4 outer + 4 hole walls
        assert_eq!(mesh.count(SurfaceType::WallOuter), 8);
    }
}
