// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plane detection: region growing over a kNN graph
//!
//! Segments roof (or ground) points into planar regions. Per-point normals
//! come from a least-squares fit over each point's k nearest neighbours;
//! regions grow from seed points while candidates stay within the distance
//! tolerance of the region plane and agree with the region normal. Small
//! regions are unwound. The kNN graph also yields the plane adjacency
//! counts that later gate plane-pair intersection.

use nalgebra::{Point3, Vector3};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use roofline_core::{Plane, PointSet3, ReconstructionConfig, RoofType};
use roofline_geometry::{fit_plane, KnnGraph};
use std::collections::{BTreeMap, VecDeque};

/// Planes steeper than this |normal z| are facade returns, not roof parts
const WALL_NORMAL_Z_MAX: f64 = 0.3;

/// Inliers per detected plane, keyed by plane id
pub type PlanesWithPoints = BTreeMap<u32, (Plane, Vec<Point3<f64>>)>;

/// Sparse symmetric neighbour-pair counts between plane pairs,
/// keyed `(hi, lo)` with `hi > lo`
pub type PlaneAdjacency = BTreeMap<(u32, u32), usize>;

/// Output of the plane detector
#[derive(Debug, Clone, Default)]
pub struct DetectedPlanes {
    pub planes: PlanesWithPoints,
    pub adjacency: PlaneAdjacency,
    /// Per-point region id; 0 = unsegmented
    pub region_of: Vec<u32>,
    pub roof_type: RoofType,
    pub elevation_min: Option<f32>,
    pub elevation_max: Option<f32>,
    pub elevation_50p: Option<f32>,
    pub elevation_70p: Option<f32>,
    pub horizontal_count: usize,
    pub slanted_count: usize,
    pub wall_point_count: usize,
    pub unsegmented_count: usize,
}

/// Detect planar regions in a point set
pub fn detect(points: &PointSet3, cfg: &ReconstructionConfig) -> DetectedPlanes {
    let mut out = DetectedPlanes {
        roof_type: RoofType::NoPoints,
        ..Default::default()
    };
    if points.is_empty() {
        return out;
    }

    let pts: Vec<Point3<f64>> = points
        .iter()
        .map(|p| Point3::new(p.x as f64, p.y as f64, p.z as f64))
        .collect();
    let n = pts.len();
    out.region_of = vec![0; n];

    if n < cfg.plane_detect_min_points {
        out.roof_type = RoofType::NoPlanes;
        out.unsegmented_count = n;
        return out;
    }

    let graph = KnnGraph::build(&pts, cfg.plane_detect_k);

    // per-point normals from the k-neighbourhood
    let normals: Vec<Option<Vector3<f64>>> = (0..n)
        .map(|i| {
            let mut nb: Vec<Point3<f64>> =
                graph.of(i).iter().map(|&j| pts[j as usize]).collect();
            nb.push(pts[i]);
            fit_plane(&nb).map(|p| p.normal)
        })
        .collect();

    // deterministic shuffled seed order
    let mut seeds: Vec<usize> = (0..n).collect();
    let mut rng = SmallRng::seed_from_u64(cfg.seed);
    seeds.shuffle(&mut rng);

    let epsilon = cfg.plane_detect_epsilon as f64;
    let normal_angle = cfg.plane_detect_normal_angle as f64;
    let refit = cfg.plane_refit_interval.max(1);

    let mut next_id: u32 = 1;
    let mut region_members: Vec<Vec<usize>> = Vec::new();

    for &seed in &seeds {
        if out.region_of[seed] != 0 {
            continue;
        }
        let Some(seed_normal) = normals[seed] else {
            continue;
        };

        let mut plane = Plane::from_normal_point(seed_normal, pts[seed], next_id);
        let mut members = vec![seed];
        let mut since_refit = 0usize;
        let mut queue = VecDeque::from([seed]);
        out.region_of[seed] = next_id;

        while let Some(cur) = queue.pop_front() {
            for &nb in graph.of(cur) {
                let nb = nb as usize;
                if out.region_of[nb] != 0 {
                    continue;
                }
                let Some(nb_normal) = normals[nb] else {
                    continue;
                };
                if plane.distance(&pts[nb]) > epsilon {
                    continue;
                }
                if nb_normal.dot(&plane.normal()).abs() < normal_angle {
                    continue;
                }
                out.region_of[nb] = next_id;
                members.push(nb);
                queue.push_back(nb);
                since_refit += 1;
                if since_refit >= refit {
                    since_refit = 0;
                    let member_pts: Vec<Point3<f64>> =
                        members.iter().map(|&m| pts[m]).collect();
                    if let Some(f) = fit_plane(&member_pts) {
                        plane = Plane::from_normal_point(f.normal, f.centroid, next_id);
                    }
                }
            }
        }

        if members.len() < cfg.plane_detect_min_points {
            // unwind an undersized region
            for &m in &members {
                out.region_of[m] = 0;
            }
            continue;
        }
        region_members.push(members);
        next_id += 1;
    }

    // final plane fit per region, with facade planes filtered out
    let mut final_id: u32 = 1;
    let mut remap: BTreeMap<u32, u32> = BTreeMap::new();
    for (r, members) in region_members.iter().enumerate() {
        let raw_id = (r + 1) as u32;
        let member_pts: Vec<Point3<f64>> = members.iter().map(|&m| pts[m]).collect();
        let Some(f) = fit_plane(&member_pts) else {
            for &m in members {
                out.region_of[m] = 0;
            }
            continue;
        };
        if f.normal.z.abs() < WALL_NORMAL_Z_MAX {
            out.wall_point_count += members.len();
            for &m in members {
                out.region_of[m] = 0;
            }
            continue;
        }
        let plane = Plane::from_normal_point(f.normal, f.centroid, final_id);
        out.planes.insert(final_id, (plane, member_pts));
        remap.insert(raw_id, final_id);
        final_id += 1;
    }
    for id in out.region_of.iter_mut() {
        if *id != 0 {
            *id = remap.get(id).copied().unwrap_or(0);
        }
    }
    out.unsegmented_count = out.region_of.iter().filter(|&&r| r == 0).count();

    // adjacency over the kNN graph
    for (p, q) in graph.edges() {
        let (rp, rq) = (out.region_of[p as usize], out.region_of[q as usize]);
        if rp != 0 && rq != 0 && rp != rq {
            *out.adjacency.entry((rp.max(rq), rp.min(rq))).or_insert(0) += 1;
        }
    }

    // roof typology and elevation statistics
    if out.planes.is_empty() {
        out.roof_type = RoofType::NoPlanes;
        return out;
    }
    let horiz = cfg.horiz_threshold as f64;
    for (plane, _) in out.planes.values() {
        if plane.is_horizontal(horiz) {
            out.horizontal_count += 1;
        } else {
            out.slanted_count += 1;
        }
    }
    out.roof_type = if out.slanted_count > 0 {
        RoofType::Slanted
    } else if out.horizontal_count > 1 {
        RoofType::MultipleHorizontal
    } else {
        RoofType::Horizontal
    };

    let mut zs: Vec<f32> = out
        .planes
        .values()
        .flat_map(|(_, pts)| pts.iter().map(|p| p.z as f32))
        .collect();
    zs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if !zs.is_empty() {
        let pick = |p: f64| zs[(p * (zs.len() - 1) as f64).floor() as usize];
        out.elevation_min = Some(zs[0]);
        out.elevation_max = Some(zs[zs.len() - 1]);
        out.elevation_50p = Some(pick(0.5));
        out.elevation_70p = Some(pick(0.7));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use roofline_core::Point3 as P3f;

    fn flat_cloud(nx: usize, ny: usize, z: f32) -> PointSet3 {
        let mut set = PointSet3::new();
        for i in 0..nx {
            for j in 0..ny {
                // slight deterministic jitter so fits are not exactly rank-deficient
                let dz = ((i * 7 + j * 13) % 5) as f32 * 0.002;
                set.push(P3f::new(i as f32 * 0.5, j as f32 * 0.5, z + dz));
            }
        }
        set
    }

    #[test]
    fn test_empty_input() {
        let out = detect(&PointSet3::new(), &ReconstructionConfig::default());
        assert_eq!(out.roof_type, RoofType::NoPoints);
        assert!(out.planes.is_empty());
    }

    #[test]
    fn test_single_horizontal_plane() {
        let cloud = flat_cloud(12, 8, 3.0);
        let out = detect(&cloud, &ReconstructionConfig::default());
        assert_eq!(out.planes.len(), 1);
        assert_eq!(out.roof_type, RoofType::Horizontal);
        let (plane, inliers) = &out.planes[&1];
        assert!(plane.is_horizontal(0.995));
        assert!(inliers.len() >= 90);
        let z70 = out.elevation_70p.unwrap();
        assert!((z70 - 3.0).abs() < 0.05);
    }

    #[test]
    fn test_gable_two_planes_with_adjacency() {
        // two slopes meeting at y = 2.5
        let mut set = PointSet3::new();
        for i in 0..20 {
            for j in 0..20 {
                let x = i as f32 * 0.5;
                let y = j as f32 * 0.25;
                let z = 3.0 + 0.8 * (2.5 - (y - 2.5).abs());
                set.push(P3f::new(x, y, z));
            }
        }
        let out = detect(&set, &ReconstructionConfig::default());
        assert_eq!(out.planes.len(), 2);
        assert_eq!(out.roof_type, RoofType::Slanted);
        // the two slopes touch along the ridge
        assert!(out.adjacency.get(&(2, 1)).copied().unwrap_or(0) > 0);
    }

    #[test]
    fn test_small_cloud_no_planes() {
        let mut set = PointSet3::new();
        for i in 0..5 {
            set.push(P3f::new(i as f32, 0.0, 1.0));
        }
        let out = detect(&set, &ReconstructionConfig::default());
        assert_eq!(out.roof_type, RoofType::NoPlanes);
    }

    #[test]
    fn test_determinism() {
        let cloud = flat_cloud(10, 10, 5.0);
        let cfg = ReconstructionConfig::default();
        let a = detect(&cloud, &cfg);
        let b = detect(&cloud, &cfg);
        assert_eq!(a.region_of, b.region_of);
        assert_eq!(a.planes.len(), b.planes.len());
    }
}
