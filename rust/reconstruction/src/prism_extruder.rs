// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simple prism extrusion
//!
//! Lifts the raw footprint to a single roof height: the LoD 1.1-style
//! shape used when a building is skipped or falls back after a blown
//! budget.

use nalgebra::Point3;
use roofline_core::{LinearRing, MultiSolid, SemanticMesh, SurfaceType};

/// Extrude the footprint from floor to one flat roof height
pub fn extrude_prism(footprint: &LinearRing, h_floor: f32, h_roof: f32) -> MultiSolid {
    let mut ring = footprint.clone();
    ring.ensure_ccw();

    let mut mesh = SemanticMesh::new();

    let mut roof = ring.clone();
    roof.set_elevation(h_roof);
    mesh.push(roof, SurfaceType::Roof);

    // outer walls
    let n = ring.points.len();
    for j in 0..n {
        let j_prev = (j + n - 1) % n;
        mesh.push(
            wall(&ring.points[j_prev], &ring.points[j], h_floor, h_roof),
            SurfaceType::WallOuter,
        );
    }
    // hole walls
    for hole in &ring.interiors {
        let n = hole.len();
        for j in 0..n {
            let j_prev = (j + n - 1) % n;
            mesh.push(
                wall(&hole[j_prev], &hole[j], h_floor, h_roof),
                SurfaceType::WallOuter,
            );
        }
    }

    let mut floor = ring.reversed();
    floor.set_elevation(h_floor);
    mesh.push(floor, SurfaceType::Ground);

    let mut solid = MultiSolid::new();
    solid.insert(0, mesh);
    solid
}

fn wall(a: &Point3<f32>, b: &Point3<f32>, h_floor: f32, h_roof: f32) -> LinearRing {
    LinearRing::new(vec![
        Point3::new(a.x, a.y, h_floor),
        Point3::new(b.x, b.y, h_floor),
        Point3::new(b.x, b.y, h_roof),
        Point3::new(a.x, a.y, h_roof),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prism_counts() {
        let fp = LinearRing::from_xy(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)], 0.0);
        let solid = extrude_prism(&fp, 0.0, 3.0);
        let mesh = &solid[&0];
        assert_eq!(mesh.count(SurfaceType::Roof), 1);
        assert_eq!(mesh.count(SurfaceType::Ground), 1);
        assert_eq!(mesh.count(SurfaceType::WallOuter), 4);

        let roof = mesh.surfaces(SurfaceType::Roof).next().unwrap();
        assert!(roof.is_ccw());
        assert!(roof.points.iter().all(|p| p.z == 3.0));
    }

    #[test]
    fn test_prism_with_hole() {
        let mut fp = LinearRing::from_xy(&[(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0)], 0.0);
        fp.interiors
            .push(LinearRing::from_xy(&[(3.0, 3.0), (3.0, 5.0), (5.0, 5.0), (5.0, 3.0)], 0.0).points);
        let solid = extrude_prism(&fp, -0.5, 6.0);
        let mesh = &solid[&0];
        assert_eq!(mesh.count(SurfaceType::WallOuter), 8);
        let roof = mesh.surfaces(SurfaceType::Roof).next().unwrap();
        assert_eq!(roof.interiors.len(), 1);
        let floor = mesh.surfaces(SurfaceType::Ground).next().unwrap();
        assert!(floor.points.iter().all(|p| p.z == -0.5));
    }
}
