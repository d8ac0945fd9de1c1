// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! kNN graphs over an R*-tree

use nalgebra::Point3;
use rstar::primitives::GeomWithData;
use rstar::RTree;

type IndexedPoint = GeomWithData<[f64; 3], u32>;

/// k-nearest-neighbour graph of a point cloud. `neighbours[i]` holds the k
/// indices closest to point i (self excluded), nearest first.
#[derive(Debug, Clone)]
pub struct KnnGraph {
    pub neighbours: Vec<Vec<u32>>,
}

impl KnnGraph {
    /// Build the graph with k neighbours per point
    pub fn build(points: &[Point3<f64>], k: usize) -> Self {
        let tree = RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| IndexedPoint::new([p.x, p.y, p.z], i as u32))
                .collect(),
        );

        let neighbours = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                tree.nearest_neighbor_iter(&[p.x, p.y, p.z])
                    .filter(|n| n.data != i as u32)
                    .take(k)
                    .map(|n| n.data)
                    .collect()
            })
            .collect();

        Self { neighbours }
    }

    /// Number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    /// Check if the graph is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }

    /// Neighbour indices of one point
    #[inline]
    pub fn of(&self, i: usize) -> &[u32] {
        &self.neighbours[i]
    }

    /// Iterate over every undirected graph edge (i, j) with i < j exactly once
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.neighbours.iter().enumerate().flat_map(move |(i, ns)| {
            ns.iter().filter_map(move |&j| {
                let i = i as u32;
                // emit each undirected pair once, from the lower index;
                // one-directional kNN links are still included
                if i < j || !self.neighbours[j as usize].contains(&i) {
                    Some((i.min(j), i.max(j)))
                } else {
                    None
                }
            })
        })
    }
}
