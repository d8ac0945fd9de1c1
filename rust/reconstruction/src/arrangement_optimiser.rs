// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face labelling by multi-label graph cut
//!
//! Assigns one candidate plane to every in-footprint face by α-expansion.
//! The data term is the raster-approximated volume between the height
//! field and the candidate plane inside the face; the smoothness term is a
//! Potts penalty proportional to shared edge length. Each expansion move is
//! one binary min-cut solved by the Boykov–Kolmogorov solver; labels sweep
//! in ascending id order until a full sweep changes nothing, which makes
//! tie-breaking deterministic.

use crate::error::{Error, Result};
use crate::plane_detector::PlanesWithPoints;
use roofline_core::{HeightField, Plane};
use roofline_geometry::arrangement::Arrangement;
use roofline_geometry::{BkGraph, CutSide};
use rustc_hash::FxHashMap;
use std::time::Instant;
use tracing::debug;

/// Optimiser parameters, derived from the reconstruction config
#[derive(Debug, Clone)]
pub struct OptimiserConfig {
    pub data_multiplier: f64,
    pub smoothness_multiplier: f64,
    /// Offer ground planes as labels
    pub use_ground: bool,
    /// Drop ground-labelled faces out of the footprint
    pub label_ground_outside_fp: bool,
    /// Scale data costs and edge weights by their maxima before the cut
    pub do_normalise: bool,
}

const MAX_SWEEPS: usize = 8;

/// Label every in-footprint face with a roof (or ground) plane
pub fn optimise(
    arr: &mut Arrangement,
    field: &HeightField,
    roof_planes: &PlanesWithPoints,
    ground_planes: &PlanesWithPoints,
    cfg: &OptimiserConfig,
    deadline: Option<Instant>,
) -> Result<()> {
    // label set: roof planes then ground planes, ids ascending
    let mut labels: Vec<(Plane, bool)> = roof_planes
        .values()
        .map(|(p, _)| (*p, false))
        .collect();
    if cfg.use_ground {
        labels.extend(ground_planes.values().map(|(p, _)| (*p, true)));
    }

    let faces: Vec<u32> = (0..arr.faces.len() as u32)
        .filter(|&f| arr.faces[f as usize].data.in_footprint)
        .collect();
    if labels.is_empty() || faces.is_empty() {
        return Ok(());
    }
    let face_index: FxHashMap<u32, usize> =
        faces.iter().enumerate().map(|(i, &f)| (f, i)).collect();

    // data term: volume between raster and candidate plane per face
    let cell_area = field.cell_area();
    let mut data = vec![vec![0.0f64; labels.len()]; faces.len()];
    let mut max_cost = 0.0f64;
    for (fi, &f) in faces.iter().enumerate() {
        let (outer, inners) = arr.face_polygon_f64(f);
        let cells = field.rasterise_polygon(&outer, &inners, false);
        for (li, (plane, _)) in labels.iter().enumerate() {
            let mut volume = 0.0;
            for &(x, y, z) in &cells {
                volume += (z as f64 - plane.z_at(x, y)).abs();
            }
            let cost = cfg.data_multiplier * cell_area * volume;
            data[fi][li] = cost;
            max_cost = max_cost.max(cost);
        }
    }
    if cfg.do_normalise && max_cost > 0.0 {
        for row in &mut data {
            for c in row.iter_mut() {
                *c /= max_cost;
            }
        }
    }

    // smoothness term: shared-edge lengths between in-footprint faces
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    let mut max_weight = 0.0f64;
    let edge_ids: Vec<u32> = arr.edges().collect();
    for &h in &edge_ids {
        let (fa, fb) = arr.edge_faces(h);
        if fa == fb {
            continue;
        }
        let (Some(&ia), Some(&ib)) = (face_index.get(&fa), face_index.get(&fb)) else {
            continue;
        };
        let w = cfg.smoothness_multiplier * arr.edge_length_f64(h);
        let twin = arr.half_edges[h as usize].twin;
        arr.half_edges[h as usize].weight = w;
        arr.half_edges[twin as usize].weight = w;
        pairs.push((ia, ib, w));
        max_weight = max_weight.max(w);
    }
    if cfg.do_normalise && max_weight > 0.0 {
        for p in &mut pairs {
            p.2 /= max_weight;
        }
    }

    debug!(
        faces = faces.len(),
        labels = labels.len(),
        edges = pairs.len(),
        "expanding labels"
    );

    // alpha-expansion sweeps
    let mut label_of = vec![0usize; faces.len()];
    for _sweep in 0..MAX_SWEEPS {
        let mut changed = false;
        for alpha in 0..labels.len() {
            if let Some(d) = deadline {
                if Instant::now() > d {
                    return Err(Error::BudgetExceeded("graph-cut optimisation"));
                }
            }
            if expand(alpha, &mut label_of, &data, &pairs) {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // write the winning plane onto each face
    for (fi, &f) in faces.iter().enumerate() {
        let li = label_of[fi];
        let (plane, is_ground) = labels[li];
        let d = &mut arr.faces[f as usize].data;
        d.label = li as u32;
        d.plane = Some(plane);
        if is_ground && cfg.label_ground_outside_fp {
            d.in_footprint = false;
            d.is_ground = true;
        }
    }
    Ok(())
}

/// One expansion move; true when any face switched to `alpha`
fn expand(
    alpha: usize,
    label_of: &mut [usize],
    data: &[Vec<f64>],
    pairs: &[(usize, usize, f64)],
) -> bool {
    let n = label_of.len();
    let mut g = BkGraph::new(n);

    // source side keeps the current label, sink side takes alpha
    for i in 0..n {
        g.add_terminal(i as u32, data[i][alpha], data[i][label_of[i]]);
    }
    for &(i, j, w) in pairs {
        if w <= 0.0 {
            continue;
        }
        let (li, lj) = (label_of[i], label_of[j]);
        if li == lj {
            if li != alpha {
                g.add_edge(i as u32, j as u32, w, w);
            }
        } else if li == alpha {
            g.add_terminal(j as u32, 0.0, w);
        } else if lj == alpha {
            g.add_terminal(i as u32, 0.0, w);
        } else {
            let aux = g.add_node();
            g.add_edge(i as u32, aux, w, w);
            g.add_edge(aux, j as u32, w, w);
            g.add_terminal(aux, 0.0, w);
        }
    }

    g.max_flow();

    let mut changed = false;
    for (i, l) in label_of.iter_mut().enumerate() {
        if g.cut_side(i as u32) == CutSide::Sink && *l != alpha {
            *l = alpha;
            changed = true;
        }
    }
    changed
}
