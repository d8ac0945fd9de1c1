// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rasterisation of alpha triangles into a max-z height field
//!
//! Roof triangles are scan-converted first with a max-z write per covered
//! cell. Ground triangles may only fill cells that are still empty, so
//! terrain never lowers a roof. Remaining gaps are closed by a square
//! moving-max window.

use crate::error::{Error, Result};
use nalgebra::Point3;
use roofline_core::{HeightField, ReconstructionConfig};

/// Burn roof and ground triangles into a fresh height field
pub fn rasterise(
    roof_triangles: &[[Point3<f64>; 3]],
    ground_triangles: &[[Point3<f64>; 3]],
    cfg: &ReconstructionConfig,
) -> Result<HeightField> {
    if roof_triangles.is_empty() {
        return Err(Error::InsufficientData(
            "no alpha triangles to rasterise".into(),
        ));
    }

    let mut bb = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for t in roof_triangles.iter().chain(ground_triangles) {
        for p in t {
            bb.0 = bb.0.min(p.x);
            bb.1 = bb.1.min(p.y);
            bb.2 = bb.2.max(p.x);
            bb.3 = bb.3.max(p.y);
        }
    }

    let mut cellsize = cfg.cellsize as f64;
    let pad = cellsize;
    let (w, h) = (bb.2 - bb.0 + 2.0 * pad, bb.3 - bb.1 + 2.0 * pad);
    // coarsen when the extent would blow past the megapixel cap
    let cells = (w / cellsize) * (h / cellsize);
    let cap = (cfg.megapixel_limit as f64) * 1.0e6;
    if cells > cap {
        cellsize *= (cells / cap).sqrt();
    }

    let mut field = HeightField::new(cellsize, bb.0 - pad, bb.2 + pad, bb.1 - pad, bb.3 + pad)?;

    for t in roof_triangles {
        burn_triangle(&mut field, t, false);
    }
    for t in ground_triangles {
        burn_triangle(&mut field, t, true);
    }
    if cfg.fill_nodata_window > 0 {
        field.fill_nodata(cfg.fill_nodata_window);
    }
    Ok(field)
}

/// Scan-convert one triangle; `only_empty` enforces the ground rule
fn burn_triangle(field: &mut HeightField, t: &[Point3<f64>; 3], only_empty: bool) {
    let min_x = t[0].x.min(t[1].x).min(t[2].x);
    let max_x = t[0].x.max(t[1].x).max(t[2].x);
    let min_y = t[0].y.min(t[1].y).min(t[2].y);
    let max_y = t[0].y.max(t[1].y).max(t[2].y);

    let (dim_x, dim_y) = field.dims();
    let c0 = field.col(min_x).unwrap_or(0);
    let c1 = field.col(max_x).unwrap_or(dim_x - 1).min(dim_x - 1);
    let r0 = field.row(min_y).unwrap_or(0);
    let r1 = field.row(max_y).unwrap_or(dim_y - 1).min(dim_y - 1);

    let det = (t[1].y - t[2].y) * (t[0].x - t[2].x) + (t[2].x - t[1].x) * (t[0].y - t[2].y);
    if det.abs() < 1e-30 {
        return;
    }

    for row in r0..=r1 {
        for col in c0..=c1 {
            let (x, y) = field.cell_center(col, row);
            let w0 = ((t[1].y - t[2].y) * (x - t[2].x) + (t[2].x - t[1].x) * (y - t[2].y)) / det;
            let w1 = ((t[2].y - t[0].y) * (x - t[2].x) + (t[0].x - t[2].x) * (y - t[2].y)) / det;
            let w2 = 1.0 - w0 - w1;
            let eps = -1e-9;
            if w0 < eps || w1 < eps || w2 < eps {
                continue;
            }
            let z = (w0 * t[0].z + w1 * t[1].z + w2 * t[2].z) as f32;
            if only_empty {
                field.set_if_nodata(col, row, z);
            } else {
                field.set_max(col, row, z);
            }
        }
    }
}
