// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Height rasters: max-z grids sampled from triangulated roof surfaces

use crate::error::{Error, Result};

/// Nodata sentinel stored in raster cells
pub const NODATA: f32 = -9999.0;

/// A row-major max-z raster. Row 0 lies at `min_y`; cell (col, row) covers
/// `[min_x + col·cs, min_x + (col+1)·cs) × [min_y + row·cs, min_y + (row+1)·cs)`.
#[derive(Debug, Clone)]
pub struct HeightField {
    cellsize: f64,
    min_x: f64,
    min_y: f64,
    dim_x: usize,
    dim_y: usize,
    vals: Vec<f32>,
}

impl HeightField {
    /// Allocate a nodata-filled raster covering the given extent
    pub fn new(cellsize: f64, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Result<Self> {
        if cellsize <= 0.0 || max_x <= min_x || max_y <= min_y {
            return Err(Error::InvalidRaster(format!(
                "degenerate extent [{min_x}, {max_x}] x [{min_y}, {max_y}] at cellsize {cellsize}"
            )));
        }
        let dim_x = ((max_x - min_x) / cellsize).ceil() as usize + 1;
        let dim_y = ((max_y - min_y) / cellsize).ceil() as usize + 1;
        Ok(Self {
            cellsize,
            min_x,
            min_y,
            dim_x,
            dim_y,
            vals: vec![NODATA; dim_x * dim_y],
        })
    }

    /// Cell size in metres
    #[inline]
    pub fn cellsize(&self) -> f64 {
        self.cellsize
    }

    /// Area covered by one cell
    #[inline]
    pub fn cell_area(&self) -> f64 {
        self.cellsize * self.cellsize
    }

    /// Raster dimensions (columns, rows)
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.dim_x, self.dim_y)
    }

    /// Total number of cells
    #[inline]
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    /// Check if the raster holds no cells
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    /// Column index for an x coordinate; None when outside
    #[inline]
    pub fn col(&self, x: f64) -> Option<usize> {
        let c = ((x - self.min_x) / self.cellsize).floor();
        (c >= 0.0 && (c as usize) < self.dim_x).then(|| c as usize)
    }

    /// Row index for a y coordinate; None when outside
    #[inline]
    pub fn row(&self, y: f64) -> Option<usize> {
        let r = ((y - self.min_y) / self.cellsize).floor();
        (r >= 0.0 && (r as usize) < self.dim_y).then(|| r as usize)
    }

    /// Centre coordinates of a cell
    #[inline]
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.min_x + (col as f64 + 0.5) * self.cellsize,
            self.min_y + (row as f64 + 0.5) * self.cellsize,
        )
    }

    #[inline]
    fn idx(&self, col: usize, row: usize) -> usize {
        row * self.dim_x + col
    }

    /// Value of a cell
    #[inline]
    pub fn get(&self, col: usize, row: usize) -> f32 {
        self.vals[self.idx(col, row)]
    }

    /// Nodata test for a cell
    #[inline]
    pub fn is_nodata(&self, col: usize, row: usize) -> bool {
        self.vals[self.idx(col, row)] == NODATA
    }

    /// Overwrite a cell unconditionally
    #[inline]
    pub fn set(&mut self, col: usize, row: usize, val: f32) {
        let i = self.idx(col, row);
        self.vals[i] = val;
    }

    /// Keep the maximum of the current and the new value
    #[inline]
    pub fn set_max(&mut self, col: usize, row: usize, val: f32) {
        let i = self.idx(col, row);
        if self.vals[i] == NODATA || val > self.vals[i] {
            self.vals[i] = val;
        }
    }

    /// Write only where the cell is still nodata (ground burn-in rule:
    /// ground samples may never lower a roof cell)
    #[inline]
    pub fn set_if_nodata(&mut self, col: usize, row: usize, val: f32) {
        let i = self.idx(col, row);
        if self.vals[i] == NODATA {
            self.vals[i] = val;
        }
    }

    /// Sample the raster at a world coordinate
    pub fn sample(&self, x: f64, y: f64) -> Option<f32> {
        let (c, r) = (self.col(x)?, self.row(y)?);
        let v = self.get(c, r);
        (v != NODATA).then_some(v)
    }

    /// Fill nodata cells with the maximum value found inside a square
    /// window of the given radius (in cells). Cells with no valid
    /// neighbour stay nodata.
    pub fn fill_nodata(&mut self, radius: usize) {
        let mut filled = self.vals.clone();
        for row in 0..self.dim_y {
            for col in 0..self.dim_x {
                if !self.is_nodata(col, row) {
                    continue;
                }
                let mut best = NODATA;
                let r0 = row.saturating_sub(radius);
                let r1 = (row + radius).min(self.dim_y - 1);
                let c0 = col.saturating_sub(radius);
                let c1 = (col + radius).min(self.dim_x - 1);
                for r in r0..=r1 {
                    for c in c0..=c1 {
                        let v = self.get(c, r);
                        if v != NODATA && (best == NODATA || v > best) {
                            best = v;
                        }
                    }
                }
                filled[self.idx(col, row)] = best;
            }
        }
        self.vals = filled;
    }

    /// Collect the centre point and value of every cell covered by a
    /// polygon (scanline parity fill over exterior and hole loops).
    /// When `include_nodata` is false, nodata cells are skipped.
    ///
    /// Returns `(x, y, z)` triples; z is `NODATA` for empty cells when
    /// they are included.
    pub fn rasterise_polygon(
        &self,
        outer: &[(f64, f64)],
        holes: &[Vec<(f64, f64)>],
        include_nodata: bool,
    ) -> Vec<(f64, f64, f32)> {
        let mut out = Vec::new();
        if outer.len() < 3 {
            return out;
        }
        let (mut min_y, mut max_y) = (f64::MAX, f64::MIN);
        for &(_, y) in outer {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        let row0 = self.row(min_y.max(self.min_y)).unwrap_or(0);
        let row1 = self
            .row(max_y.min(self.min_y + self.cellsize * self.dim_y as f64 - 1e-9))
            .unwrap_or(self.dim_y - 1);

        let mut crossings: Vec<f64> = Vec::new();
        for row in row0..=row1 {
            let yc = self.min_y + (row as f64 + 0.5) * self.cellsize;
            crossings.clear();
            for ring in std::iter::once(outer).chain(holes.iter().map(|h| h.as_slice())) {
                let n = ring.len();
                let mut j = n - 1;
                for i in 0..n {
                    let (xi, yi) = ring[i];
                    let (xj, yj) = ring[j];
                    if (yi > yc) != (yj > yc) {
                        crossings.push(xi + (yc - yi) / (yj - yi) * (xj - xi));
                    }
                    j = i;
                }
            }
            crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            for pair in crossings.chunks_exact(2) {
                let (x_enter, x_exit) = (pair[0], pair[1]);
                let c0 = match self.col(x_enter.max(self.min_x)) {
                    Some(c) => c,
                    None => continue,
                };
                let c1 = self
                    .col(x_exit)
                    .unwrap_or(self.dim_x - 1)
                    .min(self.dim_x - 1);
                for col in c0..=c1 {
                    let (xc, yc2) = self.cell_center(col, row);
                    if xc < x_enter || xc > x_exit {
                        continue;
                    }
                    let v = self.get(col, row);
                    if v != NODATA || include_nodata {
                        out.push((xc, yc2, v));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addressing() {
        let r = HeightField::new(0.5, 0.0, 10.0, 0.0, 5.0).unwrap();
        let (dx, dy) = r.dims();
        assert!(dx >= 20 && dy >= 10);
        assert_eq!(r.col(0.1), Some(0));
        assert_eq!(r.row(4.9), Some(9));
        assert_eq!(r.col(-0.1), None);
    }

    #[test]
    fn test_max_discipline() {
        let mut r = HeightField::new(1.0, 0.0, 4.0, 0.0, 4.0).unwrap();
        r.set_max(1, 1, 3.0);
        r.set_max(1, 1, 2.0);
        assert_eq!(r.get(1, 1), 3.0);
        r.set_if_nodata(1, 1, 9.0);
        assert_eq!(r.get(1, 1), 3.0);
        r.set_if_nodata(2, 2, 9.0);
        assert_eq!(r.get(2, 2), 9.0);
    }

    #[test]
    fn test_fill_nodata_window() {
        let mut r = HeightField::new(1.0, 0.0, 5.0, 0.0, 5.0).unwrap();
        r.set(0, 0, 4.0);
        r.fill_nodata(1);
        assert_eq!(r.get(1, 1), 4.0);
        assert!(r.is_nodata(4, 4));
    }

    #[test]
    fn test_rasterise_polygon_with_hole() {
        let mut r = HeightField::new(1.0, 0.0, 10.0, 0.0, 10.0).unwrap();
        for row in 0..10 {
            for col in 0..10 {
                r.set(col, row, 1.0);
            }
        }
        let outer = vec![(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0)];
        let hole = vec![(2.0, 2.0), (2.0, 6.0), (6.0, 6.0), (6.0, 2.0)];
        let cells = r.rasterise_polygon(&outer, &[hole], false);
        // 8x8 minus the 4x4 hole
        assert_eq!(cells.len(), 64 - 16);
        assert!(!cells.iter().any(|&(x, y, _)| x > 2.0 && x < 6.0 && y > 2.0 && y < 6.0));
    }
}
