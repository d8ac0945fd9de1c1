// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point sets and the double-precision data anchor

use nalgebra::Point3;

/// Double-precision offset between local coordinates and the source CRS.
/// All geometry is stored in local f32 coordinates relative to this anchor;
/// the anchor itself is only applied when exchanging data with the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DataAnchor {
    /// X offset (subtracted from all X coordinates)
    pub x: f64,
    /// Y offset (subtracted from all Y coordinates)
    pub y: f64,
    /// Z offset (subtracted from all Z coordinates)
    pub z: f64,
}

impl DataAnchor {
    /// Create a new anchor
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Localise a source-CRS coordinate: subtract the anchor in f64
    /// BEFORE converting to f32, preserving sub-millimetre precision for
    /// georeferenced coordinates.
    #[inline]
    pub fn localise(&self, x: f64, y: f64, z: f64) -> Point3<f32> {
        Point3::new(
            (x - self.x) as f32,
            (y - self.y) as f32,
            (z - self.z) as f32,
        )
    }

    /// Restore a local coordinate to the source CRS
    #[inline]
    pub fn globalise(&self, p: &Point3<f32>) -> [f64; 3] {
        [
            p.x as f64 + self.x,
            p.y as f64 + self.y,
            p.z as f64 + self.z,
        ]
    }

    /// Check if the anchor is zero (no shifting needed)
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

/// LiDAR point classification codes used by the reconstruction pipeline
/// (ASPRS standard codes).
pub mod classification {
    /// Ground returns
    pub const GROUND: u8 = 2;
    /// Building returns
    pub const BUILDING: u8 = 6;
}

/// An ordered set of 3D points in local f32 coordinates with an optional
/// per-point classification code.
#[derive(Debug, Clone, Default)]
pub struct PointSet3 {
    positions: Vec<Point3<f32>>,
    classification: Option<Vec<u8>>,
}

impl PointSet3 {
    /// Create a new empty point set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point set with capacity
    pub fn with_capacity(n: usize) -> Self {
        Self {
            positions: Vec::with_capacity(n),
            classification: None,
        }
    }

    /// Build from bare positions
    pub fn from_points(positions: Vec<Point3<f32>>) -> Self {
        Self {
            positions,
            classification: None,
        }
    }

    /// Add an unclassified point
    #[inline]
    pub fn push(&mut self, p: Point3<f32>) {
        self.positions.push(p);
        if let Some(c) = &mut self.classification {
            c.push(0);
        }
    }

    /// Add a classified point
    pub fn push_classified(&mut self, p: Point3<f32>, class: u8) {
        let n = self.positions.len();
        self.positions.push(p);
        self.classification
            .get_or_insert_with(|| vec![0; n])
            .push(class);
    }

    /// Number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Point positions
    #[inline]
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    /// Per-point classification codes, if any were recorded
    #[inline]
    pub fn classification(&self) -> Option<&[u8]> {
        self.classification.as_deref()
    }

    /// Iterate over positions
    pub fn iter(&self) -> impl Iterator<Item = &Point3<f32>> {
        self.positions.iter()
    }

    /// Extract the subset with the given classification code.
    /// Returns an empty set when no classification was recorded.
    pub fn filter_class(&self, class: u8) -> PointSet3 {
        let mut out = PointSet3::new();
        if let Some(codes) = &self.classification {
            for (p, &c) in self.positions.iter().zip(codes) {
                if c == class {
                    out.push(*p);
                }
            }
        }
        out
    }

    /// Axis-aligned bounds, or None for an empty set
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        if self.positions.is_empty() {
            return None;
        }
        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);
        for p in &self.positions {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some((min, max))
    }
}

impl FromIterator<Point3<f32>> for PointSet3 {
    fn from_iter<I: IntoIterator<Item = Point3<f32>>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_roundtrip() {
        let anchor = DataAnchor::new(85000.0, 447000.0, 0.0);
        let local = anchor.localise(85012.123, 447034.567, 12.25);
        let global = anchor.globalise(&local);
        assert!((global[0] - 85012.123).abs() < 1e-3);
        assert!((global[1] - 447034.567).abs() < 1e-3);
        assert!((global[2] - 12.25).abs() < 1e-3);
    }

    #[test]
    fn test_filter_class() {
        let mut set = PointSet3::new();
        set.push_classified(Point3::new(0.0, 0.0, 0.0), classification::GROUND);
        set.push_classified(Point3::new(1.0, 0.0, 3.0), classification::BUILDING);
        set.push_classified(Point3::new(2.0, 0.0, 3.1), classification::BUILDING);

        assert_eq!(set.filter_class(classification::BUILDING).len(), 2);
        assert_eq!(set.filter_class(classification::GROUND).len(), 1);
        assert_eq!(set.filter_class(9).len(), 0);
    }

    #[test]
    fn test_bounds() {
        let set: PointSet3 = vec![
            Point3::new(0.0, 1.0, 2.0),
            Point3::new(-1.0, 5.0, 0.5),
        ]
        .into_iter()
        .collect();
        let (min, max) = set.bounds().unwrap();
        assert_eq!(min, Point3::new(-1.0, 1.0, 0.5));
        assert_eq!(max, Point3::new(0.0, 5.0, 2.0));
    }
}
