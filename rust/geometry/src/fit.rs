// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Least-squares plane and line fitting via covariance eigenanalysis

use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};

/// A least-squares plane through a point cloud
#[derive(Debug, Clone, Copy)]
pub struct FittedPlane {
    /// Unit normal (smallest covariance eigenvector)
    pub normal: Vector3<f64>,
    /// Centroid of the fitted points
    pub centroid: Point3<f64>,
    /// Smallest eigenvalue over the trace; 0 for perfectly planar sets
    pub planarity_residual: f64,
}

/// A least-squares line through a point cloud
#[derive(Debug, Clone, Copy)]
pub struct FittedLine {
    /// Unit direction (largest covariance eigenvector)
    pub direction: Vector3<f64>,
    /// Centroid of the fitted points
    pub centroid: Point3<f64>,
}

impl FittedLine {
    /// Distance from a point to the line
    #[inline]
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        let v = p - self.centroid;
        (v - self.direction * v.dot(&self.direction)).norm()
    }

    /// Scalar position of a point projected onto the line
    #[inline]
    pub fn parameter(&self, p: &Point3<f64>) -> f64 {
        (p - self.centroid).dot(&self.direction)
    }

    /// Point at a scalar position along the line
    #[inline]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.centroid + self.direction * t
    }
}

fn covariance(points: &[Point3<f64>]) -> Option<(Point3<f64>, Matrix3<f64>)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mut c = Vector3::zeros();
    for p in points {
        c += p.coords;
    }
    c /= n;
    let centroid = Point3::from(c);

    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p - centroid;
        cov += d * d.transpose();
    }
    cov /= n;
    Some((centroid, cov))
}

/// Fit a plane to at least three points. Returns None for fewer points or
/// collinear sets (zero normal).
pub fn fit_plane(points: &[Point3<f64>]) -> Option<FittedPlane> {
    if points.len() < 3 {
        return None;
    }
    let (centroid, cov) = covariance(points)?;
    let eigen = SymmetricEigen::new(cov);

    let mut min_i = 0;
    for i in 1..3 {
        if eigen.eigenvalues[i] < eigen.eigenvalues[min_i] {
            min_i = i;
        }
    }
    let normal = eigen.eigenvectors.column(min_i).into_owned();
    let norm = normal.norm();
    if norm < 1e-12 {
        return None;
    }
    let trace = eigen.eigenvalues.iter().sum::<f64>().max(1e-300);
    Some(FittedPlane {
        normal: normal / norm,
        centroid,
        planarity_residual: eigen.eigenvalues[min_i].max(0.0) / trace,
    })
}

/// Fit a line to at least two points. Returns None for coincident sets.
pub fn fit_line(points: &[Point3<f64>]) -> Option<FittedLine> {
    let (centroid, cov) = covariance(points)?;
    let eigen = SymmetricEigen::new(cov);

    let mut max_i = 0;
    for i in 1..3 {
        if eigen.eigenvalues[i] > eigen.eigenvalues[max_i] {
            max_i = i;
        }
    }
    if eigen.eigenvalues[max_i] < 1e-18 {
        return None;
    }
    let direction = eigen.eigenvectors.column(max_i).into_owned();
    Some(FittedLine {
        direction: direction / direction.norm(),
        centroid,
    })
}
