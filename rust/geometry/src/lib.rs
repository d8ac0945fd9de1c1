// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Roofline Geometry
//!
//! Geometric substrate of the building-reconstruction pipeline:
//!
//! - **Fitting**: least-squares planes and lines via covariance
//!   eigenanalysis
//! - **Neighbours**: kNN graphs over an R*-tree
//! - **Delaunay**: triangulation with circumradii and TIN interpolation
//! - **Exact kernel**: arbitrary-precision rational predicates and
//!   constructions
//! - **Arrangement**: the planar subdivision (DCEL) built from footprint
//!   and regularised edges
//! - **Max-flow**: the Boykov–Kolmogorov solver backing the multi-label
//!   α-expansion
//! - **Triangulation**: polygon-with-holes triangulation in a best-fit
//!   plane via [earcutr](https://docs.rs/earcutr)

pub mod arrangement;
pub mod delaunay;
pub mod error;
pub mod exact;
pub mod fit;
pub mod maxflow;
pub mod neighbours;
pub mod triangulate;

pub use arrangement::{Arrangement, SegmentInput};
pub use delaunay::Triangulation2;
pub use error::{Error, Result};
pub use exact::{ExactPoint2, Rational};
pub use fit::{fit_line, fit_plane, FittedLine, FittedPlane};
pub use maxflow::{BkGraph, CutSide};
pub use neighbours::KnnGraph;
pub use triangulate::{polygon_normal, triangulate_ring};
