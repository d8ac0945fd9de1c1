// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Roofline Core
//!
//! Data model shared by the building-reconstruction pipeline:
//!
//! - **Points**: f32 point sets in anchor-relative local coordinates
//! - **Rings**: closed 3D polygons with holes and orientation helpers
//! - **Planes**: detected roof/ground planes in Hessian form
//! - **Meshes**: semantic boundary surfaces and multi-part solids
//! - **Rasters**: max-z height fields sampled from roof triangles
//! - **Configuration**: the reconstruction parameter set
//! - **Attributes**: the per-building result row

pub mod attributes;
pub mod config;
pub mod error;
pub mod mesh;
pub mod plane;
pub mod point;
pub mod raster;
pub mod ring;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use attributes::{BuildingAttributes, ExtrusionMode, ReconstructStatus, RoofType};
pub use config::ReconstructionConfig;
pub use error::{Error, Result};
pub use mesh::{LodSolids, MultiSolid, SemanticMesh, SurfaceType};
pub use plane::{Plane, UNSEGMENTED};
pub use point::{classification, DataAnchor, PointSet3};
pub use raster::{HeightField, NODATA};
pub use ring::LinearRing;
