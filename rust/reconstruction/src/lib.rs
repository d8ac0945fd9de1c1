// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Roofline Reconstruction
//!
//! Reconstructs watertight building solids at LoD 1.2, 1.3 and 2.2 from a
//! classified airborne LiDAR point cloud and a 2D footprint polygon.
//!
//! ## Pipeline
//!
//! | Stage | Responsibility |
//! |-------|----------------|
//! | [`plane_detector`] | Segment roof/ground points into planar regions |
//! | [`alpha_shaper`] | 2.5D concave hull per plane |
//! | [`line_detector`] | Fit boundary segments along alpha rings |
//! | [`plane_intersector`] | Ridge/valley lines between adjacent planes |
//! | [`line_regulariser`] | Cluster and snap lines by angle and distance |
//! | [`segment_rasteriser`] | Burn alpha triangles into a height raster |
//! | [`arrangement_builder`] | Exact planar subdivision inside the footprint |
//! | [`arrangement_optimiser`] | α-expansion face-to-plane labelling |
//! | [`arrangement_dissolver`] | LoD generalisation by face merging |
//! | [`arrangement_snapper`] | Sub-tolerance vertex snapping |
//! | [`arrangement_extruder`] | Lift to 3D solids with surface semantics |
//! | [`mesh_triangulator`] | Triangulation, RMSE, volume, validity |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use roofline_reconstruction::{reconstruct, FloorSource};
//! use roofline_core::{LinearRing, PointSet3, ReconstructionConfig};
//!
//! let result = reconstruct(
//!     &points_roof,
//!     &points_ground,          // may be empty
//!     &footprint,              // CCW outer ring, CW holes
//!     FloorSource::Constant(0.0),
//!     &ReconstructionConfig::default(),
//! )?;
//! println!("LoD 2.2 volume: {:?}", result.attributes.volume_lod22);
//! ```
//!
//! Reconstruction of a single building is sequential; buildings are
//! independent, so callers parallelise at building granularity. With a
//! fixed seed the result is deterministic.

pub mod alpha_shaper;
pub mod arrangement_builder;
pub mod arrangement_dissolver;
pub mod arrangement_extruder;
pub mod arrangement_optimiser;
pub mod arrangement_snapper;
pub mod elevation;
pub mod error;
pub mod line_detector;
pub mod line_regulariser;
pub mod mesh_triangulator;
pub mod pipeline;
pub mod plane_detector;
pub mod plane_intersector;
pub mod prism_extruder;
pub mod segment_rasteriser;
pub mod segments;

pub use elevation::{ConstantElevation, FloorElevation, FloorSource, TinElevation};
pub use error::{Error, Result};
pub use pipeline::{reconstruct, ReconstructResult};

// Re-export the data model for callers
pub use roofline_core::{
    BuildingAttributes, ExtrusionMode, LinearRing, LodSolids, MultiSolid, PointSet3,
    ReconstructStatus, ReconstructionConfig, RoofType, SemanticMesh, SurfaceType,
};
