// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-building reconstruction pipeline
//!
//! Chains the stages of the reconstruction: plane detection, alpha shapes,
//! line detection and regularisation, rasterisation, exact arrangement
//! construction, graph-cut labelling, and one dissolve/snap/extrude pass
//! per requested LoD on a clone of the optimised arrangement. Budget
//! overruns downgrade the building to a prism; insufficient point clouds
//! skip it.

use crate::alpha_shaper;
use crate::arrangement_builder;
use crate::arrangement_dissolver::{self, DissolverConfig};
use crate::arrangement_extruder::{self, ExtruderConfig};
use crate::arrangement_optimiser::{self, OptimiserConfig};
use crate::arrangement_snapper;
use crate::elevation::{ConstantElevation, FloorElevation, FloorSource, TinElevation};
use crate::error::{Error, Result};
use crate::line_detector;
use crate::line_regulariser;
use crate::mesh_triangulator::{self, TriangulatedSolid};
use crate::plane_detector;
use crate::plane_intersector;
use crate::prism_extruder;
use crate::segment_rasteriser;
use nalgebra::Point3;
use roofline_core::{
    BuildingAttributes, ExtrusionMode, LinearRing, LodSolids, MultiSolid, PointSet3,
    ReconstructStatus, ReconstructionConfig, RoofType,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one reconstruction call
#[derive(Debug, Clone)]
pub struct ReconstructResult {
    pub lods: LodSolids,
    pub attributes: BuildingAttributes,
    pub status: ReconstructStatus,
}

/// Floor elevation provider resolved from the caller's request
enum Provider {
    Constant(ConstantElevation),
    Tin(TinElevation),
}

impl FloorElevation for Provider {
    fn elevation_at(&self, x: f64, y: f64) -> f32 {
        match self {
            Provider::Constant(c) => c.elevation_at(x, y),
            Provider::Tin(t) => t.elevation_at(x, y),
        }
    }

    fn percentile(&self, p: f64) -> f32 {
        match self {
            Provider::Constant(c) => c.percentile(p),
            Provider::Tin(t) => t.percentile(p),
        }
    }
}

/// Reconstruct one building at LoD 1.2, 1.3 and 2.2.
///
/// The point sets and footprint are borrowed; everything the pipeline
/// allocates is dropped when the call returns.
pub fn reconstruct(
    points_roof: &PointSet3,
    points_ground: &PointSet3,
    footprint: &LinearRing,
    floor_source: FloorSource,
    config: &ReconstructionConfig,
) -> Result<ReconstructResult> {
    config.validate()?;
    validate_footprint(footprint)?;

    let mut fp = footprint.clone();
    fp.ensure_ccw();

    let provider = resolve_floor(&fp, floor_source, config);

    let mut attributes = BuildingAttributes::default();

    // roof plane detection
    let roof = plane_detector::detect(points_roof, config);
    attributes.roof_type = roof.roof_type;
    attributes.roof_elevation_min = roof.elevation_min;
    attributes.roof_elevation_max = roof.elevation_max;
    attributes.roof_elevation_50p = roof.elevation_50p;
    attributes.roof_elevation_70p = roof.elevation_70p;
    info!(roof_type = %roof.roof_type, planes = roof.planes.len(), "plane detection complete");

    if roof.roof_type == RoofType::NoPoints {
        return Ok(skipped(attributes, ReconstructStatus::Skipped));
    }
    if roof.roof_type == RoofType::NoPlanes {
        return Ok(skipped(attributes, ReconstructStatus::Insufficient));
    }

    // caller-requested prism-only output
    if config.skip {
        let h_floor = provider.percentile(0.5);
        let h_roof = roof
            .elevation_70p
            .unwrap_or(h_floor + config.nodata_elevation);
        let prism = prism_extruder::extrude_prism(&fp, h_floor, h_roof);
        let roof_pts = all_inliers(&roof.planes);
        let mut result = ReconstructResult {
            lods: LodSolids::default(),
            attributes,
            status: ReconstructStatus::Skipped,
        };
        fill_all_lods(&mut result, &prism, &roof_pts)?;
        result.attributes.extrusion_mode = ExtrusionMode::Skip;
        return Ok(result);
    }

    // ground plane detection feeds clipping and the height raster
    let use_ground = config.clip_ground && !points_ground.is_empty();
    let ground = if points_ground.is_empty() {
        plane_detector::DetectedPlanes::default()
    } else {
        plane_detector::detect(points_ground, config)
    };

    // alpha shapes
    let roof_shapes = alpha_shaper::compute(&roof.planes, config);
    if roof_shapes.is_empty() {
        debug!("no alpha rings; pointcloud insufficient");
        return Ok(skipped(attributes, ReconstructStatus::Insufficient));
    }
    let ground_shapes = alpha_shaper::compute(&ground.planes, config);

    // boundary and intersection lines
    let mut segments = line_detector::detect(&roof_shapes.rings, config);
    let intersections = plane_intersector::compute(&roof.planes, &roof.adjacency, config);
    let (ridge_count, ridge_high) = plane_intersector::highest_ridgeline(&intersections);
    attributes.ridgeline_count = ridge_count;
    attributes.highest_ridge_elevation = ridge_high;
    segments.extend(intersections);
    debug!(segments = segments.len(), "line detection complete");

    // regularise, then extend for insertion
    let regularised = line_regulariser::regularise(&segments, config);
    let exact_edges =
        line_regulariser::extend_exact(&regularised, config.thres_reg_line_ext as f64);

    // height raster
    let ground_tris = if use_ground {
        ground_shapes.triangles.as_slice()
    } else {
        &[]
    };
    let field = segment_rasteriser::rasterise(&roof_shapes.triangles, ground_tris, config)?;

    let deadline = (config.max_time_ms > 0)
        .then(|| Instant::now() + Duration::from_millis(config.max_time_ms as u64));

    let roof_pts = all_inliers(&roof.planes);

    // exact arrangement
    let mut arr = match arrangement_builder::build(
        &fp,
        &exact_edges,
        config.max_arr_complexity,
        deadline,
    ) {
        Ok(arr) => arr,
        Err(Error::BudgetExceeded(stage)) => {
            warn!(stage, "budget exceeded; falling back to prism");
            return fallback(&fp, &provider, &roof_pts, attributes, config);
        }
        Err(e) => return Err(e),
    };
    info!(faces = arr.num_bounded_faces(), "arrangement built");

    // graph-cut labelling
    let opt_cfg = OptimiserConfig {
        data_multiplier: config.lambda as f64,
        smoothness_multiplier: (1.0 - config.lambda) as f64,
        use_ground,
        label_ground_outside_fp: config.clip_ground,
        // normalising both terms by their maxima would cancel lambda
        do_normalise: false,
    };
    match arrangement_optimiser::optimise(
        &mut arr,
        &field,
        &roof.planes,
        &ground.planes,
        &opt_cfg,
        deadline,
    ) {
        Ok(()) => {}
        Err(Error::BudgetExceeded(stage)) => {
            warn!(stage, "budget exceeded; falling back to prism");
            return fallback(&fp, &provider, &roof_pts, attributes, config);
        }
        Err(e) => return Err(e),
    }

    // one dissolve/snap/extrude chain per LoD, each on its own clone
    let mut result = ReconstructResult {
        lods: LodSolids::default(),
        attributes,
        status: ReconstructStatus::Ok,
    };
    for lod in [12u8, 13, 22] {
        let dissolved = arrangement_dissolver::dissolve(
            &arr,
            &field,
            &DissolverConfig::for_lod(lod, config.lod13_step_height),
        )?;
        let snapped = arrangement_snapper::snap(&dissolved, config.snap_dist)?;
        let (solid, _) = arrangement_extruder::extrude(
            &snapped,
            &provider,
            &ExtruderConfig {
                lod2: lod == 22,
                nodata_elevation: config.nodata_elevation,
            },
        );
        let metrics = solid_metrics(&solid, &roof_pts)?;
        store_lod(&mut result, lod, solid, metrics);
        info!(lod, "extrusion complete");
    }
    result.attributes.extrusion_mode = ExtrusionMode::Standard;

    Ok(result)
}

fn validate_footprint(fp: &LinearRing) -> Result<()> {
    if fp.len() < 3 {
        return Err(Error::DegenerateInput(
            "footprint has fewer than 3 vertices".into(),
        ));
    }
    if fp.area() <= 1e-6 {
        return Err(Error::DegenerateInput("footprint without area".into()));
    }
    if fp.is_self_intersecting() {
        return Err(Error::DegenerateInput("self-intersecting footprint".into()));
    }
    Ok(())
}

fn resolve_floor(
    fp: &LinearRing,
    source: FloorSource,
    config: &ReconstructionConfig,
) -> Provider {
    if config.override_with_floor_elevation {
        return Provider::Constant(ConstantElevation(config.floor_elevation));
    }
    match source {
        FloorSource::Constant(z) => Provider::Constant(ConstantElevation(z)),
        FloorSource::Interpolated => match TinElevation::from_footprint(fp) {
            Some(tin) => Provider::Tin(tin),
            None => Provider::Constant(ConstantElevation(config.floor_elevation)),
        },
    }
}

fn all_inliers(planes: &plane_detector::PlanesWithPoints) -> Vec<Point3<f64>> {
    planes
        .values()
        .flat_map(|(_, pts)| pts.iter().copied())
        .collect()
}

fn skipped(attributes: BuildingAttributes, status: ReconstructStatus) -> ReconstructResult {
    ReconstructResult {
        lods: LodSolids::default(),
        attributes,
        status,
    }
}

/// Prism fallback after a blown budget
fn fallback(
    fp: &LinearRing,
    provider: &Provider,
    roof_pts: &[Point3<f64>],
    attributes: BuildingAttributes,
    config: &ReconstructionConfig,
) -> Result<ReconstructResult> {
    let h_floor = provider.percentile(0.5);
    let h_roof = attributes
        .roof_elevation_70p
        .unwrap_or(h_floor + config.nodata_elevation);
    let prism = prism_extruder::extrude_prism(fp, h_floor, h_roof);
    let mut result = ReconstructResult {
        lods: LodSolids::default(),
        attributes,
        status: ReconstructStatus::Fallback,
    };
    fill_all_lods(&mut result, &prism, roof_pts)?;
    result.attributes.extrusion_mode = ExtrusionMode::Lod11Fallback;
    Ok(result)
}

struct LodMetrics {
    rmse: Option<f32>,
    volume: f32,
    validity: String,
}

fn solid_metrics(solid: &MultiSolid, roof_pts: &[Point3<f64>]) -> Result<LodMetrics> {
    let ts: TriangulatedSolid = mesh_triangulator::triangulate_solid(solid)?;
    Ok(LodMetrics {
        rmse: mesh_triangulator::rmse_to_roof(&ts, roof_pts),
        volume: mesh_triangulator::volume(&ts) as f32,
        validity: mesh_triangulator::validity(&ts),
    })
}

fn store_lod(result: &mut ReconstructResult, lod: u8, solid: MultiSolid, m: LodMetrics) {
    match lod {
        12 => {
            result.attributes.rmse_lod12 = m.rmse;
            result.attributes.volume_lod12 = Some(m.volume);
            result.attributes.validity_lod12 = Some(m.validity);
            result.lods.lod12 = solid;
        }
        13 => {
            result.attributes.rmse_lod13 = m.rmse;
            result.attributes.volume_lod13 = Some(m.volume);
            result.attributes.validity_lod13 = Some(m.validity);
            result.lods.lod13 = solid;
        }
        _ => {
            result.attributes.rmse_lod22 = m.rmse;
            result.attributes.volume_lod22 = Some(m.volume);
            result.attributes.validity_lod22 = Some(m.validity);
            result.lods.lod22 = solid;
        }
    }
}

fn fill_all_lods(
    result: &mut ReconstructResult,
    prism: &MultiSolid,
    roof_pts: &[Point3<f64>],
) -> Result<()> {
    for lod in [12u8, 13, 22] {
        let metrics = solid_metrics(prism, roof_pts)?;
        store_lod(result, lod, prism.clone(), metrics);
    }
    Ok(())
}
