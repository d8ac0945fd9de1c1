// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line regularisation: two-stage clustering of detected segments
//!
//! Segments are bucketed by direction on the half-circle, then by signed
//! perpendicular offset within each direction bucket. Every (angle,
//! distance) cluster collapses to one representative line whose support
//! interval is the hull of the members' projections. Plane-intersection
//! segments take precedence over boundary segments when positioning the
//! representative.
//!
//! Regularisation is a fixed point: feeding the output back in reproduces
//! it. The pre-optimisation extension happens in a separate step.

use crate::segments::{Segment3, INTERSECTION_PRIORITY};
use nalgebra::{Point2, Vector2};
use roofline_core::ReconstructionConfig;
use roofline_geometry::ExactPoint2;

/// A regularised 2D line segment (still inexact; made exact after the
/// optional extension step)
#[derive(Debug, Clone, PartialEq)]
pub struct RegularisedLine {
    pub a: Point2<f64>,
    pub b: Point2<f64>,
}

/// Cluster and collapse segments into regularised lines
pub fn regularise(segments: &[Segment3], cfg: &ReconstructionConfig) -> Vec<RegularisedLine> {
    let mut out = Vec::new();
    if segments.is_empty() {
        return out;
    }
    let angle_thres = cfg.thres_reg_line_angle as f64;
    let dist_thres = cfg.thres_reg_line_dist as f64;

    // stage 1: angle clustering on [0, pi)
    let mut order: Vec<usize> = (0..segments.len()).collect();
    order.sort_by(|&i, &j| {
        segments[i]
            .angle_half_circle()
            .partial_cmp(&segments[j].angle_half_circle())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for &i in &order {
        let angle = segments[i].angle_half_circle();
        let fits = clusters.last().map_or(false, |c| {
            let last = segments[*c.last().unwrap_or(&i)].angle_half_circle();
            (angle - last).abs() <= angle_thres
        });
        if fits {
            if let Some(c) = clusters.last_mut() {
                c.push(i);
            }
        } else {
            clusters.push(vec![i]);
        }
    }
    // the half-circle wraps: the first and last clusters may be one
    if clusters.len() > 1 {
        let first_angle = clusters
            .first()
            .and_then(|c| c.first())
            .map(|&i| segments[i].angle_half_circle())
            .unwrap_or(0.0);
        let last_angle = clusters
            .last()
            .and_then(|c| c.last())
            .map(|&i| segments[i].angle_half_circle())
            .unwrap_or(0.0);
        if (first_angle + std::f64::consts::PI - last_angle).abs() <= angle_thres {
            let tail = clusters.pop().unwrap_or_default();
            if let Some(head) = clusters.first_mut() {
                head.extend(tail);
            }
        }
    }

    for cluster in clusters {
        // weighted mean direction via angle doubling, robust at the wrap
        let (mut sx, mut sy, mut wsum) = (0.0f64, 0.0f64, 0.0f64);
        for &i in &cluster {
            let w = segments[i].length_2d();
            let a2 = 2.0 * segments[i].angle_half_circle();
            sx += w * a2.cos();
            sy += w * a2.sin();
            wsum += w;
        }
        if wsum <= 0.0 {
            continue;
        }
        let theta = 0.5 * sy.atan2(sx).rem_euclid(2.0 * std::f64::consts::PI);
        let dir = Vector2::new(theta.cos(), theta.sin());
        let normal = Vector2::new(-dir.y, dir.x);

        // stage 2: distance clustering of signed offsets
        let mut offsets: Vec<(f64, usize)> = cluster
            .iter()
            .map(|&i| {
                let m = (segments[i].a.xy().coords + segments[i].b.xy().coords) * 0.5;
                (m.dot(&normal), i)
            })
            .collect();
        offsets.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut group: Vec<(f64, usize)> = Vec::new();
        let mut flush = |group: &mut Vec<(f64, usize)>, out: &mut Vec<RegularisedLine>| {
            if group.is_empty() {
                return;
            }
            // intersection segments alone position the line when present
            let prio: Vec<&(f64, usize)> = group
                .iter()
                .filter(|(_, i)| segments[*i].priority == INTERSECTION_PRIORITY)
                .collect();
            let pos_members: Vec<&(f64, usize)> = if prio.is_empty() {
                group.iter().collect()
            } else {
                prio
            };
            let (mut o_sum, mut w_sum) = (0.0f64, 0.0f64);
            for (off, i) in pos_members.iter() {
                let w = segments[*i].length_2d();
                o_sum += off * w;
                w_sum += w;
            }
            if w_sum <= 0.0 {
                group.clear();
                return;
            }
            let offset = o_sum / w_sum;

            // support interval: hull of all endpoint projections
            let (mut t_min, mut t_max) = (f64::MAX, f64::MIN);
            for (_, i) in group.iter() {
                for p in [&segments[*i].a, &segments[*i].b] {
                    let t = p.xy().coords.dot(&dir);
                    t_min = t_min.min(t);
                    t_max = t_max.max(t);
                }
            }
            let base = normal * offset;
            out.push(RegularisedLine {
                a: Point2::from(base + dir * t_min),
                b: Point2::from(base + dir * t_max),
            });
            group.clear();
        };

        for (off, i) in offsets {
            let split = group
                .last()
                .map_or(false, |&(last, _)| (off - last).abs() > dist_thres);
            if split {
                flush(&mut group, &mut out);
            }
            group.push((off, i));
        }
        flush(&mut group, &mut out);
    }

    out
}

/// Extend regularised lines at both ends and convert them to exact
/// segments for arrangement insertion.
pub fn extend_exact(lines: &[RegularisedLine], extension: f64) -> Vec<(ExactPoint2, ExactPoint2)> {
    lines
        .iter()
        .filter_map(|l| {
            let d = l.b - l.a;
            let len = d.norm();
            if len < 1e-12 {
                return None;
            }
            let d = d / len;
            let a = l.a - d * extension;
            let b = l.b + d * extension;
            Some((
                ExactPoint2::from_f64(a.x, a.y)?,
                ExactPoint2::from_f64(b.x, b.y)?,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::BOUNDARY_PRIORITY;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn seg(ax: f64, ay: f64, bx: f64, by: f64, priority: u8) -> Segment3 {
        Segment3 {
            a: Point3::new(ax, ay, 0.0),
            b: Point3::new(bx, by, 0.0),
            priority,
            plane_lo: 1,
            plane_hi: 1,
            is_ridgeline: false,
        }
    }

    #[test]
    fn test_parallel_near_lines_merge() {
        let segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, BOUNDARY_PRIORITY),
            seg(2.0, 0.2, 12.0, 0.2, BOUNDARY_PRIORITY),
        ];
        let lines = regularise(&segments, &ReconstructionConfig::default());
        assert_eq!(lines.len(), 1);
        // merged offset is the weighted mean, support covers both
        assert_relative_eq!(lines[0].a.y, 0.1, epsilon = 1e-9);
        assert_relative_eq!(lines[0].a.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(lines[0].b.x, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_distant_parallel_lines_stay_apart() {
        let segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, BOUNDARY_PRIORITY),
            seg(0.0, 3.0, 10.0, 3.0, BOUNDARY_PRIORITY),
        ];
        let lines = regularise(&segments, &ReconstructionConfig::default());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_orthogonal_lines_stay_apart() {
        let segments = vec![
            seg(0.0, 0.0, 10.0, 0.0, BOUNDARY_PRIORITY),
            seg(0.0, 0.0, 0.0, 5.0, BOUNDARY_PRIORITY),
        ];
        let lines = regularise(&segments, &ReconstructionConfig::default());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_intersection_segment_wins_position() {
        let segments = vec![
            seg(0.0, 0.3, 10.0, 0.3, BOUNDARY_PRIORITY),
            seg(1.0, 0.0, 9.0, 0.0, INTERSECTION_PRIORITY),
        ];
        let lines = regularise(&segments, &ReconstructionConfig::default());
        assert_eq!(lines.len(), 1);
        // the ridge line dictates the offset
        assert_relative_eq!(lines[0].a.y, 0.0, epsilon = 1e-9);
        // support still covers the boundary segment
        assert_relative_eq!(lines[0].a.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(lines[0].b.x, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_idempotent() {
        let segments = vec![
            seg(0.0, 0.0, 10.0, 0.1, BOUNDARY_PRIORITY),
            seg(2.0, 0.3, 12.0, 0.4, BOUNDARY_PRIORITY),
            seg(0.0, 0.0, 0.2, 5.0, BOUNDARY_PRIORITY),
        ];
        let cfg = ReconstructionConfig::default();
        let once = regularise(&segments, &cfg);
        let again: Vec<Segment3> = once
            .iter()
            .map(|l| seg(l.a.x, l.a.y, l.b.x, l.b.y, BOUNDARY_PRIORITY))
            .collect();
        let twice = regularise(&again, &cfg);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_relative_eq!(a.a.x, b.a.x, epsilon = 1e-9);
            assert_relative_eq!(a.a.y, b.a.y, epsilon = 1e-9);
            assert_relative_eq!(a.b.x, b.b.x, epsilon = 1e-9);
            assert_relative_eq!(a.b.y, b.b.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_wrap_around_angles_cluster() {
        // directions just above 0 and just below pi are the same line family
        let segments = vec![
            seg(0.0, 0.0, 10.0, 0.05, BOUNDARY_PRIORITY),
            seg(10.0, 0.0, 0.0, 0.05, BOUNDARY_PRIORITY),
        ];
        let lines = regularise(&segments, &ReconstructionConfig::default());
        assert_eq!(lines.len(), 1);
    }
}
