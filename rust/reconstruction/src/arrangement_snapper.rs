// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sub-tolerance vertex snapping
//!
//! Merges vertex pairs closer than the tolerance and removes the resulting
//! zero-length edges, so no edge shorter than the tolerance survives into
//! extrusion. Face payloads are relocated through interior witnesses of
//! the snapped faces; a snap moves geometry by millimetres, so the witness
//! lands in the originating face.

use crate::error::Result;
use roofline_geometry::arrangement::{self, Arrangement};

/// Snap the arrangement and re-attach face data
pub fn snap(arr: &Arrangement, dist: f32) -> Result<Arrangement> {
    let mut snapped = arrangement::snap_vertices(arr, dist as f64)?;

    for f in 0..snapped.faces.len() as u32 {
        if snapped.faces[f as usize].is_unbounded() {
            continue;
        }
        let Some(witness) = arrangement::interior_witness(&snapped, f) else {
            continue;
        };
        let source = arrangement::locate_face(arr, &witness);
        if source != arr.unbounded {
            snapped.faces[f as usize].data = arr.faces[source as usize].data.clone();
        }
    }
    Ok(snapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roofline_geometry::arrangement::SegmentInput;
    use roofline_geometry::ExactPoint2;

    fn pt(x: f64, y: f64) -> ExactPoint2 {
        ExactPoint2::from_f64(x, y).unwrap()
    }

    #[test]
    fn test_snap_preserves_face_data() {
        // square with a 2 mm sliver vertex near one corner
        let segs = vec![
            SegmentInput::new(pt(0.0, 0.0), pt(6.0, 0.0), true),
            SegmentInput::new(pt(6.0, 0.0), pt(6.0, 4.0), true),
            SegmentInput::new(pt(6.0, 4.0), pt(0.002, 4.0), true),
            SegmentInput::new(pt(0.002, 4.0), pt(0.0, 4.0), true),
            SegmentInput::new(pt(0.0, 4.0), pt(0.0, 0.0), true),
        ];
        let mut arr = arrangement::build(&segs, None).unwrap();
        for f in 0..arr.faces.len() {
            if !arr.faces[f].is_unbounded() {
                arr.faces[f].data.in_footprint = true;
                arr.faces[f].data.part_id = 7;
            }
        }

        let out = snap(&arr, 0.005).unwrap();
        assert_eq!(out.vertices.len(), 4);
        let face = out.faces.iter().find(|f| !f.is_unbounded()).unwrap();
        assert!(face.data.in_footprint);
        assert_eq!(face.data.part_id, 7);
        for h in out.edges() {
            assert!(out.edge_length_f64(h) >= 0.005);
        }
    }

    #[test]
    fn test_snap_noop_when_clean() {
        let segs = vec![
            SegmentInput::new(pt(0.0, 0.0), pt(4.0, 0.0), true),
            SegmentInput::new(pt(4.0, 0.0), pt(4.0, 4.0), true),
            SegmentInput::new(pt(4.0, 4.0), pt(0.0, 4.0), true),
            SegmentInput::new(pt(0.0, 4.0), pt(0.0, 0.0), true),
        ];
        let arr = arrangement::build(&segs, None).unwrap();
        let out = snap(&arr, 0.005).unwrap();
        assert_eq!(out.vertices.len(), 4);
        assert_eq!(out.num_bounded_faces(), 1);
    }
}
