// THEORY:
// The `motion_extractor` is the spatial half of the motion branch. It takes the
// difference image produced by the background model and answers two questions:
// "is anything moving?" and "where?".
//
// Algorithm, in this order (the order matters):
// 1.  **Threshold**: pixels whose difference is strictly above the cutoff become
//     foreground. Done first so dilation never amplifies noise.
// 2.  **Dilate** (2 iterations): merges nearby fragments of the same object and
//     fills small holes.
// 3.  **External contours**: one boundary per connected region.
// 4.  **Area filter**: regions smaller than `min_area` are noise. The filter runs
//     after dilation so fragments that only become large once merged survive.
// 5.  **Bounding rectangles**: each survivor becomes a motion region.
// 6.  **Occupancy**: occupied iff at least one region survives.
//
// Like the blob detector of a grid engine, this is a stateless utility: one
// difference image in, one summary out, no memory of earlier frames.

use std::fmt;

use image::GrayImage;

use crate::core_modules::mask;
use crate::core_modules::shape::{self, Rect};

/// Dilation passes applied to the thresholded difference image.
pub const MOTION_DILATE_ITERATIONS: u8 = 2;

/// Two-valued room status, recomputed from scratch every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Occupancy {
    #[default]
    Unoccupied,
    Occupied,
}

impl Occupancy {
    pub fn label(&self) -> &'static str {
        match self {
            Occupancy::Unoccupied => "Unoccupied",
            Occupancy::Occupied => "Occupied",
        }
    }

    pub fn is_occupied(&self) -> bool {
        matches!(self, Occupancy::Occupied)
    }
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tunables of the motion branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    /// Differences strictly above this intensity count as change.
    pub delta_threshold: u8,
    /// Regions with a smaller contour area are dropped.
    pub min_area: f64,
}

/// The motion verdict for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MotionSummary {
    pub occupancy: Occupancy,
    /// Bounding boxes of the surviving regions in contour discovery order.
    /// No spatial or size ordering is implied.
    pub regions: Vec<Rect>,
}

/// Turns a difference image into motion regions and an occupancy label.
pub fn extract_motion(delta: &GrayImage, params: &MotionParams) -> MotionSummary {
    let thresholded = mask::threshold_above(delta, params.delta_threshold);
    let cleaned = mask::dilate(&thresholded, MOTION_DILATE_ITERATIONS);

    let regions: Vec<Rect> = shape::find_external_shapes(&cleaned)
        .iter()
        .filter(|candidate| candidate.area() >= params.min_area)
        .map(|survivor| survivor.bounding_rect())
        .collect();

    let occupancy = if regions.is_empty() {
        Occupancy::Unoccupied
    } else {
        Occupancy::Occupied
    };

    MotionSummary { occupancy, regions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn delta_with_square(x0: u32, y0: u32, side: u32, value: u8) -> GrayImage {
        let mut delta = GrayImage::new(100, 100);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                delta.put_pixel(x, y, Luma([value]));
            }
        }
        delta
    }

    fn params(delta_threshold: u8, min_area: f64) -> MotionParams {
        MotionParams { delta_threshold, min_area }
    }

    #[test]
    fn blank_delta_is_unoccupied() {
        let summary = extract_motion(&GrayImage::new(50, 50), &params(25, 10.0));
        assert_eq!(summary, MotionSummary::default());
        assert_eq!(summary.occupancy.to_string(), "Unoccupied");
    }

    #[test]
    fn large_change_is_reported_with_dilated_bounds() {
        let delta = delta_with_square(20, 30, 20, 200);
        let summary = extract_motion(&delta, &params(25, 100.0));
        assert!(summary.occupancy.is_occupied());
        assert_eq!(
            summary.regions,
            vec![Rect { x: 18, y: 28, width: 24, height: 24 }]
        );
    }

    #[test]
    fn changes_in_the_corner_are_reported() {
        let mut delta = delta_with_square(0, 0, 20, 200);
        for y in 80..100 {
            for x in 80..100 {
                delta.put_pixel(x, y, Luma([200]));
            }
        }
        let mut regions = extract_motion(&delta, &params(25, 100.0)).regions;
        regions.sort_by_key(|r| (r.x, r.y));
        assert_eq!(
            regions,
            vec![
                Rect { x: 0, y: 0, width: 22, height: 22 },
                Rect { x: 78, y: 78, width: 22, height: 22 },
            ]
        );
    }

    #[test]
    fn changes_at_or_below_the_cutoff_are_ignored() {
        let delta = delta_with_square(20, 30, 20, 25);
        let summary = extract_motion(&delta, &params(25, 1.0));
        assert_eq!(summary.occupancy, Occupancy::Unoccupied);
    }

    #[test]
    fn small_regions_fall_below_min_area() {
        let delta = delta_with_square(40, 40, 3, 255);
        // 3x3 dilated to 7x7, contour area 36.
        assert!(extract_motion(&delta, &params(25, 37.0)).regions.is_empty());
        assert_eq!(extract_motion(&delta, &params(25, 36.0)).regions.len(), 1);
    }

    #[test]
    fn dilation_merges_fragments_before_filtering() {
        let mut delta = delta_with_square(10, 10, 6, 255);
        for y in 10..16 {
            for x in 18..24 {
                delta.put_pixel(x, y, Luma([255]));
            }
        }
        // Each fragment alone: 10x10 after dilation, area 81. Merged: 18x10, area 153.
        let summary = extract_motion(&delta, &params(25, 120.0));
        assert_eq!(summary.regions.len(), 1);
        assert_eq!(summary.regions[0].width, 18);
    }

    #[test]
    fn raising_min_area_never_adds_regions() {
        let mut delta = delta_with_square(5, 5, 4, 255);
        for y in 50..70 {
            for x in 50..75 {
                delta.put_pixel(x, y, Luma([255]));
            }
        }
        let mut previous = usize::MAX;
        for min_area in [0.0, 50.0, 100.0, 500.0, 1000.0, 5000.0] {
            let count = extract_motion(&delta, &params(25, min_area)).regions.len();
            assert!(count <= previous);
            previous = count;
        }
        assert_eq!(previous, 0);
    }
}
