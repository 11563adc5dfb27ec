// THEORY:
// The `ColorBlobDetector` is the color branch of the engine. For every configured
// HSV range it finds the single most prominent blob of that color in the frame
// and summarizes it as an enclosing circle.
//
// Per range, on the shared HSV frame:
// 1.  **Mask** every pixel inside [lower, upper].
// 2.  **Open** the mask (erode 2, dilate 2) so sensor speckle disappears while
//     real objects keep their outline.
// 3.  **External contours**, then keep the one with the largest area. Ties go to
//     whichever maximal contour the tracer found first; callers must not rely on it.
// 4.  **Enclosing circle** of that contour, reported only if its radius is above
//     the configured minimum.
//
// Ranges never interact: the HSV conversion is the only thing they share. An
// absent blob is an ordinary outcome and is reported as `None`, never as an error.

use image::Rgb;

use crate::config::ColorRange;
use crate::core_modules::frame_prep::HsvFrame;
use crate::core_modules::mask;
use crate::core_modules::shape::{self, Circle, Shape};

/// Erode/dilate passes of the opening applied to every color mask.
pub const COLOR_OPEN_ITERATIONS: u8 = 2;

/// Marker colors handed out to ranges that do not pick their own.
const MARKER_PALETTE: [Rgb<u8>; 4] = [
    Rgb([255, 255, 0]),
    Rgb([255, 0, 255]),
    Rgb([0, 255, 255]),
    Rgb([255, 128, 0]),
];

/// The outcome for one color range on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorDetection {
    /// Name of the color range this result belongs to.
    pub name: String,
    /// Color to draw this range's circle with.
    pub marker: Rgb<u8>,
    /// Enclosing circle of the dominant blob, if one was large enough.
    pub circle: Option<Circle>,
}

/// Stateless detector over a fixed list of color ranges.
#[derive(Debug, Clone)]
pub struct ColorBlobDetector {
    ranges: Vec<ColorRange>,
    markers: Vec<Rgb<u8>>,
    min_radius: f32,
}

impl ColorBlobDetector {
    /// Keeps only the enabled ranges, preserving configuration order.
    pub fn new(ranges: &[ColorRange], min_radius: f32) -> Self {
        let ranges: Vec<ColorRange> = ranges.iter().filter(|r| r.enabled).cloned().collect();
        let markers = ranges
            .iter()
            .enumerate()
            .map(|(i, range)| {
                range
                    .marker
                    .map(Rgb)
                    .unwrap_or(MARKER_PALETTE[i % MARKER_PALETTE.len()])
            })
            .collect();
        Self {
            ranges,
            markers,
            min_radius,
        }
    }

    pub fn ranges(&self) -> &[ColorRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// One detection per active range, in configuration order.
    pub fn detect(&self, hsv: &HsvFrame) -> Vec<ColorDetection> {
        self.ranges
            .iter()
            .zip(&self.markers)
            .map(|(range, &marker)| ColorDetection {
                name: range.name.clone(),
                marker,
                circle: self.detect_range(hsv, range),
            })
            .collect()
    }

    fn detect_range(&self, hsv: &HsvFrame, range: &ColorRange) -> Option<Circle> {
        let raw_mask = hsv.mask_in_range(&range.lower, &range.upper);
        let cleaned = mask::open(&raw_mask, COLOR_OPEN_ITERATIONS);
        let shapes = shape::find_external_shapes(&cleaned);

        let dominant = largest_shape(&shapes)?;
        let circle = dominant.min_enclosing_circle();
        (circle.radius > self.min_radius).then_some(circle)
    }
}

/// Any shape of maximal area; the first one found wins ties.
fn largest_shape(shapes: &[Shape]) -> Option<&Shape> {
    let mut best: Option<(&Shape, f64)> = None;
    for candidate in shapes {
        let area = candidate.area();
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((candidate, area)),
        }
    }
    best.map(|(shape, _)| shape)
}
