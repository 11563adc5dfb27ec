// THEORY:
// `annotate` renders a frame's findings back onto the working frame so a human can
// check them: motion rectangles in red and one circle per detected color blob in
// that range's marker color. Strokes are two pixels wide.
//
// It only reads analysis results; nothing downstream depends on the drawn image.
// Text overlays (room status, timestamps) belong to whatever displays the frame.

use std::path::Path;

use image::{ImageEncoder, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut};

use crate::core_modules::color_blob_detector::ColorDetection;
use crate::core_modules::shape::Rect;
use crate::error::Result;

pub const MOTION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const STROKE: u32 = 2;

/// Returns a copy of `frame` with motion regions and blob circles drawn on it.
pub fn annotate(frame: &RgbImage, regions: &[Rect], detections: &[ColorDetection]) -> RgbImage {
    let mut canvas = frame.clone();
    for region in regions {
        draw_region(&mut canvas, region);
    }
    for detection in detections {
        if let Some(circle) = detection.circle {
            let center = (circle.center.0.round() as i32, circle.center.1.round() as i32);
            let radius = circle.radius.round() as i32;
            for inset in 0..STROKE as i32 {
                if radius - inset > 0 {
                    draw_hollow_circle_mut(&mut canvas, center, radius - inset, detection.marker);
                }
            }
        }
    }
    canvas
}

fn draw_region(canvas: &mut RgbImage, region: &Rect) {
    for inset in 0..STROKE {
        let width = region.width.saturating_sub(2 * inset);
        let height = region.height.saturating_sub(2 * inset);
        if width == 0 || height == 0 {
            break;
        }
        let outline = imageproc::rect::Rect::at((region.x + inset) as i32, (region.y + inset) as i32)
            .of_size(width, height);
        draw_hollow_rect_mut(canvas, outline, MOTION_COLOR);
    }
}

/// Writes an RGB frame as PNG.
pub fn save_png(path: &Path, frame: &RgbImage) -> Result<()> {
    let output = std::fs::File::create(path).map_err(image::ImageError::IoError)?;
    let encoder = image::codecs::png::PngEncoder::new(std::io::BufWriter::new(output));
    encoder.write_image(
        frame.as_raw(),
        frame.width(),
        frame.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::shape::Circle;

    #[test]
    fn regions_are_outlined_in_red() {
        let frame = RgbImage::new(50, 50);
        let region = Rect { x: 10, y: 10, width: 20, height: 15 };
        let out = annotate(&frame, &[region], &[]);
        assert_eq!(*out.get_pixel(10, 10), MOTION_COLOR);
        assert_eq!(*out.get_pixel(11, 11), MOTION_COLOR);
        assert_eq!(*out.get_pixel(29, 24), MOTION_COLOR);
        assert_eq!(*out.get_pixel(20, 17), Rgb([0, 0, 0]));
        // The input frame is left alone.
        assert_eq!(*frame.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn circles_use_the_detection_marker() {
        let frame = RgbImage::new(100, 100);
        let marker = Rgb([255, 255, 0]);
        let detections = [
            ColorDetection {
                name: "green".to_string(),
                marker,
                circle: Some(Circle { center: (50.0, 50.0), radius: 20.0 }),
            },
            ColorDetection { name: "blue".to_string(), marker: Rgb([0, 0, 255]), circle: None },
        ];
        let out = annotate(&frame, &[], &detections);
        assert_eq!(*out.get_pixel(70, 50), marker);
        assert_eq!(*out.get_pixel(50, 50), Rgb([0, 0, 0]));
        assert!(out.pixels().all(|p| *p != Rgb([0, 0, 255])));
    }

    #[test]
    fn saved_png_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let frame = RgbImage::from_pixel(12, 7, Rgb([9, 8, 7]));
        save_png(&path, &frame).unwrap();
        let loaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(loaded, frame);
    }
}
