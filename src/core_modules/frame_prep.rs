// THEORY:
// `frame_prep` is the bridge between a raw camera frame and the two analysis
// branches. It turns one raw buffer into the derived views downstream stages
// expect, and does it once per cycle.
//
// Key architectural principles:
// 1.  **Resize exactly once**: The raw frame is scaled to the working width a single
//     time. Both the gray view and the HSV view are derived from that one resized
//     frame, so motion rectangles and blob circles share a coordinate system with
//     the frame that gets annotated.
// 2.  **Motion view**: Rec. 601 gray followed by a fixed 21-tap Gaussian. The blur
//     kills sensor noise before the background model ever sees it.
// 3.  **Color view**: 8-bit HSV, computed per pixel. Lighting mostly moves V while
//     the hue of an object stays put, which is what makes range masks usable.

use image::{GrayImage, ImageBuffer, Luma, RgbImage, imageops::FilterType};

use crate::core_modules::pixel::pixel::{Hsv, Pixel};
use crate::error::{Result, VisionError};

/// Side length of the square blur kernel used on the motion branch.
pub const BLUR_KERNEL_SIZE: usize = 21;

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// A frame converted to 8-bit HSV, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct HsvFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Hsv>,
}

impl HsvFrame {
    pub fn get(&self, x: u32, y: u32) -> Hsv {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Binary mask: 255 where the pixel lies inside `[lower, upper]`, 0 elsewhere.
    pub fn mask_in_range(&self, lower: &Hsv, upper: &Hsv) -> GrayImage {
        let raw = self
            .pixels
            .iter()
            .map(|hsv| if hsv.within(lower, upper) { 255 } else { 0 })
            .collect();
        GrayImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}

/// The two per-cycle views of one resized frame.
pub struct PreparedFrame {
    /// The resized color frame. This is also the frame annotations are drawn on.
    pub color: RgbImage,
    /// Gray + blurred version of `color`, input of the background model.
    pub gray: GrayImage,
}

impl PreparedFrame {
    pub fn prepare(frame: &RgbImage, working_width: u32) -> Result<Self> {
        let color = resize_to_width(frame, working_width)?;
        let gray = to_motion_gray(&color);
        Ok(Self { color, gray })
    }

    /// HSV view of the same resized frame the gray view came from.
    pub fn hsv(&self) -> HsvFrame {
        to_color_space(&self.color)
    }
}

/// Scales `frame` to `width` pixels wide, keeping the aspect ratio.
pub fn resize_to_width(frame: &RgbImage, width: u32) -> Result<RgbImage> {
    let (frame_width, frame_height) = frame.dimensions();
    if frame_width == 0 || frame_height == 0 {
        return Err(VisionError::EmptyFrame);
    }
    if width == 0 {
        return Err(VisionError::InvalidConfig(
            "working width must be greater than zero".to_string(),
        ));
    }
    if width == frame_width {
        return Ok(frame.clone());
    }

    let height = ((frame_height as u64 * width as u64) / frame_width as u64).max(1) as u32;
    Ok(image::imageops::resize(frame, width, height, FilterType::Triangle))
}

/// Gray + Gaussian blurred view used by the background model.
pub fn to_motion_gray(frame: &RgbImage) -> GrayImage {
    let (width, height) = frame.dimensions();
    let gray = GrayF32::from_fn(width, height, |x, y| {
        Luma([Pixel::from(frame.get_pixel(x, y)).luma() as f32])
    });

    let kernel = gaussian_kernel(BLUR_KERNEL_SIZE);
    let blurred = imageproc::filter::separable_filter_equal(&gray, &kernel);

    GrayImage::from_fn(width, height, |x, y| {
        Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Per-pixel HSV conversion.
pub fn to_color_space(frame: &RgbImage) -> HsvFrame {
    let (width, height) = frame.dimensions();
    HsvFrame {
        width,
        height,
        pixels: frame.pixels().map(|rgb| Pixel::from(rgb).hsv()).collect(),
    }
}

/// Sigma picked automatically from the kernel size.
fn auto_sigma(size: usize) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1D Gaussian taps of length `size`.
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = auto_sigma(size);
    let center = (size as f32 - 1.0) * 0.5;
    let taps: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = taps.iter().sum();
    taps.into_iter().map(|t| t / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn auto_sigma_matches_kernel_size() {
        assert!((auto_sigma(BLUR_KERNEL_SIZE) - 3.5).abs() < 1e-6);
        let kernel = gaussian_kernel(BLUR_KERNEL_SIZE);
        assert_eq!(kernel.len(), BLUR_KERNEL_SIZE);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(kernel[10] > kernel[9] && kernel[9] > kernel[0]);
    }

    #[test]
    fn resize_preserves_aspect_ratio() {
        let frame = RgbImage::new(1000, 750);
        let resized = resize_to_width(&frame, 500).unwrap();
        assert_eq!(resized.dimensions(), (500, 375));
    }

    #[test]
    fn resize_rejects_empty_frames() {
        let frame = RgbImage::new(0, 10);
        assert!(matches!(
            resize_to_width(&frame, 500),
            Err(VisionError::EmptyFrame)
        ));
    }

    #[test]
    fn uniform_frame_stays_uniform_after_blur() {
        let frame = RgbImage::from_pixel(40, 30, Rgb([120, 120, 120]));
        let gray = to_motion_gray(&frame);
        assert_eq!(gray.dimensions(), (40, 30));
        assert!(gray.pixels().all(|p| p[0] == 120));
    }

    #[test]
    fn both_views_come_from_the_same_resized_frame() {
        let frame = RgbImage::from_pixel(800, 600, Rgb([0, 200, 0]));
        let prepared = PreparedFrame::prepare(&frame, 400).unwrap();
        let hsv = prepared.hsv();
        assert_eq!(prepared.color.dimensions(), prepared.gray.dimensions());
        assert_eq!((hsv.width, hsv.height), prepared.color.dimensions());
        assert_eq!(hsv.get(10, 10).hue, 60);
    }

    #[test]
    fn in_range_mask_marks_matching_pixels() {
        let mut frame = RgbImage::new(4, 1);
        frame.put_pixel(1, 0, Rgb([0, 0, 255]));
        let mask = to_color_space(&frame).mask_in_range(&Hsv::new(110, 50, 50), &Hsv::new(130, 255, 255));
        assert_eq!(mask.as_raw(), &vec![0, 255, 0, 0]);
    }
}
