//! Binary mask helpers shared by the motion and color branches.
//!
//! Masks are plain `GrayImage`s holding 0 (background) or 255 (foreground).
//! Morphology uses a 3x3 square element; `n` iterations of it are the same as a
//! single pass with an L-infinity radius of `n`.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;

pub const FOREGROUND: u8 = 255;

/// 255 where the pixel is strictly greater than `cutoff`, 0 elsewhere.
pub fn threshold_above(image: &GrayImage, cutoff: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] > cutoff {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Grows foreground regions by `iterations` pixels in every direction.
pub fn dilate(mask: &GrayImage, iterations: u8) -> GrayImage {
    if iterations == 0 {
        return mask.clone();
    }
    imageproc::morphology::dilate(mask, Norm::LInf, iterations)
}

/// Shrinks foreground regions by `iterations` pixels in every direction.
pub fn erode(mask: &GrayImage, iterations: u8) -> GrayImage {
    if iterations == 0 {
        return mask.clone();
    }
    imageproc::morphology::erode(mask, Norm::LInf, iterations)
}

/// Erode then dilate: drops specks smaller than the element, keeps large shapes.
pub fn open(mask: &GrayImage, iterations: u8) -> GrayImage {
    dilate(&erode(mask, iterations), iterations)
}

pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] != 0).count()
}
