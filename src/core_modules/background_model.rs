// THEORY:
// The `BackgroundModel` is the only piece of the engine that remembers anything
// between frames. It is a slowly adapting estimate of the "empty scene": one
// floating-point value per pixel of the blurred gray frame.
//
// Key architectural principles:
// 1.  **Create once, update many, never reset**: The model is born from the first
//     gray frame of the stream. There is no "uninitialized" state to guard against;
//     whoever owns the stream owns the model and decides when it is created.
// 2.  **Exponential smoothing**: Every frame is blended in with a fixed weight
//     (`model = w * frame + (1 - w) * model`). A larger weight forgets faster. The
//     weight is fixed at construction so it cannot drift mid-stream.
// 3.  **Read-only comparison**: `delta` compares a frame against the model without
//     touching it. The model is rounded back to bytes before the comparison so the
//     difference image lives in the same 0..255 space as the frame.
// 4.  **Shape is a contract**: A frame of a different size than the seed is a
//     configuration error and is reported, never silently resampled.

use image::GrayImage;

use crate::error::{Result, VisionError};

/// Weight of the newest frame in the running average. Always in (0, 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingWeight(f32);

impl SmoothingWeight {
    pub fn new(weight: f32) -> Result<Self> {
        if !weight.is_finite() || weight <= 0.0 || weight >= 1.0 {
            return Err(VisionError::InvalidConfig(format!(
                "smoothing weight must lie strictly between 0 and 1, got {weight}"
            )));
        }
        Ok(Self(weight))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

/// Running average of the blurred gray frames of one stream.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    width: u32,
    height: u32,
    weight: SmoothingWeight,
    /// Row-major average intensity, one value per pixel.
    average: Vec<f32>,
}

impl BackgroundModel {
    /// Seeds the model with the first gray frame of the stream.
    pub fn initialize(first_gray: &GrayImage, weight: SmoothingWeight) -> Result<Self> {
        let (width, height) = first_gray.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::EmptyFrame);
        }
        Ok(Self {
            width,
            height,
            weight,
            average: first_gray.as_raw().iter().map(|&v| v as f32).collect(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The raw average values, row-major.
    pub fn average(&self) -> &[f32] {
        &self.average
    }

    /// Blends `gray` into the model in place.
    pub fn update(&mut self, gray: &GrayImage) -> Result<()> {
        self.check_dimensions(gray)?;
        let w = self.weight.get();
        for (avg, &value) in self.average.iter_mut().zip(gray.as_raw()) {
            *avg = w * value as f32 + (1.0 - w) * *avg;
        }
        Ok(())
    }

    /// Per-pixel `|gray - model|`, with the model rounded to bytes first.
    pub fn delta(&self, gray: &GrayImage) -> Result<GrayImage> {
        self.check_dimensions(gray)?;
        let raw = gray
            .as_raw()
            .iter()
            .zip(&self.average)
            .map(|(&value, &avg)| value.abs_diff(to_byte(avg)))
            .collect();
        GrayImage::from_raw(self.width, self.height, raw).ok_or(VisionError::DimensionMismatch {
            expected_width: self.width,
            expected_height: self.height,
            actual_width: gray.width(),
            actual_height: gray.height(),
        })
    }

    fn check_dimensions(&self, gray: &GrayImage) -> Result<()> {
        let (width, height) = gray.dimensions();
        if (width, height) != (self.width, self.height) {
            return Err(VisionError::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: width,
                actual_height: height,
            });
        }
        Ok(())
    }
}

/// Round-half-to-even with saturation into 0..=255.
#[inline]
fn to_byte(value: f32) -> u8 {
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn half() -> SmoothingWeight {
        SmoothingWeight::new(0.5).unwrap()
    }

    #[test]
    fn seed_equals_first_frame() {
        let seed = GrayImage::from_fn(8, 6, |x, y| Luma([(x * 10 + y) as u8]));
        let model = BackgroundModel::initialize(&seed, half()).unwrap();
        assert_eq!(model.dimensions(), (8, 6));
        for (avg, &value) in model.average().iter().zip(seed.as_raw()) {
            assert_eq!(*avg, value as f32);
        }
        assert!(model.delta(&seed).unwrap().pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn update_is_an_exponential_moving_average() {
        let seed = GrayImage::from_pixel(2, 2, Luma([0]));
        let mut model = BackgroundModel::initialize(&seed, half()).unwrap();
        let bright = GrayImage::from_pixel(2, 2, Luma([200]));

        model.update(&bright).unwrap();
        assert!(model.average().iter().all(|&v| (v - 100.0).abs() < 1e-4));
        model.update(&bright).unwrap();
        assert!(model.average().iter().all(|&v| (v - 150.0).abs() < 1e-4));

        let delta = model.delta(&bright).unwrap();
        assert!(delta.pixels().all(|p| p[0] == 50));
    }

    #[test]
    fn half_way_averages_round_to_even() {
        let seed = GrayImage::from_pixel(2, 1, Luma([0]));
        let mut model = BackgroundModel::initialize(&seed, half()).unwrap();
        let frame = GrayImage::from_raw(2, 1, vec![253, 255]).unwrap();
        model.update(&frame).unwrap();
        // 126.5 rounds down to 126, 127.5 rounds up to 128.
        let delta = model.delta(&frame).unwrap();
        assert_eq!(delta.as_raw(), &vec![127, 127]);
    }

    #[test]
    fn delta_does_not_touch_the_model() {
        let seed = GrayImage::from_pixel(3, 3, Luma([40]));
        let model = BackgroundModel::initialize(&seed, half()).unwrap();
        let before = model.average().to_vec();
        let _ = model.delta(&GrayImage::from_pixel(3, 3, Luma([255]))).unwrap();
        assert_eq!(model.average(), before.as_slice());
    }

    #[test]
    fn mismatched_frames_are_rejected() {
        let seed = GrayImage::new(4, 4);
        let mut model = BackgroundModel::initialize(&seed, half()).unwrap();
        let other = GrayImage::new(5, 4);
        assert!(matches!(
            model.update(&other),
            Err(VisionError::DimensionMismatch { expected_width: 4, actual_width: 5, .. })
        ));
        assert!(model.delta(&other).is_err());
        assert!(model.average().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn weight_must_be_strictly_inside_unit_interval() {
        assert!(SmoothingWeight::new(0.0).is_err());
        assert!(SmoothingWeight::new(1.0).is_err());
        assert!(SmoothingWeight::new(f32::NAN).is_err());
        assert!(SmoothingWeight::new(0.05).is_ok());
    }
}
