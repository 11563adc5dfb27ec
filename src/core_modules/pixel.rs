// THEORY (single-pixel color transforms):
// The `Pixel` module is the smallest unit of the vision system. It is a "dumb"
// data container for one RGB sample plus the two single-pixel transforms the rest
// of the engine is built on. Nothing in here looks at neighbors in space or time.
//
// What lives here:
// - Luma (Rec. 601): the brightness used by the motion branch. Weighted sum of
//   R, G, B rounded back to a byte so that it matches an 8-bit gray frame.
// - HSV in the 8-bit convention: hue is stored as degrees / 2 so that the full
//   color wheel fits in 0..180, saturation and value use the whole 0..255 range.
//   This is the space color ranges are written in.
//
// Key principles:
// 1) Single-pixel scope: every function takes one pixel and returns one value.
// 2) Byte-exact outputs: results are rounded the same way everywhere so that a
//    gray frame, a mask and a configured bound all agree on what "25" means.

pub mod pixel {
    use image::Rgb;
    use serde::{Deserialize, Serialize};

    pub type Channel = u8;
    pub type Luminance = f64;

    /// Largest hue value in the 8-bit convention (exclusive upper end of the wheel).
    pub const HUE_RANGE: u8 = 180;

    /// A "dumb" data container representing a single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    /// A color in 8-bit HSV: hue 0..180, saturation and value 0..255.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(from = "[u8; 3]", into = "[u8; 3]")]
    pub struct Hsv {
        pub hue: Channel,
        pub saturation: Channel,
        pub value: Channel,
    }

    impl Hsv {
        pub const fn new(hue: Channel, saturation: Channel, value: Channel) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }

        /// True when every channel lies inside `[lower, upper]`, bounds included.
        #[inline]
        pub fn within(&self, lower: &Hsv, upper: &Hsv) -> bool {
            (lower.hue..=upper.hue).contains(&self.hue)
                && (lower.saturation..=upper.saturation).contains(&self.saturation)
                && (lower.value..=upper.value).contains(&self.value)
        }
    }

    impl From<[u8; 3]> for Hsv {
        fn from(channels: [u8; 3]) -> Self {
            Hsv::new(channels[0], channels[1], channels[2])
        }
    }

    impl From<Hsv> for [u8; 3] {
        fn from(hsv: Hsv) -> Self {
            [hsv.hue, hsv.saturation, hsv.value]
        }
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64 + 0.587_f64 * self.green as f64 + 0.114_f64 * self.blue as f64
        }

        /// Luminance rounded to a gray byte.
        #[inline]
        pub fn luma(&self) -> Channel {
            self.luminance().round().clamp(0.0, 255.0) as Channel
        }

        /// Converts to 8-bit HSV.
        ///
        /// - Value is the largest channel.
        /// - Saturation is chroma relative to value, scaled to 0..255 (0 for black).
        /// - Hue is the wheel angle halved; grays get hue 0.
        pub fn hsv(&self) -> Hsv {
            let red = self.red as f32;
            let green = self.green as f32;
            let blue = self.blue as f32;

            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = maximum_channel - minimum_channel;

            let saturation = if maximum_channel <= 0.0 {
                0.0
            } else {
                255.0 * chroma / maximum_channel
            };

            let hue_degrees = if chroma <= 0.0 {
                0.0
            } else {
                let (base_difference, sector_offset) = if maximum_channel == red {
                    (green - blue, 0.0)
                } else if maximum_channel == green {
                    (blue - red, 120.0)
                } else {
                    (red - green, 240.0)
                };
                let mut degrees = 60.0 * base_difference / chroma + sector_offset;
                if degrees < 0.0 {
                    degrees += 360.0;
                }
                degrees
            };

            let mut hue = (hue_degrees / 2.0).round() as u16;
            if hue >= HUE_RANGE as u16 {
                hue -= HUE_RANGE as u16;
            }

            Hsv {
                hue: hue as Channel,
                saturation: saturation.round().clamp(0.0, 255.0) as Channel,
                value: maximum_channel as Channel,
            }
        }
    }

    impl From<&Rgb<u8>> for Pixel {
        fn from(rgb: &Rgb<u8>) -> Self {
            Pixel::new(rgb[0], rgb[1], rgb[2])
        }
    }

    impl From<Pixel> for Rgb<u8> {
        fn from(pixel: Pixel) -> Self {
            Rgb([pixel.red, pixel.green, pixel.blue])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    #[test]
    fn primaries_map_to_expected_hues() {
        assert_eq!(Pixel::new(255, 0, 0).hsv(), Hsv::new(0, 255, 255));
        assert_eq!(Pixel::new(0, 255, 0).hsv(), Hsv::new(60, 255, 255));
        assert_eq!(Pixel::new(0, 0, 255).hsv(), Hsv::new(120, 255, 255));
    }

    #[test]
    fn grays_have_no_hue_or_saturation() {
        let hsv = Pixel::new(90, 90, 90).hsv();
        assert_eq!(hsv, Hsv::new(0, 0, 90));
        assert_eq!(Pixel::default().hsv(), Hsv::default());
    }

    #[test]
    fn luma_uses_rec601_weights() {
        assert_eq!(Pixel::new(255, 255, 255).luma(), 255);
        assert_eq!(Pixel::new(0, 0, 0).luma(), 0);
        // 0.299 * 100 = 29.9
        assert_eq!(Pixel::new(100, 0, 0).luma(), 30);
        // 0.587 * 100 = 58.7
        assert_eq!(Pixel::new(0, 100, 0).luma(), 59);
    }

    #[test]
    fn within_is_inclusive_on_every_channel() {
        let lower = Hsv::new(29, 86, 6);
        let upper = Hsv::new(64, 255, 255);
        assert!(Hsv::new(29, 86, 6).within(&lower, &upper));
        assert!(Hsv::new(64, 255, 255).within(&lower, &upper));
        assert!(!Hsv::new(65, 200, 200).within(&lower, &upper));
        assert!(!Hsv::new(40, 85, 200).within(&lower, &upper));
    }

    #[test]
    fn hue_near_full_circle_wraps_to_zero() {
        // Almost pure red with a hint of blue sits just below 360 degrees.
        let hsv = Pixel::new(255, 0, 1).hsv();
        assert!(hsv.hue < HUE_RANGE);
    }
}
