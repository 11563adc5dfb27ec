//! Pipeline configuration.
//!
//! Settings are immutable once a pipeline has been built from them. They come
//! either from code (`PipelineConfig::default()` plus field overrides) or from a
//! JSON file. The file format also accepts the short key names used by camera
//! config files (`delta_thresh`, `weight`) and silently ignores camera-only keys
//! such as `resolution`, `fps` or `show_video`.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::core_modules::background_model::SmoothingWeight;
use crate::core_modules::pixel::pixel::{HUE_RANGE, Hsv};
use crate::error::{Result, VisionError};

const DEFAULT_WORKING_WIDTH: u32 = 500;
const DEFAULT_DELTA_THRESHOLD: u8 = 5;
const DEFAULT_MIN_AREA: f64 = 5000.0;
const DEFAULT_SMOOTHING_WEIGHT: f32 = 0.5;
const DEFAULT_MIN_BLOB_RADIUS: f32 = 20.0;

/// A named HSV band to track.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColorRange {
    pub name: String,
    pub lower: Hsv,
    pub upper: Hsv,
    /// RGB color used when drawing this range's circle. Falls back to a palette.
    #[serde(default)]
    pub marker: Option<[u8; 3]>,
    /// Disabled ranges are validated but never processed.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl ColorRange {
    pub fn new(name: impl Into<String>, lower: Hsv, upper: Hsv) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
            marker: None,
            enabled: true,
        }
    }

    pub fn green() -> Self {
        Self::new("green", Hsv::new(29, 86, 6), Hsv::new(64, 255, 255))
    }

    pub fn blue() -> Self {
        Self::new("blue", Hsv::new(110, 50, 50), Hsv::new(130, 255, 255))
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| VisionError::InvalidColorRange {
            name: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if self.upper.hue > HUE_RANGE {
            return Err(invalid(format!(
                "hue bound {} exceeds {}",
                self.upper.hue, HUE_RANGE
            )));
        }
        let channels = [
            ("hue", self.lower.hue, self.upper.hue),
            ("saturation", self.lower.saturation, self.upper.saturation),
            ("value", self.lower.value, self.upper.value),
        ];
        for (channel, lower, upper) in channels {
            if lower > upper {
                return Err(invalid(format!(
                    "lower {channel} {lower} is greater than upper {channel} {upper}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the VisionPipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Width every frame is resized to before analysis. Height follows the aspect ratio.
    pub working_width: u32,
    /// Background differences strictly above this value count as motion.
    pub delta_threshold: u8,
    /// Motion regions with a smaller contour area are ignored.
    pub min_area: f64,
    /// Weight of the newest frame in the background average, in (0, 1).
    pub smoothing_weight: f32,
    /// Blobs whose enclosing circle is not larger than this are ignored.
    pub min_blob_radius: f32,
    /// Zero or more color ranges to track.
    pub color_ranges: Vec<ColorRange>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            working_width: DEFAULT_WORKING_WIDTH,
            delta_threshold: DEFAULT_DELTA_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
            smoothing_weight: DEFAULT_SMOOTHING_WEIGHT,
            min_blob_radius: DEFAULT_MIN_BLOB_RADIUS,
            color_ranges: vec![ColorRange::green(), ColorRange::blue()],
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    working_width: Option<u32>,
    #[serde(alias = "delta_thresh")]
    delta_threshold: Option<u8>,
    min_area: Option<f64>,
    #[serde(alias = "weight")]
    smoothing_weight: Option<f32>,
    min_blob_radius: Option<f32>,
    color_ranges: Option<Vec<ColorRange>>,
}

impl PipelineConfig {
    /// Reads, fills in defaults and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| VisionError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file: PipelineConfigFile =
            serde_json::from_str(&raw).map_err(|source| VisionError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        let cfg = Self::from_file(file);
        cfg.validate()?;
        log::debug!("loaded pipeline config from {}", path.display());
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            working_width: file.working_width.unwrap_or(defaults.working_width),
            delta_threshold: file.delta_threshold.unwrap_or(defaults.delta_threshold),
            min_area: file.min_area.unwrap_or(defaults.min_area),
            smoothing_weight: file.smoothing_weight.unwrap_or(defaults.smoothing_weight),
            min_blob_radius: file.min_blob_radius.unwrap_or(defaults.min_blob_radius),
            color_ranges: file.color_ranges.unwrap_or(defaults.color_ranges),
        }
    }

    /// Checks every invariant the pipeline relies on and hands back the
    /// smoothing weight in its validated form.
    pub fn validate(&self) -> Result<SmoothingWeight> {
        if self.working_width == 0 {
            return Err(VisionError::InvalidConfig(
                "working width must be greater than zero".to_string(),
            ));
        }
        let weight = SmoothingWeight::new(self.smoothing_weight)?;
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(VisionError::InvalidConfig(format!(
                "min area must be a non-negative number, got {}",
                self.min_area
            )));
        }
        if !self.min_blob_radius.is_finite() || self.min_blob_radius < 0.0 {
            return Err(VisionError::InvalidConfig(format!(
                "min blob radius must be a non-negative number, got {}",
                self.min_blob_radius
            )));
        }

        let mut seen = HashSet::new();
        for range in &self.color_ranges {
            range.validate()?;
            if !seen.insert(range.name.as_str()) {
                return Err(VisionError::InvalidColorRange {
                    name: range.name.clone(),
                    reason: "name is used by more than one range".to_string(),
                });
            }
        }
        Ok(weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_track_green_and_blue() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.validate().unwrap().get(), 0.5);
        let names: Vec<&str> = cfg.color_ranges.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["green", "blue"]);
        assert_eq!(cfg.working_width, 500);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let range = ColorRange::new("bad", Hsv::new(64, 86, 6), Hsv::new(29, 255, 255));
        let err = range.validate().unwrap_err();
        assert!(matches!(err, VisionError::InvalidColorRange { ref name, .. } if name == "bad"));
    }

    #[test]
    fn hue_beyond_the_wheel_is_rejected() {
        let range = ColorRange::new("bad", Hsv::new(0, 0, 0), Hsv::new(200, 255, 255));
        assert!(range.validate().is_err());
        let black = ColorRange::new("black", Hsv::new(0, 0, 0), Hsv::new(180, 255, 30));
        assert!(black.validate().is_ok());
    }

    #[test]
    fn scalar_settings_are_checked() {
        let cfg = PipelineConfig { smoothing_weight: 1.5, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = PipelineConfig { working_width: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = PipelineConfig { min_area: -1.0, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = PipelineConfig { min_blob_radius: f32::INFINITY, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let cfg = PipelineConfig {
            color_ranges: vec![ColorRange::green(), ColorRange::green()],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn file_keys_fall_back_to_defaults() {
        let file: PipelineConfigFile =
            serde_json::from_str(r#"{ "delta_thresh": 25, "min_area": 500, "fps": 16 }"#).unwrap();
        let cfg = PipelineConfig::from_file(file);
        assert_eq!(cfg.delta_threshold, 25);
        assert_eq!(cfg.min_area, 500.0);
        assert_eq!(cfg.working_width, 500);
        assert_eq!(cfg.color_ranges.len(), 2);
    }

    #[test]
    fn color_ranges_parse_from_arrays() {
        let range: ColorRange = serde_json::from_str(
            r#"{ "name": "black", "lower": [0, 0, 0], "upper": [180, 255, 30], "enabled": false }"#,
        )
        .unwrap();
        assert_eq!(range.upper, Hsv::new(180, 255, 30));
        assert!(!range.enabled);
        assert_eq!(range.marker, None);
    }
}
