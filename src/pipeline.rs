// THEORY:
// The `pipeline` module is the top-level API of the engine. It encapsulates the
// per-frame stack behind one object: give it a frame, get back a report saying
// whether the room is occupied, where things moved and where each tracked color is.
//
// One processing cycle:
// 1.  **Prepare**: resize once, derive the blurred gray view and (when colors are
//     tracked) the HSV view from that same resized frame.
// 2.  **Seed or update**: the first frame only seeds the background model and the
//     cycle ends there. Every later frame is blended into the model first.
// 3.  **Motion**: difference against the model, then threshold, dilate, contours,
//     area filter, rectangles, occupancy.
// 4.  **Color**: the dominant blob per configured color range.
//
// The background model is the only state carried from one cycle to the next. It
// is owned here, created once and never reset; dropping the pipeline drops it.

use image::RgbImage;

use crate::config::PipelineConfig;
use crate::core_modules::annotate;
use crate::core_modules::background_model::{BackgroundModel, SmoothingWeight};
use crate::core_modules::color_blob_detector::ColorBlobDetector;
use crate::core_modules::frame_prep::PreparedFrame;
use crate::core_modules::motion_extractor::{MotionParams, extract_motion};
use crate::error::Result;

// Re-export key data structures for the public API.
pub use crate::core_modules::color_blob_detector::ColorDetection;
pub use crate::core_modules::motion_extractor::Occupancy;
pub use crate::core_modules::shape::{Circle, Rect};

/// Everything found in one analysed frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Zero-based position of the frame in the stream (the seed frame is 0).
    pub frame_index: u64,
    pub occupancy: Occupancy,
    /// Motion bounding boxes in discovery order.
    pub motion_regions: Vec<Rect>,
    /// One entry per enabled color range, in configuration order.
    pub color_detections: Vec<ColorDetection>,
    /// The resized frame all coordinates refer to.
    pub working_frame: RgbImage,
}

impl FrameAnalysis {
    /// The working frame with rectangles and circles drawn on it.
    pub fn annotated(&self) -> RgbImage {
        annotate::annotate(&self.working_frame, &self.motion_regions, &self.color_detections)
    }

    pub fn room_status(&self) -> String {
        format!("Room Status: {}", self.occupancy)
    }

    /// Detection for the color range called `name`, if it is tracked.
    pub fn detection(&self, name: &str) -> Option<&ColorDetection> {
        self.color_detections.iter().find(|d| d.name == name)
    }
}

/// The output of the vision pipeline for a single frame.
#[derive(Debug, Clone)]
pub enum Report {
    /// The frame seeded the background model; nothing else was computed.
    BackgroundSeeded {
        frame_index: u64,
        width: u32,
        height: u32,
    },
    Analyzed(FrameAnalysis),
}

impl Report {
    pub fn frame_index(&self) -> u64 {
        match self {
            Report::BackgroundSeeded { frame_index, .. } => *frame_index,
            Report::Analyzed(analysis) => analysis.frame_index,
        }
    }

    /// Seeding cycles report an empty room.
    pub fn occupancy(&self) -> Occupancy {
        match self {
            Report::BackgroundSeeded { .. } => Occupancy::Unoccupied,
            Report::Analyzed(analysis) => analysis.occupancy,
        }
    }

    pub fn analysis(&self) -> Option<&FrameAnalysis> {
        match self {
            Report::Analyzed(analysis) => Some(analysis),
            Report::BackgroundSeeded { .. } => None,
        }
    }
}

/// The main, top-level struct for the vision engine.
pub struct VisionPipeline {
    config: PipelineConfig,
    weight: SmoothingWeight,
    motion_params: MotionParams,
    color_detector: ColorBlobDetector,
    background: Option<BackgroundModel>,
    frames_processed: u64,
    last_occupancy: Occupancy,
}

impl VisionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let weight = config.validate()?;
        let motion_params = MotionParams {
            delta_threshold: config.delta_threshold,
            min_area: config.min_area,
        };
        let color_detector = ColorBlobDetector::new(&config.color_ranges, config.min_blob_radius);
        Ok(Self {
            config,
            weight,
            motion_params,
            color_detector,
            background: None,
            frames_processed: 0,
            last_occupancy: Occupancy::Unoccupied,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The background model, once the first frame has been seen.
    pub fn background(&self) -> Option<&BackgroundModel> {
        self.background.as_ref()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn occupancy_detected(&mut self, frame: &RgbImage) -> Result<bool> {
        let report = self.process_frame(frame)?;
        Ok(report.occupancy().is_occupied())
    }

    /// Runs one full cycle. Errors leave the background model untouched.
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<Report> {
        let frame_index = self.frames_processed;
        let prepared = PreparedFrame::prepare(frame, self.config.working_width)?;

        let Some(background) = self.background.as_mut() else {
            return self.seed_background(&prepared, frame_index);
        };

        // Stage 1: Temporal Analysis
        background.update(&prepared.gray)?;
        let delta = background.delta(&prepared.gray)?;

        // Stage 2: Motion Regions
        let motion = extract_motion(&delta, &self.motion_params);

        // Stage 3: Color Blobs
        let color_detections = if self.color_detector.is_empty() {
            Vec::new()
        } else {
            self.color_detector.detect(&prepared.hsv())
        };

        if motion.occupancy != self.last_occupancy {
            log::info!(
                "frame {}: room status changed from {} to {}",
                frame_index,
                self.last_occupancy,
                motion.occupancy
            );
            self.last_occupancy = motion.occupancy;
        }
        log::debug!(
            "frame {}: {} motion region(s), {} color blob(s)",
            frame_index,
            motion.regions.len(),
            color_detections.iter().filter(|d| d.circle.is_some()).count()
        );

        self.frames_processed += 1;
        Ok(Report::Analyzed(FrameAnalysis {
            frame_index,
            occupancy: motion.occupancy,
            motion_regions: motion.regions,
            color_detections,
            working_frame: prepared.color,
        }))
    }

    fn seed_background(&mut self, prepared: &PreparedFrame, frame_index: u64) -> Result<Report> {
        let model = BackgroundModel::initialize(&prepared.gray, self.weight)?;
        let (width, height) = model.dimensions();
        log::info!("starting background model ({}x{})", width, height);
        self.background = Some(model);
        self.frames_processed += 1;
        Ok(Report::BackgroundSeeded {
            frame_index,
            width,
            height,
        })
    }
}
