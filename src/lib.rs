// THEORY:
// This file is the main entry point for the `occupancy_vision` library crate.
// It defines the public API handed to callers that own a frame source (a camera
// loop, a directory replay, a test harness).
//
// The primary goal is to export the `VisionPipeline`, its async front end
// `StreamPipeline`, and the data structures around them (`PipelineConfig`,
// `Report`, `FrameAnalysis`). The algorithmic building blocks live in
// `core_modules` and stay usable on their own, but most callers only need the
// pipeline.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod stream_pipeline;

pub use config::{ColorRange, PipelineConfig};
pub use error::{Result, VisionError};
pub use pipeline::{FrameAnalysis, Occupancy, Report, VisionPipeline};
pub use stream_pipeline::{StreamPipeline, TimedReport};
