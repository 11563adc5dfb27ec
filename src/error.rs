//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort the processing of a frame or the setup of a pipeline.
///
/// "Nothing found" outcomes (no motion, no blob of a color) are not errors and
/// never show up here.
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("frame is {actual_width}x{actual_height} but the background model is {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("frame has no pixels")]
    EmptyFrame,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid color range `{name}`: {reason}")]
    InvalidColorRange { name: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("the pipeline worker is no longer running")]
    PipelineClosed,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, VisionError>;
