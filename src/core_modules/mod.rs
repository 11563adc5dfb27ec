//! Algorithmic building blocks of the engine, from single pixels up to per-frame
//! detectors. The `pipeline` module composes them.

pub mod annotate;
pub mod background_model;
pub mod color_blob_detector;
pub mod frame_prep;
pub mod mask;
pub mod motion_extractor;
pub mod pixel;
pub mod shape;
