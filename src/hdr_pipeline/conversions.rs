//! Pipeline orchestration module
//!
//! Ties decoding, merging, calibration and encoding together.

mod calibration_pipeline;
mod curve_export;
mod merge_pipeline;
pub mod types;


pub use calibration_pipeline::{CalibrationResult, HdrCalibrationPipeline, RESPONSE_FILE_NAME};
pub use curve_export::export_curve;
pub use merge_pipeline::HdrMergePipeline;
pub use types::{CurveKind, CurveSelection, CurveSelectionBuilder};
