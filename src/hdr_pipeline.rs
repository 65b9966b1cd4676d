//! HDR calibration and merge pipeline module
//!
//! This module recovers camera response curves from bracketed exposures
//! and fuses exposure stacks into radiance images, with separate modules
//! for pixel storage, curves, merging, calibration, TIFF I/O and pipeline
//! orchestration.

pub mod calibration;
pub mod common;
pub mod conversions;
pub mod curve;
pub mod merge;
pub mod pixel;
pub mod tiff;

pub use common::{HdrError, Result};

pub use pixel::{OwnedBuffer, PixelBuffer};

pub use curve::{
    DEFAULT_GAUSSIAN_SIZE, DEFAULT_QUANTIZATION, ResponseCurve, ResponsePreset, WeightPreset,
};

pub use merge::{ExposureStack, MergeConfig, MergeConfigBuilder, WeightedMerge};

pub use calibration::{
    CalibrationConfig, CalibrationConfigBuilder, CalibrationOutcome, CalibrationState,
    IterationReport, PipelineTimings, RobertsonCalibrator,
};

pub use self::tiff::{
    ImageReader, OutputConfig, OutputConfigBuilder, RadianceWriter, StandardTiffWriter,
    TiffCompression, TiffImageReader,
};

pub use conversions::{
    CalibrationResult, CurveKind, CurveSelection, CurveSelectionBuilder, HdrCalibrationPipeline,
    HdrMergePipeline, export_curve,
};
