//! Response calibration module
//!
//! Recovers a camera response curve from bracketed exposure groups with the
//! Robertson iterative scheme, and reports per-phase timings.

mod calibrator;
pub mod timing;
pub mod types;

#[cfg(test)]
mod tests;

pub use calibrator::RobertsonCalibrator;
pub use timing::{PipelineTimings, StepTiming, Timer};
pub use types::{
    CalibrationConfig, CalibrationConfigBuilder, CalibrationOutcome, CalibrationState,
    DEFAULT_MAX_ITERATIONS, DEFAULT_THRESHOLD, IterationReport,
};
