//! Calibration configuration and result types

use crate::hdr_pipeline::calibration::timing::PipelineTimings;
use crate::hdr_pipeline::common::error::{HdrError, Result};
use crate::hdr_pipeline::curve::{DEFAULT_QUANTIZATION, ResponseCurve};

pub const DEFAULT_MAX_ITERATIONS: usize = 500;
pub const DEFAULT_THRESHOLD: f64 = 0.01;

/// Configuration for Robertson response calibration
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// Upper bound on refinement iterations
    pub max_iterations: usize,
    /// Mean absolute per-channel curve change below which iteration stops
    pub threshold: f64,
    /// Number of bins of the recovered response curve
    pub quantization: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
            quantization: DEFAULT_QUANTIZATION,
        }
    }
}

impl CalibrationConfig {
    pub fn builder() -> CalibrationConfigBuilder {
        CalibrationConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantization < 2 {
            return Err(HdrError::InvalidConfig(format!(
                "quantization must be at least 2 bins, got {}",
                self.quantization
            )));
        }
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(HdrError::InvalidConfig(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Builder for CalibrationConfig
#[derive(Default)]
pub struct CalibrationConfigBuilder {
    max_iterations: Option<usize>,
    threshold: Option<f64>,
    quantization: Option<usize>,
}

impl CalibrationConfigBuilder {
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn quantization(mut self, bins: usize) -> Self {
        self.quantization = Some(bins);
        self
    }

    pub fn build(self) -> CalibrationConfig {
        let default = CalibrationConfig::default();
        CalibrationConfig {
            max_iterations: self.max_iterations.unwrap_or(default.max_iterations),
            threshold: self.threshold.unwrap_or(default.threshold),
            quantization: self.quantization.unwrap_or(default.quantization),
        }
    }
}

/// How a calibration run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    /// The curve change dropped below the threshold.
    Converged,
    /// The iteration budget ran out first.
    Exhausted,
    /// The cancellation flag was raised.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    pub state: CalibrationState,
    /// Completed iterations
    pub iterations: usize,
    /// Curve change of the last completed iteration
    pub last_diff: Option<f64>,
    pub timings: PipelineTimings,
}

impl CalibrationOutcome {
    pub fn converged(&self) -> bool {
        self.state == CalibrationState::Converged
    }
}

/// Progress passed to the observer after every iteration.
#[derive(Debug, Clone, Copy)]
pub struct IterationReport<'a> {
    /// Zero-based iteration index
    pub iteration: usize,
    pub diff: f64,
    /// Response after this iteration
    pub response: &'a ResponseCurve,
}
