//! Exposure stacks and merge configuration types

use crate::hdr_pipeline::common::error::{HdrError, Result};
use crate::hdr_pipeline::curve::DEFAULT_QUANTIZATION;
use crate::hdr_pipeline::pixel::PixelBuffer;

/// Offset added to every weight so a fully saturated stack never sums to 0/0.
pub const DEFAULT_WEIGHT_EPSILON: f32 = 0.001;

/// Weight sums at or below this produce a black pixel instead of a division.
pub const DEFAULT_MIN_WEIGHT_SUM: f32 = 1e-4;

/// One bracketed sequence: images of the same scene with their exposure times.
#[derive(Debug, Default)]
pub struct ExposureStack<'a> {
    images: Vec<PixelBuffer<'a, f32>>,
    times: Vec<f32>,
}

impl<'a> ExposureStack<'a> {
    pub fn new(images: Vec<PixelBuffer<'a, f32>>, times: Vec<f32>) -> Self {
        Self { images, times }
    }

    pub fn push(&mut self, image: PixelBuffer<'a, f32>, time: f32) {
        self.images.push(image);
        self.times.push(time);
    }

    pub fn images(&self) -> &[PixelBuffer<'a, f32>] {
        &self.images
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Checks image/time counts, that every time is finite and positive,
    /// and that every image shares one size. Returns that size.
    pub fn validate(&self) -> Result<(usize, usize)> {
        if self.images.len() != self.times.len() {
            return Err(HdrError::ExposureCountMismatch {
                images: self.images.len(),
                times: self.times.len(),
            });
        }
        if let Some((index, &time)) = self
            .times
            .iter()
            .enumerate()
            .find(|(_, time)| !time.is_finite() || **time <= 0.0)
        {
            return Err(HdrError::InvalidExposureTime { index, time });
        }
        PixelBuffer::check_same_dimensions(&self.images)
    }

    /// Smallest channel count across the stack.
    pub fn channels(&self) -> usize {
        self.images.iter().map(PixelBuffer::channels).min().unwrap_or(0)
    }
}

/// Configuration for weighted merging
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Exposure time the fused radiance is scaled to
    pub target_time: f32,
    /// Number of bins of the response and weight curves
    pub quantization: usize,
    /// Offset added to each sample weight
    pub weight_epsilon: f32,
    /// Floor on the summed weight below which a pixel is set to 0
    pub min_weight_sum: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            target_time: 1.0,
            quantization: DEFAULT_QUANTIZATION,
            weight_epsilon: DEFAULT_WEIGHT_EPSILON,
            min_weight_sum: DEFAULT_MIN_WEIGHT_SUM,
        }
    }
}

impl MergeConfig {
    pub fn builder() -> MergeConfigBuilder {
        MergeConfigBuilder::default()
    }
}

/// Builder for MergeConfig
#[derive(Default)]
pub struct MergeConfigBuilder {
    target_time: Option<f32>,
    quantization: Option<usize>,
    weight_epsilon: Option<f32>,
    min_weight_sum: Option<f32>,
}

impl MergeConfigBuilder {
    pub fn target_time(mut self, target_time: f32) -> Self {
        self.target_time = Some(target_time);
        self
    }

    pub fn quantization(mut self, bins: usize) -> Self {
        self.quantization = Some(bins);
        self
    }

    pub fn weight_epsilon(mut self, epsilon: f32) -> Self {
        self.weight_epsilon = Some(epsilon);
        self
    }

    pub fn min_weight_sum(mut self, floor: f32) -> Self {
        self.min_weight_sum = Some(floor);
        self
    }

    pub fn build(self) -> MergeConfig {
        let default = MergeConfig::default();
        MergeConfig {
            target_time: self.target_time.unwrap_or(default.target_time),
            quantization: self.quantization.unwrap_or(default.quantization),
            weight_epsilon: self.weight_epsilon.unwrap_or(default.weight_epsilon),
            min_weight_sum: self.min_weight_sum.unwrap_or(default.min_weight_sum),
        }
    }
}
