//! Weighted fusion of one exposure stack into a radiance buffer.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::hdr_pipeline::common::error::{HdrError, Result};
use crate::hdr_pipeline::curve::ResponseCurve;
use crate::hdr_pipeline::merge::types::{
    DEFAULT_MIN_WEIGHT_SUM, DEFAULT_WEIGHT_EPSILON, ExposureStack, MergeConfig,
};
use crate::hdr_pipeline::pixel::{OwnedBuffer, PixelBuffer};

/// Fuses bracketed exposures using a weight curve and a response curve.
///
/// Two forms are provided. [`WeightedMerge::merge`] produces display
/// radiance scaled to a target exposure time.
/// [`WeightedMerge::merge_time_domain`] produces the unnormalized
/// estimate `Σ w·r·t / Σ w·t²` that the Robertson re-fit is built on.
#[derive(Debug, Clone)]
pub struct WeightedMerge {
    weight_epsilon: f32,
    min_weight_sum: f32,
}

impl Default for WeightedMerge {
    fn default() -> Self {
        Self {
            weight_epsilon: DEFAULT_WEIGHT_EPSILON,
            min_weight_sum: DEFAULT_MIN_WEIGHT_SUM,
        }
    }
}

impl WeightedMerge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &MergeConfig) -> Self {
        Self {
            weight_epsilon: config.weight_epsilon,
            min_weight_sum: config.min_weight_sum,
        }
    }

    pub fn weight_epsilon(&self) -> f32 {
        self.weight_epsilon
    }

    pub fn min_weight_sum(&self) -> f32 {
        self.min_weight_sum
    }

    /// Validates the inputs and returns the number of channels to fuse.
    fn check_inputs(
        stack: &ExposureStack<'_>,
        weight: &ResponseCurve,
        response: &ResponseCurve,
        output: &PixelBuffer<'_, f32>,
    ) -> Result<usize> {
        if weight.is_empty() || response.is_empty() {
            return Err(HdrError::EmptyCurve);
        }
        let (width, height) = stack.validate()?;
        if output.dimensions() != (width, height) {
            return Err(HdrError::DimensionMismatch {
                expected_width: width,
                expected_height: height,
                width: output.width(),
                height: output.height(),
            });
        }

        let channels = output.channels();
        let available = stack
            .channels()
            .min(weight.channel_count())
            .min(response.channel_count());
        if channels > available {
            return Err(HdrError::ChannelMismatch {
                required: channels,
                available,
            });
        }
        Ok(channels)
    }

    /// Target-time form:
    ///
    /// ```text
    /// wsum = Σ (w(v) + ε) · r(v) / t
    /// wdiv = Σ (w(v) + ε)
    /// out  = wdiv > floor ? wsum / wdiv · target_time : 0
    /// ```
    #[instrument(level = "debug", skip_all, fields(images = stack.len(), target_time))]
    pub fn merge(
        &self,
        stack: &ExposureStack<'_>,
        weight: &ResponseCurve,
        response: &ResponseCurve,
        target_time: f32,
        output: &mut PixelBuffer<'_, f32>,
    ) -> Result<()> {
        let channels = Self::check_inputs(stack, weight, response, output)?;
        if channels == 0 {
            return Ok(());
        }

        let images = stack.images();
        let times = stack.times();
        let epsilon = self.weight_epsilon;
        let floor = self.min_weight_sum;

        output.par_rows_mut()?.enumerate().for_each(|(y, row)| {
            let sources: Vec<(&[f32], usize)> = images
                .iter()
                .map(|image| (image.row(y), image.channels()))
                .collect();

            for (x, pixel) in row.chunks_exact_mut(channels).enumerate() {
                for (channel, out) in pixel.iter_mut().enumerate() {
                    let mut wsum = 0.0f32;
                    let mut wdiv = 0.0f32;
                    for (&(source, source_channels), &time) in sources.iter().zip(times) {
                        let value = source[x * source_channels + channel];
                        let w = weight.value(value, channel) + epsilon;
                        wsum += w * response.value(value, channel) / time;
                        wdiv += w;
                    }
                    *out = if wdiv > floor {
                        wsum / wdiv * target_time
                    } else {
                        0.0
                    };
                }
            }
        });

        debug!("Target-time merge complete");
        Ok(())
    }

    /// Time-domain form used by the calibrator: accumulates `Σ w·r·t` into
    /// `output` and `Σ w·t²` into a weight buffer, then divides, with a
    /// zero weight sum giving 0.
    #[instrument(level = "debug", skip_all, fields(images = stack.len()))]
    pub fn merge_time_domain(
        &self,
        stack: &ExposureStack<'_>,
        weight: &ResponseCurve,
        response: &ResponseCurve,
        output: &mut PixelBuffer<'_, f32>,
    ) -> Result<()> {
        let channels = Self::check_inputs(stack, weight, response, output)?;
        if channels == 0 {
            return Ok(());
        }

        let (width, height) = output.dimensions();
        let mut weight_sum = OwnedBuffer::<f32>::new(width, height, channels);
        let images = stack.images();
        let times = stack.times();

        output
            .par_rows_mut()?
            .zip(weight_sum.par_rows_mut()?)
            .enumerate()
            .for_each(|(y, (row, weight_row))| {
                row.fill(0.0);
                weight_row.fill(0.0);

                for (image, &time) in images.iter().zip(times) {
                    let source = image.row(y);
                    let source_channels = image.channels();
                    let sqr_time = time * time;

                    for x in 0..width {
                        for channel in 0..channels {
                            let value = source[x * source_channels + channel];
                            let w = weight.value(value, channel);
                            let r = response.value(value, channel);
                            let index = x * channels + channel;
                            row[index] += w * r * time;
                            weight_row[index] += w * sqr_time;
                        }
                    }
                }
            });

        output.divide(&weight_sum)?;
        Ok(())
    }
}
