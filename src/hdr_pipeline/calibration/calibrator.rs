//! Robertson iterative recovery of the camera response.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, info_span, instrument};

use crate::hdr_pipeline::calibration::timing::{PipelineTimings, Timer};
use crate::hdr_pipeline::calibration::types::{
    CalibrationConfig, CalibrationOutcome, CalibrationState, IterationReport,
};
use crate::hdr_pipeline::common::error::{HdrError, Result};
use crate::hdr_pipeline::curve::{RGB_CHANNELS, ResponseCurve, sample_to_bin};
use crate::hdr_pipeline::merge::{ExposureStack, WeightedMerge};
use crate::hdr_pipeline::pixel::{OwnedBuffer, PixelBuffer};

/// Recovers a response curve from one or more bracketed groups.
///
/// Only the first three channels of each image take part; an alpha
/// channel is ignored. After [`RobertsonCalibrator::process`] the
/// calibrator holds the refined response and one radiance buffer per
/// group, sized to that group.
#[derive(Debug)]
pub struct RobertsonCalibrator {
    config: CalibrationConfig,
    merge: WeightedMerge,
    response: ResponseCurve,
    radiance: Vec<OwnedBuffer<f32>>,
}

impl RobertsonCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            merge: WeightedMerge::new(),
            response: ResponseCurve::new(0),
            radiance: Vec::new(),
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Response of the last run; empty before the first one.
    pub fn response(&self) -> &ResponseCurve {
        &self.response
    }

    pub fn group_count(&self) -> usize {
        self.radiance.len()
    }

    pub fn radiance(&self, group: usize) -> Result<&OwnedBuffer<f32>> {
        self.radiance.get(group).ok_or(HdrError::GroupIndexOutOfRange {
            index: group,
            count: self.radiance.len(),
        })
    }

    pub fn into_parts(self) -> (ResponseCurve, Vec<OwnedBuffer<f32>>) {
        (self.response, self.radiance)
    }

    pub fn process(
        &mut self,
        groups: &[ExposureStack<'_>],
        weight: &ResponseCurve,
    ) -> Result<CalibrationOutcome> {
        self.process_with(groups, weight, |_| {}, None)
    }

    /// Runs the calibration, calling `observer` after every iteration.
    ///
    /// `cancel` is polled before each iteration and between groups. A
    /// cancelled run returns `Ok` with [`CalibrationState::Cancelled`]
    /// and keeps the response and radiance of the last completed
    /// iteration.
    pub fn process_with<F>(
        &mut self,
        groups: &[ExposureStack<'_>],
        weight: &ResponseCurve,
        observer: F,
        cancel: Option<&AtomicBool>,
    ) -> Result<CalibrationOutcome>
    where
        F: FnMut(&IterationReport<'_>),
    {
        self.process_until(groups, weight, observer, || is_cancelled(cancel))
    }

    /// Same as [`RobertsonCalibrator::process_with`], with cancellation
    /// asked of `should_stop` at the same points.
    #[instrument(
        skip_all,
        fields(groups = groups.len(), max_iterations = self.config.max_iterations)
    )]
    pub fn process_until<F, S>(
        &mut self,
        groups: &[ExposureStack<'_>],
        weight: &ResponseCurve,
        mut observer: F,
        mut should_stop: S,
    ) -> Result<CalibrationOutcome>
    where
        F: FnMut(&IterationReport<'_>),
        S: FnMut() -> bool,
    {
        let mut timings = PipelineTimings::new();

        let timer = Timer::start("validate");
        self.config.validate()?;
        let sizes = check_groups(groups, weight)?;
        timings.record(timer);

        let bins = self.config.quantization;
        let allocate = || -> Vec<OwnedBuffer<f32>> {
            sizes
                .iter()
                .map(|&(width, height)| OwnedBuffer::new(width, height, RGB_CHANNELS))
                .collect()
        };
        self.radiance = allocate();
        // Groups merge here and replace `self.radiance` only once all of
        // them finished the iteration.
        let mut scratch = allocate();

        self.response = ResponseCurve::new(bins);
        self.response.set_linear();
        self.response.normalize();

        let timer = Timer::start("cardinality");
        let cardinality = info_span!("cardinality").in_scope(|| -> Result<ResponseCurve> {
            let mut histogram = vec![0.0f64; RGB_CHANNELS * bins];
            for image in groups.iter().flat_map(|group| group.images()) {
                accumulate_bins(image, bins, &mut histogram, |_, _, _| 1.0);
            }
            let mut cardinality = histogram_to_curve(&histogram, bins)?;
            cardinality.interpolate_missing_values();
            cardinality.inverse_all_values();
            Ok(cardinality)
        })?;
        timings.record(timer);

        let mut state = CalibrationState::Exhausted;
        let mut iterations = 0;
        let mut last_diff = None;

        for iteration in 0..self.config.max_iterations {
            if should_stop() {
                state = CalibrationState::Cancelled;
                break;
            }
            let _span = info_span!("iteration", iteration).entered();

            let timer = Timer::start("merge");
            let mut interrupted = false;
            for (group, radiance) in groups.iter().zip(scratch.iter_mut()) {
                if should_stop() {
                    interrupted = true;
                    break;
                }
                self.merge
                    .merge_time_domain(group, weight, &self.response, radiance)?;
            }
            timings.record(timer);
            if interrupted {
                state = CalibrationState::Cancelled;
                break;
            }
            std::mem::swap(&mut self.radiance, &mut scratch);

            let timer = Timer::start("refit");
            let mut accumulation = vec![0.0f64; RGB_CHANNELS * bins];
            for (group, radiance) in groups.iter().zip(&self.radiance) {
                for (image, &time) in group.images().iter().zip(group.times()) {
                    let time = time as f64;
                    accumulate_bins(image, bins, &mut accumulation, |x, y, channel| {
                        time * radiance.row(y)[x * RGB_CHANNELS + channel] as f64
                    });
                }
            }
            let mut refined = histogram_to_curve(&accumulation, bins)?;
            refined.multiply(&cardinality)?;
            refined.interpolate_missing_values();
            refined.normalize();
            timings.record(timer);

            let mut change = refined.subtract(&self.response)?;
            change.set_all_absolute();
            let diff = ResponseCurve::sum_all(&change) / RGB_CHANNELS as f64;

            self.response = refined;
            iterations = iteration + 1;
            last_diff = Some(diff);
            debug!(iteration, diff, "Calibration iteration complete");

            observer(&IterationReport {
                iteration,
                diff,
                response: &self.response,
            });

            if diff < self.config.threshold {
                state = CalibrationState::Converged;
                break;
            }
        }

        info!(?state, iterations, diff = ?last_diff, "Calibration finished");
        Ok(CalibrationOutcome {
            state,
            iterations,
            last_diff,
            timings,
        })
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Validates every group before any work starts and returns their sizes.
fn check_groups(
    groups: &[ExposureStack<'_>],
    weight: &ResponseCurve,
) -> Result<Vec<(usize, usize)>> {
    if groups.is_empty() {
        return Err(HdrError::EmptyGroup);
    }
    if weight.is_empty() {
        return Err(HdrError::EmptyCurve);
    }
    if weight.channel_count() < RGB_CHANNELS {
        return Err(HdrError::ChannelMismatch {
            required: RGB_CHANNELS,
            available: weight.channel_count(),
        });
    }

    groups
        .iter()
        .map(|group| {
            let size = group.validate()?;
            if group.channels() < RGB_CHANNELS {
                return Err(HdrError::ChannelMismatch {
                    required: RGB_CHANNELS,
                    available: group.channels(),
                });
            }
            Ok(size)
        })
        .collect()
}

/// Adds `contribution(x, y, channel)` to the bin of every RGB sample of
/// `image`. Rows are split across workers, each filling its own partial
/// histogram; the partials are summed at the end.
///
/// `histogram` is laid out channel-major: `channel * bins + bin`.
fn accumulate_bins<F>(
    image: &PixelBuffer<'_, f32>,
    bins: usize,
    histogram: &mut [f64],
    contribution: F,
) where
    F: Fn(usize, usize, usize) -> f64 + Sync,
{
    let source_channels = image.channels();
    let size = RGB_CHANNELS * bins;

    let partial = image
        .par_rows()
        .enumerate()
        .fold(
            || vec![0.0f64; size],
            |mut acc, (y, row)| {
                for (x, pixel) in row.chunks_exact(source_channels).enumerate() {
                    for (channel, &sample) in pixel[..RGB_CHANNELS].iter().enumerate() {
                        let bin = sample_to_bin(sample, bins);
                        acc[channel * bins + bin] += contribution(x, y, channel);
                    }
                }
                acc
            },
        )
        .reduce(
            || vec![0.0f64; size],
            |mut left, right| {
                for (l, r) in left.iter_mut().zip(right) {
                    *l += r;
                }
                left
            },
        );

    for (total, value) in histogram.iter_mut().zip(partial) {
        *total += value;
    }
}

fn histogram_to_curve(histogram: &[f64], bins: usize) -> Result<ResponseCurve> {
    ResponseCurve::from_channels(
        histogram
            .chunks(bins)
            .map(|channel| channel.iter().map(|&value| value as f32).collect())
            .collect(),
    )
}
