//! Per-channel discretized curves used for camera response and sample weights.

use std::ops::{Add, MulAssign, Sub};

use tracing::{trace, warn};

use crate::hdr_pipeline::common::error::{HdrError, Result};

/// Number of channels of an RGB curve.
pub const RGB_CHANNELS: usize = 3;

/// Bin count for 12-bit sources.
pub const DEFAULT_QUANTIZATION: usize = 4096;

/// A sampled function over `[0, 1]`, stored as `bins` values per channel.
///
/// Every channel has the same number of bins. A continuous sample is
/// mapped to a bin with [`sample_to_bin`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCurve {
    channels: Vec<Vec<f32>>,
}

/// Maps a sample to its bin: `round(clamp(sample, 0, 1) * (bins - 1))`.
///
/// Negative samples land in bin 0, samples above 1 in the last bin and
/// NaN in bin 0.
pub fn sample_to_bin(sample: f32, bins: usize) -> usize {
    if bins <= 1 {
        return 0;
    }
    let clamped = if sample.is_nan() { 0.0 } else { sample.clamp(0.0, 1.0) };
    let index = (clamped * (bins - 1) as f32).round() as usize;
    index.min(bins - 1)
}

impl ResponseCurve {
    /// Zero-filled RGB curve.
    pub fn new(bins: usize) -> Self {
        Self::with_channels(RGB_CHANNELS, bins)
    }

    /// Zero-filled curve with an arbitrary channel count.
    pub fn with_channels(channel_count: usize, bins: usize) -> Self {
        Self {
            channels: vec![vec![0.0; bins]; channel_count],
        }
    }

    /// Builds a curve from per-channel values, e.g. keyframes edited by the host.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self> {
        let bins = channels.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = channels.iter().find(|channel| channel.len() != bins) {
            return Err(HdrError::CurveSizeMismatch {
                expected: bins,
                found: bad.len(),
            });
        }
        Ok(Self { channels })
    }

    pub fn bins(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins() == 0 || self.channels.is_empty()
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.channels[channel]
    }

    /// `(bin, value)` pairs of one channel, for hosts that display curves
    /// as keyframes.
    pub fn points(&self, channel: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.channels[channel].iter().copied().enumerate()
    }

    pub fn bin_index(&self, sample: f32) -> usize {
        sample_to_bin(sample, self.bins())
    }

    /// Curve value at the bin of `sample`.
    pub fn value(&self, sample: f32, channel: usize) -> f32 {
        self.channels[channel][self.bin_index(sample)]
    }

    pub fn value_mut(&mut self, sample: f32, channel: usize) -> &mut f32 {
        let index = self.bin_index(sample);
        &mut self.channels[channel][index]
    }

    pub fn set_zero(&mut self) {
        self.fill(0.0);
    }

    pub fn fill(&mut self, value: f32) {
        for curve in &mut self.channels {
            curve.fill(value);
        }
    }

    pub fn set_all_channels(&mut self, index: usize, value: f32) {
        for curve in &mut self.channels {
            curve[index] = value;
        }
    }

    fn check_same_shape(&self, other: &ResponseCurve) -> Result<()> {
        if self.channel_count() != other.channel_count() {
            return Err(HdrError::ChannelMismatch {
                required: self.channel_count(),
                available: other.channel_count(),
            });
        }
        if self.bins() != other.bins() {
            return Err(HdrError::CurveSizeMismatch {
                expected: self.bins(),
                found: other.bins(),
            });
        }
        Ok(())
    }

    fn zip_with(&self, other: &ResponseCurve, op: impl Fn(f32, f32) -> f32) -> Result<Self> {
        self.check_same_shape(other)?;
        let channels = self
            .channels
            .iter()
            .zip(&other.channels)
            .map(|(curve, other_curve)| {
                curve
                    .iter()
                    .zip(other_curve)
                    .map(|(&a, &b)| op(a, b))
                    .collect()
            })
            .collect();
        Ok(Self { channels })
    }

    /// Channel-by-channel sum into a new curve.
    pub fn sum(&self, other: &ResponseCurve) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Channel-by-channel difference into a new curve.
    pub fn subtract(&self, other: &ResponseCurve) -> Result<Self> {
        self.zip_with(other, |a, b| a - b)
    }

    /// In-place elementwise product.
    pub fn multiply(&mut self, other: &ResponseCurve) -> Result<()> {
        self.check_same_shape(other)?;
        for (curve, other_curve) in self.channels.iter_mut().zip(&other.channels) {
            for (value, &factor) in curve.iter_mut().zip(other_curve) {
                *value *= factor;
            }
        }
        Ok(())
    }

    /// Replaces every nonzero bin by its reciprocal. Zero bins stay zero.
    pub fn inverse_all_values(&mut self) {
        for value in self.channels.iter_mut().flatten() {
            if *value != 0.0 {
                *value = 1.0 / *value;
            }
        }
    }

    pub fn set_all_absolute(&mut self) {
        for value in self.channels.iter_mut().flatten() {
            *value = value.abs();
        }
    }

    /// Bin whose value [`ResponseCurve::normalize`] scales to 1.
    ///
    /// Midpoint between the first and last nonzero bins, moved forward to
    /// the first nonzero bin at or after it. `None` for an all-zero channel.
    pub fn normalization_pivot(&self, channel: usize) -> Option<usize> {
        pivot_of(&self.channels[channel])
    }

    /// Divides each channel by its pivot value so the pivot bin becomes 1.
    ///
    /// All-zero channels have no pivot and are left untouched.
    pub fn normalize(&mut self) {
        for (channel, curve) in self.channels.iter_mut().enumerate() {
            let Some(pivot) = pivot_of(curve) else {
                warn!(channel, "Cannot normalize an all-zero curve channel");
                continue;
            };
            let pivot_value = curve[pivot];
            trace!(channel, pivot, pivot_value, "Normalizing curve channel");
            for value in curve.iter_mut() {
                *value /= pivot_value;
            }
        }
    }

    /// Fills runs of zero bins by linear interpolation between the nonzero
    /// bins around them. Bin 0 always counts as an anchor; trailing zeros
    /// after the last nonzero bin are kept.
    pub fn interpolate_missing_values(&mut self) {
        for curve in &mut self.channels {
            let mut anchor = 0;
            for index in 1..curve.len() {
                if curve[index] == 0.0 {
                    continue;
                }
                if anchor + 1 < index {
                    let start = curve[anchor];
                    let step = (curve[index] - start) / (index - anchor) as f32;
                    for j in anchor + 1..index {
                        curve[j] = start + step * (j - anchor) as f32;
                    }
                }
                anchor = index;
            }
        }
    }

    /// Sum of every bin of every channel.
    pub fn sum_all(curve: &ResponseCurve) -> f64 {
        curve
            .channels
            .iter()
            .flatten()
            .map(|&value| value as f64)
            .sum()
    }
}

fn pivot_of(curve: &[f32]) -> Option<usize> {
    let first = curve.iter().position(|&v| v != 0.0)?;
    let last = curve.iter().rposition(|&v| v != 0.0)?;
    let mut pivot = first + (last - first) / 2;
    while pivot < last && curve[pivot] == 0.0 {
        pivot += 1;
    }
    Some(pivot)
}

/// # Panics
///
/// Panics when the curves differ in shape; use [`ResponseCurve::sum`] to
/// get an error instead.
impl Add for &ResponseCurve {
    type Output = ResponseCurve;

    fn add(self, rhs: Self) -> ResponseCurve {
        self.sum(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

/// # Panics
///
/// Panics when the curves differ in shape; use [`ResponseCurve::subtract`]
/// to get an error instead.
impl Sub for &ResponseCurve {
    type Output = ResponseCurve;

    fn sub(self, rhs: Self) -> ResponseCurve {
        self.subtract(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl MulAssign<&ResponseCurve> for ResponseCurve {
    fn mul_assign(&mut self, rhs: &ResponseCurve) {
        self.multiply(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}
