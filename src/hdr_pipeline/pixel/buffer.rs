//! Strided pixel storage that is either owned or borrowed from the host.

use num_traits::Float;
use rayon::prelude::*;

use crate::hdr_pipeline::common::error::{HdrError, Result};

/// Backing memory of a [`PixelBuffer`].
///
/// Views never free the memory they point into; only `Owned` storage is
/// released when the buffer is dropped.
#[derive(Debug)]
enum Storage<'a, T> {
    Owned(Vec<T>),
    Borrowed(&'a [T]),
    BorrowedMut(&'a mut [T]),
}

/// A width x height x channels array of interleaved samples.
///
/// Rows are `row_stride` samples apart, which lets the buffer describe
/// host images whose rows are padded. Coordinates are checked on every
/// accessor; an out of range coordinate is a caller bug and panics.
#[derive(Debug)]
pub struct PixelBuffer<'a, T> {
    storage: Storage<'a, T>,
    width: usize,
    height: usize,
    channels: usize,
    row_stride: usize,
}

/// A buffer that owns its samples.
pub type OwnedBuffer<T> = PixelBuffer<'static, T>;

impl<T> Default for PixelBuffer<'_, T> {
    fn default() -> Self {
        Self {
            storage: Storage::Owned(Vec::new()),
            width: 0,
            height: 0,
            channels: 0,
            row_stride: 0,
        }
    }
}

impl<'a, T> PixelBuffer<'a, T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Logical number of samples, `width * height * channels`.
    pub fn len(&self) -> usize {
        self.width * self.height * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.storage, Storage::Borrowed(_))
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn data(&self) -> &[T] {
        match &self.storage {
            Storage::Owned(data) => data,
            Storage::Borrowed(data) => data,
            Storage::BorrowedMut(data) => data,
        }
    }

    fn data_mut(&mut self) -> Result<&mut [T]> {
        match &mut self.storage {
            Storage::Owned(data) => Ok(data),
            Storage::Borrowed(_) => Err(HdrError::ReadOnlyBuffer),
            Storage::BorrowedMut(data) => Ok(data),
        }
    }

    fn row_len(&self) -> usize {
        self.width * self.channels
    }

    fn offset(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} buffer",
            self.width,
            self.height
        );
        y * self.row_stride + x * self.channels
    }

    /// The `channels` contiguous samples at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> &[T] {
        let offset = self.offset(x, y);
        &self.data()[offset..offset + self.channels]
    }

    /// Mutable samples at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics on out of range coordinates or when the buffer is a
    /// read-only view.
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [T] {
        let offset = self.offset(x, y);
        let channels = self.channels;
        let data = self
            .data_mut()
            .unwrap_or_else(|_| panic!("cannot write pixel ({x}, {y}) of a read-only view"));
        &mut data[offset..offset + channels]
    }

    /// The `width * channels` samples of row `y`, without padding.
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} outside buffer of height {}", self.height);
        let start = y * self.row_stride;
        &self.data()[start..start + self.row_len()]
    }

    /// Iterates the logical samples in row-major order, skipping padding.
    pub fn samples(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.height).flat_map(move |y| self.row(y).iter())
    }

    fn samples_mut(&mut self) -> Result<impl Iterator<Item = &mut T> + '_> {
        let row_len = self.row_len();
        let stride = self.row_stride.max(1);
        let height = self.height;
        let data = self.data_mut()?;
        Ok(data
            .chunks_mut(stride)
            .take(height)
            .flat_map(move |row| row[..row_len].iter_mut()))
    }

    fn same_shape<U>(&self, other: &PixelBuffer<'_, U>) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }
}

impl<'a, T: Send + Sync> PixelBuffer<'a, T> {
    /// Rows in parallel, each trimmed to `width * channels` samples.
    pub fn par_rows(&self) -> impl IndexedParallelIterator<Item = &[T]> + '_ {
        let row_len = self.row_len();
        self.data()
            .par_chunks(self.row_stride.max(1))
            .take(self.height)
            .map(move |row| &row[..row_len])
    }

    /// Mutable rows in parallel, each trimmed to `width * channels` samples.
    pub fn par_rows_mut(&mut self) -> Result<impl IndexedParallelIterator<Item = &mut [T]> + '_> {
        let row_len = self.row_len();
        let stride = self.row_stride.max(1);
        let height = self.height;
        let data = self.data_mut()?;
        Ok(data
            .par_chunks_mut(stride)
            .take(height)
            .map(move |row| &mut row[..row_len]))
    }
}

impl<T: Copy + Default> OwnedBuffer<T> {
    /// Allocates an owned, packed buffer.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        let mut buffer = Self::default();
        buffer.allocate(width, height, channels);
        buffer
    }

    /// Takes ownership of packed interleaved samples.
    pub fn from_vec(data: Vec<T>, width: usize, height: usize, channels: usize) -> Result<Self> {
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(HdrError::SizeMismatch(expected, data.len()));
        }
        Ok(Self {
            storage: Storage::Owned(data),
            width,
            height,
            channels,
            row_stride: width * channels,
        })
    }
}

impl<'a, T: Copy + Default> PixelBuffer<'a, T> {
    /// Replaces the storage with a new owned, packed buffer.
    ///
    /// Samples start at `T::default()`; callers that rely on zeroed
    /// memory still call [`PixelBuffer::set_zero`] after allocating.
    pub fn allocate(&mut self, width: usize, height: usize, channels: usize) {
        self.storage = Storage::Owned(vec![T::default(); width * height * channels]);
        self.width = width;
        self.height = height;
        self.channels = channels;
        self.row_stride = width * channels;
    }

    /// Non-owning read-only view over host memory.
    pub fn wrap(
        data: &'a [T],
        width: usize,
        height: usize,
        channels: usize,
        row_stride: usize,
    ) -> Result<Self> {
        check_layout(data.len(), width, height, channels, row_stride)?;
        Ok(Self {
            storage: Storage::Borrowed(data),
            width,
            height,
            channels,
            row_stride,
        })
    }

    /// Non-owning writable view over host memory, e.g. an output image.
    pub fn wrap_mut(
        data: &'a mut [T],
        width: usize,
        height: usize,
        channels: usize,
        row_stride: usize,
    ) -> Result<Self> {
        check_layout(data.len(), width, height, channels, row_stride)?;
        Ok(Self {
            storage: Storage::BorrowedMut(data),
            width,
            height,
            channels,
            row_stride,
        })
    }

    pub fn sample(&self, x: usize, y: usize, channel: usize) -> T {
        assert!(channel < self.channels, "channel {channel} outside {} channels", self.channels);
        self.pixel(x, y)[channel]
    }

    pub fn set_sample(&mut self, x: usize, y: usize, channel: usize, value: T) {
        assert!(channel < self.channels, "channel {channel} outside {} channels", self.channels);
        self.pixel_mut(x, y)[channel] = value;
    }

    /// Packed owned copy of the logical samples.
    pub fn to_owned_buffer(&self) -> OwnedBuffer<T> {
        PixelBuffer {
            storage: Storage::Owned(self.samples().copied().collect()),
            width: self.width,
            height: self.height,
            channels: self.channels,
            row_stride: self.row_len(),
        }
    }

    /// Fails with `EmptyGroup` for an empty slice and `DimensionMismatch`
    /// when any width/height differs from the first buffer's.
    pub fn check_same_dimensions(buffers: &[PixelBuffer<'_, T>]) -> Result<(usize, usize)> {
        let first = buffers.first().ok_or(HdrError::EmptyGroup)?;
        for buffer in buffers {
            if buffer.dimensions() != first.dimensions() {
                return Err(HdrError::DimensionMismatch {
                    expected_width: first.width,
                    expected_height: first.height,
                    width: buffer.width,
                    height: buffer.height,
                });
            }
        }
        Ok(first.dimensions())
    }
}

impl<'a, T: Float + Default + Send + Sync> PixelBuffer<'a, T> {
    pub fn set_zero(&mut self) -> Result<()> {
        self.par_rows_mut()?.for_each(|row| row.fill(T::zero()));
        Ok(())
    }

    /// Debug marker: first channel 1, every other channel 0.
    pub fn set_red(&mut self) -> Result<()> {
        let channels = self.channels;
        if channels == 0 {
            return Ok(());
        }
        self.par_rows_mut()?.for_each(|row| {
            for pixel in row.chunks_exact_mut(channels) {
                pixel.fill(T::zero());
                pixel[0] = T::one();
            }
        });
        Ok(())
    }

    pub fn multiply_scalar(&mut self, coefficient: T) -> Result<()> {
        self.par_rows_mut()?.for_each(|row| {
            for value in row.iter_mut() {
                *value = *value * coefficient;
            }
        });
        Ok(())
    }

    /// Elementwise product; both buffers must hold the same number of samples.
    pub fn multiply(&mut self, other: &PixelBuffer<'_, T>) -> Result<()> {
        self.zip_apply(other, |value, factor| value * factor)
    }

    /// Elementwise quotient; a zero divisor yields exactly 0.
    pub fn divide(&mut self, other: &PixelBuffer<'_, T>) -> Result<()> {
        self.zip_apply(other, |value, divisor| {
            if divisor == T::zero() { T::zero() } else { value / divisor }
        })
    }

    fn zip_apply<F>(&mut self, other: &PixelBuffer<'_, T>, op: F) -> Result<()>
    where
        F: Fn(T, T) -> T + Sync + Send,
    {
        if self.len() != other.len() {
            return Err(HdrError::SizeMismatch(self.len(), other.len()));
        }

        if self.same_shape(other) {
            self.par_rows_mut()?
                .zip(other.par_rows())
                .for_each(|(row, other_row)| {
                    for (value, &rhs) in row.iter_mut().zip(other_row) {
                        *value = op(*value, rhs);
                    }
                });
        } else {
            for (value, &rhs) in self.samples_mut()?.zip(other.samples()) {
                *value = op(*value, rhs);
            }
        }
        Ok(())
    }

    /// Zeroes this buffer, then copies `other.channels()` channels of every
    /// pixel. Extra channels stay at zero.
    pub fn copy_from(&mut self, other: &PixelBuffer<'_, T>) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(HdrError::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: other.width,
                height: other.height,
            });
        }
        if other.channels > self.channels {
            return Err(HdrError::ChannelMismatch {
                required: other.channels,
                available: self.channels,
            });
        }

        let dst_channels = self.channels;
        let src_channels = other.channels;
        self.set_zero()?;
        if src_channels == 0 {
            return Ok(());
        }
        self.par_rows_mut()?
            .zip(other.par_rows())
            .for_each(|(row, src_row)| {
                for (dst, src) in row
                    .chunks_exact_mut(dst_channels)
                    .zip(src_row.chunks_exact(src_channels))
                {
                    dst[..src_channels].copy_from_slice(src);
                }
            });
        Ok(())
    }
}

fn check_layout(
    len: usize,
    width: usize,
    height: usize,
    channels: usize,
    row_stride: usize,
) -> Result<()> {
    let row_len = width * channels;
    if row_stride < row_len {
        return Err(HdrError::InvalidLayout(format!(
            "row stride {row_stride} shorter than {width} pixels x {channels} channels"
        )));
    }
    let required = match height {
        0 => 0,
        h => (h - 1) * row_stride + row_len,
    };
    if len < required {
        return Err(HdrError::InvalidLayout(format!(
            "{len} samples cannot hold a {width}x{height}x{channels} image with stride {row_stride}"
        )));
    }
    Ok(())
}
