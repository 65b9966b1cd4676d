//! TIFF exposure reader built on the `tiff` crate.

use std::io::Cursor;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use crate::hdr_pipeline::common::error::{HdrError, Result};
use crate::hdr_pipeline::pixel::OwnedBuffer;
use crate::hdr_pipeline::tiff::reader::ImageReader;

/// Reads Gray, GrayA, RGB and RGBA TIFF images.
///
/// Unsigned integer samples are scaled by the maximum of their type, so an
/// 8-bit 255 and a 16-bit 65535 both become 1.0. Float samples are kept
/// as they are.
pub struct TiffImageReader;

trait TiffSample: Copy {
    fn to_normalized_f32(self) -> f32;
}

impl TiffSample for u8 {
    #[inline]
    fn to_normalized_f32(self) -> f32 {
        self as f32 / u8::MAX as f32
    }
}

impl TiffSample for u16 {
    #[inline]
    fn to_normalized_f32(self) -> f32 {
        self as f32 / u16::MAX as f32
    }
}

impl TiffSample for u32 {
    #[inline]
    fn to_normalized_f32(self) -> f32 {
        (self as f64 / u32::MAX as f64) as f32
    }
}

impl TiffSample for f32 {
    #[inline]
    fn to_normalized_f32(self) -> f32 {
        self
    }
}

impl TiffSample for f64 {
    #[inline]
    fn to_normalized_f32(self) -> f32 {
        self as f32
    }
}

fn channel_count(color_type: ColorType) -> Result<usize> {
    match color_type {
        ColorType::Gray(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) => Ok(4),
        other => Err(HdrError::UnsupportedFormat(format!("TIFF color type {other:?}"))),
    }
}

fn normalize<T: TiffSample>(
    samples: &[T],
    width: usize,
    height: usize,
    channels: usize,
) -> Result<OwnedBuffer<f32>> {
    let data = samples.iter().map(|&v| v.to_normalized_f32()).collect();
    OwnedBuffer::from_vec(data, width, height, channels)
        .map_err(|e| HdrError::DecodeError(e.to_string()))
}

impl ImageReader for TiffImageReader {
    fn read_image(&self, data: &[u8]) -> Result<OwnedBuffer<f32>> {
        debug!("Decoding TIFF image, {} bytes", data.len());

        let mut decoder =
            Decoder::new(Cursor::new(data)).map_err(|e| HdrError::DecodeError(e.to_string()))?;
        let (width, height) = decoder
            .dimensions()
            .map_err(|e| HdrError::DecodeError(e.to_string()))?;
        let color_type = decoder
            .colortype()
            .map_err(|e| HdrError::DecodeError(e.to_string()))?;
        let channels = channel_count(color_type)?;

        let (width, height) = (width as usize, height as usize);
        let image = match decoder
            .read_image()
            .map_err(|e| HdrError::DecodeError(e.to_string()))?
        {
            DecodingResult::U8(buf) => normalize(&buf, width, height, channels)?,
            DecodingResult::U16(buf) => normalize(&buf, width, height, channels)?,
            DecodingResult::U32(buf) => normalize(&buf, width, height, channels)?,
            DecodingResult::F32(buf) => normalize(&buf, width, height, channels)?,
            DecodingResult::F64(buf) => normalize(&buf, width, height, channels)?,
            _ => {
                return Err(HdrError::UnsupportedFormat(format!(
                    "TIFF sample format of {color_type:?}"
                )));
            }
        };

        debug!("Decoded image: {}x{}x{}", width, height, channels);
        Ok(image)
    }
}
