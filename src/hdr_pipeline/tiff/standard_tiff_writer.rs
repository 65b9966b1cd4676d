use std::io::{Cursor, Write};

use tiff::encoder::colortype::{Gray32Float, RGB32Float};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder};
use tracing::debug;

use crate::hdr_pipeline::common::error::{HdrError, Result};
use crate::hdr_pipeline::curve::RGB_CHANNELS;
use crate::hdr_pipeline::pixel::PixelBuffer;
use crate::hdr_pipeline::tiff::types::{OutputConfig, TiffCompression};
use crate::hdr_pipeline::tiff::writer::RadianceWriter;

/// Writes radiance as 32-bit float TIFF: RGB when the buffer has at least
/// three channels, otherwise the first channel as gray.
pub struct StandardTiffWriter;

fn compression(config: &OutputConfig) -> Compression {
    match config.compression {
        TiffCompression::None => Compression::Uncompressed,
        TiffCompression::Lzw => Compression::Lzw,
        TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
        TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
        TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
    }
}

impl RadianceWriter for StandardTiffWriter {
    fn write_radiance(
        &self,
        image: &PixelBuffer<'_, f32>,
        output: &mut dyn Write,
        config: &OutputConfig,
    ) -> Result<()> {
        debug!(
            "Encoding radiance TIFF: {}x{}x{}",
            image.width(),
            image.height(),
            image.channels()
        );

        let channels = image.channels();
        if channels == 0 {
            return Err(HdrError::UnsupportedFormat(
                "cannot encode an image without channels".to_string(),
            ));
        }
        let kept = if channels >= RGB_CHANNELS { RGB_CHANNELS } else { 1 };
        let data: Vec<f32> = (0..image.height())
            .flat_map(|y| image.row(y).chunks_exact(channels))
            .flat_map(|pixel| pixel[..kept].iter().copied())
            .collect();

        let mut buffer = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
                .map_err(|e| HdrError::EncodeError(e.to_string()))?
                .with_compression(compression(config));

            let (width, height) = (image.width() as u32, image.height() as u32);
            let encoded = if kept == RGB_CHANNELS {
                encoder.write_image::<RGB32Float>(width, height, &data)
            } else {
                encoder.write_image::<Gray32Float>(width, height, &data)
            };
            encoded.map_err(|e| HdrError::EncodeError(e.to_string()))?;
        }

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}
