use std::io::Write;

use crate::hdr_pipeline::common::error::Result;
use crate::hdr_pipeline::pixel::PixelBuffer;
use crate::hdr_pipeline::tiff::types::OutputConfig;

pub trait RadianceWriter {
    fn write_radiance(
        &self,
        image: &PixelBuffer<'_, f32>,
        output: &mut dyn Write,
        config: &OutputConfig,
    ) -> Result<()>;
}
