use crate::hdr_pipeline::common::error::Result;
use crate::hdr_pipeline::pixel::OwnedBuffer;

/// Decodes one encoded exposure into samples normalized to `[0, 1]`.
pub trait ImageReader {
    fn read_image(&self, data: &[u8]) -> Result<OwnedBuffer<f32>>;
}
