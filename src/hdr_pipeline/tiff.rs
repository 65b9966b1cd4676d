//! TIFF boundary
//!
//! Decodes bracketed exposures into normalized float buffers and encodes
//! radiance buffers as 32-bit float TIFF.

mod reader;
mod standard_tiff_writer;
mod tiff_reader;
pub mod types;
mod writer;


pub use reader::ImageReader;
pub use standard_tiff_writer::StandardTiffWriter;
pub use tiff_reader::TiffImageReader;
pub use types::{OutputConfig, OutputConfigBuilder, TiffCompression};
pub use writer::RadianceWriter;
