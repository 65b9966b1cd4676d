//! Pixel storage module
//!
//! Uniform access to interleaved sample buffers, whether they are
//! allocated here or borrowed from the host application.

mod buffer;


pub use buffer::{OwnedBuffer, PixelBuffer};
