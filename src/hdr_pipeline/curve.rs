//! Response and weight curves
//!
//! Discretized per-channel functions, their built-in shapes, presets and
//! the text file format used to exchange them.

mod curve_file;
pub mod preset;
mod response_curve;
mod shapes;


pub use preset::{ResponsePreset, WeightPreset};
pub use response_curve::{DEFAULT_QUANTIZATION, RGB_CHANNELS, ResponseCurve, sample_to_bin};
pub use shapes::DEFAULT_GAUSSIAN_SIZE;
