//! Exposure merging module
//!
//! Fuses bracketed exposure stacks into radiance buffers.

pub mod types;
mod weighted_merge;

#[cfg(test)]
mod tests;

pub use types::{
    DEFAULT_MIN_WEIGHT_SUM, DEFAULT_WEIGHT_EPSILON, ExposureStack, MergeConfig, MergeConfigBuilder,
};
pub use weighted_merge::WeightedMerge;
