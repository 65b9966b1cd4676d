//! Common utilities module
//!
//! This module contains shared utilities used across the HDR pipeline.

pub mod error;

pub use error::{HdrError, Result};
