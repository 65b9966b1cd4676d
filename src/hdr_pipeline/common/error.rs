use thiserror::Error;

#[derive(Error, Debug)]
pub enum HdrError {
    #[error("Image group is empty")]
    EmptyGroup,

    #[error("Image size mismatch: expected {expected_width}x{expected_height}, found {width}x{height}")]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("Exposure count mismatch: {images} images but {times} exposure times")]
    ExposureCountMismatch { images: usize, times: usize },

    #[error("Exposure {index} has invalid time {time}: must be finite and positive")]
    InvalidExposureTime { index: usize, time: f32 },

    #[error("Buffer size mismatch: {0} vs {1} samples")]
    SizeMismatch(usize, usize),

    #[error("Not enough channels: {required} required, {available} available")]
    ChannelMismatch { required: usize, available: usize },

    #[error("Curve size mismatch: {expected} bins expected, found {found}")]
    CurveSizeMismatch { expected: usize, found: usize },

    #[error("Curve is empty")]
    EmptyCurve,

    #[error("Invalid buffer layout: {0}")]
    InvalidLayout(String),

    #[error("Buffer is a read-only view")]
    ReadOnlyBuffer,

    #[error("Group index {index} out of range ({count} groups)")]
    GroupIndexOutOfRange { index: usize, count: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No curve supplied for {0}")]
    MissingCurve(String),

    #[error("Invalid curve file: {0}")]
    FileFormat(String),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode TIFF image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl HdrError {
    /// Structural precondition violations: shapes, counts, layouts.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HdrError::EmptyGroup
                | HdrError::DimensionMismatch { .. }
                | HdrError::ExposureCountMismatch { .. }
                | HdrError::InvalidExposureTime { .. }
                | HdrError::SizeMismatch(..)
                | HdrError::ChannelMismatch { .. }
                | HdrError::CurveSizeMismatch { .. }
                | HdrError::EmptyCurve
                | HdrError::InvalidLayout(_)
                | HdrError::ReadOnlyBuffer
                | HdrError::GroupIndexOutOfRange { .. }
                | HdrError::InvalidConfig(_)
        )
    }

    pub fn is_file_format(&self) -> bool {
        matches!(self, HdrError::FileFormat(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(
            self,
            HdrError::IoError(_) | HdrError::InputReadError(_) | HdrError::OutputWriteError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HdrError>;
