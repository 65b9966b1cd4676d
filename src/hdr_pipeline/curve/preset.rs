//! Named curve presets offered to the host.
//!
//! `FromFile` and `Custom` leave the curve alone: the caller supplies it
//! from a file or from host-edited values.

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::hdr_pipeline::curve::response_curve::ResponseCurve;
use crate::hdr_pipeline::curve::shapes::DEFAULT_GAUSSIAN_SIZE;

#[repr(u32)]
#[derive(Debug, Display, EnumIter, EnumString, Copy, Clone, PartialEq, Eq, Default)]
pub enum ResponsePreset {
    #[strum(to_string = "From File", serialize = "from-file")]
    FromFile = 0,
    #[default]
    #[strum(to_string = "Linear", serialize = "linear")]
    Linear = 1,
    #[strum(to_string = "Gamma", serialize = "gamma")]
    Gamma = 2,
    #[strum(to_string = "Log10", serialize = "log10")]
    Log10 = 3,
    #[strum(to_string = "Custom", serialize = "custom")]
    Custom = 4,
}

impl ResponsePreset {
    /// Host choice index; unknown values fall back to `Linear`.
    pub fn from_index(index: u32) -> Self {
        Self::iter()
            .find(|preset| *preset as u32 == index)
            .unwrap_or(Self::Linear)
    }

    /// Option labels in index order.
    pub fn labels() -> Vec<String> {
        Self::iter().map(|preset| preset.to_string()).collect()
    }

    pub fn needs_external_curve(self) -> bool {
        matches!(self, Self::FromFile | Self::Custom)
    }

    /// Fills `response` with the preset shape. Returns `false` when the
    /// preset leaves the curve to the caller.
    pub fn apply(self, response: &mut ResponseCurve) -> bool {
        match self {
            Self::FromFile | Self::Custom => return false,
            Self::Linear => response.set_linear(),
            Self::Gamma => response.set_gamma(),
            Self::Log10 => response.set_log10(),
        }
        true
    }
}

#[repr(u32)]
#[derive(Debug, Display, EnumIter, EnumString, Copy, Clone, PartialEq, Eq, Default)]
pub enum WeightPreset {
    #[strum(to_string = "From File", serialize = "from-file")]
    FromFile = 0,
    #[strum(to_string = "Linear", serialize = "linear")]
    Linear = 1,
    #[default]
    #[strum(to_string = "Gaussian", serialize = "gaussian")]
    Gaussian = 2,
    #[strum(to_string = "Gaussian Custom", serialize = "gaussian-custom")]
    GaussianCustom = 3,
    #[strum(to_string = "Triangular", serialize = "triangular")]
    Triangular = 4,
    #[strum(to_string = "Plateau", serialize = "plateau")]
    Plateau = 5,
    #[strum(to_string = "Flat", serialize = "flat")]
    Flat = 6,
    #[strum(to_string = "Custom", serialize = "custom")]
    Custom = 7,
}

impl WeightPreset {
    /// Host choice index; unknown values fall back to `Linear`.
    pub fn from_index(index: u32) -> Self {
        Self::iter()
            .find(|preset| *preset as u32 == index)
            .unwrap_or(Self::Linear)
    }

    pub fn labels() -> Vec<String> {
        Self::iter().map(|preset| preset.to_string()).collect()
    }

    pub fn needs_external_curve(self) -> bool {
        matches!(self, Self::FromFile | Self::Custom)
    }

    /// `gaussian_size` is only read by `GaussianCustom`; `Gaussian` uses
    /// [`DEFAULT_GAUSSIAN_SIZE`].
    pub fn apply(self, weight: &mut ResponseCurve, gaussian_size: f32) -> bool {
        match self {
            Self::FromFile | Self::Custom => return false,
            Self::Linear => weight.set_linear(),
            Self::Gaussian => weight.set_gaussian(DEFAULT_GAUSSIAN_SIZE),
            Self::GaussianCustom => weight.set_gaussian(gaussian_size),
            Self::Triangular => weight.set_triangular(),
            Self::Plateau => weight.set_plateau(),
            Self::Flat => weight.set_one(),
        }
        true
    }
}
