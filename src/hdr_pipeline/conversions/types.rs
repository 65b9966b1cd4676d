//! Curve selection types shared by the pipelines

use std::path::PathBuf;

use strum_macros::{Display, EnumString};
use tracing::info;

use crate::hdr_pipeline::common::error::{HdrError, Result};
use crate::hdr_pipeline::curve::{
    DEFAULT_GAUSSIAN_SIZE, ResponseCurve, ResponsePreset, WeightPreset,
};

/// Which of the two curves of a merge a file or preset describes.
#[derive(Debug, Display, EnumString, Copy, Clone, PartialEq, Eq)]
pub enum CurveKind {
    #[strum(to_string = "Response Function", serialize = "response")]
    Response,
    #[strum(to_string = "Weight Function", serialize = "weight")]
    Weight,
}

/// Where the response and weight curves of a pipeline come from.
#[derive(Debug, Clone)]
pub struct CurveSelection {
    pub response_preset: ResponsePreset,
    pub weight_preset: WeightPreset,
    /// Width used by `WeightPreset::GaussianCustom`
    pub gaussian_size: f32,
    /// Curve file read when the response preset is `FromFile`
    pub response_path: Option<PathBuf>,
    /// Curve file read when the weight preset is `FromFile`
    pub weight_path: Option<PathBuf>,
}

impl Default for CurveSelection {
    fn default() -> Self {
        Self {
            response_preset: ResponsePreset::default(),
            weight_preset: WeightPreset::default(),
            gaussian_size: DEFAULT_GAUSSIAN_SIZE,
            response_path: None,
            weight_path: None,
        }
    }
}

impl CurveSelection {
    pub fn builder() -> CurveSelectionBuilder {
        CurveSelectionBuilder::default()
    }

    /// Builds the response curve, with `bins` bins unless it is read
    /// from a file.
    ///
    /// `Ok(None)` for `Custom`: the host supplies the curve itself.
    pub fn response_curve(&self, bins: usize) -> Result<Option<ResponseCurve>> {
        let mut curve = ResponseCurve::new(bins);
        if self.response_preset.apply(&mut curve) {
            return Ok(Some(curve));
        }
        match self.response_preset {
            ResponsePreset::FromFile => {
                load_curve(self.response_path.as_ref(), CurveKind::Response).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Builds the weight curve; `Ok(None)` for `Custom`.
    pub fn weight_curve(&self, bins: usize) -> Result<Option<ResponseCurve>> {
        let mut curve = ResponseCurve::new(bins);
        if self.weight_preset.apply(&mut curve, self.gaussian_size) {
            return Ok(Some(curve));
        }
        match self.weight_preset {
            WeightPreset::FromFile => {
                load_curve(self.weight_path.as_ref(), CurveKind::Weight).map(Some)
            }
            _ => Ok(None),
        }
    }
}

fn load_curve(path: Option<&PathBuf>, kind: CurveKind) -> Result<ResponseCurve> {
    let path = path.ok_or_else(|| HdrError::MissingCurve(kind.to_string()))?;
    let curve = ResponseCurve::read(path)?;
    info!(
        path = %path.display(),
        bins = curve.bins(),
        "Loaded {}",
        kind
    );
    Ok(curve)
}

/// Builder for CurveSelection
#[derive(Default)]
pub struct CurveSelectionBuilder {
    response_preset: Option<ResponsePreset>,
    weight_preset: Option<WeightPreset>,
    gaussian_size: Option<f32>,
    response_path: Option<PathBuf>,
    weight_path: Option<PathBuf>,
}

impl CurveSelectionBuilder {
    pub fn response_preset(mut self, preset: ResponsePreset) -> Self {
        self.response_preset = Some(preset);
        self
    }

    pub fn weight_preset(mut self, preset: WeightPreset) -> Self {
        self.weight_preset = Some(preset);
        self
    }

    pub fn gaussian_size(mut self, size: f32) -> Self {
        self.gaussian_size = Some(size);
        self
    }

    /// Also switches the response preset to `FromFile`.
    pub fn response_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.response_path = Some(path.into());
        self.response_preset = Some(ResponsePreset::FromFile);
        self
    }

    /// Also switches the weight preset to `FromFile`.
    pub fn weight_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.weight_path = Some(path.into());
        self.weight_preset = Some(WeightPreset::FromFile);
        self
    }

    pub fn build(self) -> CurveSelection {
        let default = CurveSelection::default();
        CurveSelection {
            response_preset: self.response_preset.unwrap_or(default.response_preset),
            weight_preset: self.weight_preset.unwrap_or(default.weight_preset),
            gaussian_size: self.gaussian_size.unwrap_or(default.gaussian_size),
            response_path: self.response_path.or(default.response_path),
            weight_path: self.weight_path.or(default.weight_path),
        }
    }
}
