//! Built-in curve shapes. Each initializer writes the same values to
//! every channel, for every bin `i` with `t = i / (bins - 1)`.

use crate::hdr_pipeline::curve::response_curve::ResponseCurve;

/// Width of the default gaussian weight.
pub const DEFAULT_GAUSSIAN_SIZE: f32 = 4.0;

impl ResponseCurve {
    fn set_shape(&mut self, shape: impl Fn(usize, f32) -> f32) {
        let bins = self.bins();
        let coefficient = if bins > 1 { 1.0 / (bins - 1) as f32 } else { 0.0 };
        for index in 0..bins {
            self.set_all_channels(index, shape(index, index as f32 * coefficient));
        }
    }

    pub fn set_linear(&mut self) {
        self.set_shape(|_, t| t);
    }

    pub fn set_gamma(&mut self) {
        self.set_shape(|_, t| (4.0 * t).powf(1.7) + 1e-4);
    }

    /// Spans sixteen decades, from `1e-16` at bin 0 to 1 at the last bin.
    pub fn set_log10(&mut self) {
        const INVERSE_MAX_VALUE: f32 = 1.0 / 1e8;
        self.set_shape(|_, t| INVERSE_MAX_VALUE * 10.0f32.powf(t * 16.0 - 8.0));
    }

    /// Bell centred on the middle bin; `size` widens or narrows it.
    pub fn set_gaussian(&mut self, size: f32) {
        let bins = self.bins();
        let coefficient = if bins > 1 { 4.0 / (bins - 1) as f32 } else { 0.0 };
        self.set_shape(|index, _| {
            let factor = index as f32 / size * coefficient - 2.0 / size;
            (-factor * factor).exp()
        });
    }

    pub fn set_triangular(&mut self) {
        self.set_shape(|_, t| {
            let value = t * 1.8 + 0.1;
            if value >= 1.0 { 2.0 - value } else { value }
        });
    }

    pub fn set_plateau(&mut self) {
        self.set_shape(|_, t| 1.0 - (2.0 * t - 1.0).powi(12));
    }

    /// Constant 1, the "flat" weight.
    pub fn set_one(&mut self) {
        self.fill(1.0);
    }
}
