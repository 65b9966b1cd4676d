use std::io::Write;
use std::path::Path;

use tracing::{info, info_span, instrument, warn};

use crate::hdr_pipeline::{
    common::error::{HdrError, Result},
    conversions::types::{CurveKind, CurveSelection},
    curve::{RGB_CHANNELS, ResponseCurve},
    merge::{ExposureStack, MergeConfig, WeightedMerge},
    pixel::{OwnedBuffer, PixelBuffer},
    tiff::{ImageReader, OutputConfig, RadianceWriter, StandardTiffWriter, TiffImageReader},
};

/// Merges bracketed exposures into one radiance image using fixed curves.
pub struct HdrMergePipeline<R: ImageReader, W: RadianceWriter> {
    reader: R,
    writer: W,
    merge: WeightedMerge,
    merge_config: MergeConfig,
    output_config: OutputConfig,
    response: Option<ResponseCurve>,
    weight: Option<ResponseCurve>,
}

impl HdrMergePipeline<TiffImageReader, StandardTiffWriter> {
    pub fn new(
        merge_config: MergeConfig,
        output_config: OutputConfig,
        curves: &CurveSelection,
    ) -> Result<Self> {
        Self::with_custom(
            TiffImageReader,
            StandardTiffWriter,
            merge_config,
            output_config,
            curves,
        )
    }
}

impl<R: ImageReader, W: RadianceWriter> HdrMergePipeline<R, W> {
    /// Resolves both curves from `curves`, preset curves with
    /// `merge_config.quantization` bins. A `Custom` preset leaves the
    /// curve unset until [`HdrMergePipeline::set_response_curve`] or
    /// [`HdrMergePipeline::set_weight_curve`] is called.
    pub fn with_custom(
        reader: R,
        writer: W,
        merge_config: MergeConfig,
        output_config: OutputConfig,
        curves: &CurveSelection,
    ) -> Result<Self> {
        let bins = merge_config.quantization;
        Ok(Self {
            reader,
            writer,
            merge: WeightedMerge::from_config(&merge_config),
            response: curves.response_curve(bins)?,
            weight: curves.weight_curve(bins)?,
            merge_config,
            output_config,
        })
    }

    pub fn response(&self) -> Option<&ResponseCurve> {
        self.response.as_ref()
    }

    pub fn weight(&self) -> Option<&ResponseCurve> {
        self.weight.as_ref()
    }

    pub fn set_response_curve(&mut self, curve: ResponseCurve) {
        self.response = Some(curve);
    }

    pub fn set_weight_curve(&mut self, curve: ResponseCurve) {
        self.weight = Some(curve);
    }

    pub fn merge_config(&self) -> &MergeConfig {
        &self.merge_config
    }

    pub fn set_merge_config(&mut self, config: MergeConfig) {
        self.merge = WeightedMerge::from_config(&config);
        self.merge_config = config;
    }

    pub fn output_config(&self) -> &OutputConfig {
        &self.output_config
    }

    fn curves(&self) -> Result<(&ResponseCurve, &ResponseCurve)> {
        let response = self
            .response
            .as_ref()
            .ok_or_else(|| HdrError::MissingCurve(CurveKind::Response.to_string()))?;
        let weight = self
            .weight
            .as_ref()
            .ok_or_else(|| HdrError::MissingCurve(CurveKind::Weight.to_string()))?;
        Ok((response, weight))
    }

    /// Fuses `stack` into `output` at the configured target time.
    pub fn merge(
        &self,
        stack: &ExposureStack<'_>,
        output: &mut PixelBuffer<'_, f32>,
    ) -> Result<()> {
        let (response, weight) = self.curves()?;
        self.merge
            .merge(stack, weight, response, self.merge_config.target_time, output)
    }

    /// Debug render: copies exposure `index` into `output`, or paints
    /// `output` red when the stack has no such exposure.
    pub fn debug_source(
        &self,
        stack: &ExposureStack<'_>,
        index: usize,
        output: &mut PixelBuffer<'_, f32>,
    ) -> Result<()> {
        match stack.images().get(index) {
            Some(image) => output.copy_from(image),
            None => {
                warn!(index, images = stack.len(), "Debug source index out of range");
                output.set_red()
            }
        }
    }

    /// Decodes every `(encoded image, exposure time)` pair, merges them
    /// and encodes the radiance to `output`.
    #[instrument(skip_all, fields(images = inputs.len()))]
    pub fn merge_encoded(
        &self,
        inputs: &[(&[u8], f32)],
        output: &mut dyn Write,
    ) -> Result<OwnedBuffer<f32>> {
        info!("Starting HDR merge");

        let stack = {
            let _span = info_span!("decode").entered();
            let mut stack = ExposureStack::default();
            for &(data, time) in inputs {
                stack.push(self.reader.read_image(data)?, time);
            }
            stack
        };

        let (width, height) = {
            let _span = info_span!("validate").entered();
            stack.validate()?
        };

        let channels = if stack.channels() >= RGB_CHANNELS { RGB_CHANNELS } else { 1 };
        let mut radiance = OwnedBuffer::new(width, height, channels);
        {
            let _span = info_span!("merge").entered();
            self.merge(&stack, &mut radiance)?;
        }

        {
            let _span = info_span!("encode").entered();
            self.writer
                .write_radiance(&radiance, output, &self.output_config)?;
        }

        info!(width, height, channels, "Merge complete");
        Ok(radiance)
    }

    #[instrument(skip(self, inputs, output_path))]
    pub fn merge_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        inputs: &[(P, f32)],
        output_path: Q,
    ) -> Result<()> {
        let output_path = output_path.as_ref();

        let encoded = {
            let _span = info_span!("read_input_files").entered();
            inputs
                .iter()
                .map(|(path, time)| {
                    let path = path.as_ref();
                    info!(input = %path.display(), time, "Reading exposure");
                    std::fs::read(path)
                        .map(|data| (data, *time))
                        .map_err(|e| HdrError::InputReadError(format!("{}: {}", path.display(), e)))
                })
                .collect::<Result<Vec<_>>>()?
        };
        let borrowed: Vec<(&[u8], f32)> = encoded
            .iter()
            .map(|(data, time)| (data.as_slice(), *time))
            .collect();

        let mut output_file = {
            let _span = info_span!("create_output_file").entered();
            std::fs::File::create(output_path).map_err(|e| {
                HdrError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?
        };

        self.merge_encoded(&borrowed, &mut output_file)?;
        info!(output = %output_path.display(), "Radiance written");
        Ok(())
    }
}
