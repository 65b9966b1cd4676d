use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use tracing::{info, info_span, instrument};

use crate::hdr_pipeline::{
    calibration::{
        CalibrationConfig, CalibrationOutcome, IterationReport, RobertsonCalibrator, Timer,
    },
    common::error::{HdrError, Result},
    conversions::types::{CurveKind, CurveSelection},
    curve::ResponseCurve,
    merge::ExposureStack,
    pixel::OwnedBuffer,
    tiff::{ImageReader, OutputConfig, RadianceWriter, StandardTiffWriter, TiffImageReader},
};

/// File name of the recovered response inside an output directory.
pub const RESPONSE_FILE_NAME: &str = "response.csv";

/// Products of a calibration run.
#[derive(Debug)]
pub struct CalibrationResult {
    pub response: ResponseCurve,
    /// One radiance buffer per input group
    pub radiance: Vec<OwnedBuffer<f32>>,
    pub outcome: CalibrationOutcome,
}

/// Recovers a response curve from bracketed groups and writes the curve
/// and the per-group radiance images.
pub struct HdrCalibrationPipeline<R: ImageReader, W: RadianceWriter> {
    reader: R,
    writer: W,
    config: CalibrationConfig,
    output_config: OutputConfig,
    weight: Option<ResponseCurve>,
}

impl HdrCalibrationPipeline<TiffImageReader, StandardTiffWriter> {
    pub fn new(
        config: CalibrationConfig,
        output_config: OutputConfig,
        curves: &CurveSelection,
    ) -> Result<Self> {
        Self::with_custom(TiffImageReader, StandardTiffWriter, config, output_config, curves)
    }
}

impl<R: ImageReader, W: RadianceWriter> HdrCalibrationPipeline<R, W> {
    /// Only the weight of `curves` is used; the response is what the
    /// calibration recovers.
    pub fn with_custom(
        reader: R,
        writer: W,
        config: CalibrationConfig,
        output_config: OutputConfig,
        curves: &CurveSelection,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reader,
            writer,
            weight: curves.weight_curve(config.quantization)?,
            config,
            output_config,
        })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn weight(&self) -> Option<&ResponseCurve> {
        self.weight.as_ref()
    }

    pub fn set_weight_curve(&mut self, curve: ResponseCurve) {
        self.weight = Some(curve);
    }

    pub fn calibrate(&self, groups: &[ExposureStack<'_>]) -> Result<CalibrationResult> {
        self.calibrate_with(groups, |_| {}, None)
    }

    pub fn calibrate_with<F>(
        &self,
        groups: &[ExposureStack<'_>],
        observer: F,
        cancel: Option<&AtomicBool>,
    ) -> Result<CalibrationResult>
    where
        F: FnMut(&IterationReport<'_>),
    {
        let weight = self
            .weight
            .as_ref()
            .ok_or_else(|| HdrError::MissingCurve(CurveKind::Weight.to_string()))?;

        let mut calibrator = RobertsonCalibrator::new(self.config.clone());
        let outcome = calibrator.process_with(groups, weight, observer, cancel)?;
        let (response, radiance) = calibrator.into_parts();
        Ok(CalibrationResult {
            response,
            radiance,
            outcome,
        })
    }

    /// Decodes each group of `(encoded image, exposure time)` pairs and
    /// calibrates on them. Decoding time is added to the outcome timings.
    #[instrument(skip_all, fields(groups = groups.len()))]
    pub fn calibrate_encoded(&self, groups: &[Vec<(&[u8], f32)>]) -> Result<CalibrationResult> {
        info!("Starting response calibration");

        let timer = Timer::start("decode");
        let stacks = {
            let _span = info_span!("decode").entered();
            groups
                .iter()
                .map(|group| {
                    let mut stack = ExposureStack::default();
                    for &(data, time) in group {
                        stack.push(self.reader.read_image(data)?, time);
                    }
                    Ok(stack)
                })
                .collect::<Result<Vec<_>>>()?
        };
        let (name, duration) = timer.stop();

        let mut result = self.calibrate(&stacks)?;
        result.outcome.timings.add_step(name, duration);
        Ok(result)
    }

    /// Reads every group from disk, calibrates, then writes
    /// `response.csv` and `radiance_<group>.tif` into `output_dir`.
    #[instrument(skip(self, groups, output_dir))]
    pub fn calibrate_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        groups: &[Vec<(P, f32)>],
        output_dir: Q,
    ) -> Result<CalibrationResult> {
        let output_dir = output_dir.as_ref();

        let timer = Timer::start("read_input_files");
        let encoded = groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|(path, time)| {
                        let path = path.as_ref();
                        std::fs::read(path).map(|data| (data, *time)).map_err(|e| {
                            HdrError::InputReadError(format!("{}: {}", path.display(), e))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let (name, duration) = timer.stop();

        let borrowed: Vec<Vec<(&[u8], f32)>> = encoded
            .iter()
            .map(|group| group.iter().map(|(data, time)| (data.as_slice(), *time)).collect())
            .collect();

        let mut result = self.calibrate_encoded(&borrowed)?;
        result.outcome.timings.add_step(name, duration);

        let timer = Timer::start("write_outputs");
        self.write_outputs(&result, output_dir)?;
        result.outcome.timings.record(timer);

        result.outcome.timings.log_summary();
        Ok(result)
    }

    /// Writes the response curve and one radiance TIFF per group.
    pub fn write_outputs(
        &self,
        result: &CalibrationResult,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let _span = info_span!("write_outputs", dir = %output_dir.display()).entered();

        let mut written = Vec::with_capacity(result.radiance.len() + 1);
        let response_path = output_dir.join(RESPONSE_FILE_NAME);
        result
            .response
            .write(&response_path, &CurveKind::Response.to_string())?;
        written.push(response_path);

        for (group, radiance) in result.radiance.iter().enumerate() {
            let path = output_dir.join(format!("radiance_{group}.tif"));
            let mut file = std::fs::File::create(&path).map_err(|e| {
                HdrError::OutputWriteError(format!("{}: {}", path.display(), e))
            })?;
            self.writer
                .write_radiance(radiance, &mut file, &self.output_config)?;
            info!(group, path = %path.display(), "Radiance written");
            written.push(path);
        }
        Ok(written)
    }
}
