use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use robertson_hdr_rs::hdr_pipeline::{
    CalibrationConfig, CurveKind, CurveSelection, HdrCalibrationPipeline, HdrMergePipeline,
    MergeConfig, OutputConfig, ResponsePreset, TiffCompression, WeightPreset, export_curve,
};
use robertson_hdr_rs::logger;

use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "robertson_hdr")]
#[command(about = "Camera response calibration and HDR merging of bracketed exposures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover the camera response from one or more bracketed groups
    Calibrate {
        /// Exposures of one group as PATH:SECONDS pairs separated by commas; repeat per group
        #[arg(short, long = "group", required = true, value_parser = parse_group)]
        groups: Vec<ExposureGroup>,

        /// Directory receiving response.csv and radiance_<group>.tif
        #[arg(short, long)]
        output_dir: PathBuf,

        #[command(flatten)]
        weight: WeightArgs,

        #[arg(short, long, default_value_t = 4096)]
        quantization: usize,

        #[arg(long, default_value_t = 500)]
        max_iterations: usize,

        /// Mean absolute curve change below which iteration stops
        #[arg(long, default_value_t = 0.01)]
        threshold: f64,

        #[arg(long, value_enum, default_value_t = CompressionArg::None)]
        compression: CompressionArg,
    },
    /// Merge one bracketed group into a radiance TIFF
    Merge {
        /// One exposure as PATH:SECONDS; repeat per exposure
        #[arg(short, long = "input", required = true, value_parser = parse_exposure)]
        inputs: Vec<(PathBuf, f32)>,

        #[arg(short, long)]
        output: PathBuf,

        /// Response preset: linear, gamma, log10
        #[arg(long, default_value = "linear", value_parser = parse_response_preset)]
        response: ResponsePreset,

        /// Response curve file, e.g. one written by `calibrate`
        #[arg(long)]
        response_file: Option<PathBuf>,

        #[command(flatten)]
        weight: WeightArgs,

        /// Exposure time the radiance is scaled to
        #[arg(short, long, default_value_t = 1.0)]
        target_time: f32,

        #[arg(short, long, default_value_t = 4096)]
        quantization: usize,

        #[arg(long, value_enum, default_value_t = CompressionArg::None)]
        compression: CompressionArg,
    },
    /// Write a preset curve to a curve file
    ExportCurve {
        #[arg(short, long, value_enum)]
        kind: KindArg,

        /// Preset name of the chosen curve kind
        #[arg(short, long)]
        preset: String,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, default_value_t = 4096)]
        quantization: usize,

        /// Width of the gaussian-custom weight preset
        #[arg(long)]
        gaussian_size: Option<f32>,
    },
}

#[derive(clap::Args)]
struct WeightArgs {
    /// Weight preset: linear, gaussian, gaussian-custom, triangular, plateau, flat
    #[arg(long = "weight", default_value = "gaussian", value_parser = parse_weight_preset)]
    preset: WeightPreset,

    /// Weight curve file
    #[arg(long)]
    weight_file: Option<PathBuf>,

    /// Width of the gaussian-custom weight preset
    #[arg(long)]
    gaussian_size: Option<f32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Lzw,
    DeflateFast,
    Deflate,
    DeflateBest,
}

impl From<CompressionArg> for TiffCompression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => TiffCompression::None,
            CompressionArg::Lzw => TiffCompression::Lzw,
            CompressionArg::DeflateFast => TiffCompression::DeflateFast,
            CompressionArg::Deflate => TiffCompression::DeflateBalanced,
            CompressionArg::DeflateBest => TiffCompression::DeflateBest,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Response,
    Weight,
}

#[derive(Clone)]
struct ExposureGroup(Vec<(PathBuf, f32)>);

fn parse_exposure(value: &str) -> Result<(PathBuf, f32), String> {
    let (path, time) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected PATH:SECONDS, got '{value}'"))?;
    let time: f32 = time
        .parse()
        .map_err(|e| format!("invalid exposure time '{time}': {e}"))?;
    if time.is_nan() || time <= 0.0 {
        return Err(format!("exposure time must be positive, got {time}"));
    }
    Ok((PathBuf::from(path), time))
}

fn parse_group(value: &str) -> Result<ExposureGroup, String> {
    value
        .split(',')
        .map(parse_exposure)
        .collect::<Result<Vec<_>, _>>()
        .map(ExposureGroup)
}

fn parse_response_preset(value: &str) -> Result<ResponsePreset, String> {
    value.parse().map_err(|_| {
        format!("unknown response preset '{value}', expected one of: linear, gamma, log10")
    })
}

fn parse_weight_preset(value: &str) -> Result<WeightPreset, String> {
    const NAMES: &str = "linear, gaussian, gaussian-custom, triangular, plateau, flat";
    value
        .parse()
        .map_err(|_| format!("unknown weight preset '{value}', expected one of: {NAMES}"))
}

fn curve_selection(weight: WeightArgs) -> CurveSelection {
    let mut builder = CurveSelection::builder().weight_preset(weight.preset);
    if let Some(size) = weight.gaussian_size {
        builder = builder.gaussian_size(size);
    }
    if let Some(path) = weight.weight_file {
        builder = builder.weight_file(path);
    }
    builder.build()
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Calibrate {
            groups,
            output_dir,
            weight,
            quantization,
            max_iterations,
            threshold,
            compression,
        } => {
            let config = CalibrationConfig::builder()
                .quantization(quantization)
                .max_iterations(max_iterations)
                .threshold(threshold)
                .build();
            let output_config = OutputConfig::builder()
                .compression(compression.into())
                .build();
            let pipeline =
                HdrCalibrationPipeline::new(config, output_config, &curve_selection(weight))
                    .context("Failed to set up calibration")?;

            std::fs::create_dir_all(&output_dir).with_context(|| {
                format!("Failed to create output directory {}", output_dir.display())
            })?;
            let groups: Vec<_> = groups.into_iter().map(|group| group.0).collect();
            let result = pipeline
                .calibrate_files(&groups, &output_dir)
                .context("Calibration failed")?;

            if !result.outcome.converged() {
                warn!(
                    state = ?result.outcome.state,
                    iterations = result.outcome.iterations,
                    "Calibration did not converge"
                );
            }
            info!(dir = %output_dir.display(), "Calibration outputs written");
        }
        Commands::Merge {
            inputs,
            output,
            response,
            response_file,
            weight,
            target_time,
            quantization,
            compression,
        } => {
            if response.needs_external_curve() && response_file.is_none() {
                bail!("response preset '{response}' needs --response-file");
            }
            let mut selection = curve_selection(weight);
            selection.response_preset = response;
            if let Some(path) = response_file {
                selection.response_preset = ResponsePreset::FromFile;
                selection.response_path = Some(path);
            }

            let merge_config = MergeConfig::builder()
                .target_time(target_time)
                .quantization(quantization)
                .build();
            let output_config = OutputConfig::builder()
                .compression(compression.into())
                .build();
            let pipeline = HdrMergePipeline::new(merge_config, output_config, &selection)
                .context("Failed to set up merge")?;

            pipeline
                .merge_files(&inputs, &output)
                .with_context(|| format!("Failed to merge into {}", output.display()))?;
        }
        Commands::ExportCurve {
            kind,
            preset,
            output,
            quantization,
            gaussian_size,
        } => {
            let mut builder = CurveSelection::builder();
            if let Some(size) = gaussian_size {
                builder = builder.gaussian_size(size);
            }
            let kind = match kind {
                KindArg::Response => {
                    let preset = parse_response_preset(&preset).map_err(anyhow::Error::msg)?;
                    builder = builder.response_preset(preset);
                    CurveKind::Response
                }
                KindArg::Weight => {
                    let preset = parse_weight_preset(&preset).map_err(anyhow::Error::msg)?;
                    builder = builder.weight_preset(preset);
                    CurveKind::Weight
                }
            };

            export_curve(kind, &builder.build(), quantization, &output)
                .with_context(|| format!("Failed to export {} to {}", kind, output.display()))?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    logger::init();

    let cli = Cli::parse();
    info!("Starting robertson_hdr...");

    run(cli.command)
}
