use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use robertson_hdr_rs::hdr_pipeline::{
    CalibrationConfig, DEFAULT_QUANTIZATION, ExposureStack, OutputConfig, OwnedBuffer,
    RadianceWriter, ResponseCurve, RobertsonCalibrator, StandardTiffWriter, TiffCompression,
    WeightedMerge,
};

const TIMES: [f32; 3] = [0.25, 0.5, 1.0];

/// Gradient scene seen through a linear camera, clipped at 1.
fn generate_stack(width: usize, height: usize) -> ExposureStack<'static> {
    let mut stack = ExposureStack::default();
    for &time in &TIMES {
        let data: Vec<f32> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x + y) as f32 / (width + height) as f32))
            .flat_map(|radiance| [(radiance * time * 1.5).min(1.0); 3])
            .collect();
        stack.push(OwnedBuffer::from_vec(data, width, height, 3).unwrap(), time);
    }
    stack
}

fn curves(bins: usize) -> (ResponseCurve, ResponseCurve) {
    let mut weight = ResponseCurve::new(bins);
    weight.set_gaussian(4.0);
    let mut response = ResponseCurve::new(bins);
    response.set_linear();
    (weight, response)
}

fn benchmark_merge_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_by_size");
    let (weight, response) = curves(DEFAULT_QUANTIZATION);
    let merge = WeightedMerge::new();

    let sizes = vec![
        (100, 100, "100x100"),
        (500, 500, "500x500"),
        (1000, 1000, "1000x1000"),
    ];

    for (width, height, label) in sizes {
        let stack = generate_stack(width, height);

        group.bench_with_input(BenchmarkId::from_parameter(label), &stack, |b, stack| {
            let mut radiance = OwnedBuffer::new(width, height, 3);
            b.iter(|| {
                merge
                    .merge(black_box(stack), &weight, &response, 1.0, &mut radiance)
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn benchmark_merge_forms(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_forms");
    let (weight, response) = curves(DEFAULT_QUANTIZATION);
    let merge = WeightedMerge::new();
    let stack = generate_stack(500, 500);
    let mut radiance = OwnedBuffer::new(500, 500, 3);

    group.bench_function("target_time", |b| {
        b.iter(|| {
            merge
                .merge(black_box(&stack), &weight, &response, 1.0, &mut radiance)
                .unwrap();
        });
    });

    group.bench_function("time_domain", |b| {
        b.iter(|| {
            merge
                .merge_time_domain(black_box(&stack), &weight, &response, &mut radiance)
                .unwrap();
        });
    });

    group.finish();
}

fn benchmark_calibration(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration");
    group.sample_size(10);
    let groups = vec![generate_stack(200, 200)];
    let (weight, _) = curves(DEFAULT_QUANTIZATION);

    for iterations in [1usize, 10] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{iterations}_iterations")),
            &iterations,
            |b, &iterations| {
                let config = CalibrationConfig::builder()
                    .max_iterations(iterations)
                    .threshold(0.0)
                    .build();
                b.iter(|| {
                    let mut calibrator = RobertsonCalibrator::new(config.clone());
                    calibrator.process(black_box(&groups), &weight).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_compression_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("radiance_compression");
    let stack = generate_stack(500, 500);
    let (weight, response) = curves(DEFAULT_QUANTIZATION);
    let mut radiance = OwnedBuffer::new(500, 500, 3);
    WeightedMerge::new()
        .merge(&stack, &weight, &response, 1.0, &mut radiance)
        .unwrap();

    let compressions = vec![
        (TiffCompression::None, "none"),
        (TiffCompression::Lzw, "lzw"),
        (TiffCompression::DeflateFast, "deflate_fast"),
    ];

    for (compression, label) in compressions {
        let config = OutputConfig::builder().compression(compression).build();
        group.bench_with_input(BenchmarkId::from_parameter(label), &radiance, |b, radiance| {
            b.iter(|| {
                let mut output: Vec<u8> = Vec::new();
                StandardTiffWriter
                    .write_radiance(black_box(radiance), &mut output, &config)
                    .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_merge_sizes,
    benchmark_merge_forms,
    benchmark_calibration,
    benchmark_compression_methods
);
criterion_main!(benches);
