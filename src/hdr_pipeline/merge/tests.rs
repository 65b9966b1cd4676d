use crate::hdr_pipeline::common::error::HdrError;
use crate::hdr_pipeline::curve::{DEFAULT_QUANTIZATION, ResponseCurve};
use crate::hdr_pipeline::merge::{ExposureStack, MergeConfig, WeightedMerge};
use crate::hdr_pipeline::pixel::{OwnedBuffer, PixelBuffer};

fn constant_image(width: usize, height: usize, channels: usize, value: f32) -> OwnedBuffer<f32> {
    OwnedBuffer::from_vec(vec![value; width * height * channels], width, height, channels).unwrap()
}

fn flat_weight() -> ResponseCurve {
    let mut weight = ResponseCurve::new(DEFAULT_QUANTIZATION);
    weight.set_one();
    weight
}

fn linear_response() -> ResponseCurve {
    let mut response = ResponseCurve::new(DEFAULT_QUANTIZATION);
    response.set_linear();
    response
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() <= 1e-5 * expected.abs().max(1.0),
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_config_builder() {
    let config = MergeConfig::builder()
        .target_time(0.5)
        .quantization(256)
        .weight_epsilon(0.01)
        .build();

    assert_eq!(config.target_time, 0.5);
    assert_eq!(config.quantization, 256);
    assert_eq!(config.weight_epsilon, 0.01);
    assert_eq!(config.min_weight_sum, 1e-4);

    let merge = WeightedMerge::from_config(&config);
    assert_eq!(merge.weight_epsilon(), 0.01);
    assert_eq!(merge.min_weight_sum(), 1e-4);
}

#[test]
fn test_uniform_stack_matches_per_pixel_formula() {
    let times = [0.25f32, 0.5, 1.0];
    let stack = ExposureStack::new(
        times.iter().map(|_| constant_image(4, 4, 1, 0.5)).collect(),
        times.to_vec(),
    );
    let weight = flat_weight();
    let response = linear_response();
    let mut radiance = OwnedBuffer::<f32>::new(4, 4, 1);

    WeightedMerge::new()
        .merge(&stack, &weight, &response, 1.0, &mut radiance)
        .unwrap();

    let epsilon = 0.001f32;
    let w = weight.value(0.5, 0) + epsilon;
    let r = response.value(0.5, 0);
    let wsum: f32 = times.iter().map(|t| w * r / t).sum();
    let wdiv = 3.0 * w;
    let expected = wsum / wdiv * 1.0;

    for y in 0..4 {
        for x in 0..4 {
            assert_close(radiance.sample(x, y, 0), expected);
        }
    }
}

#[test]
fn test_merge_scales_with_target_time() {
    let stack = ExposureStack::new(vec![constant_image(2, 2, 3, 0.25)], vec![0.5]);
    let weight = flat_weight();
    let response = linear_response();

    let mut at_one = OwnedBuffer::<f32>::new(2, 2, 3);
    let mut at_four = OwnedBuffer::<f32>::new(2, 2, 3);
    let merge = WeightedMerge::new();
    merge.merge(&stack, &weight, &response, 1.0, &mut at_one).unwrap();
    merge.merge(&stack, &weight, &response, 4.0, &mut at_four).unwrap();

    for (a, b) in at_one.samples().zip(at_four.samples()) {
        assert_close(*b, *a * 4.0);
    }
    assert_close(at_one.sample(1, 1, 2), response.value(0.25, 2) / 0.5);
}

#[test]
fn test_merge_follows_spatial_layout() {
    // Each pixel holds a distinct value so any indexing slip shows up.
    let (width, height) = (3, 2);
    let values: Vec<f32> = (0..width * height * 3).map(|i| i as f32 / 20.0).collect();
    let bright: Vec<f32> = values.iter().map(|v| (v * 2.0).min(1.0)).collect();
    let stack = ExposureStack::new(
        vec![
            OwnedBuffer::from_vec(values.clone(), width, height, 3).unwrap(),
            OwnedBuffer::from_vec(bright.clone(), width, height, 3).unwrap(),
        ],
        vec![1.0, 2.0],
    );
    let mut weight = ResponseCurve::new(DEFAULT_QUANTIZATION);
    weight.set_triangular();
    let response = linear_response();
    let mut radiance = OwnedBuffer::<f32>::new(width, height, 3);

    WeightedMerge::new()
        .merge(&stack, &weight, &response, 1.0, &mut radiance)
        .unwrap();

    for y in 0..height {
        for x in 0..width {
            for c in 0..3 {
                let i = (y * width + x) * 3 + c;
                let w0 = weight.value(values[i], c) + 0.001;
                let w1 = weight.value(bright[i], c) + 0.001;
                let wsum = w0 * response.value(values[i], c) / 1.0
                    + w1 * response.value(bright[i], c) / 2.0;
                assert_close(radiance.sample(x, y, c), wsum / (w0 + w1));
            }
        }
    }
}

#[test]
fn test_merge_below_weight_floor_is_black() {
    let stack = ExposureStack::new(vec![constant_image(2, 2, 1, 0.0)], vec![1.0]);
    let mut weight = ResponseCurve::new(16);
    weight.set_linear();
    let response = linear_response();
    let merge = WeightedMerge::from_config(&MergeConfig::builder().weight_epsilon(0.0).build());
    let mut radiance = constant_image(2, 2, 1, 7.0);

    merge.merge(&stack, &weight, &response, 1.0, &mut radiance).unwrap();

    assert!(radiance.samples().all(|&v| v == 0.0));
}

#[test]
fn test_time_domain_form() {
    let times = [0.25f32, 0.5, 1.0];
    let stack = ExposureStack::new(
        times.iter().map(|_| constant_image(4, 4, 3, 0.5)).collect(),
        times.to_vec(),
    );
    let weight = flat_weight();
    let response = linear_response();
    let mut radiance = OwnedBuffer::<f32>::new(4, 4, 3);

    WeightedMerge::new()
        .merge_time_domain(&stack, &weight, &response, &mut radiance)
        .unwrap();

    let r = response.value(0.5, 0);
    let numerator: f32 = times.iter().map(|t| r * t).sum();
    let denominator: f32 = times.iter().map(|t| t * t).sum();
    for value in radiance.samples() {
        assert_close(*value, numerator / denominator);
    }
}

#[test]
fn test_time_domain_zero_weight_gives_zero_not_nan() {
    let stack = ExposureStack::new(
        vec![constant_image(2, 2, 3, 0.0), constant_image(2, 2, 3, 0.0)],
        vec![1.0, 2.0],
    );
    let mut weight = ResponseCurve::new(64);
    weight.set_linear();
    let response = linear_response();
    let mut radiance = constant_image(2, 2, 3, 3.0);

    WeightedMerge::new()
        .merge_time_domain(&stack, &weight, &response, &mut radiance)
        .unwrap();

    assert!(radiance.samples().all(|&v| v == 0.0));
}

#[test]
fn test_merge_into_host_view() {
    let stack = ExposureStack::new(vec![constant_image(2, 2, 4, 1.0)], vec![1.0]);
    let weight = flat_weight();
    let response = linear_response();

    let mut host = vec![-1.0f32; 2 * 8];
    {
        let mut output = PixelBuffer::wrap_mut(&mut host, 2, 2, 3, 8).unwrap();
        WeightedMerge::new()
            .merge(&stack, &weight, &response, 1.0, &mut output)
            .unwrap();
    }

    assert_close(host[0], 1.0);
    assert_close(host[5], 1.0);
    assert_eq!(&host[6..8], &[-1.0, -1.0]);
    assert_close(host[13], 1.0);
}

#[test]
fn test_merge_rejects_invalid_stacks() {
    let weight = flat_weight();
    let response = linear_response();
    let merge = WeightedMerge::new();
    let mut radiance = OwnedBuffer::<f32>::new(2, 2, 3);

    let empty = ExposureStack::default();
    let err = merge.merge(&empty, &weight, &response, 1.0, &mut radiance).unwrap_err();
    assert!(matches!(err, HdrError::EmptyGroup));

    let counts = ExposureStack::new(vec![constant_image(2, 2, 3, 0.5)], vec![1.0, 2.0]);
    let err = merge.merge(&counts, &weight, &response, 1.0, &mut radiance).unwrap_err();
    assert!(matches!(err, HdrError::ExposureCountMismatch { images: 1, times: 2 }));

    let mut sizes = ExposureStack::default();
    sizes.push(constant_image(2, 2, 3, 0.5), 1.0);
    sizes.push(constant_image(2, 3, 3, 0.5), 2.0);
    let err = merge.merge_time_domain(&sizes, &weight, &response, &mut radiance).unwrap_err();
    assert!(matches!(err, HdrError::DimensionMismatch { .. }));
}

#[test]
fn test_merge_rejects_non_positive_exposure_times() {
    let weight = flat_weight();
    let response = linear_response();
    let merge = WeightedMerge::new();
    let mut radiance = OwnedBuffer::<f32>::new(2, 2, 1);

    let zero = ExposureStack::new(
        vec![constant_image(2, 2, 1, 0.5), constant_image(2, 2, 1, 0.5)],
        vec![0.0, 1.0],
    );
    let err = merge.merge(&zero, &weight, &response, 1.0, &mut radiance).unwrap_err();
    assert!(matches!(err, HdrError::InvalidExposureTime { index: 0, .. }));
    assert!(err.is_validation());
    assert!(radiance.samples().all(|&v| v == 0.0));

    for time in [-0.5, f32::NAN, f32::INFINITY] {
        let stack = ExposureStack::new(
            vec![constant_image(2, 2, 1, 0.5), constant_image(2, 2, 1, 0.5)],
            vec![1.0, time],
        );
        let err = merge
            .merge_time_domain(&stack, &weight, &response, &mut radiance)
            .unwrap_err();
        assert!(matches!(err, HdrError::InvalidExposureTime { index: 1, .. }));
    }
}

#[test]
fn test_merge_rejects_bad_output_and_curves() {
    let stack = ExposureStack::new(vec![constant_image(2, 2, 1, 0.5)], vec![1.0]);
    let weight = flat_weight();
    let response = linear_response();
    let merge = WeightedMerge::new();

    let mut wrong_size = OwnedBuffer::<f32>::new(3, 2, 1);
    let err = merge.merge(&stack, &weight, &response, 1.0, &mut wrong_size).unwrap_err();
    assert!(matches!(err, HdrError::DimensionMismatch { .. }));

    let mut too_many_channels = OwnedBuffer::<f32>::new(2, 2, 3);
    let err = merge.merge(&stack, &weight, &response, 1.0, &mut too_many_channels).unwrap_err();
    assert!(matches!(err, HdrError::ChannelMismatch { required: 3, available: 1 }));

    let mut radiance = OwnedBuffer::<f32>::new(2, 2, 1);
    let err = merge
        .merge(&stack, &ResponseCurve::new(0), &response, 1.0, &mut radiance)
        .unwrap_err();
    assert!(matches!(err, HdrError::EmptyCurve));
}
