use std::sync::atomic::{AtomicBool, Ordering};

use crate::hdr_pipeline::calibration::{
    CalibrationConfig, CalibrationState, PipelineTimings, RobertsonCalibrator, Timer,
};
use crate::hdr_pipeline::common::error::HdrError;
use crate::hdr_pipeline::curve::ResponseCurve;
use crate::hdr_pipeline::merge::ExposureStack;
use crate::hdr_pipeline::pixel::OwnedBuffer;

const BINS: usize = 256;
const TIMES: [f32; 3] = [0.25, 0.5, 1.0];
const WIDTH: usize = 21;
const HEIGHT: usize = 3;

/// Scene radiance of pixel `p` is `4(p + 1) / 255`, so every exposure of a
/// linear camera lands exactly on a bin of a 256-bin curve and nothing clips.
fn scene_radiance(pixel: usize) -> f32 {
    4.0 * (pixel + 1) as f32 / 255.0
}

fn linear_camera_group() -> ExposureStack<'static> {
    let mut group = ExposureStack::default();
    for &time in &TIMES {
        let data: Vec<f32> = (0..WIDTH * HEIGHT)
            .flat_map(|pixel| [scene_radiance(pixel) * time; 3])
            .collect();
        group.push(OwnedBuffer::from_vec(data, WIDTH, HEIGHT, 3).unwrap(), time);
    }
    group
}

fn flat_weight() -> ResponseCurve {
    let mut weight = ResponseCurve::new(BINS);
    weight.set_one();
    weight
}

fn assert_all_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (index, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= 1e-5 * e.abs().max(1.0), "sample {index}: expected {e}, got {a}");
    }
}

fn config() -> CalibrationConfig {
    CalibrationConfig::builder().quantization(BINS).build()
}

#[test]
fn test_config_defaults_and_builder() {
    let config = CalibrationConfig::default();
    assert_eq!(config.max_iterations, 500);
    assert_eq!(config.threshold, 0.01);
    assert_eq!(config.quantization, 4096);

    let config = CalibrationConfig::builder()
        .max_iterations(10)
        .threshold(0.5)
        .build();
    assert_eq!(config.max_iterations, 10);
    assert_eq!(config.threshold, 0.5);
    assert_eq!(config.quantization, 4096);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation() {
    let err = CalibrationConfig::builder().quantization(1).build().validate().unwrap_err();
    assert!(matches!(err, HdrError::InvalidConfig(_)));
    assert!(err.is_validation());

    let err = CalibrationConfig::builder().threshold(f64::NAN).build().validate().unwrap_err();
    assert!(matches!(err, HdrError::InvalidConfig(_)));
}

#[test]
fn test_linear_camera_converges_to_linear_response() {
    let groups = vec![linear_camera_group()];
    let mut calibrator = RobertsonCalibrator::new(config());

    let outcome = calibrator.process(&groups, &flat_weight()).unwrap();

    assert_eq!(outcome.state, CalibrationState::Converged);
    assert!(outcome.converged());
    assert_eq!(outcome.iterations, 2);
    assert!(outcome.last_diff.unwrap() < 0.01);

    // Observed bins run from 1 to 252, so the pivot is bin 126.
    let response = calibrator.response();
    assert_eq!(response.bins(), BINS);
    for channel in 0..3 {
        assert_eq!(response.normalization_pivot(channel), Some(126));
        assert_eq!(response.channel(channel)[126], 1.0);
        for bin in 1..=252 {
            let expected = bin as f32 / 126.0;
            let actual = response.channel(channel)[bin];
            assert!((actual - expected).abs() < 1e-4, "bin {bin}: {actual} vs {expected}");
        }
        assert_eq!(response.channel(channel)[0], 0.0);
        assert!(response.channel(channel)[253..].iter().all(|&v| v == 0.0));
    }
}

#[test]
fn test_radiance_is_proportional_to_scene() {
    let groups = vec![linear_camera_group()];
    let mut calibrator = RobertsonCalibrator::new(config());
    calibrator.process(&groups, &flat_weight()).unwrap();

    let radiance = calibrator.radiance(0).unwrap();
    assert_eq!(radiance.dimensions(), (WIDTH, HEIGHT));
    assert_eq!(radiance.channels(), 3);

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let pixel = y * WIDTH + x;
            let expected = scene_radiance(pixel) * 255.0 / 126.0;
            for channel in 0..3 {
                let actual = radiance.sample(x, y, channel);
                assert!(
                    (actual - expected).abs() <= 1e-4 * expected,
                    "pixel {pixel}: {actual} vs {expected}"
                );
            }
        }
    }
}

#[test]
fn test_groups_keep_their_own_size() {
    let small = {
        let mut group = ExposureStack::default();
        for &time in &TIMES {
            group.push(OwnedBuffer::from_vec(vec![0.5 * time; 2 * 2 * 4], 2, 2, 4).unwrap(), time);
        }
        group
    };
    let groups = vec![linear_camera_group(), small];
    let mut calibrator = RobertsonCalibrator::new(config());
    calibrator.process(&groups, &flat_weight()).unwrap();

    assert_eq!(calibrator.group_count(), 2);
    assert_eq!(calibrator.radiance(0).unwrap().dimensions(), (WIDTH, HEIGHT));
    assert_eq!(calibrator.radiance(1).unwrap().dimensions(), (2, 2));

    let err = calibrator.radiance(2).unwrap_err();
    assert!(matches!(err, HdrError::GroupIndexOutOfRange { index: 2, count: 2 }));

    let (response, radiance) = calibrator.into_parts();
    assert_eq!(response.bins(), BINS);
    assert_eq!(radiance.len(), 2);
}

#[test]
fn test_iteration_budget_exhausted() {
    let groups = vec![linear_camera_group()];
    let config = CalibrationConfig::builder()
        .quantization(BINS)
        .max_iterations(1)
        .build();
    let mut calibrator = RobertsonCalibrator::new(config);

    let outcome = calibrator.process(&groups, &flat_weight()).unwrap();

    assert_eq!(outcome.state, CalibrationState::Exhausted);
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.last_diff.unwrap() > 0.01);
}

#[test]
fn test_observer_sees_every_iteration() {
    let groups = vec![linear_camera_group()];
    let mut calibrator = RobertsonCalibrator::new(config());
    let mut reports = Vec::new();

    let outcome = calibrator
        .process_with(
            &groups,
            &flat_weight(),
            |report| reports.push((report.iteration, report.diff, report.response.bins())),
            None,
        )
        .unwrap();

    assert_eq!(reports.len(), outcome.iterations);
    for (index, (iteration, _, bins)) in reports.iter().enumerate() {
        assert_eq!(*iteration, index);
        assert_eq!(*bins, BINS);
    }
    assert_eq!(reports.last().map(|r| r.1), outcome.last_diff);
}

#[test]
fn test_cancel_before_first_iteration() {
    let groups = vec![linear_camera_group()];
    let mut calibrator = RobertsonCalibrator::new(config());
    let cancel = AtomicBool::new(true);

    let outcome = calibrator
        .process_with(&groups, &flat_weight(), |_| {}, Some(&cancel))
        .unwrap();

    assert_eq!(outcome.state, CalibrationState::Cancelled);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.last_diff, None);

    // The seed curve: linear and normalized at bin 128.
    assert_eq!(calibrator.response().channel(0)[128], 1.0);
}

#[test]
fn test_cancel_from_observer() {
    let groups = vec![linear_camera_group()];
    let mut calibrator = RobertsonCalibrator::new(config());
    let cancel = AtomicBool::new(false);

    let outcome = calibrator
        .process_with(
            &groups,
            &flat_weight(),
            |_| cancel.store(true, Ordering::Relaxed),
            Some(&cancel),
        )
        .unwrap();

    assert_eq!(outcome.state, CalibrationState::Cancelled);
    assert_eq!(outcome.iterations, 1);
}

#[test]
fn test_cancel_between_groups_keeps_last_completed_radiance() {
    let groups = vec![linear_camera_group(), linear_camera_group()];
    let one_iteration = CalibrationConfig::builder()
        .quantization(BINS)
        .max_iterations(1)
        .build();
    let mut reference = RobertsonCalibrator::new(one_iteration);
    reference.process(&groups, &flat_weight()).unwrap();

    // Polls per iteration: once before it starts, then once before each
    // group. The sixth poll falls between the two groups of iteration 2.
    let mut polls = 0;
    let mut calibrator = RobertsonCalibrator::new(config());
    let outcome = calibrator
        .process_until(&groups, &flat_weight(), |_| {}, || {
            polls += 1;
            polls == 6
        })
        .unwrap();

    assert_eq!(outcome.state, CalibrationState::Cancelled);
    assert_eq!(outcome.iterations, 1);
    for channel in 0..3 {
        assert_all_close(
            calibrator.response().channel(channel),
            reference.response().channel(channel),
        );
    }
    // Both groups still hold the radiance merged with the seed response.
    for group in 0..groups.len() {
        let expected: Vec<f32> = reference.radiance(group).unwrap().samples().copied().collect();
        let actual: Vec<f32> = calibrator.radiance(group).unwrap().samples().copied().collect();
        assert_all_close(&actual, &expected);
    }
}

#[test]
fn test_structural_errors_before_any_iteration() {
    let mut calibrator = RobertsonCalibrator::new(config());
    let mut called = false;

    let err = calibrator
        .process_with(&[], &flat_weight(), |_| called = true, None)
        .unwrap_err();
    assert!(matches!(err, HdrError::EmptyGroup));

    let gray = ExposureStack::new(
        vec![OwnedBuffer::from_vec(vec![0.5; 4], 2, 2, 1).unwrap()],
        vec![1.0],
    );
    let err = calibrator
        .process_with(&[linear_camera_group(), gray], &flat_weight(), |_| called = true, None)
        .unwrap_err();
    assert!(matches!(err, HdrError::ChannelMismatch { required: 3, available: 1 }));

    let mut uneven = linear_camera_group();
    uneven.push(OwnedBuffer::new(4, 4, 3), 2.0);
    let err = calibrator
        .process_with(&[uneven], &flat_weight(), |_| called = true, None)
        .unwrap_err();
    assert!(matches!(err, HdrError::DimensionMismatch { .. }));

    let counts = ExposureStack::new(vec![OwnedBuffer::new(2, 2, 3)], vec![1.0, 2.0]);
    let err = calibrator
        .process_with(&[counts], &flat_weight(), |_| called = true, None)
        .unwrap_err();
    assert!(matches!(err, HdrError::ExposureCountMismatch { .. }));

    let err = calibrator
        .process_with(&[linear_camera_group()], &ResponseCurve::new(0), |_| called = true, None)
        .unwrap_err();
    assert!(matches!(err, HdrError::EmptyCurve));

    assert!(!called);
}

#[test]
fn test_outcome_carries_phase_timings() {
    let groups = vec![linear_camera_group()];
    let mut calibrator = RobertsonCalibrator::new(config());
    let outcome = calibrator.process(&groups, &flat_weight()).unwrap();

    let timings = &outcome.timings;
    for step in ["validate", "cardinality", "merge", "refit"] {
        assert!(timings.get_step(step).is_some(), "missing {step}");
    }
    // One merge and one refit per iteration.
    let merges = timings.steps().iter().filter(|s| s.name == "merge").count();
    assert_eq!(merges, outcome.iterations);
}

#[test]
fn test_timings_sum_repeated_steps() {
    let mut timings = PipelineTimings::new();
    timings.add_step("merge", std::time::Duration::from_millis(2));
    timings.add_step("merge", std::time::Duration::from_millis(3));
    timings.record(Timer::start("refit"));

    assert_eq!(timings.steps().len(), 3);
    assert_eq!(timings.get_step("merge"), Some(std::time::Duration::from_millis(5)));
    assert!(timings.total_duration() >= std::time::Duration::from_millis(5));
    assert_eq!(timings.get_step("missing"), None);
}
