// End-to-end pipeline tests: synthesized sample blocks through amplitude,
// spectrum, and classification, checked against the documented behavior.

use hive_sentry::analysis::Detection;
use hive_sentry::audio::{SampleBlock, CHANNELS, FULL_SCALE_24BIT, SAMPLE_SHIFT};
use hive_sentry::config::{AudioConfig, DetectionConfig};
use hive_sentry::Pipeline;

const FRAMES: usize = 1024;
const SAMPLE_RATE: u32 = 10_000;

fn pipeline_with(detection: DetectionConfig) -> Pipeline {
    Pipeline::new(&AudioConfig::default(), &detection, SAMPLE_RATE)
}

fn tone_block(freq: f64, amplitude: f64, channel: usize) -> SampleBlock {
    let mut block = SampleBlock::new(FRAMES);
    for i in 0..FRAMES {
        let t = i as f64 / f64::from(SAMPLE_RATE);
        let sample =
            ((2.0 * std::f64::consts::PI * freq * t).sin() * amplitude * FULL_SCALE_24BIT) as i32;
        block.words_mut()[i * CHANNELS + channel] = sample << SAMPLE_SHIFT;
    }
    block.set_frames_read(FRAMES);
    block
}

#[test]
fn loud_tone_in_bee_band_reports_honey_bee() {
    let mut pipeline = pipeline_with(DetectionConfig::default());

    // 0.9 full-scale 250 Hz sine on channel 1, channel 0 silent.
    let result = pipeline.process(&tone_block(250.0, 0.9, 1));

    let bin_width = f64::from(SAMPLE_RATE) / FRAMES as f64;
    assert!(
        (result.peak_frequency_hz - 250.0).abs() <= bin_width,
        "peak at {} Hz",
        result.peak_frequency_hz
    );
    assert!(result.amplitude_percent > 85.0, "got {}", result.amplitude_percent);
    assert!(result.confidence_percent > 50.0, "got {}", result.confidence_percent);
    assert_eq!(result.detection, Detection::HoneyBee);
}

#[test]
fn loud_tone_above_bee_band_reports_hornet() {
    let mut pipeline = pipeline_with(DetectionConfig::default());
    let result = pipeline.process(&tone_block(500.0, 0.9, 0));
    assert_eq!(result.detection, Detection::Hornet);
}

#[test]
fn tone_below_bee_band_reports_undetermined() {
    let mut pipeline = pipeline_with(DetectionConfig::default());
    let result = pipeline.process(&tone_block(150.0, 0.9, 0));
    assert_eq!(result.detection, Detection::Undetermined);
}

#[test]
fn silence_reports_zero_loudness_and_undetermined() {
    let mut pipeline = pipeline_with(DetectionConfig::default());
    let mut block = SampleBlock::new(FRAMES);
    block.set_frames_read(FRAMES);

    let result = pipeline.process(&block);
    assert_eq!(result.amplitude_percent, 0.0);
    assert_eq!(result.confidence_percent, 0.0);
    assert_eq!(result.detection, Detection::Undetermined);
}

#[test]
fn results_are_always_finite_and_bounded() {
    let mut pipeline = pipeline_with(DetectionConfig::default());

    for (freq, amplitude) in [(250.0, 0.0), (250.0, 1e-7), (999.0, 1.0), (50.0, 0.5)] {
        let result = pipeline.process(&tone_block(freq, amplitude, 0));
        assert!(result.peak_frequency_hz.is_finite());
        assert!((0.0..=100.0).contains(&result.amplitude_percent));
        assert!((0.0..=100.0).contains(&result.confidence_percent));
    }
}

#[test]
fn adversarial_band_config_still_produces_results() {
    // Band below bin 2 and above Nyquist: the clamped bin range must still
    // be usable and every result well formed.
    let detection = DetectionConfig {
        min_freq_hz: 0.0,
        max_freq_hz: 100_000.0,
        ..DetectionConfig::default()
    };
    let mut pipeline = pipeline_with(detection);

    assert!(pipeline.detection_start_bin() >= 2);
    assert!(pipeline.detection_end_bin() <= FRAMES / 2 - 1);
    assert!(pipeline.detection_start_bin() <= pipeline.detection_end_bin());

    let result = pipeline.process(&tone_block(250.0, 0.9, 0));
    assert!(result.peak_frequency_hz.is_finite());
}

#[test]
fn quiet_tone_is_gated_by_confidence_floor() {
    let mut pipeline = pipeline_with(DetectionConfig::default());

    // Pure but extremely quiet tone: purity is high, loudness near zero, so
    // the product falls under the confidence floor.
    let result = pipeline.process(&tone_block(250.0, 0.0005, 0));
    assert!(result.confidence_percent < 3.0, "got {}", result.confidence_percent);
    assert_eq!(result.detection, Detection::Undetermined);
}
