// Analysis module - the per-block detection pipeline
//
// Stages: amplitude (channel select, DC removal, loudness), spectrum
// (windowed FFT and band-limited peak search), classifier (confidence and
// species label). `Pipeline` wires them together around one shared
// SignalBuffer and carries the small amount of state that survives between
// iterations.

pub mod amplitude;
pub mod classifier;
pub mod spectrum;

use std::time::{Duration, Instant};

use rustfft::num_complex::Complex;

use crate::audio::SampleBlock;
use crate::config::{AudioConfig, DetectionConfig};
use crate::error::AcquisitionError;

pub use amplitude::{AmplitudeEstimator, BlockAmplitude, SILENCE_DBFS};
pub use classifier::{ClassificationResult, Classifier, Detection};
pub use spectrum::{SpectralAnalyzer, SpectralPeak};

/// Minimum gap between repeated diagnostic log lines.
const DIAG_INTERVAL: Duration = Duration::from_millis(3_000);

/// Reusable complex buffer shared by the amplitude and spectrum stages.
///
/// Contract: the amplitude stage fills the real parts with time-domain
/// samples; the spectrum stage then transforms the buffer in place, after
/// which the real parts hold the magnitude spectrum and the time-domain
/// data is gone. Each iteration must refill it before reuse.
pub struct SignalBuffer {
    bins: Vec<Complex<f64>>,
}

impl SignalBuffer {
    pub fn new(frames: usize) -> Self {
        Self {
            bins: vec![Complex::new(0.0, 0.0); frames],
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Zero the buffer.
    pub fn fill_silence(&mut self) {
        self.bins.fill(Complex::new(0.0, 0.0));
    }

    /// Real part of `frame`, valid while the buffer holds time-domain data.
    pub fn time_sample(&self, frame: usize) -> f64 {
        self.bins[frame].re
    }

    /// Store a time-domain sample in `frame` (imaginary part is zeroed).
    pub fn set_time_sample(&mut self, frame: usize, value: f64) {
        self.bins[frame] = Complex::new(value, 0.0);
    }

    /// Raw complex storage for the in-place transform.
    pub fn bins_mut(&mut self) -> &mut [Complex<f64>] {
        &mut self.bins
    }
}

/// Rate limiter for diagnostic log lines that would otherwise repeat every
/// iteration (acquisition failures, silent-input warnings).
struct DiagLimiter {
    last_emitted: Option<Instant>,
    interval: Duration,
}

impl DiagLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            last_emitted: None,
            interval,
        }
    }

    /// True when enough time has passed to emit again; records the emission.
    fn should_emit(&mut self) -> bool {
        let now = Instant::now();
        match self.last_emitted {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_emitted = Some(now);
                true
            }
        }
    }
}

/// State carried between pipeline iterations.
struct PipelineState {
    /// Loudness from the last successful read; reused when acquisition
    /// fails so telemetry keeps reporting the last known level.
    loudness_percent: f64,
    acquisition_diag: DiagLimiter,
    silence_diag: DiagLimiter,
}

/// The full per-block detection pipeline.
pub struct Pipeline {
    estimator: AmplitudeEstimator,
    analyzer: SpectralAnalyzer,
    classifier: Classifier,
    signal: SignalBuffer,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(audio: &AudioConfig, detection: &DetectionConfig, sample_rate_hz: u32) -> Self {
        let frames = audio.frames_per_block;
        let analyzer = SpectralAnalyzer::new(
            frames,
            f64::from(sample_rate_hz),
            detection.min_freq_hz,
            detection.max_freq_hz,
        );
        tracing::info!(
            "[Pipeline] {} frames at {} Hz, detection bins {}..={}",
            frames,
            sample_rate_hz,
            analyzer.start_bin(),
            analyzer.end_bin()
        );

        Self {
            estimator: AmplitudeEstimator::new(detection.amplitude_db_floor),
            analyzer,
            classifier: Classifier::new(detection),
            signal: SignalBuffer::new(frames),
            state: PipelineState {
                loudness_percent: 0.0,
                acquisition_diag: DiagLimiter::new(DIAG_INTERVAL),
                silence_diag: DiagLimiter::new(DIAG_INTERVAL),
            },
        }
    }

    /// Run one block through all three stages.
    ///
    /// An empty block (failed read) reuses the previous loudness figure, so
    /// the result is always well formed.
    pub fn process(&mut self, block: &SampleBlock) -> ClassificationResult {
        let amplitude = self.estimator.ingest(block, &mut self.signal);
        if let Some(percent) = amplitude.loudness_percent {
            self.state.loudness_percent = percent;
        }
        if amplitude.both_channels_silent && self.state.silence_diag.should_emit() {
            tracing::warn!("[Pipeline] Both channels silent, check microphone wiring");
        }

        let peak = self.analyzer.analyze(&mut self.signal);
        let result = self
            .classifier
            .classify(&peak, self.state.loudness_percent);

        tracing::debug!(
            "[Pipeline] ch={} peak={:.2} Hz mag={:.1} dom={:.2} amp={:.1}% conf={:.1}% -> {}",
            amplitude.channel,
            result.peak_frequency_hz,
            result.peak_magnitude,
            peak.dominance(),
            result.amplitude_percent,
            result.confidence_percent,
            result.detection
        );
        if result.detection != Detection::Undetermined {
            tracing::info!(
                "[Pipeline] Detection: {} at {:.2} Hz ({:.1}% confidence)",
                result.detection,
                result.peak_frequency_hz,
                result.confidence_percent
            );
        }

        result
    }

    /// Log an acquisition failure, rate limited so a dead microphone does
    /// not flood the log.
    pub fn note_acquisition_failure(&mut self, err: &AcquisitionError) {
        if self.state.acquisition_diag.should_emit() {
            tracing::warn!("[Pipeline] Acquisition failed: {}", err);
        }
    }

    /// First bin of the detection band.
    pub fn detection_start_bin(&self) -> usize {
        self.analyzer.start_bin()
    }

    /// Last bin of the detection band.
    pub fn detection_end_bin(&self) -> usize {
        self.analyzer.end_bin()
    }
}
