// Spectral analyzer - windowed FFT, band-limited peak search, and sub-bin
// refinement.
//
// The transform runs in place on the shared SignalBuffer and destroys its
// time-domain contents; see the buffer contract in mod.rs. Peak search is
// restricted to the configured detection band, clamped away from DC and the
// Nyquist mirror region, and refined with parabolic interpolation over the
// peak bin and its two neighbors.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::SignalBuffer;

/// Dominant spectral peak within the detection band.
#[derive(Debug, Clone, Copy)]
pub struct SpectralPeak {
    /// Bin of maximum magnitude; always within the clamped band.
    pub bin: usize,
    /// Peak frequency in Hz after parabolic refinement.
    pub frequency_hz: f64,
    /// Magnitude at the peak bin.
    pub magnitude: f64,
    /// Arithmetic mean magnitude across the whole band.
    pub band_average: f64,
}

impl SpectralPeak {
    /// Ratio of peak magnitude to band average; 0 when the band is silent.
    /// Measures how tonal (vs. noise-like) the signal is.
    pub fn dominance(&self) -> f64 {
        if self.band_average > 0.0 {
            self.magnitude / self.band_average
        } else {
            0.0
        }
    }
}

pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex<f64>>,
    /// Pre-computed Hamming window.
    window: Vec<f64>,
    frames: usize,
    sample_rate: f64,
    start_bin: usize,
    end_bin: usize,
}

impl SpectralAnalyzer {
    /// Plan the transform and fix the detection-band bin range for a
    /// [min_freq_hz, max_freq_hz] band at the given rate.
    pub fn new(frames: usize, sample_rate: f64, min_freq_hz: f64, max_freq_hz: f64) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frames);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let window = (0..frames)
            .map(|i| {
                0.54 - 0.46
                    * ((2.0 * std::f64::consts::PI * i as f64) / (frames as f64 - 1.0)).cos()
            })
            .collect();

        let (start_bin, end_bin) = detection_band_bins(frames, sample_rate, min_freq_hz, max_freq_hz);

        Self {
            fft,
            scratch,
            window,
            frames,
            sample_rate,
            start_bin,
            end_bin,
        }
    }

    /// First bin of the clamped detection band (always >= 2).
    pub fn start_bin(&self) -> usize {
        self.start_bin
    }

    /// Last bin of the clamped detection band (always <= N/2 - 1).
    pub fn end_bin(&self) -> usize {
        self.end_bin
    }

    /// Window, transform, and locate the dominant peak.
    ///
    /// Overwrites `signal` with its magnitude spectrum; the time-domain data
    /// is gone afterwards.
    pub fn analyze(&mut self, signal: &mut SignalBuffer) -> SpectralPeak {
        debug_assert_eq!(signal.len(), self.frames);

        let bins = signal.bins_mut();
        for (bin, w) in bins.iter_mut().zip(self.window.iter()) {
            bin.re *= w;
            bin.im = 0.0;
        }

        self.fft.process_with_scratch(bins, &mut self.scratch);

        // Magnitude spectrum in place, mirroring the destructive transform.
        for bin in bins.iter_mut() {
            *bin = Complex::new(bin.norm(), 0.0);
        }

        let mut max_magnitude = 0.0f64;
        let mut sum_magnitude = 0.0f64;
        let mut peak_bin = self.start_bin;
        for i in self.start_bin..=self.end_bin {
            let magnitude = bins[i].re;
            sum_magnitude += magnitude;
            if magnitude > max_magnitude {
                max_magnitude = magnitude;
                peak_bin = i;
            }
        }
        let band_average = sum_magnitude / (self.end_bin - self.start_bin + 1) as f64;

        let bin_width = self.sample_rate / self.frames as f64;
        let mut frequency_hz = peak_bin as f64 * bin_width;

        // Sub-bin refinement needs both neighbors inside the band.
        if peak_bin > self.start_bin && peak_bin < self.end_bin {
            let y0 = bins[peak_bin - 1].re;
            let y1 = bins[peak_bin].re;
            let y2 = bins[peak_bin + 1].re;
            let delta = parabolic_offset(y0, y1, y2);
            frequency_hz = (peak_bin as f64 + delta) * bin_width;
        }

        SpectralPeak {
            bin: peak_bin,
            frequency_hz,
            magnitude: max_magnitude,
            band_average,
        }
    }
}

/// Parabolic interpolation offset for a peak at y1 with neighbors y0, y2.
///
/// Returns 0 when the parabola degenerates (flat neighborhood) so a silent
/// or pathological spectrum never produces NaN.
pub fn parabolic_offset(y0: f64, y1: f64, y2: f64) -> f64 {
    let denom = y0 - 2.0 * y1 + y2;
    if denom == 0.0 {
        return 0.0;
    }
    (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5)
}

/// Compute the clamped detection-band bin range.
///
/// Lower bound rounds up and is clamped to >= 2 (skipping DC and its
/// neighbor); upper bound rounds down and is clamped to <= N/2 - 1
/// (skipping the Nyquist mirror region). The range is never empty, even
/// for block sizes too small to leave room above bin 2.
pub fn detection_band_bins(
    frames: usize,
    sample_rate: f64,
    min_freq_hz: f64,
    max_freq_hz: f64,
) -> (usize, usize) {
    // Keep a valid clamp range even for tiny block sizes from a hand-edited
    // config.
    let ceiling = (frames / 2).saturating_sub(1).max(2);
    let raw_start = ((min_freq_hz * frames as f64) / sample_rate).ceil().max(0.0) as usize;
    let raw_end = ((max_freq_hz * frames as f64) / sample_rate).floor().max(0.0) as usize;

    let start = raw_start.clamp(2, ceiling);
    let end = raw_end.clamp(start, ceiling);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMES: usize = 1024;
    const SAMPLE_RATE: f64 = 10_000.0;

    fn signal_with_sine(freq: f64, amplitude: f64) -> SignalBuffer {
        let mut signal = SignalBuffer::new(FRAMES);
        for i in 0..FRAMES {
            let t = i as f64 / SAMPLE_RATE;
            signal.set_time_sample(i, (2.0 * std::f64::consts::PI * freq * t).sin() * amplitude);
        }
        signal
    }

    #[test]
    fn band_bins_for_default_config() {
        let (start, end) = detection_band_bins(FRAMES, SAMPLE_RATE, 100.0, 1000.0);
        // 100 Hz -> bin 10.24 -> 11; 1000 Hz -> bin 102.4 -> 102.
        assert_eq!(start, 11);
        assert_eq!(end, 102);
    }

    #[test]
    fn band_bins_clamp_low_and_high() {
        // A band reaching down to DC must still start at bin 2.
        let (start, _) = detection_band_bins(FRAMES, SAMPLE_RATE, 0.0, 1000.0);
        assert_eq!(start, 2);

        // A band past Nyquist must stop short of the mirror region.
        let (_, end) = detection_band_bins(FRAMES, SAMPLE_RATE, 100.0, 100_000.0);
        assert_eq!(end, FRAMES / 2 - 1);
    }

    #[test]
    fn band_bins_never_invert() {
        for (min, max) in [
            (0.0, 1.0),
            (4999.0, 5000.0),
            (900.0, 100.0),
            (0.0, 100_000.0),
        ] {
            let (start, end) = detection_band_bins(FRAMES, SAMPLE_RATE, min, max);
            assert!(start >= 2, "start {} for band [{}, {}]", start, min, max);
            assert!(end <= FRAMES / 2 - 1, "end {} for band [{}, {}]", end, min, max);
            assert!(start <= end, "inverted range for band [{}, {}]", min, max);
        }
    }

    #[test]
    fn band_bins_survive_tiny_block_sizes() {
        // A hand-edited config can shrink frames_per_block below anything
        // sensible; the bin range must stay well formed, never panic.
        for frames in [1, 2, 4, 6, 8, 16] {
            let (start, end) = detection_band_bins(frames, SAMPLE_RATE, 100.0, 1000.0);
            assert!(start >= 2, "start {} for {} frames", start, frames);
            assert!(start <= end, "inverted range for {} frames", frames);
        }
    }

    #[test]
    fn finds_peak_near_injected_frequency() {
        let mut analyzer = SpectralAnalyzer::new(FRAMES, SAMPLE_RATE, 100.0, 1000.0);
        let mut signal = signal_with_sine(250.0, 1_000_000.0);

        let peak = analyzer.analyze(&mut signal);
        let bin_width = SAMPLE_RATE / FRAMES as f64;
        assert!(
            (peak.frequency_hz - 250.0).abs() <= bin_width,
            "peak at {} Hz",
            peak.frequency_hz
        );
        assert!(peak.dominance() > 1.0, "dominance {}", peak.dominance());
    }

    #[test]
    fn peak_bin_stays_inside_band() {
        let mut analyzer = SpectralAnalyzer::new(FRAMES, SAMPLE_RATE, 100.0, 1000.0);

        // A 50 Hz tone lies below the band; the reported bin must still be
        // inside it.
        let mut signal = signal_with_sine(50.0, 1_000_000.0);
        let peak = analyzer.analyze(&mut signal);
        assert!(peak.bin >= analyzer.start_bin() && peak.bin <= analyzer.end_bin());
    }

    #[test]
    fn symmetric_neighbors_give_zero_offset() {
        assert_eq!(parabolic_offset(3.0, 10.0, 3.0), 0.0);
    }

    #[test]
    fn degenerate_parabola_gives_zero_offset() {
        assert_eq!(parabolic_offset(5.0, 5.0, 5.0), 0.0);
        assert_eq!(parabolic_offset(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn offset_is_clamped_to_half_bin() {
        let delta = parabolic_offset(0.0, 1.0, 100.0);
        assert!((-0.5..=0.5).contains(&delta), "got {}", delta);
    }

    #[test]
    fn silent_signal_yields_zero_dominance() {
        let mut analyzer = SpectralAnalyzer::new(FRAMES, SAMPLE_RATE, 100.0, 1000.0);
        let mut signal = SignalBuffer::new(FRAMES);

        let peak = analyzer.analyze(&mut signal);
        assert_eq!(peak.dominance(), 0.0);
        assert!(peak.frequency_hz.is_finite());
        assert!(peak.band_average == 0.0);
    }
}
