// Channel selector and amplitude estimator.
//
// Consumes a raw stereo block, picks the louder channel (microphone L/R
// wiring is unknown in the field, so this is decided per block rather than
// configured), removes DC bias, and derives a 0-100% loudness figure from
// RMS energy expressed in dBFS.

use crate::audio::{SampleBlock, CHANNELS, FULL_SCALE_24BIT, SAMPLE_SHIFT};

use super::SignalBuffer;

/// dBFS substituted when RMS is exactly zero, avoiding log(0).
pub const SILENCE_DBFS: f64 = -120.0;

/// Outcome of ingesting one sample block.
#[derive(Debug, Clone, Copy)]
pub struct BlockAmplitude {
    /// Loudness of this block, or `None` when the block was empty and the
    /// previously cached value should be carried forward.
    pub loudness_percent: Option<f64>,
    /// Channel chosen for analysis (0 or 1).
    pub channel: usize,
    /// Both channels carried zero energy despite a successful read.
    pub both_channels_silent: bool,
}

pub struct AmplitudeEstimator {
    /// dBFS value that maps to 0% loudness; 0 dBFS maps to 100%.
    db_floor: f64,
}

impl AmplitudeEstimator {
    pub fn new(db_floor: f64) -> Self {
        // A floor at or above 0 dBFS would divide by zero in the percent
        // mapping; pin it strictly below full scale.
        let db_floor = if db_floor.is_finite() {
            db_floor.min(-1.0)
        } else {
            -60.0
        };
        Self { db_floor }
    }

    /// Select the louder channel, extract it into `signal` with DC removed,
    /// and estimate loudness.
    ///
    /// An empty block zeroes the signal and reports no loudness update.
    /// Short blocks are padded with silence, matching a partial driver read.
    pub fn ingest(&self, block: &SampleBlock, signal: &mut SignalBuffer) -> BlockAmplitude {
        let frames = signal.len();
        debug_assert_eq!(frames, block.capacity());

        if block.frames_read() == 0 {
            signal.fill_silence();
            return BlockAmplitude {
                loudness_percent: None,
                channel: 0,
                both_channels_silent: false,
            };
        }

        // Total absolute energy per channel decides which microphone is live.
        let mut energy = [0.0f64; CHANNELS];
        for frame in 0..frames {
            for (ch, acc) in energy.iter_mut().enumerate() {
                let sample = block.word(frame, ch) >> SAMPLE_SHIFT;
                *acc += f64::from(sample.unsigned_abs());
            }
        }
        let both_channels_silent = energy[0] == 0.0 && energy[1] == 0.0;
        let channel = usize::from(energy[1] > energy[0]);

        let mut sum = 0.0f64;
        for frame in 0..frames {
            let sample = f64::from(block.word(frame, channel) >> SAMPLE_SHIFT);
            signal.set_time_sample(frame, sample);
            sum += sample;
        }

        // DC removal, then RMS of the zero-mean signal.
        let mean = sum / frames as f64;
        let mut sum_sq = 0.0f64;
        for frame in 0..frames {
            let centered = signal.time_sample(frame) - mean;
            signal.set_time_sample(frame, centered);
            sum_sq += centered * centered;
        }

        let rms = (sum_sq / frames as f64).sqrt();
        let normalized = rms / FULL_SCALE_24BIT;
        let dbfs = if normalized > 0.0 {
            20.0 * normalized.log10()
        } else {
            SILENCE_DBFS
        };
        let percent = ((dbfs - self.db_floor) / (0.0 - self.db_floor)) * 100.0;

        BlockAmplitude {
            loudness_percent: Some(percent.clamp(0.0, 100.0)),
            channel,
            both_channels_silent,
        }
    }
}
