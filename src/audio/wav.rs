// Offline WAV replay backend.
//
// Feeds recorded audio through the same SampleSource boundary as live
// capture, which makes field recordings replayable through the full pipeline
// for threshold tuning. Samples are rescaled to the 24-bit ADC word format
// on load; mono files land on channel 0 with channel 1 silent, mirroring a
// single wired microphone.

use std::path::Path;

use super::{SampleBlock, SampleSource, CHANNELS, SAMPLE_SHIFT};
use crate::error::AcquisitionError;

pub struct WavSource {
    words: Vec<i32>,
    cursor: usize,
    sample_rate: u32,
}

impl WavSource {
    /// Decode the whole file into interleaved stereo ADC words.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AcquisitionError> {
        let mut reader = hound::WavReader::open(&path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let mono_or_stereo: Vec<i32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let bits = spec.bits_per_sample as i32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| rescale_int(v, bits)))
                    .collect::<Result<_, _>>()?
            }
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(rescale_float))
                .collect::<Result<_, _>>()?,
        };

        let frames = mono_or_stereo.len() / channels;
        let mut words = Vec::with_capacity(frames * CHANNELS);
        for frame in mono_or_stereo.chunks(channels) {
            words.push(frame[0]);
            words.push(if channels > 1 { frame[1] } else { 0 });
        }

        tracing::info!(
            "[Wav] Loaded {:?}: {} frames at {} Hz ({} channel(s))",
            path.as_ref(),
            frames,
            spec.sample_rate,
            channels
        );

        Ok(Self {
            words,
            cursor: 0,
            sample_rate: spec.sample_rate,
        })
    }
}

impl SampleSource for WavSource {
    fn read_block(&mut self, block: &mut SampleBlock) -> Result<usize, AcquisitionError> {
        let words_needed = block.capacity() * CHANNELS;
        let remaining = self.words.len() - self.cursor;
        if remaining < words_needed {
            block.clear();
            return Err(AcquisitionError::EndOfStream);
        }

        block
            .words_mut()
            .copy_from_slice(&self.words[self.cursor..self.cursor + words_needed]);
        self.cursor += words_needed;
        block.set_frames_read(block.capacity());
        Ok(block.capacity())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Rescale an integer PCM sample of `bits` width to a left-justified 24-bit
/// word (24-bit value shifted up by `SAMPLE_SHIFT`).
fn rescale_int(sample: i32, bits: i32) -> i32 {
    let sample_24 = if bits <= 24 {
        sample << (24 - bits)
    } else {
        sample >> (bits - 24)
    };
    sample_24 << SAMPLE_SHIFT
}

fn rescale_float(sample: f32) -> i32 {
    let scaled = (f64::from(sample.clamp(-1.0, 1.0)) * 8_388_607.0) as i32;
    scaled << SAMPLE_SHIFT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_widens_16_bit_samples() {
        // i16::MAX should land near 24-bit full scale before the shift.
        let word = rescale_int(i32::from(i16::MAX), 16);
        let sample_24 = word >> SAMPLE_SHIFT;
        assert!(sample_24 > 8_380_000, "got {}", sample_24);
    }

    #[test]
    fn wav_source_round_trips_blocks() {
        let dir = std::env::temp_dir().join("hive_sentry_wav_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tone.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 10_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..2048u32 {
            let t = i as f32 / 10_000.0;
            let s = (2.0 * std::f32::consts::PI * 250.0 * t).sin();
            writer.write_sample((s * 20_000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(source.sample_rate(), 10_000);

        let mut block = SampleBlock::new(1024);
        assert_eq!(source.read_block(&mut block).unwrap(), 1024);
        assert_eq!(block.frames_read(), 1024);
        // Mono input: channel 1 must be silent.
        assert_eq!(block.word(0, 1), 0);

        assert_eq!(source.read_block(&mut block).unwrap(), 1024);
        assert!(matches!(
            source.read_block(&mut block),
            Err(AcquisitionError::EndOfStream)
        ));
        assert_eq!(block.frames_read(), 0, "EOF must leave an empty block");
    }
}
