// Audio module - sample acquisition boundary
//
// Defines the fixed-size interleaved sample block the pipeline consumes and
// the blocking SampleSource trait that hides the capture backend. Two
// backends exist: live capture via cpal (capture.rs) and offline WAV replay
// via hound (wav.rs).

pub mod capture;
pub mod wav;

use crate::error::AcquisitionError;

pub use capture::CpalSource;
pub use wav::WavSource;

/// Channels per frame. The INMP441-style front end always delivers stereo
/// words even when only one microphone is wired, which is why the pipeline
/// auto-selects the louder channel.
pub const CHANNELS: usize = 2;

/// Bits to discard from the low end of each 32-bit ADC word. The converter
/// left-justifies 24-bit samples, so `word >> SAMPLE_SHIFT` recovers them.
pub const SAMPLE_SHIFT: u32 = 8;

/// Full-scale reference of the 24-bit converter (2^23).
pub const FULL_SCALE_24BIT: f64 = 8_388_608.0;

/// One acquisition's worth of interleaved stereo ADC words.
///
/// The buffer is allocated once and reused every iteration; `frames_read`
/// records how much of it the last read actually filled. A failed or empty
/// read leaves it at zero, which downstream stages treat as silence.
#[derive(Debug, Clone)]
pub struct SampleBlock {
    words: Vec<i32>,
    frames: usize,
    frames_read: usize,
}

impl SampleBlock {
    /// Allocate a zeroed block of `frames` stereo frames.
    pub fn new(frames: usize) -> Self {
        Self {
            words: vec![0; frames * CHANNELS],
            frames,
            frames_read: 0,
        }
    }

    /// Capacity of the block in frames.
    pub fn capacity(&self) -> usize {
        self.frames
    }

    /// Frames actually filled by the last read.
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Raw ADC word for `frame` on `channel`, or 0 past the filled region.
    pub fn word(&self, frame: usize, channel: usize) -> i32 {
        debug_assert!(channel < CHANNELS);
        if frame < self.frames_read {
            self.words[frame * CHANNELS + channel]
        } else {
            0
        }
    }

    /// Mutable access to the interleaved word storage for sources to fill.
    pub fn words_mut(&mut self) -> &mut [i32] {
        &mut self.words
    }

    /// Record how many frames the source filled, clamped to capacity.
    pub fn set_frames_read(&mut self, frames: usize) {
        self.frames_read = frames.min(self.frames);
    }

    /// Zero the block and mark it empty (the degraded-acquisition path).
    pub fn clear(&mut self) {
        self.words.fill(0);
        self.frames_read = 0;
    }
}

/// Blocking acquisition boundary.
///
/// `read_block` blocks until a full block is available, the deadline passes,
/// or the source fails; it returns the number of frames filled. Callers must
/// treat any error as a valid-but-empty block rather than aborting.
pub trait SampleSource {
    /// Fill `block` with the next batch of interleaved stereo words.
    fn read_block(&mut self, block: &mut SampleBlock) -> Result<usize, AcquisitionError>;

    /// Sample rate of the delivered frames in Hz.
    fn sample_rate(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_reads_zero_past_filled_region() {
        let mut block = SampleBlock::new(4);
        block.words_mut()[0] = 100;
        block.words_mut()[1] = -200;
        block.set_frames_read(1);

        assert_eq!(block.word(0, 0), 100);
        assert_eq!(block.word(0, 1), -200);
        assert_eq!(block.word(1, 0), 0, "unfilled frames must read as silence");
        assert_eq!(block.word(3, 1), 0);
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut block = SampleBlock::new(2);
        block.words_mut().fill(42);
        block.set_frames_read(2);

        block.clear();
        assert_eq!(block.frames_read(), 0);
        assert_eq!(block.word(0, 0), 0);
    }

    #[test]
    fn frames_read_clamps_to_capacity() {
        let mut block = SampleBlock::new(8);
        block.set_frames_read(64);
        assert_eq!(block.frames_read(), 8);
    }
}
