// Live capture backend built on cpal.
//
// The real-time callback converts f32 samples into left-justified 24-bit ADC
// words and pushes them into a lock-free SPSC ring; `read_block` drains the
// ring with a sleep-poll loop so the pipeline sees a plain blocking read.
// The callback never blocks or allocates: when the ring is full, words are
// dropped and the reader times out instead.

use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};

use super::{SampleBlock, SampleSource, CHANNELS, FULL_SCALE_24BIT, SAMPLE_SHIFT};
use crate::error::AcquisitionError;

/// Ring capacity in seconds of stereo audio.
const RING_SECONDS: usize = 2;

/// Convert a normalized f32 sample into the 32-bit word format the pipeline
/// expects: a 24-bit sample left-shifted by `SAMPLE_SHIFT`.
fn to_adc_word(sample: f32) -> i32 {
    let scaled = (f64::from(sample.clamp(-1.0, 1.0)) * (FULL_SCALE_24BIT - 1.0)) as i32;
    scaled << SAMPLE_SHIFT
}

/// Microphone source backed by a cpal input stream.
pub struct CpalSource {
    // Held to keep the stream alive; dropping it stops capture.
    _stream: cpal::Stream,
    consumer: Consumer<i32>,
    sample_rate: u32,
    read_timeout: Duration,
}

impl CpalSource {
    /// Open the default input device, preferring `desired_rate` when the
    /// hardware supports it.
    pub fn open(desired_rate: u32, read_timeout: Duration) -> Result<Self, AcquisitionError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AcquisitionError::DeviceUnavailable)?;

        let default_config =
            device
                .default_input_config()
                .map_err(|e| AcquisitionError::StreamOpenFailed {
                    reason: format!("failed to get default input config: {:?}", e),
                })?;

        if default_config.sample_format() != cpal::SampleFormat::F32 {
            return Err(AcquisitionError::StreamOpenFailed {
                reason: "only F32 input sample format is supported".to_string(),
            });
        }

        let mut stream_config: cpal::StreamConfig = default_config.into();
        if rate_supported(&device, desired_rate) {
            stream_config.sample_rate = cpal::SampleRate(desired_rate);
        } else {
            tracing::warn!(
                "[Capture] Device does not support {} Hz, using {} Hz",
                desired_rate,
                stream_config.sample_rate.0
            );
        }
        let sample_rate = stream_config.sample_rate.0;
        let input_channels = stream_config.channels.max(1) as usize;

        let capacity = sample_rate as usize * CHANNELS * RING_SECONDS;
        let (mut producer, consumer) = RingBuffer::<i32>::new(capacity);

        let err_fn = |err| eprintln!("Input stream error: {}", err);
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(input_channels) {
                        let left = frame.first().copied().unwrap_or(0.0);
                        let right = frame.get(1).copied().unwrap_or(0.0);
                        // Full ring: drop the frame, the reader will notice.
                        let _ = producer.push(to_adc_word(left));
                        let _ = producer.push(to_adc_word(right));
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AcquisitionError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?;

        stream.play().map_err(|e| AcquisitionError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        tracing::info!(
            "[Capture] Input stream open: {} Hz, {} channel(s)",
            sample_rate,
            input_channels
        );

        Ok(Self {
            _stream: stream,
            consumer,
            sample_rate,
            read_timeout,
        })
    }
}

impl SampleSource for CpalSource {
    fn read_block(&mut self, block: &mut SampleBlock) -> Result<usize, AcquisitionError> {
        let words_needed = block.capacity() * CHANNELS;
        let deadline = Instant::now() + self.read_timeout;
        let mut filled = 0;

        while filled < words_needed {
            match self.consumer.pop() {
                Ok(word) => {
                    block.words_mut()[filled] = word;
                    filled += 1;
                }
                Err(_) => {
                    if Instant::now() >= deadline {
                        block.set_frames_read(filled / CHANNELS);
                        return Err(AcquisitionError::Timeout {
                            waited_ms: self.read_timeout.as_millis() as u64,
                        });
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }

        block.set_frames_read(block.capacity());
        Ok(block.capacity())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn rate_supported(device: &cpal::Device, rate: u32) -> bool {
    device
        .supported_input_configs()
        .map(|mut configs| {
            configs.any(|c| {
                c.sample_format() == cpal::SampleFormat::F32
                    && c.min_sample_rate().0 <= rate
                    && rate <= c.max_sample_rate().0
            })
        })
        .unwrap_or(false)
}
