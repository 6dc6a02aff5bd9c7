// Audio output using cpal
// One output stream per live track; narration and ambience mix at the
// device, each with its own independently controlled volume

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

const RING_BUFFER_SIZE: usize = 48000 * 2 / 4; // ~250ms of stereo audio at 48kHz

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Knobs shared with the realtime callback. Plain atomics so neither side
/// can block the audio thread.
pub struct OutputControl {
    volume_bits: AtomicU32,
    suspended: AtomicBool,
    clear_flag: AtomicBool,
}

impl OutputControl {
    pub fn new(volume: f32) -> Arc<Self> {
        Arc::new(Self {
            volume_bits: AtomicU32::new(volume.clamp(0.0, 1.0).to_bits()),
            suspended: AtomicBool::new(true),
            clear_flag: AtomicBool::new(false),
        })
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume_bits
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::SeqCst))
    }

    /// While suspended the callback emits silence without consuming, so the
    /// buffered audio survives a pause/resume cycle.
    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::SeqCst);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// Ask the callback to drain any buffered samples (used when seeking).
    pub fn request_clear(&self) {
        self.clear_flag.store(true, Ordering::SeqCst);
    }
}

pub struct AudioOutput {
    _stream: Stream,
    producer: Mutex<RingProducer>,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// Open a stream on the default output device.
    pub fn open(control: Arc<OutputControl>) -> Result<Self, String> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or("No output device available")?;

        let config = device
            .default_output_config()
            .map_err(|e| format!("Failed to get default output config: {}", e))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = rb.split();
        let consumer = Mutex::new(consumer);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), consumer, control)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), consumer, control)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), consumer, control)?
            }
            format => return Err(format!("Unsupported sample format: {:?}", format)),
        };

        stream
            .play()
            .map_err(|e| format!("Failed to start stream: {}", e))?;

        Ok(Self {
            _stream: stream,
            producer: Mutex::new(producer),
            sample_rate,
            channels,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        consumer: Mutex<RingConsumer>,
        control: Arc<OutputControl>,
    ) -> Result<Stream, String> {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut consumer = consumer.lock();

                    if control.clear_flag.swap(false, Ordering::SeqCst) {
                        while consumer.try_pop().is_some() {}
                    }

                    if control.suspended.load(Ordering::SeqCst) {
                        for sample in data.iter_mut() {
                            *sample = T::from_sample(0.0);
                        }
                        return;
                    }

                    let vol = f32::from_bits(control.volume_bits.load(Ordering::SeqCst));
                    for sample in data.iter_mut() {
                        let value = consumer.try_pop().unwrap_or(0.0) * vol;
                        *sample = T::from_sample(value);
                    }
                },
                move |err| {
                    log::warn!("[Output] Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| format!("Failed to build output stream: {}", e))?;

        Ok(stream)
    }

    /// Write samples to the output buffer.
    /// Returns the number of samples actually written.
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut producer = self.producer.lock();
        let mut written = 0;

        for &sample in samples {
            if producer.try_push(sample).is_ok() {
                written += 1;
            } else {
                break;
            }
        }

        written
    }

    /// Get available space in the buffer.
    pub fn available_space(&self) -> usize {
        let producer = self.producer.lock();
        producer.vacant_len()
    }

    /// Samples currently buffered and not yet played.
    pub fn buffered(&self) -> usize {
        let producer = self.producer.lock();
        producer.occupied_len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Probe the default output device once per process. Both controllers call
/// this at first use; repeated calls are harmless and return the cached
/// result.
pub fn ensure_output_device() -> Result<(), String> {
    static DEVICE_PROBE: OnceLock<Result<String, String>> = OnceLock::new();

    let probed = DEVICE_PROBE.get_or_init(|| {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "No output device available".to_string())?;
        let name = device
            .name()
            .unwrap_or_else(|_| "unknown device".to_string());
        log::info!("[Output] Audio output device: {}", name);
        Ok(name)
    });

    probed.clone().map(|_| ())
}
