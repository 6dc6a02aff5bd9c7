// Real audio engine: Symphonia decode, linear resample to the device rate,
// a producer thread feeding a per-track cpal stream

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use super::decoder::{self, DecodedClip};
use super::engine::{
    AudioEngine, AudioSource, EngineStatus, LoadOptions, StatusSender, TrackHandle,
};
use super::output::{ensure_output_device, AudioOutput, OutputControl};
use super::tone::{render_tone, TONE_CHANNELS, TONE_SAMPLE_RATE};

/// Upper bound on fetch + decode + device open before a load is abandoned.
const LOAD_TIMEOUT: Duration = Duration::from_secs(20);
/// Cadence of the status feed (~5 Hz).
const STATUS_INTERVAL: Duration = Duration::from_millis(200);
/// Frames pushed per producer iteration.
const PRODUCER_CHUNK_FRAMES: usize = 1024;

const SEEK_NONE: u64 = u64::MAX;

pub struct CpalAudioEngine {
    http: reqwest::Client,
}

impl CpalAudioEngine {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn acquire_clip(&self, source: &AudioSource) -> Result<DecodedClip, String> {
        match source {
            AudioSource::Tone(spec) => Ok(DecodedClip {
                samples: render_tone(*spec),
                sample_rate: TONE_SAMPLE_RATE,
                channels: TONE_CHANNELS as usize,
            }),
            AudioSource::File(path) => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || decoder::decode_file(&path))
                    .await
                    .map_err(|e| format!("Decode task failed: {}", e))?
            }
            AudioSource::Url(url) => {
                let bytes = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| format!("Failed to fetch {}: {}", url, e))?
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read body of {}: {}", url, e))?;
                tokio::task::spawn_blocking(move || decoder::decode_bytes(bytes.to_vec()))
                    .await
                    .map_err(|e| format!("Decode task failed: {}", e))?
            }
        }
    }
}

impl Default for CpalAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioEngine for CpalAudioEngine {
    async fn load(
        &self,
        source: AudioSource,
        options: LoadOptions,
        status_tx: StatusSender,
    ) -> Result<Box<dyn TrackHandle>, String> {
        ensure_output_device()?;

        let load = async {
            let clip = self.acquire_clip(&source).await?;
            let duration_ms = clip.duration_ms();

            let transport = Arc::new(Transport {
                playing: AtomicBool::new(options.autoplay),
                looping: AtomicBool::new(options.looping),
                stop: AtomicBool::new(false),
                unloaded: AtomicBool::new(false),
                seek_ms_request: AtomicU64::new(SEEK_NONE),
            });
            let control = OutputControl::new(options.volume);
            control.set_suspended(!options.autoplay);

            // The cpal stream is not Send, so the producer thread owns it
            // for the track's whole life and reports readiness back once.
            let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();
            let thread_transport = Arc::clone(&transport);
            let thread_control = Arc::clone(&control);
            thread::Builder::new()
                .name("rewired-track".to_string())
                .spawn(move || {
                    run_track(
                        clip,
                        duration_ms,
                        thread_transport,
                        thread_control,
                        status_tx,
                        ready_tx,
                    )
                })
                .map_err(|e| format!("Failed to spawn track thread: {}", e))?;

            ready_rx
                .await
                .map_err(|_| "Track thread exited before opening output".to_string())??;

            Ok::<Box<dyn TrackHandle>, String>(Box::new(CpalTrack {
                transport,
                control,
                duration_ms,
            }))
        };

        match tokio::time::timeout(LOAD_TIMEOUT, load).await {
            Ok(result) => result,
            Err(_) => Err(format!("Load timed out after {:?}", LOAD_TIMEOUT)),
        }
    }
}

/// Transport flags shared between the handle and the producer thread.
struct Transport {
    playing: AtomicBool,
    looping: AtomicBool,
    stop: AtomicBool,
    unloaded: AtomicBool,
    seek_ms_request: AtomicU64,
}

struct CpalTrack {
    transport: Arc<Transport>,
    control: Arc<OutputControl>,
    duration_ms: u64,
}

impl TrackHandle for CpalTrack {
    fn play(&self) {
        if self.transport.unloaded.load(Ordering::SeqCst) {
            return;
        }
        self.transport.playing.store(true, Ordering::SeqCst);
        self.control.set_suspended(false);
    }

    fn pause(&self) {
        self.transport.playing.store(false, Ordering::SeqCst);
        self.control.set_suspended(true);
    }

    fn is_playing(&self) -> bool {
        !self.transport.unloaded.load(Ordering::SeqCst)
            && self.transport.playing.load(Ordering::SeqCst)
    }

    fn is_loaded(&self) -> bool {
        !self.transport.unloaded.load(Ordering::SeqCst)
    }

    fn seek_ms(&self, position_ms: u64) {
        let clamped = position_ms.min(self.duration_ms);
        self.transport
            .seek_ms_request
            .store(clamped, Ordering::SeqCst);
        self.control.request_clear();
    }

    fn set_volume(&self, volume: f32) {
        self.control.set_volume(volume);
    }

    fn set_looping(&self, looping: bool) {
        self.transport.looping.store(looping, Ordering::SeqCst);
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    fn stop_and_unload(&self) {
        self.transport.playing.store(false, Ordering::SeqCst);
        self.transport.stop.store(true, Ordering::SeqCst);
        self.transport.unloaded.store(true, Ordering::SeqCst);
        self.control.set_suspended(true);
    }
}

impl Drop for CpalTrack {
    fn drop(&mut self) {
        self.stop_and_unload();
    }
}

/// Producer loop: owns the output stream, feeds it from the decoded clip,
/// honors seek/loop/stop flags, and emits the status feed.
fn run_track(
    clip: DecodedClip,
    duration_ms: u64,
    transport: Arc<Transport>,
    control: Arc<OutputControl>,
    status_tx: StatusSender,
    ready_tx: oneshot::Sender<Result<(), String>>,
) {
    let output = match AudioOutput::open(Arc::clone(&control)) {
        Ok(o) => o,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let out_rate = output.sample_rate();
    let out_channels = output.channels() as usize;

    let mut pcm = clip.samples;
    if clip.sample_rate != out_rate {
        pcm = resample_linear(&pcm, clip.sample_rate, out_rate, clip.channels);
    }
    if clip.channels != out_channels {
        pcm = adapt_channels(&pcm, clip.channels, out_channels);
    }

    let _ = ready_tx.send(Ok(()));

    let total_frames = pcm.len() / out_channels.max(1);
    let mut read_frame = 0usize;
    let mut finished = false;

    let emit = |read_frame: usize, playing: bool, did_just_finish: bool| {
        let position_ms = read_frame as u64 * 1000 / out_rate.max(1) as u64;
        let _ = status_tx.send(EngineStatus {
            is_loaded: true,
            is_playing: playing,
            position_ms: position_ms.min(duration_ms),
            duration_ms,
            did_just_finish,
            error: None,
        });
    };

    // Initial status so subscribers learn the track is loaded.
    emit(0, transport.playing.load(Ordering::SeqCst), false);
    let mut last_status = Instant::now();

    loop {
        if transport.stop.load(Ordering::SeqCst) {
            break;
        }

        let requested_seek = transport.seek_ms_request.swap(SEEK_NONE, Ordering::SeqCst);
        if requested_seek != SEEK_NONE {
            read_frame = ((requested_seek as u128 * out_rate as u128 / 1000) as usize)
                .min(total_frames);
            finished = read_frame >= total_frames;
        }

        let playing = transport.playing.load(Ordering::SeqCst);
        if playing && !finished {
            let free = output.available_space();
            if free >= out_channels {
                let writable_frames = (free / out_channels).min(PRODUCER_CHUNK_FRAMES);
                let end = ((read_frame + writable_frames) * out_channels).min(pcm.len());
                let written = output.write(&pcm[read_frame * out_channels..end]);
                read_frame += written / out_channels;
            }

            if read_frame >= total_frames {
                if transport.looping.load(Ordering::SeqCst) {
                    read_frame = 0;
                } else {
                    // Let the buffered tail play out before reporting done.
                    while output.buffered() > 0
                        && !transport.stop.load(Ordering::SeqCst)
                        && transport.playing.load(Ordering::SeqCst)
                    {
                        thread::sleep(Duration::from_millis(5));
                    }
                    finished = true;
                    transport.playing.store(false, Ordering::SeqCst);
                    control.set_suspended(true);
                    emit(total_frames, false, true);
                    last_status = Instant::now();
                }
            }
        } else {
            thread::sleep(Duration::from_millis(5));
        }

        if last_status.elapsed() >= STATUS_INTERVAL {
            emit(
                read_frame,
                transport.playing.load(Ordering::SeqCst),
                false,
            );
            last_status = Instant::now();
        }

        thread::sleep(Duration::from_millis(2));
    }
}

/// Linear-interpolation resampler. Narration clips are short spoken word,
/// where the quality gap to a windowed-sinc resampler is inaudible.
fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32, channels: usize) -> Vec<f32> {
    if from_rate == to_rate || channels == 0 || input.is_empty() {
        return input.to_vec();
    }

    let in_frames = input.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }
    let out_frames = (in_frames as u64 * to_rate as u64 / from_rate as u64) as usize;
    let mut out = Vec::with_capacity(out_frames * channels);

    for frame in 0..out_frames {
        let src_pos = frame as f64 * from_rate as f64 / to_rate as f64;
        let src_frame = src_pos as usize;
        let frac = (src_pos - src_frame as f64) as f32;
        let next_frame = (src_frame + 1).min(in_frames - 1);

        for ch in 0..channels {
            let a = input[src_frame * channels + ch];
            let b = input[next_frame * channels + ch];
            out.push(a + (b - a) * frac);
        }
    }

    out
}

/// Duplicate or fold channels to match the device layout.
fn adapt_channels(input: &[f32], in_channels: usize, out_channels: usize) -> Vec<f32> {
    if in_channels == out_channels || in_channels == 0 || out_channels == 0 {
        return input.to_vec();
    }

    let frames = input.len() / in_channels;
    let mut out = vec![0.0f32; frames * out_channels];
    for frame in 0..frames {
        for ch in 0..out_channels {
            out[frame * out_channels + ch] = input[frame * in_channels + (ch % in_channels)];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_identity_when_rates_match() {
        let input = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_linear(&input, 44_100, 44_100, 2), input);
    }

    #[test]
    fn test_resample_halves_frame_count() {
        let input: Vec<f32> = (0..400).map(|i| i as f32 / 400.0).collect();
        let out = resample_linear(&input, 48_000, 24_000, 2);
        assert_eq!(out.len(), 200);
    }

    #[test]
    fn test_adapt_mono_to_stereo_duplicates() {
        let out = adapt_channels(&[0.5, -0.5], 1, 2);
        assert_eq!(out, vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_adapt_stereo_to_mono_takes_left() {
        let out = adapt_channels(&[0.5, -0.5, 0.25, -0.25], 2, 1);
        assert_eq!(out, vec![0.5, 0.25]);
    }
}
