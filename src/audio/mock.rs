// Scripted engine for controller tests
// Records every load, lets tests gate load completion, force failures, and
// inject status payloads on a recorded track's channel

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::engine::{AudioEngine, AudioSource, LoadOptions, StatusSender, TrackHandle};

pub struct MockEngine {
    state: Mutex<MockEngineState>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

struct MockEngineState {
    loads: Vec<MockLoad>,
    fail_next_load: bool,
    next_duration_ms: u64,
}

/// One recorded `load` call, kept alive for the whole test so statuses can
/// be injected after the fact.
#[derive(Clone)]
pub struct MockLoad {
    pub source: AudioSource,
    pub options: LoadOptions,
    pub status_tx: StatusSender,
    pub track: Arc<MockTrackState>,
}

pub struct MockTrackState {
    duration_ms: u64,
    playing: AtomicBool,
    looping: AtomicBool,
    loaded: AtomicBool,
    volume: Mutex<f32>,
    seeks: Mutex<Vec<u64>>,
}

impl MockTrackState {
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    pub fn seeks(&self) -> Vec<u64> {
        self.seeks.lock().clone()
    }

    /// Flip the transport behind the controller's back, standing in for an
    /// external interruption the controller hasn't heard about yet.
    pub fn force_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockEngineState {
                loads: Vec::new(),
                fail_next_load: false,
                next_duration_ms: 10_000,
            }),
            gate: Mutex::new(None),
        })
    }

    /// Make every subsequent load wait for a permit before completing.
    pub fn gate_loads(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_next_load(&self) {
        self.state.lock().fail_next_load = true;
    }

    pub fn set_next_duration_ms(&self, duration_ms: u64) {
        self.state.lock().next_duration_ms = duration_ms;
    }

    pub fn load_count(&self) -> usize {
        self.state.lock().loads.len()
    }

    pub fn load_at(&self, index: usize) -> MockLoad {
        self.state.lock().loads[index].clone()
    }

    pub fn last_load(&self) -> MockLoad {
        self.state.lock().loads.last().expect("no loads recorded").clone()
    }
}

struct MockTrack {
    state: Arc<MockTrackState>,
}

impl TrackHandle for MockTrack {
    fn play(&self) {
        if self.state.loaded.load(Ordering::SeqCst) {
            self.state.playing.store(true, Ordering::SeqCst);
        }
    }

    fn pause(&self) {
        self.state.playing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    fn seek_ms(&self, position_ms: u64) {
        self.state.seeks.lock().push(position_ms);
    }

    fn set_volume(&self, volume: f32) {
        *self.state.volume.lock() = volume;
    }

    fn set_looping(&self, looping: bool) {
        self.state.looping.store(looping, Ordering::SeqCst);
    }

    fn duration_ms(&self) -> u64 {
        self.state.duration_ms
    }

    fn stop_and_unload(&self) {
        self.state.playing.store(false, Ordering::SeqCst);
        self.state.loaded.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioEngine for MockEngine {
    async fn load(
        &self,
        source: AudioSource,
        options: LoadOptions,
        status_tx: StatusSender,
    ) -> Result<Box<dyn TrackHandle>, String> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire().await.map_err(|_| "gate closed".to_string())?.forget();
        }

        let mut state = self.state.lock();
        if state.fail_next_load {
            state.fail_next_load = false;
            return Err("simulated load failure".to_string());
        }

        let track_state = Arc::new(MockTrackState {
            duration_ms: state.next_duration_ms,
            playing: AtomicBool::new(options.autoplay),
            looping: AtomicBool::new(options.looping),
            loaded: AtomicBool::new(true),
            volume: Mutex::new(options.volume),
            seeks: Mutex::new(Vec::new()),
        });

        state.loads.push(MockLoad {
            source,
            options,
            status_tx,
            track: Arc::clone(&track_state),
        });

        Ok(Box::new(MockTrack { state: track_state }))
    }
}
