// Engine boundary: the surface the playback controllers drive
// Mirrors the platform audio API: load, transport, volume, looping, and an
// asynchronous status feed per loaded track

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::tone::ToneSpec;

/// Where a track's audio comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// Local file on disk (bundled ambience asset, cached narration).
    File(PathBuf),
    /// Remote narration audio, fetched before decoding.
    Url(String),
    /// Procedurally synthesized ambience tone.
    Tone(ToneSpec),
}

/// Snapshot pushed by the engine over a track's status channel at roughly
/// 5 Hz, and on transport events.
///
/// Every field is independently possibly stale by the time a consumer sees
/// it; consumers must treat the payload as advisory and tolerate partial or
/// erroneous updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub did_just_finish: bool,
    pub error: Option<String>,
}

/// Per-track configuration applied before playback begins.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub autoplay: bool,
    pub looping: bool,
    pub volume: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            autoplay: false,
            looping: false,
            volume: 1.0,
        }
    }
}

pub type StatusSender = mpsc::UnboundedSender<EngineStatus>;
pub type StatusReceiver = mpsc::UnboundedReceiver<EngineStatus>;

/// An audio engine capable of opening sources into live tracks.
///
/// Implementations report failures as strings; the controllers wrap them
/// into the public error taxonomy.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Open `source`, apply `options`, and hand back a live track. Statuses
    /// flow on `status_tx` until the track is unloaded.
    async fn load(
        &self,
        source: AudioSource,
        options: LoadOptions,
        status_tx: StatusSender,
    ) -> Result<Box<dyn TrackHandle>, String>;
}

/// A loaded track owned by exactly one controller.
pub trait TrackHandle: Send + Sync {
    fn play(&self);
    fn pause(&self);

    /// Reads the engine's actual transport state, not a cached copy. The
    /// controllers consult this immediately before toggling so an external
    /// transport change can't cause a double-invocation.
    fn is_playing(&self) -> bool;

    /// Whether the track still holds engine resources.
    fn is_loaded(&self) -> bool;

    fn seek_ms(&self, position_ms: u64);
    fn set_volume(&self, volume: f32);
    fn set_looping(&self, looping: bool);
    fn duration_ms(&self) -> u64;

    /// Stop playback and release engine resources. Idempotent; safe to call
    /// on an already-unloaded track.
    fn stop_and_unload(&self);
}
