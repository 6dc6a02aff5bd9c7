// Ambience playback controller: the looping background layer
//
// Selection and volume are durable preferences; the track itself is
// ephemeral. Never coupled to the narration controller — the common case is
// both playing at once.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

use crate::audio::engine::{AudioEngine, LoadOptions, StatusReceiver, TrackHandle};
use crate::error::PlaybackError;
use crate::settings::{AmbienceSettings, AmbienceStore};

use super::catalog::AmbienceId;
use super::AmbienceSnapshot;

pub struct AmbiencePlaybackController {
    engine: Arc<dyn AudioEngine>,
    inner: Arc<Mutex<Inner>>,
    state_tx: Arc<watch::Sender<AmbienceSnapshot>>,
    store: AmbienceStore,
}

struct Inner {
    selection: Option<AmbienceId>,
    volume: f32,
    track: Option<Box<dyn TrackHandle>>,
}

impl AmbiencePlaybackController {
    /// Restores the persisted selection and volume; playback itself only
    /// starts on an explicit `start`.
    pub fn new(engine: Arc<dyn AudioEngine>, store: AmbienceStore) -> Self {
        let settings = store.load();
        let snapshot = AmbienceSnapshot {
            selection: settings.selection,
            volume: settings.volume,
            is_playing: false,
        };
        let (state_tx, _) = watch::channel(snapshot);
        Self {
            engine,
            inner: Arc::new(Mutex::new(Inner {
                selection: settings.selection,
                volume: settings.volume,
                track: None,
            })),
            state_tx: Arc::new(state_tx),
            store,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AmbienceSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> AmbienceSnapshot {
        self.state_tx.borrow().clone()
    }

    /// Change the selected ambience. `None` stops and unloads whatever is
    /// playing. While audible, selecting a different entry switches tracks:
    /// the old one is fully unloaded before the new one loads, so the two
    /// never overlap. While silent, only the preference is persisted.
    pub async fn select(&self, id: Option<AmbienceId>) -> Result<(), PlaybackError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if inner.selection == id {
            return Ok(());
        }

        inner.selection = id;
        self.persist(inner);

        let result = match id {
            None => {
                Self::unload_in_place(inner);
                Ok(())
            }
            Some(new_id) => {
                if inner.track.is_some() {
                    Self::unload_in_place(inner);
                    self.start_locked(inner, new_id).await
                } else {
                    Ok(())
                }
            }
        };

        self.publish(inner);
        result
    }

    /// Begin playback of the selected ambience. No-op when nothing is
    /// selected or it is already playing.
    pub async fn start(&self) -> Result<(), PlaybackError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let Some(id) = inner.selection else {
            return Ok(());
        };
        if inner.track.is_some() {
            return Ok(());
        }

        let result = self.start_locked(inner, id).await;
        self.publish(inner);
        result
    }

    /// Stop and unload. Idempotent; safe with no active track.
    pub async fn stop(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        Self::unload_in_place(inner);
        self.publish(inner);
    }

    /// Set the ambience volume, clamped to `[0, 1]`. Persisted always;
    /// applied live when a track is loaded. The narration controller's
    /// volume is untouched.
    pub async fn set_volume(&self, volume: f32) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        inner.volume = volume.clamp(0.0, 1.0);
        self.persist(inner);
        if let Some(track) = &inner.track {
            track.set_volume(inner.volume);
        }
        self.publish(inner);
    }

    async fn start_locked(&self, inner: &mut Inner, id: AmbienceId) -> Result<(), PlaybackError> {
        // The persisted volume is read fresh for every start, so a volume
        // saved while nothing was loaded takes effect here.
        inner.volume = self.store.load().volume;

        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let options = LoadOptions {
            autoplay: true,
            // Ambience always loops; it has no finished state.
            looping: true,
            volume: inner.volume,
        };

        match self.engine.load(id.source(), options, status_tx).await {
            Ok(track) => {
                inner.track = Some(track);
                Self::spawn_status_drain(status_rx);
                Ok(())
            }
            Err(e) => {
                log::warn!("[Ambience] Failed to load {}: {}", id.label(), e);
                inner.track = None;
                Err(PlaybackError::Load(e))
            }
        }
    }

    fn unload_in_place(inner: &mut Inner) {
        if let Some(track) = inner.track.take() {
            track.stop_and_unload();
        }
    }

    /// Ambience state never follows engine positions — it just loops — but
    /// the feed still has to be drained, and errors are worth a log line.
    fn spawn_status_drain(mut status_rx: StatusReceiver) {
        tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                if let Some(err) = status.error {
                    log::warn!("[Ambience] Engine reported error: {}", err);
                }
            }
        });
    }

    fn persist(&self, inner: &Inner) {
        let settings = AmbienceSettings {
            selection: inner.selection,
            volume: inner.volume,
        };
        if let Err(e) = self.store.save(&settings) {
            // Preferences degrade to in-memory; playback is unaffected.
            log::warn!("[Ambience] {}", e);
        }
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(AmbienceSnapshot {
            selection: inner.selection,
            volume: inner.volume,
            is_playing: inner.track.as_ref().is_some_and(|t| t.is_playing()),
        });
    }
}
