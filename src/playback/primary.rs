// Primary playback controller: the narration track being listened to
//
// Serializes its own load/unload sequences behind an async mutex and tags
// every load with a generation so status callbacks from a superseded track
// can be discarded mechanically.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

use crate::audio::engine::{
    AudioEngine, AudioSource, EngineStatus, LoadOptions, StatusReceiver,
};
use crate::db::connection::DatabaseConnection;
use crate::db::operations::DbOperations;
use crate::error::PlaybackError;

use super::{AffirmationRef, PlaybackPhase, PlaybackSnapshot};

pub struct PrimaryPlaybackController {
    engine: Arc<dyn AudioEngine>,
    inner: Arc<Mutex<Inner>>,
    state_tx: Arc<watch::Sender<PlaybackSnapshot>>,
    /// When present, finished (non-looping) narrations are appended to the
    /// listening log that feeds streak tracking.
    listen_log: Option<DatabaseConnection>,
}

struct Inner {
    phase: PlaybackPhase,
    current: Option<AffirmationRef>,
    position_ms: u64,
    duration_ms: u64,
    loop_enabled: bool,
    volume: f32,
    /// Bumped on every load and stop. Status handlers compare against it and
    /// drop anything from an older generation.
    generation: u64,
}

impl PrimaryPlaybackController {
    pub fn new(engine: Arc<dyn AudioEngine>, listen_log: Option<DatabaseConnection>) -> Self {
        let (state_tx, _) = watch::channel(PlaybackSnapshot::default());
        Self {
            engine,
            inner: Arc::new(Mutex::new(Inner {
                phase: PlaybackPhase::Idle,
                current: None,
                position_ms: 0,
                duration_ms: 0,
                loop_enabled: false,
                volume: 1.0,
                generation: 0,
            })),
            state_tx: Arc::new(state_tx),
            listen_log,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state_tx.borrow().clone()
    }

    /// Start (or resume) playback of an affirmation.
    ///
    /// If the same affirmation is already loaded, playback resumes in place;
    /// reloading would throw away the listener's position. Anything else
    /// unloads the old track, then loads `source` and starts playing. A new
    /// `play` arriving while a previous load is still in flight waits for it
    /// and then supersedes it — last writer wins, and the superseded track is
    /// always fully unloaded.
    pub async fn play(
        &self,
        affirmation: AffirmationRef,
        source: AudioSource,
    ) -> Result<(), PlaybackError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let mut resumed = false;
        if let PlaybackPhase::Ready { track, paused } = &mut inner.phase {
            let same_affirmation = inner
                .current
                .as_ref()
                .is_some_and(|c| c.id == affirmation.id);
            // Resume only against a track that actually finished loading; a
            // silently failed load must take the reload path instead.
            if same_affirmation && track.is_loaded() {
                track.play();
                *paused = false;
                resumed = true;
            }
        }
        if resumed {
            self.publish(inner);
            return Ok(());
        }

        Self::unload_in_place(inner);
        inner.generation += 1;
        let generation = inner.generation;
        inner.current = Some(affirmation);
        inner.position_ms = 0;
        inner.duration_ms = 0;
        inner.phase = PlaybackPhase::Loading;
        self.publish(inner);

        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let options = LoadOptions {
            autoplay: true,
            looping: inner.loop_enabled,
            volume: inner.volume,
        };

        match self.engine.load(source, options, status_tx).await {
            Ok(track) => {
                inner.duration_ms = track.duration_ms();
                inner.phase = PlaybackPhase::Ready {
                    track,
                    paused: false,
                };
                self.publish(inner);
                self.spawn_status_task(generation, status_rx);
                Ok(())
            }
            Err(e) => {
                log::warn!("[Playback] Failed to load narration: {}", e);
                inner.phase = PlaybackPhase::Idle;
                inner.current = None;
                inner.position_ms = 0;
                inner.duration_ms = 0;
                self.publish(inner);
                Err(PlaybackError::Load(e))
            }
        }
    }

    /// Flip between playing and paused. No-op unless a track is loaded.
    pub async fn toggle_play_pause(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if let PlaybackPhase::Ready { track, paused } = &mut inner.phase {
            // Ask the engine, not our cache: an interruption may have flipped
            // the transport without a status round-trip yet.
            if track.is_playing() {
                track.pause();
                *paused = true;
            } else {
                track.play();
                *paused = false;
            }
        } else {
            return;
        }

        self.publish(inner);
    }

    /// Seek within the loaded track, clamped to `[0, duration]`. Ignored
    /// while idle or loading; UI controls are transiently enabled during
    /// transitions and that must not be an error.
    pub async fn seek(&self, position_ms: u64) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if let PlaybackPhase::Ready { track, .. } = &inner.phase {
            let clamped = position_ms.min(inner.duration_ms);
            track.seek_ms(clamped);
            inner.position_ms = clamped;
            self.publish(inner);
        }
    }

    /// Stop and unload. Safe from any state, any number of times.
    pub async fn stop(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        inner.generation += 1;
        Self::unload_in_place(inner);
        inner.current = None;
        inner.position_ms = 0;
        inner.duration_ms = 0;
        self.publish(inner);
    }

    /// Update the loop preference, propagating to the live track without
    /// interrupting playback.
    pub async fn set_loop(&self, enabled: bool) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        inner.loop_enabled = enabled;
        if let PlaybackPhase::Ready { track, .. } = &inner.phase {
            track.set_looping(enabled);
        }
        self.publish(inner);
    }

    /// Narration volume, independent of the ambience layer's volume.
    pub async fn set_volume(&self, volume: f32) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        inner.volume = volume.clamp(0.0, 1.0);
        if let PlaybackPhase::Ready { track, .. } = &inner.phase {
            track.set_volume(inner.volume);
        }
    }

    fn unload_in_place(inner: &mut Inner) {
        if let PlaybackPhase::Ready { track, .. } = &inner.phase {
            track.stop_and_unload();
        }
        inner.phase = PlaybackPhase::Idle;
    }

    fn spawn_status_task(&self, generation: u64, mut status_rx: StatusReceiver) {
        let inner = Arc::clone(&self.inner);
        let state_tx = Arc::clone(&self.state_tx);
        let listen_log = self.listen_log.clone();

        tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                let mut guard = inner.lock().await;
                let inner = &mut *guard;
                if inner.generation != generation {
                    log::debug!("[Playback] Discarding status from superseded track");
                    break;
                }
                Self::apply_status(inner, status, &listen_log);
                state_tx.send_replace(Self::snapshot_of(inner));
            }
        });
    }

    fn apply_status(inner: &mut Inner, status: EngineStatus, listen_log: &Option<DatabaseConnection>) {
        if let Some(err) = status.error {
            // Leave state as last known rather than corrupting it.
            log::warn!("[Playback] Engine reported error: {}", err);
            return;
        }

        if let PlaybackPhase::Ready { paused, .. } = &mut inner.phase {
            if status.duration_ms > 0 {
                inner.duration_ms = status.duration_ms;
            }

            if status.did_just_finish {
                if inner.loop_enabled {
                    inner.position_ms = 0;
                    *paused = false;
                } else {
                    // Finished, not stopped: the track stays loaded, parked
                    // at the end.
                    inner.position_ms = inner.duration_ms;
                    *paused = true;
                    Self::record_listen(inner, listen_log);
                }
            } else {
                inner.position_ms = status.position_ms;
                *paused = !status.is_playing;
            }
        }
    }

    fn record_listen(inner: &Inner, listen_log: &Option<DatabaseConnection>) {
        let (Some(db), Some(current)) = (listen_log, &inner.current) else {
            return;
        };
        let today = chrono::Local::now().date_naive();
        if let Err(e) =
            DbOperations::record_listening_session(db, &current.id, today, inner.duration_ms as i64)
        {
            log::warn!("[Playback] Failed to record listening session: {}", e);
        }
    }

    fn snapshot_of(inner: &Inner) -> PlaybackSnapshot {
        let (is_playing, is_loading) = match &inner.phase {
            PlaybackPhase::Idle => (false, false),
            PlaybackPhase::Loading => (false, true),
            PlaybackPhase::Ready { paused, .. } => (!*paused, false),
        };
        PlaybackSnapshot {
            is_playing,
            is_loading,
            position_ms: inner.position_ms,
            duration_ms: inner.duration_ms,
            loop_enabled: inner.loop_enabled,
            current: inner.current.clone(),
        }
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(Self::snapshot_of(inner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::MockEngine;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::time::timeout;

    fn aff(id: &str) -> AffirmationRef {
        AffirmationRef {
            id: id.to_string(),
            title: format!("Affirmation {}", id),
        }
    }

    fn src(name: &str) -> AudioSource {
        AudioSource::File(PathBuf::from(format!("{}.mp3", name)))
    }

    fn status(position_ms: u64, is_playing: bool) -> EngineStatus {
        EngineStatus {
            is_loaded: true,
            is_playing,
            position_ms,
            duration_ms: 10_000,
            did_just_finish: false,
            error: None,
        }
    }

    fn finished_status() -> EngineStatus {
        EngineStatus {
            is_loaded: true,
            is_playing: false,
            position_ms: 10_000,
            duration_ms: 10_000,
            did_just_finish: true,
            error: None,
        }
    }

    async fn wait_until(
        rx: &mut watch::Receiver<PlaybackSnapshot>,
        pred: impl FnMut(&PlaybackSnapshot) -> bool,
    ) -> PlaybackSnapshot {
        timeout(Duration::from_secs(1), rx.wait_for(pred))
            .await
            .expect("timed out waiting for snapshot")
            .expect("state channel closed")
            .clone()
    }

    fn controller(engine: &Arc<MockEngine>) -> PrimaryPlaybackController {
        PrimaryPlaybackController::new(Arc::clone(engine) as Arc<dyn AudioEngine>, None)
    }

    #[tokio::test]
    async fn test_play_loads_and_starts() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);

        ctrl.play(aff("a"), src("a")).await.unwrap();

        let snap = ctrl.snapshot();
        assert!(snap.is_playing);
        assert!(!snap.is_loading);
        assert_eq!(snap.duration_ms, 10_000);
        assert_eq!(snap.current.unwrap().id, "a");
        assert_eq!(engine.load_count(), 1);
        assert!(engine.last_load().options.autoplay);
    }

    #[tokio::test]
    async fn test_replaying_same_affirmation_resumes_without_reload() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);
        let mut rx = ctrl.subscribe();

        ctrl.play(aff("a"), src("a")).await.unwrap();
        engine.last_load().status_tx.send(status(5_000, true)).unwrap();
        wait_until(&mut rx, |s| s.position_ms == 5_000).await;

        ctrl.play(aff("a"), src("a")).await.unwrap();

        assert_eq!(engine.load_count(), 1, "same affirmation must not reload");
        assert_eq!(ctrl.snapshot().position_ms, 5_000, "resume must keep position");
        assert!(ctrl.snapshot().is_playing);
    }

    #[tokio::test]
    async fn test_playing_different_affirmation_unloads_old_track_first() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);

        ctrl.play(aff("a"), src("a")).await.unwrap();
        let track_a = engine.last_load().track;

        ctrl.play(aff("b"), src("b")).await.unwrap();

        assert_eq!(engine.load_count(), 2);
        assert!(!track_a.is_loaded(), "a's track must be fully unloaded");
        assert!(engine.last_load().track.is_loaded());
        assert_eq!(ctrl.snapshot().current.unwrap().id, "b");
    }

    #[tokio::test]
    async fn test_failed_load_returns_to_idle_with_error() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);

        engine.fail_next_load();
        let result = ctrl.play(aff("a"), src("a")).await;

        assert!(matches!(result, Err(PlaybackError::Load(_))));
        let snap = ctrl.snapshot();
        assert!(!snap.is_playing);
        assert!(!snap.is_loading, "no stuck spinner after a failed load");
        assert!(snap.current.is_none());
    }

    #[tokio::test]
    async fn test_failed_load_then_same_id_reloads_instead_of_resuming() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);

        engine.fail_next_load();
        assert!(ctrl.play(aff("a"), src("a")).await.is_err());

        ctrl.play(aff("a"), src("a")).await.unwrap();
        assert_eq!(engine.load_count(), 1, "only the successful load registers");
        assert!(ctrl.snapshot().is_playing);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_from_any_state() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);

        // Never loaded.
        ctrl.stop().await;
        ctrl.stop().await;
        assert_eq!(ctrl.snapshot(), PlaybackSnapshot::default());

        // Loaded, then stopped twice.
        ctrl.play(aff("a"), src("a")).await.unwrap();
        let track = engine.last_load().track;
        ctrl.stop().await;
        ctrl.stop().await;

        let snap = ctrl.snapshot();
        assert!(!snap.is_playing);
        assert_eq!(snap.position_ms, 0);
        assert!(snap.current.is_none());
        assert!(!track.is_loaded());
    }

    #[tokio::test]
    async fn test_toggle_play_pause_follows_actual_engine_state() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);

        // Idle: toggling does nothing.
        ctrl.toggle_play_pause().await;
        assert_eq!(ctrl.snapshot(), PlaybackSnapshot::default());

        ctrl.play(aff("a"), src("a")).await.unwrap();
        let track = engine.last_load().track;

        ctrl.toggle_play_pause().await;
        assert!(!track.is_playing());
        assert!(!ctrl.snapshot().is_playing);

        // An external interruption pauses the engine behind our back; the
        // next toggle must resume, not "pause" a second time.
        ctrl.toggle_play_pause().await;
        track.force_playing(false);
        ctrl.toggle_play_pause().await;
        assert!(track.is_playing());
        assert!(ctrl.snapshot().is_playing);
    }

    #[tokio::test]
    async fn test_seek_clamps_and_ignores_invalid_states() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);

        // Idle: no-op, no panic.
        ctrl.seek(3_000).await;
        assert_eq!(ctrl.snapshot().position_ms, 0);

        engine.set_next_duration_ms(8_000);
        ctrl.play(aff("a"), src("a")).await.unwrap();
        ctrl.seek(25_000).await;

        let track = engine.last_load().track;
        assert_eq!(track.seeks(), vec![8_000], "seek past end clamps to duration");
        assert_eq!(ctrl.snapshot().position_ms, 8_000);
    }

    #[tokio::test]
    async fn test_finish_with_loop_restarts_from_zero() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);
        let mut rx = ctrl.subscribe();

        ctrl.set_loop(true).await;
        ctrl.play(aff("a"), src("a")).await.unwrap();
        assert!(engine.last_load().options.looping);

        engine.last_load().status_tx.send(status(9_800, true)).unwrap();
        wait_until(&mut rx, |s| s.position_ms == 9_800).await;

        engine.last_load().status_tx.send(finished_status()).unwrap();
        let snap = wait_until(&mut rx, |s| s.position_ms == 0).await;
        assert!(snap.is_playing, "looping playback continues after finish");
    }

    #[tokio::test]
    async fn test_finish_without_loop_parks_at_end_paused() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);
        let mut rx = ctrl.subscribe();

        ctrl.play(aff("a"), src("a")).await.unwrap();
        engine.last_load().status_tx.send(finished_status()).unwrap();

        let snap = wait_until(&mut rx, |s| !s.is_playing).await;
        assert_eq!(snap.position_ms, 10_000);
        assert!(snap.current.is_some(), "finished is not stopped: track stays current");
    }

    #[tokio::test]
    async fn test_set_loop_propagates_to_live_track() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);

        ctrl.play(aff("a"), src("a")).await.unwrap();
        let track = engine.last_load().track;
        assert!(!track.looping());

        ctrl.set_loop(true).await;
        assert!(track.looping());
        assert!(track.is_playing(), "loop change must not interrupt playback");
    }

    #[tokio::test]
    async fn test_stale_status_from_superseded_track_is_discarded() {
        let engine = MockEngine::new();
        let ctrl = Arc::new(controller(&engine));
        let mut rx = ctrl.subscribe();

        let gate = engine.gate_loads();
        let ctrl_a = Arc::clone(&ctrl);
        let play_a =
            tokio::spawn(async move { ctrl_a.play(aff("a"), src("a")).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let ctrl_b = Arc::clone(&ctrl);
        let play_b =
            tokio::spawn(async move { ctrl_b.play(aff("b"), src("b")).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        gate.add_permits(2);
        play_a.await.unwrap().unwrap();
        play_b.await.unwrap().unwrap();

        assert_eq!(engine.load_count(), 2);
        assert!(!engine.load_at(0).track.is_loaded(), "a was superseded and unloaded");
        assert_eq!(ctrl.snapshot().current.as_ref().unwrap().id, "b");

        // A late status tagged for a's load must not touch b's state.
        engine.load_at(0).status_tx.send(status(7_777, false)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = ctrl.snapshot();
        assert_ne!(snap.position_ms, 7_777);
        assert!(snap.is_playing);
        assert_eq!(snap.current.unwrap().id, "b");

        // And b's own feed still works.
        engine.load_at(1).status_tx.send(status(1_234, true)).unwrap();
        wait_until(&mut rx, |s| s.position_ms == 1_234).await;
    }

    #[tokio::test]
    async fn test_engine_error_status_leaves_last_known_state() {
        let engine = MockEngine::new();
        let ctrl = controller(&engine);
        let mut rx = ctrl.subscribe();

        ctrl.play(aff("a"), src("a")).await.unwrap();
        engine.last_load().status_tx.send(status(2_000, true)).unwrap();
        wait_until(&mut rx, |s| s.position_ms == 2_000).await;

        engine
            .last_load()
            .status_tx
            .send(EngineStatus {
                error: Some("transient decoder hiccup".to_string()),
                ..Default::default()
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snap = ctrl.snapshot();
        assert_eq!(snap.position_ms, 2_000);
        assert!(snap.is_playing);
    }

    #[tokio::test]
    async fn test_finish_records_listening_session() {
        let engine = MockEngine::new();
        let db = DatabaseConnection::open_in_memory().unwrap();
        let ctrl = PrimaryPlaybackController::new(
            Arc::clone(&engine) as Arc<dyn AudioEngine>,
            Some(db.clone()),
        );
        let mut rx = ctrl.subscribe();

        ctrl.play(aff("morning-calm"), src("a")).await.unwrap();
        engine.last_load().status_tx.send(finished_status()).unwrap();
        wait_until(&mut rx, |s| !s.is_playing).await;

        assert_eq!(DbOperations::session_count(&db).unwrap(), 1);
    }
}
