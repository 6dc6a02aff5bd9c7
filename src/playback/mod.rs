// Playback controllers
// The primary controller owns the narration being listened to; the ambience
// controller owns the looping background layer. Their lifecycles are fully
// independent and they are meant to run simultaneously.

pub mod ambience;
pub mod catalog;
pub mod primary;

use serde::Serialize;

use crate::audio::engine::TrackHandle;
use catalog::AmbienceId;

pub use ambience::AmbiencePlaybackController;
pub use primary::PrimaryPlaybackController;

/// The affirmation the primary controller currently has loaded (or is
/// loading). Cleared on explicit stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffirmationRef {
    pub id: String,
    pub title: String,
}

/// Track lifecycle. The track handle only exists inside `Ready`, so no
/// operation can reach a half-initialized track, and the loading/playing
/// flag combinations that can't happen can't be represented either.
pub(crate) enum PlaybackPhase {
    Idle,
    Loading,
    Ready {
        track: Box<dyn TrackHandle>,
        paused: bool,
    },
}

/// Primary controller state as published to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub is_loading: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub loop_enabled: bool,
    pub current: Option<AffirmationRef>,
}

impl PlaybackSnapshot {
    /// The word the reading view should highlight at this position. The
    /// view calls this on every published snapshot, so it stays a cheap
    /// binary search over the timing list.
    pub fn active_word<'a>(
        &self,
        timings: &'a [crate::rsvp::WordTiming],
    ) -> Option<crate::rsvp::ActiveWord<'a>> {
        crate::rsvp::resolve_active_word(timings, self.position_ms)
    }
}

/// Ambience controller state as published to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbienceSnapshot {
    pub selection: Option<AmbienceId>,
    pub volume: f32,
    pub is_playing: bool,
}
