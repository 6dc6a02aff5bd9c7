// Rewired - Affirmation Playback Engine
// Module declarations
pub mod api;
pub mod audio;
pub mod breathing;
pub mod db;
pub mod error;
pub mod playback;
pub mod rsvp;
pub mod settings;
pub mod state;
pub mod streaks;

pub use audio::cpal_engine::CpalAudioEngine;
pub use audio::engine::{AudioEngine, AudioSource, EngineStatus, LoadOptions, TrackHandle};
pub use error::{ApiError, PlaybackError, SettingsError};
pub use playback::catalog::AmbienceId;
pub use playback::{
    AffirmationRef, AmbiencePlaybackController, AmbienceSnapshot, PlaybackSnapshot,
    PrimaryPlaybackController,
};
pub use rsvp::{orp_index, parse_word_timings, resolve_active_word, ActiveWord, WordTiming};
pub use state::AppState;
