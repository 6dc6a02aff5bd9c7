// Error taxonomy for the playback subsystem

use thiserror::Error;

/// Errors surfaced by the playback controllers.
///
/// Engine-level failures (device, codec, network) are caught at the
/// controller boundary and either converted into one of these variants or
/// into a state transition — they never propagate as panics into the UI.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The track could not be fetched, opened, or decoded, or the load
    /// exceeded the timeout. The controller has already returned to `Idle`.
    #[error("failed to load track: {0}")]
    Load(String),

    /// The underlying engine rejected an operation on a live track.
    #[error("audio engine error: {0}")]
    Engine(String),
}

/// Errors from the local settings store. Callers fall back to defaults on
/// read failures and skip the write on write failures; playback never
/// blocks on these.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Read(String),

    #[error("failed to write settings: {0}")]
    Write(String),
}

/// Errors from the backend API boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response ({status}): {body}")]
    Response { status: u16, body: String },
}
