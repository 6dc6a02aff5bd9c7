// Settings module
// Durable ambience preferences, restored at startup

pub mod settings;

pub use settings::{AmbienceSettings, AmbienceStore, DEFAULT_AMBIENCE_VOLUME};
