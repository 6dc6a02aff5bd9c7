// Fixed ambience catalog
// Nature loops map to bundled assets; tones are synthesized at load time

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::audio::engine::AudioSource;
use crate::audio::tone::ToneSpec;

/// Built-in ambience tracks. A closed set: the app ships these and users
/// cannot add entries at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbienceId {
    Rain,
    OceanWaves,
    #[serde(rename = "432hz-healing")]
    Healing432,
    #[serde(rename = "528hz-love")]
    Love528,
    ThetaWaves,
    AlphaWaves,
    DeltaWaves,
    BetaWaves,
}

impl AmbienceId {
    pub const ALL: [AmbienceId; 8] = [
        AmbienceId::Rain,
        AmbienceId::OceanWaves,
        AmbienceId::Healing432,
        AmbienceId::Love528,
        AmbienceId::ThetaWaves,
        AmbienceId::AlphaWaves,
        AmbienceId::DeltaWaves,
        AmbienceId::BetaWaves,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AmbienceId::Rain => "Rain",
            AmbienceId::OceanWaves => "Ocean Waves",
            AmbienceId::Healing432 => "432Hz Healing Tone",
            AmbienceId::Love528 => "528Hz Love Frequency",
            AmbienceId::ThetaWaves => "Theta Waves (6Hz)",
            AmbienceId::AlphaWaves => "Alpha Waves (10Hz)",
            AmbienceId::DeltaWaves => "Delta Waves (2Hz)",
            AmbienceId::BetaWaves => "Beta Waves (18Hz)",
        }
    }

    /// The audio behind each entry.
    pub fn source(self) -> AudioSource {
        match self {
            AmbienceId::Rain => AudioSource::File(asset_path("rain.wav")),
            AmbienceId::OceanWaves => AudioSource::File(asset_path("ocean-waves.wav")),
            AmbienceId::Healing432 => AudioSource::Tone(ToneSpec::Pure { freq_hz: 432.0 }),
            AmbienceId::Love528 => AudioSource::Tone(ToneSpec::Pure { freq_hz: 528.0 }),
            AmbienceId::ThetaWaves => AudioSource::Tone(ToneSpec::Binaural {
                carrier_hz: 200.0,
                beat_hz: 6.0,
            }),
            AmbienceId::AlphaWaves => AudioSource::Tone(ToneSpec::Binaural {
                carrier_hz: 200.0,
                beat_hz: 10.0,
            }),
            AmbienceId::DeltaWaves => AudioSource::Tone(ToneSpec::Binaural {
                carrier_hz: 150.0,
                beat_hz: 2.0,
            }),
            AmbienceId::BetaWaves => AudioSource::Tone(ToneSpec::Binaural {
                carrier_hz: 250.0,
                beat_hz: 18.0,
            }),
        }
    }
}

fn asset_path(file: &str) -> PathBuf {
    PathBuf::from("assets/audio").join(file)
}
