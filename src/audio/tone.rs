// Procedural ambience tones
// Renders the built-in solfeggio/binaural catalog entries as loopable
// stereo PCM, replacing the bundled WAVs the mobile build ships

use std::f32::consts::TAU;

pub const TONE_SAMPLE_RATE: u32 = 44_100;
pub const TONE_CHANNELS: u16 = 2;

/// Loop length. Long enough that the fade ends are inaudible under playback,
/// short enough to keep the render cheap.
const TONE_SECONDS: u32 = 30;
const TONE_AMPLITUDE: f32 = 0.3;
/// Fade applied to both ends so the loop seam doesn't click.
const FADE_SECONDS: f32 = 0.5;

/// A synthesized catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneSpec {
    /// One frequency on both channels, with soft 2nd/3rd harmonic overtones
    /// so the tone doesn't sound clinical.
    Pure { freq_hz: f32 },
    /// Carrier on the left ear, carrier + beat on the right; the listener's
    /// brain perceives the difference as a low-frequency beat.
    Binaural { carrier_hz: f32, beat_hz: f32 },
}

/// Render a tone as interleaved stereo f32 at [`TONE_SAMPLE_RATE`].
pub fn render_tone(spec: ToneSpec) -> Vec<f32> {
    let frames = (TONE_SAMPLE_RATE * TONE_SECONDS) as usize;
    let mut samples = Vec::with_capacity(frames * TONE_CHANNELS as usize);

    for i in 0..frames {
        let t = i as f32 / TONE_SAMPLE_RATE as f32;
        let (left, right) = match spec {
            ToneSpec::Pure { freq_hz } => {
                let mut s = 0.7 * (TAU * freq_hz * t).sin();
                s += 0.2 * (TAU * freq_hz * 2.0 * t).sin();
                s += 0.1 * (TAU * freq_hz * 3.0 * t).sin();
                let s = TONE_AMPLITUDE * s;
                (s, s)
            }
            ToneSpec::Binaural {
                carrier_hz,
                beat_hz,
            } => {
                let left = TONE_AMPLITUDE * (TAU * carrier_hz * t).sin();
                let right = TONE_AMPLITUDE * (TAU * (carrier_hz + beat_hz) * t).sin();
                (left, right)
            }
        };

        let gain = loop_fade_gain(i, frames);
        samples.push(left * gain);
        samples.push(right * gain);
    }

    samples
}

/// Linear fade-in over the first half second and fade-out over the last.
fn loop_fade_gain(frame: usize, total_frames: usize) -> f32 {
    let fade_frames = (TONE_SAMPLE_RATE as f32 * FADE_SECONDS) as usize;
    if frame < fade_frames {
        frame as f32 / fade_frames as f32
    } else if frame >= total_frames - fade_frames {
        (total_frames - frame) as f32 / fade_frames as f32
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_length_and_channels() {
        let samples = render_tone(ToneSpec::Pure { freq_hz: 432.0 });
        assert_eq!(
            samples.len(),
            (TONE_SAMPLE_RATE * TONE_SECONDS) as usize * TONE_CHANNELS as usize
        );
    }

    #[test]
    fn test_fade_ends_are_silent_and_middle_is_not() {
        let samples = render_tone(ToneSpec::Pure { freq_hz: 432.0 });
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 0.0);

        let mid = samples.len() / 2;
        let peak = samples[mid..mid + 2000]
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.1, "mid-loop audio should carry signal, got {}", peak);
    }

    #[test]
    fn test_amplitude_stays_in_range() {
        for spec in [
            ToneSpec::Pure { freq_hz: 528.0 },
            ToneSpec::Binaural {
                carrier_hz: 200.0,
                beat_hz: 6.0,
            },
        ] {
            let samples = render_tone(spec);
            assert!(samples.iter().all(|s| s.abs() <= 1.0));
        }
    }

    #[test]
    fn test_binaural_channels_differ() {
        let samples = render_tone(ToneSpec::Binaural {
            carrier_hz: 200.0,
            beat_hz: 10.0,
        });
        // Away from the fades the two ears drift in and out of phase, so the
        // channels cannot be identical the way a pure tone's are.
        let mid = samples.len() / 2;
        let differs = samples[mid..mid + 4000]
            .chunks_exact(2)
            .any(|frame| (frame[0] - frame[1]).abs() > 0.01);
        assert!(differs);
    }
}
