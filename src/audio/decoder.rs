// Clip decoding using Symphonia
// Affirmation narrations and ambience assets are short, so clips are
// decoded fully up front rather than streamed

use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A fully decoded clip: interleaved f32 samples at the source rate.
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl DecodedClip {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() / self.channels;
        frames as u64 * 1000 / self.sample_rate as u64
    }
}

/// Decode an audio file from disk.
pub fn decode_file(path: &Path) -> Result<DecodedClip, String> {
    let file = File::open(path).map_err(|e| format!("Failed to open {:?}: {}", path, e))?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_source(Box::new(file), hint)
}

/// Decode audio held in memory (downloaded narration).
pub fn decode_bytes(bytes: Vec<u8>) -> Result<DecodedClip, String> {
    decode_source(Box::new(Cursor::new(bytes)), Hint::new())
}

fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<DecodedClip, String> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("Failed to probe audio format: {}", e))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| "No audio track found".to_string())?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| "Audio track has no sample rate".to_string())?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| format!("Failed to create decoder: {}", e))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channels = 0usize;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(format!("Failed to read packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_buf.is_none() {
                    let spec = *decoded.spec();
                    channels = spec.channels.count();
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // A corrupt packet shouldn't kill the whole clip.
                log::warn!("[Decoder] Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(format!("Decode failed: {}", e)),
        }
    }

    if samples.is_empty() || channels == 0 {
        return Err("Clip decoded to no audio".to_string());
    }

    Ok(DecodedClip {
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_sample_count() {
        let clip = DecodedClip {
            samples: vec![0.0; 44_100 * 2],
            sample_rate: 44_100,
            channels: 2,
        };
        assert_eq!(clip.duration_ms(), 1000);
    }

    #[test]
    fn test_duration_handles_degenerate_clip() {
        let clip = DecodedClip {
            samples: vec![],
            sample_rate: 0,
            channels: 0,
        };
        assert_eq!(clip.duration_ms(), 0);
    }

    #[test]
    fn test_decode_garbage_bytes_is_an_error() {
        assert!(decode_bytes(vec![0u8; 64]).is_err());
    }
}
