//! Audio decoding using Symphonia
//!
//! Probes the container, decodes the first audio track and mixes every
//! channel down to mono `f32` in [-1.0, 1.0]. Packets that fail to decode are
//! skipped; a stream with no decodable audio is a `DecodingError`.

use crate::error::AnalysisError;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded mono waveform
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f32 / self.sample_rate as f32
        }
    }
}

/// Average all channels of one decoded buffer
fn mix_to_mono<S>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    S: Sample + IntoSample<f32>,
{
    let channels = buf.spec().channels.count();
    if channels == 0 {
        return vec![];
    }
    if channels == 1 {
        return buf.chan(0).iter().map(|&s| s.into_sample()).collect();
    }
    (0..buf.frames())
        .map(|i| {
            (0..channels)
                .map(|ch| -> f32 { buf.chan(ch)[i].into_sample() })
                .sum::<f32>()
                / channels as f32
        })
        .collect()
}

fn mono_samples(decoded: AudioBufferRef<'_>) -> Vec<f32> {
    match decoded {
        AudioBufferRef::U8(buf) => mix_to_mono(&*buf),
        AudioBufferRef::U16(buf) => mix_to_mono(&*buf),
        AudioBufferRef::U24(buf) => mix_to_mono(&*buf),
        AudioBufferRef::U32(buf) => mix_to_mono(&*buf),
        AudioBufferRef::S8(buf) => mix_to_mono(&*buf),
        AudioBufferRef::S16(buf) => mix_to_mono(&*buf),
        AudioBufferRef::S24(buf) => mix_to_mono(&*buf),
        AudioBufferRef::S32(buf) => mix_to_mono(&*buf),
        AudioBufferRef::F32(buf) => mix_to_mono(&*buf),
        AudioBufferRef::F64(buf) => mix_to_mono(&*buf),
    }
}

/// Decode an audio file to mono PCM samples
///
/// # Arguments
///
/// * `path` - Path to audio file (WAV, FLAC, MP3, AAC, Vorbis, MP4)
///
/// # Returns
///
/// `DecodedAudio` with mono samples and the stream's sample rate
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the file cannot be opened, has
/// no supported audio track, or yields no samples
pub fn decode_audio(path: &Path) -> Result<DecodedAudio, AnalysisError> {
    log::debug!("Decoding audio file: {}", path.display());

    let decode_err = |what: &str, e: &dyn std::fmt::Display| {
        AnalysisError::DecodingError(format!("{}: {}: {}", path.display(), what, e))
    };

    let src = File::open(path).map_err(|e| decode_err("cannot open", &e))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_err("unrecognized format", &e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            AnalysisError::DecodingError(format!(
                "{}: no supported audio tracks found",
                path.display()
            ))
        })?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
        AnalysisError::DecodingError(format!("{}: unknown sample rate", path.display()))
    })?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err("unsupported codec", &e))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream (or an unrecoverable container error)
            Err(_) => break,
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => samples.extend(mono_samples(decoded)),
            Err(SymphoniaError::DecodeError(_)) => {
                // Corrupted packet
                skipped_packets += 1;
                continue;
            }
            Err(e) => return Err(decode_err("decode failed", &e)),
        }
    }

    if skipped_packets > 0 {
        log::warn!(
            "{}: skipped {} undecodable packets",
            path.display(),
            skipped_packets
        );
    }

    if samples.is_empty() {
        return Err(AnalysisError::DecodingError(format!(
            "{}: no audio samples decoded",
            path.display()
        )));
    }

    log::debug!(
        "Decoded {} samples at {} Hz ({:.2} s)",
        samples.len(),
        sample_rate,
        samples.len() as f32 / sample_rate as f32
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_decoding_error() {
        let err = decode_audio(Path::new("/nonexistent/track.wav")).unwrap_err();
        assert!(matches!(err, AnalysisError::DecodingError(_)), "got {:?}", err);
    }

    #[test]
    fn test_garbage_file_is_decoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"this is not audio at all").unwrap();
        assert!(matches!(
            decode_audio(&path),
            Err(AnalysisError::DecodingError(_))
        ));
    }

    #[test]
    fn test_duration() {
        let audio = DecodedAudio {
            samples: vec![0.0; 22050],
            sample_rate: 44100,
        };
        assert_eq!(audio.duration_seconds(), 0.5);
    }
}
