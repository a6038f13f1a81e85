//! DSP front-end abstraction
//!
//! The heuristic engine never measures audio itself: every low-level signal
//! comes from a [`DspFrontEnd`]. [`NativeFrontEnd`] is the implementation the
//! crate ships; tests and embedders can provide their own. Optional
//! capabilities have default methods that return
//! `AnalysisError::MeasurementUnavailable`, and the engine degrades around
//! them instead of probing at runtime.
//!
//! [`RawSignals::collect`] calls the front-end once per track and bundles
//! everything the heuristics consume. Spectral measurements read a shared
//! [`Spectrogram`], computed once per waveform.
//!
//! # Example
//!
//! ```no_run
//! use soundprint::frontend::{NativeFrontEnd, RawSignals, DspFrontEnd};
//! use soundprint::EngineConfig;
//! use std::path::Path;
//!
//! let config = EngineConfig::default();
//! let frontend = NativeFrontEnd::from_config(&config);
//! let audio = frontend.decode(Path::new("track.flac"))?;
//! let signals = RawSignals::collect(
//!     &frontend,
//!     audio.samples,
//!     audio.sample_rate,
//!     config.target_loudness_lufs,
//! )?;
//! println!("raw tempo {:.1} BPM", signals.raw_bpm);
//! # Ok::<(), soundprint::AnalysisError>(())
//! ```

use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::features::chroma::extract_chroma;
use crate::features::onset::{detect_onset_events, onset_strength, PeakPickParams};
use crate::features::period::{compute_tempogram, estimate_tempo, TempoEstimate, Tempogram};
use crate::features::spectral::{spectral_features, SpectralFeatures};
use crate::features::stft::{compute_stft, frame_rms, Spectrogram};
use crate::io::decoder::{decode_audio, DecodedAudio};
use crate::preprocessing::normalization;
use std::path::Path;

/// Low-level measurement backend
pub trait DspFrontEnd: Send + Sync {
    /// Name of this front-end (for logging)
    fn name(&self) -> &'static str;

    /// Hop size (samples per frame) of every frame-based measurement
    fn hop_size(&self) -> usize;

    /// Decode a file to mono samples
    fn decode(&self, path: &Path) -> Result<DecodedAudio, AnalysisError>;

    /// Frame-level RMS energy
    fn frame_rms(&self, samples: &[f32]) -> Result<Vec<f32>, AnalysisError>;

    /// Magnitude spectrogram shared by the spectral measurements
    fn spectrogram(&self, samples: &[f32], sample_rate: u32) -> Result<Spectrogram, AnalysisError>;

    /// Onset-strength envelope, one value per frame
    fn onset_strength(&self, spectrogram: &Spectrogram) -> Result<Vec<f32>, AnalysisError>;

    /// Onset event frames from an onset-strength envelope
    fn onset_events(
        &self,
        onset_envelope: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<usize>, AnalysisError>;

    /// Single raw tempo estimate with beat frames
    fn estimate_tempo(
        &self,
        onset_envelope: &[f32],
        sample_rate: u32,
    ) -> Result<TempoEstimate, AnalysisError>;

    /// Spectral centroid, rolloff, bandwidth, contrast and zero-crossing rate
    fn spectral(
        &self,
        spectrogram: &Spectrogram,
        samples: &[f32],
    ) -> Result<SpectralFeatures, AnalysisError>;

    /// Pitch-class energy over time
    fn chromagram(&self, spectrogram: &Spectrogram) -> Result<Vec<[f32; 12]>, AnalysisError>;

    /// Integrated loudness in LUFS
    fn integrated_loudness(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<f32, AnalysisError>;

    /// Waveform scaled to the target integrated loudness
    fn normalize_loudness(
        &self,
        samples: &[f32],
        sample_rate: u32,
        target_lufs: f32,
    ) -> Result<Vec<f32>, AnalysisError>;

    /// Time-by-tempo energy matrix (optional capability)
    fn tempogram(
        &self,
        _onset_envelope: &[f32],
        _sample_rate: u32,
    ) -> Result<Tempogram, AnalysisError> {
        Err(AnalysisError::MeasurementUnavailable(format!(
            "{} does not provide a tempogram",
            self.name()
        )))
    }
}

/// The shipped front-end: STFT, mel spectral flux, autocorrelation tempo,
/// BS.1770 loudness
#[derive(Debug, Clone)]
pub struct NativeFrontEnd {
    /// STFT / RMS frame size
    pub frame_size: usize,
    /// Hop size between frames
    pub hop_size: usize,
    /// Raw tempo search range, lower bound
    pub min_bpm: f32,
    /// Raw tempo search range, upper bound
    pub max_bpm: f32,
    /// Center of the raw tempo prior
    pub tempo_prior_bpm: f32,
    /// Optional peak headroom preserved by loudness normalization
    pub max_headroom_db: Option<f32>,
}

impl Default for NativeFrontEnd {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl NativeFrontEnd {
    /// Front-end using the framing and tempo parameters of `config`
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            frame_size: config.frame_size,
            hop_size: config.hop_size,
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            tempo_prior_bpm: config.tempo_prior_bpm,
            max_headroom_db: config.max_headroom_db,
        }
    }
}

impl DspFrontEnd for NativeFrontEnd {
    fn name(&self) -> &'static str {
        "native"
    }

    fn hop_size(&self) -> usize {
        self.hop_size
    }

    fn decode(&self, path: &Path) -> Result<DecodedAudio, AnalysisError> {
        decode_audio(path)
    }

    fn frame_rms(&self, samples: &[f32]) -> Result<Vec<f32>, AnalysisError> {
        frame_rms(samples, self.frame_size, self.hop_size)
    }

    fn spectrogram(&self, samples: &[f32], sample_rate: u32) -> Result<Spectrogram, AnalysisError> {
        compute_stft(samples, sample_rate, self.frame_size, self.hop_size)
    }

    fn onset_strength(&self, spectrogram: &Spectrogram) -> Result<Vec<f32>, AnalysisError> {
        onset_strength(spectrogram)
    }

    fn onset_events(
        &self,
        onset_envelope: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<usize>, AnalysisError> {
        detect_onset_events(
            onset_envelope,
            sample_rate,
            self.hop_size,
            PeakPickParams::default(),
        )
    }

    fn estimate_tempo(
        &self,
        onset_envelope: &[f32],
        sample_rate: u32,
    ) -> Result<TempoEstimate, AnalysisError> {
        estimate_tempo(
            onset_envelope,
            sample_rate,
            self.hop_size,
            self.min_bpm,
            self.max_bpm,
            self.tempo_prior_bpm,
        )
    }

    fn spectral(
        &self,
        spectrogram: &Spectrogram,
        samples: &[f32],
    ) -> Result<SpectralFeatures, AnalysisError> {
        spectral_features(spectrogram, samples)
    }

    fn chromagram(&self, spectrogram: &Spectrogram) -> Result<Vec<[f32; 12]>, AnalysisError> {
        extract_chroma(spectrogram)
    }

    fn integrated_loudness(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<f32, AnalysisError> {
        normalization::integrated_loudness(samples, sample_rate)
    }

    fn normalize_loudness(
        &self,
        samples: &[f32],
        sample_rate: u32,
        target_lufs: f32,
    ) -> Result<Vec<f32>, AnalysisError> {
        let (normalized, meta) = normalization::normalize_loudness(
            samples,
            sample_rate,
            target_lufs,
            self.max_headroom_db,
        )?;
        log::debug!(
            "Normalized {:.2} LUFS -> {:.2} LUFS (gain {:+.2} dB, limited: {})",
            meta.measured_lufs,
            target_lufs,
            meta.gain_db,
            meta.limited
        );
        Ok(normalized)
    }

    fn tempogram(
        &self,
        onset_envelope: &[f32],
        sample_rate: u32,
    ) -> Result<Tempogram, AnalysisError> {
        compute_tempogram(onset_envelope, sample_rate, self.hop_size)
    }
}

/// Every raw measurement of one track
///
/// Created once per analysis call and read by all heuristic components.
#[derive(Debug, Clone)]
pub struct RawSignals {
    /// Mono waveform
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f32,
    /// Hop size of all frame-based signals
    pub hop_size: usize,
    /// Single raw tempo estimate in BPM
    pub raw_bpm: f32,
    /// Beat positions in frames
    pub beat_frames: Vec<usize>,
    /// Pitch-class energy per frame
    pub chromagram: Vec<[f32; 12]>,
    /// Spectral shape curves
    pub spectral: SpectralFeatures,
    /// Frame RMS of the waveform
    pub rms: Vec<f32>,
    /// Onset strength of the waveform
    pub onset_envelope: Vec<f32>,
    /// Onset event frames
    pub onset_events: Vec<usize>,
    /// Tempogram, when the front-end provides one
    pub tempogram: Option<Tempogram>,
    /// Integrated loudness in LUFS
    pub integrated_loudness: f32,
    /// Frame RMS of the loudness-normalized waveform
    pub normalized_rms: Vec<f32>,
    /// Onset strength of the loudness-normalized waveform
    pub normalized_onset_envelope: Vec<f32>,
}

impl RawSignals {
    /// Run every front-end measurement on one waveform
    ///
    /// # Arguments
    ///
    /// * `frontend` - Measurement backend
    /// * `samples` - Mono waveform
    /// * `sample_rate` - Sample rate in Hz
    /// * `target_lufs` - Loudness target for the energy measurements
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for an empty waveform or zero
    /// sample rate, and propagates any required measurement failure. A missing
    /// tempogram only logs a warning.
    pub fn collect(
        frontend: &dyn DspFrontEnd,
        samples: Vec<f32>,
        sample_rate: u32,
        target_lufs: f32,
    ) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Empty audio samples".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }

        log::debug!(
            "Collecting raw signals with {} front-end: {} samples at {} Hz",
            frontend.name(),
            samples.len(),
            sample_rate
        );

        let duration = samples.len() as f32 / sample_rate as f32;
        let rms = frontend.frame_rms(&samples)?;
        let spectrogram = frontend.spectrogram(&samples, sample_rate)?;
        let onset_envelope = frontend.onset_strength(&spectrogram)?;
        let onset_events = frontend.onset_events(&onset_envelope, sample_rate)?;
        let tempo = frontend.estimate_tempo(&onset_envelope, sample_rate)?;

        let tempogram = match frontend.tempogram(&onset_envelope, sample_rate) {
            Ok(t) => Some(t),
            Err(e) => {
                log::warn!("Tempogram unavailable, tempo correction disabled: {}", e);
                None
            }
        };

        let spectral = frontend.spectral(&spectrogram, &samples)?;
        let chromagram = frontend.chromagram(&spectrogram)?;
        drop(spectrogram);
        let integrated_loudness = frontend.integrated_loudness(&samples, sample_rate)?;

        let normalized = frontend.normalize_loudness(&samples, sample_rate, target_lufs)?;
        let normalized_rms = frontend.frame_rms(&normalized)?;
        let normalized_spectrogram = frontend.spectrogram(&normalized, sample_rate)?;
        let normalized_onset_envelope = frontend.onset_strength(&normalized_spectrogram)?;

        Ok(Self {
            samples,
            sample_rate,
            duration,
            hop_size: frontend.hop_size(),
            raw_bpm: tempo.bpm,
            beat_frames: tempo.beat_frames,
            chromagram,
            spectral,
            rms,
            onset_envelope,
            onset_events,
            tempogram,
            integrated_loudness,
            normalized_rms,
            normalized_onset_envelope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tone_with_clicks(sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        let click_every = sample_rate as usize / 2;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let tone = 0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin();
                let phase = i % click_every;
                let click = if phase < 200 {
                    0.6 * (1.0 - phase as f32 / 200.0)
                } else {
                    0.0
                };
                tone + click
            })
            .collect()
    }

    #[test]
    fn test_collect_aligns_frame_signals() {
        let frontend = NativeFrontEnd::default();
        let samples = tone_with_clicks(22050, 6.0);
        let signals = RawSignals::collect(&frontend, samples, 22050, -14.0).unwrap();

        assert_eq!(signals.hop_size, 512);
        assert!((signals.duration - 6.0).abs() < 1e-3);
        assert_eq!(signals.rms.len(), signals.onset_envelope.len());
        assert_eq!(signals.rms.len(), signals.spectral.centroid.len());
        assert_eq!(signals.rms.len(), signals.chromagram.len());
        assert_eq!(signals.normalized_rms.len(), signals.rms.len());
        assert!(signals.tempogram.is_some());
        assert!(!signals.onset_events.is_empty());
        assert!(signals.integrated_loudness.is_finite());
    }

    #[test]
    fn test_collect_rejects_empty_input() {
        let frontend = NativeFrontEnd::default();
        assert!(matches!(
            RawSignals::collect(&frontend, vec![], 44100, -14.0),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_silence_is_measurement_error() {
        let frontend = NativeFrontEnd::default();
        let result = RawSignals::collect(&frontend, vec![0.0; 44100 * 2], 44100, -14.0);
        assert!(matches!(result, Err(AnalysisError::MeasurementError(_))));
    }

    /// Native front-end that counts spectrograms and optionally lacks a tempogram
    #[derive(Default)]
    struct Wrapped {
        inner: NativeFrontEnd,
        with_tempogram: bool,
        spectrograms: AtomicUsize,
    }

    impl DspFrontEnd for Wrapped {
        fn name(&self) -> &'static str {
            "wrapped"
        }

        fn hop_size(&self) -> usize {
            self.inner.hop_size()
        }

        fn decode(&self, path: &Path) -> Result<DecodedAudio, AnalysisError> {
            self.inner.decode(path)
        }

        fn frame_rms(&self, samples: &[f32]) -> Result<Vec<f32>, AnalysisError> {
            self.inner.frame_rms(samples)
        }

        fn spectrogram(&self, samples: &[f32], sr: u32) -> Result<Spectrogram, AnalysisError> {
            self.spectrograms.fetch_add(1, Ordering::SeqCst);
            self.inner.spectrogram(samples, sr)
        }

        fn onset_strength(&self, spectrogram: &Spectrogram) -> Result<Vec<f32>, AnalysisError> {
            self.inner.onset_strength(spectrogram)
        }

        fn onset_events(&self, envelope: &[f32], sr: u32) -> Result<Vec<usize>, AnalysisError> {
            self.inner.onset_events(envelope, sr)
        }

        fn estimate_tempo(
            &self,
            envelope: &[f32],
            sr: u32,
        ) -> Result<TempoEstimate, AnalysisError> {
            self.inner.estimate_tempo(envelope, sr)
        }

        fn spectral(
            &self,
            spectrogram: &Spectrogram,
            samples: &[f32],
        ) -> Result<SpectralFeatures, AnalysisError> {
            self.inner.spectral(spectrogram, samples)
        }

        fn chromagram(&self, spectrogram: &Spectrogram) -> Result<Vec<[f32; 12]>, AnalysisError> {
            self.inner.chromagram(spectrogram)
        }

        fn integrated_loudness(&self, samples: &[f32], sr: u32) -> Result<f32, AnalysisError> {
            self.inner.integrated_loudness(samples, sr)
        }

        fn normalize_loudness(
            &self,
            samples: &[f32],
            sr: u32,
            target_lufs: f32,
        ) -> Result<Vec<f32>, AnalysisError> {
            self.inner.normalize_loudness(samples, sr, target_lufs)
        }

        fn tempogram(&self, envelope: &[f32], sr: u32) -> Result<Tempogram, AnalysisError> {
            if self.with_tempogram {
                self.inner.tempogram(envelope, sr)
            } else {
                Err(AnalysisError::MeasurementUnavailable(
                    "wrapped front-end has no tempogram".to_string(),
                ))
            }
        }
    }

    #[test]
    fn test_missing_tempogram_is_not_fatal() {
        let frontend = Wrapped::default();
        let err = frontend.tempogram(&[0.0; 10], 44100).unwrap_err();
        assert!(err.is_unavailable());

        let samples = tone_with_clicks(22050, 4.0);
        let signals = RawSignals::collect(&frontend, samples, 22050, -14.0).unwrap();
        assert!(signals.tempogram.is_none());
    }

    #[test]
    fn test_one_spectrogram_per_waveform() {
        let frontend = Wrapped {
            with_tempogram: true,
            ..Wrapped::default()
        };
        let samples = tone_with_clicks(22050, 4.0);
        let signals = RawSignals::collect(&frontend, samples, 22050, -14.0).unwrap();

        // Raw waveform and loudness-normalized waveform
        assert_eq!(frontend.spectrograms.load(Ordering::SeqCst), 2);
        assert!(signals.tempogram.is_some());
        assert_eq!(signals.onset_envelope.len(), signals.spectral.centroid.len());
    }
}
