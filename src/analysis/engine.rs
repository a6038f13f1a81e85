//! Descriptor engine
//!
//! Ties the front-end and the heuristics together:
//!
//! ```text
//! decode → RawSignals::collect → tempo → half-time → key / energy / valence
//!        → silence → (quality) → (highlights) → TrackDescriptor
//! ```
//!
//! [`Engine::analyze_signals`] is a pure function of its inputs, so the same
//! raw signals always produce the same descriptor. [`Engine::analyze_path`]
//! is the per-track boundary: every error and panic below it becomes a
//! [`TrackResult::Error`] record.
//!
//! # Example
//!
//! ```no_run
//! use soundprint::{Engine, EngineConfig};
//! use std::path::Path;
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! match engine.analyze_path(Path::new("track.mp3")).descriptor() {
//!     Some(d) => println!("{:.1} BPM, {}", d.bpm, d.key),
//!     None => eprintln!("analysis failed"),
//! }
//! # Ok::<(), soundprint::AnalysisError>(())
//! ```

use crate::analysis::result::{TrackDescriptor, TrackResult, ENGINE_VERSION};
use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::features::statistics::mean;
use crate::frontend::{DspFrontEnd, NativeFrontEnd, RawSignals};
use crate::heuristics::energy::{active_rms, energy_inputs, perceptual_energy};
use crate::heuristics::halftime::detect_halftime;
use crate::heuristics::highlights::{highlights_from_signals, HighlightOptions};
use crate::heuristics::key::estimate_key;
use crate::heuristics::quality::score_quality;
use crate::heuristics::tempo::{resolve_tempo, tempo_confidence};
use crate::heuristics::valence::{estimate_silence, estimate_valence};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

/// Floor of the descriptor loudness in dB
const LOUDNESS_FLOOR_DB: f32 = -80.0;

/// Track descriptor engine
pub struct Engine {
    config: EngineConfig,
    frontend: Box<dyn DspFrontEnd>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("frontend", &self.frontend.name())
            .finish()
    }
}

impl Engine {
    /// Engine with the native front-end
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` if `config` is invalid
    pub fn new(config: EngineConfig) -> Result<Self, AnalysisError> {
        let frontend = NativeFrontEnd::from_config(&config);
        Self::with_frontend(config, Box::new(frontend))
    }

    /// Engine with a custom front-end
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` if `config` is invalid
    pub fn with_frontend(
        config: EngineConfig,
        frontend: Box<dyn DspFrontEnd>,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config, frontend })
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Measurement backend
    pub fn frontend(&self) -> &dyn DspFrontEnd {
        self.frontend.as_ref()
    }

    /// Run every front-end measurement on a waveform
    pub fn collect_signals(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
    ) -> Result<RawSignals, AnalysisError> {
        RawSignals::collect(
            self.frontend.as_ref(),
            samples,
            sample_rate,
            self.config.target_loudness_lufs,
        )
    }

    /// Build a descriptor from raw signals
    ///
    /// # Arguments
    ///
    /// * `signals` - Raw measurements of one track
    /// * `filename_hint` - File name used as a tempo prior, if any
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::MeasurementError` if the key cannot be
    /// estimated (empty chromagram)
    pub fn analyze_signals(
        &self,
        signals: &RawSignals,
        filename_hint: Option<&str>,
    ) -> Result<TrackDescriptor, AnalysisError> {
        let config = &self.config;

        let bpm = resolve_tempo(signals.raw_bpm, signals.tempogram.as_ref(), filename_hint);
        let halftime = detect_halftime(
            bpm,
            &signals.onset_envelope,
            signals.onset_events.len(),
            signals.duration,
        );
        let key = estimate_key(&signals.chromagram)?;

        let inputs = energy_inputs(&signals.normalized_rms, &signals.normalized_onset_envelope);
        let energy = perceptual_energy(
            inputs,
            config.energy_model,
            config.effective_energy_weights(),
            halftime.is_halftime,
        );

        let level = active_rms(&signals.rms);
        let loudness = if level > 0.0 {
            (20.0 * level.log10()).max(LOUDNESS_FLOOR_DB)
        } else {
            LOUDNESS_FLOOR_DB
        };

        let mut descriptor = TrackDescriptor {
            duration: signals.duration,
            bpm,
            effective_bpm: halftime.effective_bpm,
            is_halftime: halftime.is_halftime,
            key,
            energy,
            energy_raw: inputs.active_rms,
            energy_spectral: inputs.spectral_energy,
            valence: estimate_valence(&signals.spectral.centroid),
            loudness,
            integrated_loudness: signals.integrated_loudness,
            spectral_centroid: mean(&signals.spectral.centroid),
            spectral_rolloff: mean(&signals.spectral.rolloff),
            zero_crossing_rate: mean(&signals.spectral.zero_crossing_rate),
            silence_ratio: estimate_silence(&signals.samples, config.silence_threshold_db),
            tempo_confidence: tempo_confidence(&signals.onset_envelope),
            quality_score: None,
            quality_breakdown: None,
            highlights: None,
            engine_version: ENGINE_VERSION.to_string(),
        };

        if config.include_quality {
            let quality = score_quality(descriptor.quality_inputs());
            descriptor.quality_score = Some(quality.overall);
            descriptor.quality_breakdown = Some(quality.breakdown);
        }

        if config.include_highlights {
            let options = HighlightOptions {
                count: config.num_highlights,
                window_seconds: config.highlight_window_seconds,
                ranking: config.highlight_ranking,
            };
            descriptor.highlights = Some(highlights_from_signals(signals, &options));
        }

        Ok(descriptor)
    }

    /// Measure and analyze a decoded waveform
    pub fn analyze_samples(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        filename_hint: Option<&str>,
    ) -> Result<TrackDescriptor, AnalysisError> {
        let signals = self.collect_signals(samples, sample_rate)?;
        self.analyze_signals(&signals, filename_hint)
    }

    /// Decode and analyze a file, propagating failures
    pub fn try_analyze_path(&self, path: &Path) -> Result<TrackDescriptor, AnalysisError> {
        let start_time = Instant::now();
        log::debug!("Analyzing {}", path.display());

        let audio = self.frontend.decode(path)?;
        let file_name = path.file_name().and_then(|n| n.to_str());
        let descriptor = self.analyze_samples(audio.samples, audio.sample_rate, file_name)?;

        log::debug!(
            "Analyzed {} in {:.1} ms: {:.1} BPM, {}",
            path.display(),
            start_time.elapsed().as_secs_f32() * 1000.0,
            descriptor.bpm,
            descriptor.key
        );
        Ok(descriptor)
    }

    /// Decode and analyze a file
    ///
    /// Never fails: errors and panics become an error record.
    pub fn analyze_path(&self, path: &Path) -> TrackResult {
        match catch_unwind(AssertUnwindSafe(|| self.try_analyze_path(path))) {
            Ok(Ok(descriptor)) => TrackResult::Descriptor(Box::new(descriptor)),
            Ok(Err(e)) => {
                log::warn!("Analysis of {} failed: {}", path.display(), e);
                TrackResult::from_error(e)
            }
            Err(payload) => {
                let message = format!("Analysis panicked: {}", panic_message(payload.as_ref()));
                log::warn!("{} ({})", message, path.display());
                TrackResult::from_error(message)
            }
        }
    }
}

/// Text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::period::Tempogram;

    fn tone_with_clicks(sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        let click_every = sample_rate as usize / 2;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let tone = 0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin();
                let click = if i % click_every < 64 { 0.8 } else { 0.0 };
                tone + click
            })
            .collect()
    }

    fn signals(engine: &Engine) -> RawSignals {
        engine.collect_signals(tone_with_clicks(22050, 12.0), 22050).unwrap()
    }

    #[test]
    fn test_descriptor_invariants() {
        let engine = Engine::new(EngineConfig {
            include_quality: true,
            include_highlights: true,
            ..EngineConfig::default()
        })
        .unwrap();
        let d = engine.analyze_signals(&signals(&engine), None).unwrap();

        for (name, v) in [
            ("energy", d.energy),
            ("valence", d.valence),
            ("silence_ratio", d.silence_ratio),
            ("tempo_confidence", d.tempo_confidence),
        ] {
            assert!((0.0..=1.0).contains(&v), "{} out of range: {}", name, v);
        }
        let q = d.quality_score.unwrap();
        assert!((0.0..=1.0).contains(&q), "quality out of range: {}", q);
        assert!(d.highlights.as_ref().unwrap().len() <= 3);
        if d.is_halftime {
            assert!(d.effective_bpm <= d.bpm);
        } else {
            assert_eq!(d.effective_bpm, d.bpm);
        }
        assert!(d.loudness >= LOUDNESS_FLOOR_DB && d.loudness <= 0.0, "loudness {}", d.loudness);
        assert_eq!(d.engine_version, ENGINE_VERSION);
    }

    #[test]
    fn test_analyze_signals_is_idempotent() {
        let engine = Engine::new(EngineConfig {
            include_highlights: true,
            ..EngineConfig::default()
        })
        .unwrap();
        let raw = signals(&engine);
        let a = engine.analyze_signals(&raw, Some("loop 120bpm.wav")).unwrap();
        let b = engine.analyze_signals(&raw, Some("loop 120bpm.wav")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_optional_sections_follow_config() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let d = engine.analyze_signals(&signals(&engine), None).unwrap();
        assert!(d.quality_score.is_none());
        assert!(d.quality_breakdown.is_none());
        assert!(d.highlights.is_none());
    }

    #[test]
    fn test_highlight_window_length() {
        let engine = Engine::new(EngineConfig {
            include_highlights: true,
            ..EngineConfig::default()
        })
        .unwrap();
        let raw = signals(&engine);
        let highlights = engine.analyze_signals(&raw, None).unwrap().highlights.unwrap();
        assert!(!highlights.is_empty());
        for h in &highlights {
            assert!((h.end - h.start - 10.0).abs() < 1e-4, "{:?}", h);
        }

        let engine = Engine::new(EngineConfig {
            include_highlights: true,
            highlight_window_seconds: 4.0,
            ..EngineConfig::default()
        })
        .unwrap();
        let highlights = engine.analyze_signals(&raw, None).unwrap().highlights.unwrap();
        assert!(highlights.iter().all(|h| (h.end - h.start - 4.0).abs() < 1e-4));
    }

    #[test]
    fn test_tempogram_drives_correction() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let mut raw = signals(&engine);
        raw.raw_bpm = 85.0;
        let axis: Vec<f32> = (40..=240).rev().map(|b| b as f32).collect();
        let rows = axis
            .iter()
            .map(|&b| vec![if b == 170.0 { 1.0 } else { 0.1 }; 8])
            .collect();
        raw.tempogram = Some(Tempogram::new(axis, rows).unwrap());

        let d = engine.analyze_signals(&raw, None).unwrap();
        assert_eq!(d.bpm, 170.0);
    }

    #[test]
    fn test_empty_chromagram_is_error() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let mut raw = signals(&engine);
        raw.chromagram.clear();
        assert!(matches!(
            engine.analyze_signals(&raw, None),
            Err(AnalysisError::MeasurementError(_))
        ));
    }

    #[test]
    fn test_missing_file_becomes_error_record() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let result = engine.analyze_path(Path::new("/definitely/not/here.wav"));
        assert!(!result.is_ok());
        assert!(result.error().unwrap().contains("Decoding error"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            hop_size: 0,
            ..EngineConfig::default()
        };
        assert!(Engine::new(config).is_err());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
