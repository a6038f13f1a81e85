//! # Soundprint
//!
//! Perceptual descriptors for music tracks: corrected tempo, half-time feel,
//! key, energy, valence, loudness, silence, a quality rubric and highlight
//! windows, computed from a decoded waveform.
//!
//! ## Features
//!
//! - **Tempo**: autocorrelation estimate corrected for octave errors with a
//!   tempogram and an optional filename prior
//! - **Half-time**: detects grooves felt at half the detected tempo
//! - **Energy**: loudness-normalized, so mastering level does not decide it
//! - **Quality and highlights**: optional descriptor sections
//! - **Batch**: parallel analysis with per-track failure isolation
//!
//! ## Quick Start
//!
//! ```no_run
//! use soundprint::{analyze_audio, EngineConfig};
//!
//! // Mono f32 samples, e.g. from soundprint::io::decode_audio
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 44100;
//!
//! let descriptor = analyze_audio(samples, sample_rate, EngineConfig::default())?;
//!
//! println!("BPM: {:.2} (effective {:.2})", descriptor.bpm, descriptor.effective_bpm);
//! println!("Key: {}, energy {:.2}", descriptor.key, descriptor.energy);
//! # Ok::<(), soundprint::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Audio Input → DSP front-end (RawSignals) → Heuristics → TrackDescriptor
//! ```
//!
//! The front-end is the [`frontend::DspFrontEnd`] trait; [`frontend::NativeFrontEnd`]
//! is the shipped implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod frontend;
pub mod heuristics;
pub mod io;
pub mod preprocessing;

// Re-export main types
pub use analysis::engine::Engine;
pub use analysis::result::{Key, TrackDescriptor, TrackResult, ENGINE_VERSION};
pub use batch::{analyze_batch, BatchReport, BatchTrack};
pub use config::EngineConfig;
pub use error::AnalysisError;
pub use frontend::{DspFrontEnd, NativeFrontEnd, RawSignals};

/// Main analysis function
///
/// Analyzes mono samples with the native front-end and returns the track
/// descriptor. No filename prior is used.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Engine configuration
///
/// # Errors
///
/// Returns `AnalysisError` for invalid configuration or input, or when a
/// measurement fails (for example an all-silent signal)
///
/// # Example
///
/// ```no_run
/// use soundprint::{analyze_audio, EngineConfig};
///
/// let samples = vec![0.0f32; 44100 * 30];
/// // Pure silence cannot be loudness-normalized
/// assert!(analyze_audio(samples, 44100, EngineConfig::default()).is_err());
/// ```
pub fn analyze_audio(
    samples: Vec<f32>,
    sample_rate: u32,
    config: EngineConfig,
) -> Result<TrackDescriptor, AnalysisError> {
    Engine::new(config)?.analyze_samples(samples, sample_rate, None)
}
