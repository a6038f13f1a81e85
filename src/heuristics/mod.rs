//! Descriptor heuristics
//!
//! Pure functions that turn raw front-end measurements into track
//! descriptors:
//! - Tempo resolution (octave-error correction, filename prior)
//! - Half-time feel detection
//! - Key estimation
//! - Perceptual energy
//! - Valence and silence ratio
//! - Quality rubric
//! - Highlight windows

pub mod energy;
pub mod halftime;
pub mod highlights;
pub mod key;
pub mod quality;
pub mod tempo;
pub mod valence;
