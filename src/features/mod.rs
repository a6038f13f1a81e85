//! Feature extraction modules
//!
//! Low-level measurements the native front-end is built from:
//! - Framing, STFT, frame RMS, zero-crossing rate
//! - Onset strength and onset events
//! - Raw tempo, beat grid and tempogram
//! - Chroma extraction
//! - Spectral shape features

pub mod chroma;
pub mod onset;
pub mod period;
pub mod spectral;
pub mod statistics;
pub mod stft;
