//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from a spectrogram:
//! - Chroma vector computation
//! - Per-frame normalization

pub mod extractor;
pub mod normalization;

pub use extractor::extract_chroma;
