//! Audio I/O modules
//!
//! Audio decoding to mono PCM using Symphonia.

pub mod decoder;

pub use decoder::{decode_audio, DecodedAudio};
