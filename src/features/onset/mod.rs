//! Onset detection modules
//!
//! - Spectral flux onset-strength envelope (mel-band, dB)
//! - Adaptive-threshold event picking on that envelope

pub mod spectral_flux;
pub mod threshold;

pub use spectral_flux::onset_strength;
pub use threshold::{detect_onset_events, PeakPickParams};
