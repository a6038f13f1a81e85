//! Signal preprocessing
//!
//! - Integrated loudness measurement and loudness normalization (ITU-R BS.1770)
//! - Silence measurement relative to the track peak

pub mod normalization;
pub mod silence;
