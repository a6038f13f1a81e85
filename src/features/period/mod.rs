//! Period estimation modules
//!
//! Rhythm periodicity from the onset-strength envelope:
//! - Global autocorrelation raw tempo estimate and beat grid
//! - Local autocorrelation tempogram
//! - Peak picking on feature curves

pub mod autocorrelation;
pub mod peak_picking;
pub mod tempogram;

pub use autocorrelation::{estimate_tempo, TempoEstimate};
pub use tempogram::{compute_tempogram, Tempogram};
