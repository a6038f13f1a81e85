//! Descriptor assembly
//!
//! - [`engine`]: runs the heuristics over raw signals and guards each track
//! - [`result`]: descriptor, key and per-track result types

pub mod engine;
pub mod result;
