//! Parallel batch analysis
//!
//! Parallelism is across tracks: each track is analyzed on one worker of a
//! fixed-size rayon pool, and every analysis runs behind the engine's panic
//! boundary, so one failing track only produces its own error record.
//! Default workers: available CPU threads - 1 (minimum 1).
//!
//! # Example
//!
//! ```no_run
//! use soundprint::batch::{analyze_batch, load_manifest};
//! use soundprint::EngineConfig;
//! use std::path::Path;
//!
//! let tracks = load_manifest(Path::new("manifest.json"))?;
//! let report = analyze_batch(tracks, None, EngineConfig::default())?;
//! eprintln!("Success: {}, Errors: {}", report.success_count, report.error_count);
//! # Ok::<(), soundprint::AnalysisError>(())
//! ```

use crate::analysis::engine::Engine;
use crate::analysis::result::TrackResult;
use crate::config::EngineConfig;
use crate::error::AnalysisError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One track of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTrack {
    /// Caller-chosen track id
    pub id: String,
    /// Audio file
    pub path: PathBuf,
}

impl BatchTrack {
    /// Track from an id and a path
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Result per track id
    pub results: BTreeMap<String, TrackResult>,
    /// Number of tracks with a descriptor
    pub success_count: usize,
    /// Number of tracks with an error record
    pub error_count: usize,
}

/// Default worker count: CPU threads - 1, at least 1
pub fn default_jobs() -> usize {
    let n = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

/// Read a JSON manifest of `[{"id": "...", "path": "..."}]`
///
/// # Errors
///
/// Returns `AnalysisError::ConfigurationError` if the file cannot be read or
/// is not a valid manifest
pub fn load_manifest(path: &Path) -> Result<Vec<BatchTrack>, AnalysisError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AnalysisError::ConfigurationError(format!("cannot read manifest {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        AnalysisError::ConfigurationError(format!("invalid manifest {}: {}", path.display(), e))
    })
}

/// Analyze tracks in parallel with the native front-end
///
/// # Arguments
///
/// * `tracks` - Tracks to analyze
/// * `workers` - Worker count; `None` or `Some(0)` uses [`default_jobs`]
/// * `config` - Engine configuration shared by every track
///
/// # Errors
///
/// Returns `AnalysisError::ConfigurationError` for an invalid configuration
/// or if the worker pool cannot be created. Per-track failures are reported
/// in the result map, never as an `Err`.
pub fn analyze_batch(
    tracks: Vec<BatchTrack>,
    workers: Option<usize>,
    config: EngineConfig,
) -> Result<BatchReport, AnalysisError> {
    let engine = Engine::new(config)?;
    analyze_batch_with(&engine, tracks, workers)
}

/// Analyze tracks in parallel with an existing engine
pub fn analyze_batch_with(
    engine: &Engine,
    tracks: Vec<BatchTrack>,
    workers: Option<usize>,
) -> Result<BatchReport, AnalysisError> {
    let jobs = match workers {
        Some(n) if n > 0 => n,
        _ => default_jobs(),
    };
    log::debug!("Batch: {} tracks, jobs={}", tracks.len(), jobs);

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| {
            AnalysisError::ConfigurationError(format!("cannot build worker pool: {}", e))
        })?;

    let outs: Vec<(String, TrackResult)> = pool.install(|| {
        tracks
            .par_iter()
            .map(|track| (track.id.clone(), engine.analyze_path(&track.path)))
            .collect()
    });

    let mut results = BTreeMap::new();
    for (id, result) in outs {
        if results.contains_key(&id) {
            log::warn!("Duplicate track id '{}', keeping the last result", id);
        }
        results.insert(id, result);
    }

    let success_count = results.values().filter(|r| r.is_ok()).count();
    let error_count = results.len() - success_count;

    log::debug!(
        "Batch done in {:.2}s: {} ok, {} failed",
        t0.elapsed().as_secs_f32(),
        success_count,
        error_count
    );

    Ok(BatchReport {
        results,
        success_count,
        error_count,
    })
}
