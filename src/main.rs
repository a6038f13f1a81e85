//! soundprint command-line front-end
//!
//! **Usage:**
//! ```bash
//! soundprint analyze <path> [--json] [--quality] [--highlights] [--num-highlights N]
//!                    [--config FILE] [--energy-model power-law|legacy-log]
//!                    [--highlight-ranking raw-score|percentile-rank]
//! soundprint batch <manifest.json> [--workers N] [--output FILE] [--quality] [--config FILE]
//! ```
//!
//! Exit codes: 0 on success, 1 when no track could be analyzed, 2 on invalid
//! arguments, configuration or manifest.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use soundprint::batch::{analyze_batch, load_manifest};
use soundprint::heuristics::energy::EnergyModel;
use soundprint::heuristics::highlights::HighlightRanking;
use soundprint::{Engine, EngineConfig, TrackResult};
use std::path::PathBuf;

/// Perceptual audio descriptors
#[derive(Parser, Debug)]
#[command(name = "soundprint", version)]
#[command(about = "Tempo, key, energy, quality and highlight descriptors for audio files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a single audio file
    Analyze(AnalyzeArgs),
    /// Analyze every track of a JSON manifest in parallel
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Audio file
    path: PathBuf,

    /// Print the descriptor as pretty JSON
    #[arg(long)]
    json: bool,

    /// Attach the quality score and breakdown
    #[arg(long)]
    quality: bool,

    /// Attach highlight windows
    #[arg(long)]
    highlights: bool,

    /// Number of highlights
    #[arg(long, value_name = "N")]
    num_highlights: Option<usize>,

    /// JSON configuration file (partial files allowed)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Energy model
    #[arg(long, value_name = "MODEL")]
    energy_model: Option<EnergyModel>,

    /// Cross-signal highlight ranking
    #[arg(long, value_name = "POLICY")]
    highlight_ranking: Option<HighlightRanking>,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// JSON manifest: [{"id": "...", "path": "..."}]
    manifest: PathBuf,

    /// Parallel workers (default: CPU-1)
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Write the result map here instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Attach the quality score and breakdown
    #[arg(long)]
    quality: bool,

    /// JSON configuration file (partial files allowed)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::from_json_file(p).with_context(|| "loading configuration"),
        None => Ok(EngineConfig::default()),
    }
}

fn run_analyze(args: AnalyzeArgs) -> anyhow::Result<i32> {
    let mut config = load_config(args.config.as_ref())?;
    config.include_quality |= args.quality;
    config.include_highlights |= args.highlights;
    if let Some(n) = args.num_highlights {
        config.num_highlights = n;
    }
    if let Some(model) = args.energy_model {
        config.energy_model = model;
    }
    if let Some(ranking) = args.highlight_ranking {
        config.highlight_ranking = ranking;
    }

    let engine = Engine::new(config).context("invalid configuration")?;

    match engine.analyze_path(&args.path) {
        TrackResult::Descriptor(descriptor) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&descriptor)?);
            } else {
                for line in descriptor.to_flat_lines() {
                    println!("{}", line);
                }
            }
            Ok(0)
        }
        TrackResult::Error { error } => {
            if args.json {
                let record = serde_json::json!({ "error": error });
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                eprintln!("ERROR: {}: {}", args.path.display(), error);
            }
            Ok(1)
        }
    }
}

fn run_batch(args: BatchArgs) -> anyhow::Result<i32> {
    let mut config = load_config(args.config.as_ref())?;
    config.include_quality |= args.quality;

    let tracks = load_manifest(&args.manifest).context("loading manifest")?;
    eprintln!("Batch: {} tracks", tracks.len());

    let report = analyze_batch(tracks, args.workers, config).context("batch analysis")?;

    let json = serde_json::to_string_pretty(&report.results)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("writing results to {}", path.display()))?,
        None => println!("{}", json),
    }

    eprintln!("Success: {}, Errors: {}", report.success_count, report.error_count);

    Ok(if report.success_count == 0 { 1 } else { 0 })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Batch(args) => run_batch(args),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            2
        }
    };
    std::process::exit(code);
}
