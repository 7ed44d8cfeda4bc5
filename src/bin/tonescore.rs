use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tonescore::audio::decoder::decode_file;
use tonescore::config::EngineConfig;
use tonescore::extraction::{signal_rms, PitchExtractor, PyinExtractor};
use tonescore::pronunciation::cli::{AnalyzeArgs, Cli, Command, CompareArgs, ExtractArgs};
use tonescore::{PitchComparator, PitchTrack};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Compare(args) => handle_compare(&args),
        Command::Analyze(args) => handle_analyze(&args),
        Command::Extract(args) => handle_extract(&args),
        Command::Config => {
            print!("{}", EngineConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_compare(args: &CompareArgs) -> Result<()> {
    let config = args.scoring.engine_config()?;
    let options = args.scoring.compare_options(None)?;
    let standard = read_track(&args.standard)?;
    let user = read_track(&args.user)?;
    let comparator = PitchComparator::try_new(Arc::new(config))?;
    let comparison = comparator.compare(&standard, &user, &options)?;
    print_json(&comparison)
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<()> {
    let config = args.scoring.engine_config()?;
    let extractor = PyinExtractor::new();
    let standard_audio = decode_file(&args.standard)?;
    let user_audio = decode_file(&args.user)?;
    let standard = extractor
        .extract(&standard_audio.samples, standard_audio.sample_rate)
        .with_context(|| format!("pitch extraction failed for {}", args.standard.display()))?;
    let user = extractor
        .extract(&user_audio.samples, user_audio.sample_rate)
        .with_context(|| format!("pitch extraction failed for {}", args.user.display()))?;
    let options = args
        .scoring
        .compare_options(Some(signal_rms(&user_audio.samples)))?;
    let comparator = PitchComparator::try_new(Arc::new(config))?;
    let comparison = comparator.compare(&standard, &user, &options)?;
    print_json(&comparison)
}

fn handle_extract(args: &ExtractArgs) -> Result<()> {
    let audio = decode_file(&args.input)?;
    let track = PyinExtractor::new()
        .extract(&audio.samples, audio.sample_rate)
        .with_context(|| format!("pitch extraction failed for {}", args.input.display()))?;
    print_json(&track)
}

fn read_track(path: &Path) -> Result<PitchTrack> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pitch track {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse pitch track {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}
