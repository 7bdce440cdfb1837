//! Fleet Stats CLI
//!
//! Extracts player stats from a results screenshot, resolves them against
//! the player registry, and optionally appends them to the results CSV.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use fleet_stats::config::ExtractionConfig;
use fleet_stats::ocr::TesseractEngine;
use fleet_stats::persist::{CsvSink, RecordSink};
use fleet_stats::pipeline::{Pipeline, PlayerRecord};
use fleet_stats::registry::JsonRegistry;

const USAGE: &str = "usage: fleet-stats <image> [--registry <registry.json>] \
[--config <config.json>] [--csv <results.csv>] [--submitter <name>]";

struct Args {
    image: PathBuf,
    registry: PathBuf,
    config: Option<PathBuf>,
    csv: Option<PathBuf>,
    submitter: String,
}

fn parse_args() -> Result<Args> {
    let mut image = None;
    let mut registry = PathBuf::from("registry.json");
    let mut config = None;
    let mut csv = None;
    let mut submitter = "unknown".to_string();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--registry" => {
                registry = PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?);
            }
            "--config" => {
                config = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?));
            }
            "--csv" => {
                csv = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?));
            }
            "--submitter" => {
                submitter = args.next().ok_or_else(|| anyhow!(USAGE))?;
            }
            "--help" | "-h" => return Err(anyhow!(USAGE)),
            other if image.is_none() => image = Some(PathBuf::from(other)),
            other => return Err(anyhow!("unexpected argument {:?}\n{}", other, USAGE)),
        }
    }

    Ok(Args {
        image: image.ok_or_else(|| anyhow!(USAGE))?,
        registry,
        config,
        csv,
        submitter,
    })
}

fn print_record(index: usize, record: &PlayerRecord) {
    println!("Player {}", index + 1);
    println!("  Name:        {}", record.player_name.as_deref().unwrap_or("Unknown"));
    println!("  Clan:        {}", record.clan_name);
    println!("  Kills:       {}", record.kills);
    println!("  Deaths:      {}", record.deaths);
    println!("  Shots Fired: {}", record.shots_fired);
    println!("  Shots Hit:   {}", record.shots_hit);
    println!("  Accuracy:    {}", record.accuracy);
    println!("  Melee Kills: {}", record.melee_kills);
    if record.hits_clamped {
        println!("  Note: shots hit was clamped to shots fired");
    }
}

fn run() -> Result<()> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => ExtractionConfig::load(path),
        None => ExtractionConfig::default(),
    };

    if !config.extension_allowed(&args.image) {
        return Err(anyhow!(
            "unsupported image extension (allowed: {})",
            config.allowed_extensions.join(", ")
        ));
    }

    let image = image::open(&args.image)
        .with_context(|| format!("failed to decode {}", args.image.display()))?
        .to_rgba8();
    log::info!("image is {}x{}", image.width(), image.height());

    let engine = TesseractEngine::new()?;
    let registry = JsonRegistry::from_file(&args.registry)?;
    let pipeline = Pipeline::new(&config, &engine, &registry);

    let records = pipeline.run(&image)?;
    for (index, record) in records.iter().enumerate() {
        print_record(index, record);
    }

    if let Some(csv_path) = &args.csv {
        let sink = CsvSink::create(csv_path)?;
        let submitted_at = Utc::now();
        for record in &records {
            sink.append(record, &args.submitter, submitted_at)?;
        }
        println!("{} records appended to {}", records.len(), csv_path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
