// src/main.rs

mod analysis;
mod config;
mod envelope;
mod geometry;
mod pipeline;
mod scenario_io;
mod types;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::{BodyConfig, BodyKind, Config};

#[derive(Parser)]
#[command(
    name = "envelope-da",
    about = "Safety-envelope metrics and DA scoring for recorded ego/challenger scenarios"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every scenario CSV under the input directory
    Run {
        /// Path to the YAML config
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,

        /// Overrides io.input_dir
        #[arg(long)]
        input: Option<PathBuf>,

        /// Overrides io.output_dir
        #[arg(long)]
        output: Option<PathBuf>,

        /// Log level or filter directive, overrides logging.level and RUST_LOG
        #[arg(long)]
        log_level: Option<String>,

        /// Process scenarios one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Score one scenario and print its aggregate record as JSON
    Score {
        /// Scenario CSV
        file: PathBuf,

        /// Path to the YAML config
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Print the built-in body presets as YAML
    Presets,
}

fn init_logging(level: &str, explicit: bool) {
    let directive = if level.contains('=') {
        level.to_string()
    } else {
        format!("envelope_da={level}")
    };
    let filter = if explicit {
        EnvFilter::new(directive)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn presets() -> Result<String> {
    let presets: BTreeMap<&str, BodyConfig> = BodyKind::ALL
        .iter()
        .map(|kind| {
            let profile = BodyConfig::new(*kind).resolve();
            (
                kind.as_str(),
                BodyConfig {
                    kind: *kind,
                    length: Some(profile.length),
                    width: Some(profile.width),
                    envelope: Some(profile.envelope),
                },
            )
        })
        .collect();
    Ok(serde_yaml::to_string(&presets)?)
}

fn run(
    config_path: PathBuf,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    log_level: Option<String>,
    sequential: bool,
) -> Result<()> {
    let mut config = Config::load_or_default(&config_path)?;
    match &log_level {
        Some(level) => init_logging(level, true),
        None => init_logging(&config.logging.level, false),
    }

    info!("🚗 Safety envelope scoring starting");
    if config_path.exists() {
        info!("✓ Configuration loaded from {}", config_path.display());
    } else {
        warn!(
            "Config {} not found, using built-in defaults",
            config_path.display()
        );
    }

    if let Some(input) = input {
        config.io.input_dir = input.display().to_string();
    }
    if let Some(output) = output {
        config.io.output_dir = output.display().to_string();
    }
    if sequential {
        config.io.parallel = false;
    }

    let ego = config.ego.resolve();
    let challenger = config.challenger.resolve();
    info!(
        "Bodies: ego={} ({:.2}x{:.2}m), challenger={} ({:.2}x{:.2}m)",
        ego.kind.as_str(),
        ego.length,
        ego.width,
        challenger.kind.as_str(),
        challenger.length,
        challenger.width
    );
    info!(
        "Thresholds: restoration={:.1}s, response={:.1}s, n={:.2}",
        config.thresholds.restoration_time,
        config.thresholds.response_time,
        config.thresholds.mrd_proportion
    );

    let report = pipeline::run_batch(&config)?;
    if !report.failed.is_empty() {
        warn!("⚠️  {} scenario(s) skipped", report.failed.len());
    }
    Ok(())
}

fn score(file: PathBuf, config_path: PathBuf) -> Result<()> {
    let config = Config::load_or_default(&config_path)?;
    init_logging(&config.logging.level, false);

    let table = scenario_io::read_scenario(&file, &config.columns)?;
    let root = file.parent().unwrap_or_else(|| Path::new(""));
    let id = scenario_io::scenario_id(&file, root);
    let output = pipeline::score_scenario(&id, &table, &config);
    println!("{}", serde_json::to_string_pretty(&output.result)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            input,
            output,
            log_level,
            sequential,
        } => run(config, input, output, log_level, sequential),
        Commands::Score { file, config } => score(file, config),
        Commands::Presets => {
            print!("{}", presets()?);
            Ok(())
        }
    }
}
