use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use std::path::PathBuf;

use mriqc_gear::bids::{Hierarchy, LocalDatasetSource, RunLevel};
use mriqc_gear::config_loader;
use mriqc_gear::orchestrator::{self, GearContext};
use mriqc_gear::process::environment::ENVIRONMENT_FILE;
use mriqc_gear::utils::SystemResources;
use mriqc_gear::GEAR_NAME;

/// Stage a BIDS dataset, run MRIQC on it and package the results
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gear directory holding config.json, manifest.json, input/, output/ and work/
    #[arg(long, default_value = "/flywheel/v0")]
    gear_dir: PathBuf,

    /// Run configuration, JSON or YAML [default: <gear-dir>/config.json]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gear manifest [default: <gear-dir>/manifest.json]
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// BIDS dataset to stage [default: <gear-dir>/input/bids]
    #[arg(long)]
    bids_dir: Option<PathBuf>,

    /// Saved shell environment for the application
    #[arg(long, default_value = ENVIRONMENT_FILE)]
    environment_file: PathBuf,

    /// Hierarchy level the gear was launched at
    #[arg(long, value_enum, default_value_t = RunLevel::Session)]
    run_level: RunLevel,

    /// Label of the project, subject or session [default: destination id]
    #[arg(long)]
    run_label: Option<String>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| args.gear_dir.join("config.json"));
    let manifest_path = args
        .manifest
        .clone()
        .unwrap_or_else(|| args.gear_dir.join("manifest.json"));

    // Manifest defaults are merged before validation and before the log
    // level is read
    let manifest = config_loader::load_manifest(&manifest_path)?;
    let config = config_loader::load_config(&config_path, manifest.as_ref())?;

    let log_level = config.gear_options().log_level;
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level.as_filter())).init();

    info!("Configuration file: {:?}", config_path);
    match &manifest {
        Some(manifest) => info!("Loaded manifest for gear '{}'", manifest.name),
        None => warn!("Manifest not found at {:?}, using built-in gear name", manifest_path),
    }
    config_loader::log_config(&config);

    let hierarchy = Hierarchy {
        run_level: args.run_level,
        run_label: args
            .run_label
            .clone()
            .unwrap_or_else(|| config.destination.id.clone()),
    };

    let context = GearContext {
        gear_name: manifest.map(|m| m.name).unwrap_or_else(|| GEAR_NAME.to_string()),
        output_dir: args.gear_dir.join("output"),
        work_dir: args.gear_dir.join("work"),
        environment_file: args.environment_file.clone(),
        hierarchy,
        config,
    };

    let bids_dir = args
        .bids_dir
        .clone()
        .unwrap_or_else(|| args.gear_dir.join("input").join("bids"));
    let source = LocalDatasetSource::new(bids_dir);
    let resources = SystemResources::detect();

    let code = orchestrator::run(&context, &source, &resources)?;
    std::process::exit(code);
}
