use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use log::{error, LevelFilter};
use rayon::prelude::*;

use scalp_scan_rust_lib::{
    get_image_files_in_dir, load_image, process_image, write_comparison_sheet, write_summary_csv,
    Config, ImageReport, MemoryCache, ResultCache,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "ScalpScanR - Rule-based scalp photo analysis")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Draw markers without numbered labels
    #[clap(long)]
    no_labels: bool,

    /// Leave the legend box off annotated images
    #[clap(long)]
    no_legend: bool,

    /// Skip the comparison sheet for multi-image runs
    #[clap(long)]
    no_comparison: bool,

    /// Directory of external results named `<image stem>.json` (overwrites config)
    #[clap(short, long)]
    external: Option<String>,

    /// Verbose logging
    #[clap(short, long)]
    debug: bool,

    /// Write a default configuration to the --config path and exit
    #[clap(long)]
    write_default_config: bool,
}

fn init_logging(debug: bool) {
    let default_filter = if debug { LevelFilter::Debug } else { LevelFilter::Info };
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    if let Err(e) = builder.try_init() {
        log::debug!("Logger already initialized: {}", e);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    if args.write_default_config {
        Config::default()
            .save_to_file(&args.config)
            .with_context(|| format!("writing default config to {}", args.config))?;
        println!("Default configuration written to {}", args.config);
        return Ok(());
    }

    // Load configuration, falling back to defaults when the file is absent
    let mut config = if PathBuf::from(&args.config).is_file() {
        Config::from_file(&args.config)?
    } else {
        log::warn!("Config file {} not found, using defaults", args.config);
        Config::default()
    };

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }
    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }
    if let Some(external) = args.external.clone() {
        config.external_results_dir = Some(external);
    }
    if args.no_labels {
        config.show_labels = false;
    }
    if args.no_legend {
        config.show_legend = false;
    }
    if args.no_comparison {
        config.save_comparison = false;
    }

    config.validate().context("invalid configuration")?;

    let start_time = Instant::now();
    let cache = MemoryCache::new();
    let cache_ref: Option<&dyn ResultCache> = Some(&cache);

    let input_path = PathBuf::from(&config.input_path);
    let reports: Vec<ImageReport> = if input_path.is_file() {
        println!("Processing single file: {}", input_path.display());
        let input_image = load_image(&input_path)?;
        vec![process_image(input_image, &config, cache_ref)?]
    } else if input_path.is_dir() {
        println!("Processing directory: {}", input_path.display());
        let image_files = get_image_files_in_dir(&input_path)?;
        println!("Found {} image files", image_files.len());

        let run = |path: &PathBuf| -> Option<ImageReport> {
            println!("Processing: {}", path.display());
            let result = load_image(path).and_then(|input| process_image(input, &config, cache_ref));
            match result {
                Ok(report) => Some(report),
                Err(e) => {
                    error!("Failed on {}: {}", path.display(), e);
                    None
                }
            }
        };

        if config.use_parallel {
            image_files.par_iter().filter_map(run).collect()
        } else {
            image_files.iter().filter_map(run).collect()
        }
    } else {
        bail!("Input path {} is neither a file nor a directory", input_path.display());
    };

    let summary_path = PathBuf::from(&config.output_base_dir).join("summary.csv");
    write_summary_csv(&reports, &summary_path)
        .with_context(|| format!("writing {}", summary_path.display()))?;
    println!("Summary of {} images written to {}", reports.len(), summary_path.display());

    if config.save_comparison && reports.len() > 1 {
        let sheet_path = PathBuf::from(&config.output_base_dir).join("comparison.png");
        if let Some(path) = write_comparison_sheet(&reports, &sheet_path)
            .with_context(|| format!("writing {}", sheet_path.display()))?
        {
            println!("Comparison sheet written to {}", path.display());
        }
    }

    let elapsed = start_time.elapsed();
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
