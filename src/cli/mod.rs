//! Command-line interface for the calibration pipeline.

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::DisplayMode;
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "astigmatism-calibration")]
#[command(about = "Astigmatism calibration from microsphere localizations", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the calibration curve from a localization file
    Calibrate(CalibrateArgs),

    /// Write the default configuration as YAML
    InitConfig {
        /// Destination of the YAML file
        path: PathBuf,
    },
}

/// Overrides for values read from the config file.
#[derive(Args, Debug, Default)]
struct CalibrateArgs {
    /// Localization file (x y width_x width_y, nm)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// X coordinate of the sphere center (nm)
    #[arg(long, allow_negative_numbers = true)]
    center_x: Option<f64>,

    /// Y coordinate of the sphere center (nm)
    #[arg(long, allow_negative_numbers = true)]
    center_y: Option<f64>,

    /// Sphere radius (nm)
    #[arg(short, long)]
    radius: Option<f64>,

    /// 0 = none, 1 = point cloud, 2 = averaged curve, 3 = molecule counts
    #[arg(short, long, value_parser = parse_display_mode)]
    display: Option<DisplayMode>,

    /// Full width of the depth averaging window (nm)
    #[arg(long)]
    averaging_width: Option<f64>,

    /// Axial range of the calibration (nm)
    #[arg(long)]
    depth_range: Option<f64>,

    /// Upper bound on fitted widths (nm)
    #[arg(long)]
    max_width: Option<f64>,

    /// Calibration table output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write per-bin statistics CSV here
    #[arg(long)]
    statistics: Option<PathBuf>,

    /// Also write every reprojected localization as CSV here
    #[arg(long)]
    records: Option<PathBuf>,

    /// Plot output path (PNG)
    #[arg(long)]
    plot: Option<PathBuf>,
}

impl CalibrateArgs {
    /// Apply command-line overrides on top of `config`.
    fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(path) = self.input {
            config.input.path = path;
        }
        if let Some(x) = self.center_x {
            config.sphere.center[0] = x;
        }
        if let Some(y) = self.center_y {
            config.sphere.center[1] = y;
        }
        if let Some(radius) = self.radius {
            config.sphere.radius = radius;
        }
        if let Some(mode) = self.display {
            config.display.mode = mode;
        }
        if let Some(width) = self.averaging_width {
            config.averaging.averaging_width = width;
        }
        if let Some(range) = self.depth_range {
            config.averaging.depth_range = range;
        }
        if let Some(max_width) = self.max_width {
            config.filter.max_width = max_width;
        }
        if let Some(path) = self.output {
            config.output.calibration_path = path;
        }
        if self.statistics.is_some() {
            config.output.statistics_path = self.statistics;
        }
        if self.records.is_some() {
            config.output.records_path = self.records;
        }
        if let Some(path) = self.plot {
            config.display.plot_path = path;
        }
        config
    }
}

/// Parse `--display` through the same integer mapping the config file uses.
fn parse_display_mode(value: &str) -> Result<DisplayMode, String> {
    let code: u8 = value
        .parse()
        .map_err(|_| format!("expected 0, 1, 2 or 3, got '{}'", value))?;
    DisplayMode::try_from(code).map_err(|e| e.to_string())
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<60} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 37 {
            let head: String = value.chars().take(34).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<37} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config; an unreadable file is fatal
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                error!("Failed to load config from {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Calibrate(args) => {
            cmd_calibrate(args.apply(config));
        }
        Commands::InitConfig { path } => {
            cmd_init_config(&path, &config);
        }
    }
}

fn cmd_calibrate(config: PipelineConfig) {
    use crate::processors::calibration;

    let start = Instant::now();

    println!("Building astigmatism calibration...");
    println!("Input: {}", config.input.path.display());
    println!(
        "Sphere: center ({}, {}) nm, radius {} nm",
        config.sphere.center[0], config.sphere.center[1], config.sphere.radius
    );
    println!(
        "Averaging: window {} nm over {} nm",
        config.averaging.averaging_width, config.averaging.depth_range
    );

    let spinner = create_spinner("Averaging PSF widths over depth...");

    match calibration::run_calibration(&config) {
        Ok(report) => {
            spinner.finish_and_clear();

            let optional = |p: &Option<PathBuf>| {
                p.as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string())
            };

            print_summary(
                "Calibration Complete",
                &[
                    ("Input file", config.input.path.display().to_string()),
                    ("Localizations", report.loaded.to_string()),
                    ("Inside sphere", report.retained.to_string()),
                    (
                        "Depth bins",
                        format!("{} ({} populated)", report.bins, report.populated_bins),
                    ),
                    ("Calibration table", report.calibration_path.display().to_string()),
                    ("Bin statistics", optional(&report.statistics_path)),
                    ("Records", optional(&report.records_path)),
                    ("Display", config.display.mode.to_string()),
                    ("Plot", optional(&report.plot_path)),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
            println!("Done");
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Calibration failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_init_config(path: &Path, config: &PipelineConfig) {
    match config.to_yaml(path) {
        Ok(()) => println!("Wrote configuration to {}", path.display()),
        Err(e) => {
            error!("Failed to write config to {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}
