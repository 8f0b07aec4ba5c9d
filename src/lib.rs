//! Astigmatism calibration for 3D single-molecule localization microscopy.
//!
//! This crate turns localizations recorded on a fluorophore-coated
//! microsphere into a depth-to-PSF-width calibration curve:
//! - Loading whitespace-delimited localization tables (x, y, width_x, width_y)
//! - Filtering to the projected sphere disk and sane PSF widths
//! - Reprojecting planar positions to depth on the sphere surface
//! - Sliding-window averaging of widths over depth (parallelized)
//! - Exporting the calibration table and plotting the result
//!
//! # Example
//!
//! ```no_run
//! use astigmatism_calibration::{core::loaders::load_localizations, processors::calibration::calibrate};
//! use astigmatism_calibration::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! let table = load_localizations(&config.input.path).unwrap();
//! let result = calibrate(&table, &config);
//! println!("{} depth bins", result.curve.len());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{
    AveragingConfig, DisplayConfig, DisplayMode, FilterConfig, InputConfig, OutputConfig,
    PipelineConfig, SphereConfig,
};
pub use core::loaders::{Localization, LocalizationTable};
pub use processors::averaging::{CalibrationCurve, DepthBin};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
