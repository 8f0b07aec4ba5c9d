//! Data processing modules.

pub mod averaging;
pub mod calibration;
pub mod filtering;

// Re-export key types for convenience
pub use averaging::{
    average_depth_bins, bin_statistics, sample_count, BinStatistics, CalibrationCurve, DepthBin,
    WidthTriple,
};
pub use calibration::{calibrate, run_calibration, CalibrationReport, CalibrationResult};
pub use filtering::{filter_localizations, filter_one, passes_filter, FilteredLocalization};
