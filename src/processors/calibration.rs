//! End-to-end calibration: load, filter, reproject, average, export, plot.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::config::PipelineConfig;
use crate::core::loaders::{load_localizations, LocalizationTable};
use crate::core::transforms::{reproject, DerivedRecord};
use crate::core::writers::{
    write_bin_statistics_csv, write_calibration_table, write_derived_records_csv,
};
use crate::processors::averaging::{average_depth_bins, CalibrationCurve};
use crate::processors::filtering::filter_localizations;
use crate::visualization;

/// In-memory result of one calibration.
#[derive(Debug, Clone)]
pub struct CalibrationResult {
    /// Rows in the input table.
    pub loaded: usize,
    /// Localizations that passed the filter, with their depth.
    pub records: Vec<DerivedRecord>,
    pub curve: CalibrationCurve,
}

/// What a file-level run produced.
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub loaded: usize,
    pub retained: usize,
    pub bins: usize,
    pub populated_bins: usize,
    pub calibration_path: PathBuf,
    pub statistics_path: Option<PathBuf>,
    pub records_path: Option<PathBuf>,
    pub plot_path: Option<PathBuf>,
}

/// Filter, reproject and average a loaded table. Touches no files.
pub fn calibrate(table: &LocalizationTable, config: &PipelineConfig) -> CalibrationResult {
    let sphere = &config.sphere;

    let filtered = filter_localizations(table, sphere.center, sphere.radius, config.filter.max_width);
    let records = reproject(&filtered, sphere.radius);
    let curve = average_depth_bins(
        &records,
        config.averaging.depth_range,
        config.averaging.averaging_width,
    );

    CalibrationResult {
        loaded: table.len(),
        records,
        curve,
    }
}

/// Run the whole calibration described by `config`.
///
/// Nothing is written if the configuration is invalid or the input cannot
/// be loaded.
pub fn run_calibration(config: &PipelineConfig) -> Result<CalibrationReport> {
    config.validate().context("Invalid configuration")?;

    let input = &config.input.path;
    let table = load_localizations(input)
        .with_context(|| format!("Failed to load localizations from {}", input.display()))?;
    info!("Loaded {} localizations from {}", table.len(), input.display());

    let result = calibrate(&table, config);
    info!(
        "{} localizations inside the sphere disk, {} of {} depth bins populated",
        result.records.len(),
        result.curve.populated_bins(),
        result.curve.len()
    );

    let output = &config.output;
    write_calibration_table(&output.calibration_path, &result.curve).with_context(|| {
        format!(
            "Failed to write calibration table to {}",
            output.calibration_path.display()
        )
    })?;
    info!("Wrote calibration table to {}", output.calibration_path.display());

    if let Some(path) = &output.statistics_path {
        write_bin_statistics_csv(path, &result.curve)
            .with_context(|| format!("Failed to write bin statistics to {}", path.display()))?;
        info!("Wrote bin statistics to {}", path.display());
    }

    if let Some(path) = &output.records_path {
        write_derived_records_csv(path, &result.records)
            .with_context(|| format!("Failed to write reprojected records to {}", path.display()))?;
        info!("Wrote reprojected records to {}", path.display());
    }

    let plot_path = visualization::render(
        config.display.mode,
        &config.display.plot_path,
        &result.records,
        &result.curve,
        config.averaging.depth_range,
    )
    .with_context(|| format!("Failed to render {} plot", config.display.mode))?;

    Ok(CalibrationReport {
        loaded: result.loaded,
        retained: result.records.len(),
        bins: result.curve.len(),
        populated_bins: result.curve.populated_bins(),
        calibration_path: output.calibration_path.clone(),
        statistics_path: output.statistics_path.clone(),
        records_path: output.records_path.clone(),
        plot_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayMode;
    use crate::core::loaders::Localization;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    fn sphere_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.sphere.center = [12540.0, 17190.0];
        config.sphere.radius = 7500.0;
        config.averaging.averaging_width = 50.0;
        config.averaging.depth_range = 800.0;
        config.display.mode = DisplayMode::None;
        config
    }

    #[test]
    fn test_calibrate_two_point_example() {
        let table = LocalizationTable::from_records(vec![
            Localization::new(12540.0, 17190.0, 100.0, 100.0),
            Localization::new(12545.0, 17190.0, 100.0, 80.0),
        ]);

        let result = calibrate(&table, &sphere_config());

        assert_eq!(result.loaded, 2);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].depth, 0.0);
        assert!(result.records[1].depth < 0.01);
        assert_eq!(result.records[1].radial_distance, 5.0);

        let bin0 = &result.curve.bins[0];
        assert_eq!(bin0.count, 2);
        assert!((bin0.mean.width_diff - 10.0).abs() < 1e-12);
        assert!((bin0.mean.width_x - 100.0).abs() < 1e-12);
        assert!((bin0.mean.width_y - 90.0).abs() < 1e-12);

        assert_eq!(result.curve.len(), 800);
        // the second record sits just below 0.002 nm, so it still reaches bin 25
        assert_eq!(result.curve.bins[24].count, 2);
        assert_eq!(result.curve.bins[25].count, 1);
        assert_eq!(result.curve.bins[26].count, 0);
        assert!(result.curve.bins[26].mean.width_diff.is_nan());
    }

    #[test]
    fn test_calibrate_with_nothing_retained() {
        let table = LocalizationTable::from_records(vec![Localization::new(0.0, 0.0, 100.0, 100.0)]);

        let result = calibrate(&table, &sphere_config());

        assert!(result.records.is_empty());
        assert_eq!(result.curve.len(), 800);
        assert_eq!(result.curve.populated_bins(), 0);
    }

    #[test]
    fn test_run_calibration_writes_outputs() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("localizations.txt");
        let mut file = fs::File::create(&input).unwrap();
        writeln!(file, "12540 17190 100 100").unwrap();
        writeln!(file, "12545 17190 100 80").unwrap();
        writeln!(file, "0 0 100 100").unwrap();
        drop(file);

        let mut config = sphere_config();
        config.input.path = input;
        config.averaging.depth_range = 100.0;
        config.output.calibration_path = dir.path().join("Results_calibration_astigmatism.txt");
        config.output.statistics_path = Some(dir.path().join("stats.csv"));
        config.output.records_path = Some(dir.path().join("records.csv"));

        let report = run_calibration(&config).unwrap();

        assert_eq!(report.loaded, 3);
        assert_eq!(report.retained, 2);
        assert_eq!(report.bins, 100);
        assert_eq!(report.populated_bins, 26);
        assert!(report.plot_path.is_none());

        let table = fs::read_to_string(&report.calibration_path).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 101);
        assert!(lines[0].starts_with('#'));
        assert_eq!(lines[1], "0.0 100.000000 90.000000 10.000000");
        assert_eq!(lines[100], "99.0 NaN NaN NaN");

        let stats = fs::read_to_string(dir.path().join("stats.csv")).unwrap();
        assert_eq!(stats.lines().count(), 101);
        let records = fs::read_to_string(dir.path().join("records.csv")).unwrap();
        assert_eq!(records.lines().count(), 3);
    }

    #[test]
    fn test_run_calibration_row_count_with_empty_filter() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("localizations.txt");
        fs::write(&input, "0 0 100 100\n1 1 100 100\n").unwrap();

        let mut config = sphere_config();
        config.input.path = input;
        config.averaging.depth_range = 37.0;
        config.output.calibration_path = dir.path().join("out.txt");

        let report = run_calibration(&config).unwrap();

        assert_eq!(report.retained, 0);
        let table = fs::read_to_string(&report.calibration_path).unwrap();
        assert_eq!(table.lines().count(), 38);
    }

    #[test]
    fn test_run_calibration_missing_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut config = sphere_config();
        config.input.path = dir.path().join("missing.txt");
        config.output.calibration_path = dir.path().join("out.txt");

        let result = run_calibration(&config);

        assert!(result.is_err());
        assert!(!config.output.calibration_path.exists());
    }

    #[test]
    fn test_run_calibration_rejects_invalid_config() {
        let dir = tempdir().unwrap();
        let mut config = sphere_config();
        config.sphere.radius = -1.0;
        config.output.calibration_path = dir.path().join("out.txt");

        assert!(run_calibration(&config).is_err());
        assert!(!config.output.calibration_path.exists());
    }
}
