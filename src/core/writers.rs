//! Writers for the calibration table and its companion CSV exports.
//!
//! - Calibration table: space-delimited, one `#` header line, one row per depth bin
//! - Bin statistics CSV: means, standard errors and counts per bin
//! - Derived records CSV: every reprojected localization

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::transforms::DerivedRecord;
use crate::processors::averaging::CalibrationCurve;

/// Header line of the calibration table.
pub const CALIBRATION_HEADER: &str =
    "# Format: depth // width_x // width_y // width_x - width_y (all values in nm)";

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path, truncating any existing file.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

fn create_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    ensure_parent_dirs(path)?;
    Ok(csv::Writer::from_writer(create_buffered_writer(path)?))
}

/// Write the calibration table.
///
/// One header line, then `depth width_x width_y width_diff` per bin in
/// increasing depth. Empty bins are written as `NaN`. An existing file at
/// `path` is overwritten.
///
/// # Example
///
/// ```no_run
/// use astigmatism_calibration::core::writers::write_calibration_table;
/// use astigmatism_calibration::processors::averaging::CalibrationCurve;
/// use std::path::Path;
///
/// let curve = CalibrationCurve::default();
/// write_calibration_table(Path::new("Results_calibration_astigmatism.txt"), &curve).unwrap();
/// ```
pub fn write_calibration_table(path: &Path, curve: &CalibrationCurve) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;
    let path_str = path.display().to_string();
    let io_err = |e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    };

    writeln!(writer, "{}", CALIBRATION_HEADER).map_err(io_err)?;

    for bin in curve.iter() {
        writeln!(
            writer,
            "{:.1} {:.6} {:.6} {:.6}",
            bin.depth, bin.mean.width_x, bin.mean.width_y, bin.mean.width_diff
        )
        .map_err(io_err)?;
    }

    writer.flush().map_err(io_err)?;

    Ok(())
}

/// Write per-bin means, standard errors and counts to CSV.
pub fn write_bin_statistics_csv(path: &Path, curve: &CalibrationCurve) -> Result<()> {
    let mut csv_writer = create_csv_writer(path)?;
    let path_str = path.display().to_string();
    let csv_err = |e| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer
        .write_record([
            "depth",
            "width_x",
            "width_y",
            "width_diff",
            "sem_x",
            "sem_y",
            "sem_diff",
            "count",
        ])
        .map_err(csv_err)?;

    for bin in curve.iter() {
        csv_writer
            .write_record(&[
                format!("{:.1}", bin.depth),
                format!("{:.6}", bin.mean.width_x),
                format!("{:.6}", bin.mean.width_y),
                format!("{:.6}", bin.mean.width_diff),
                format!("{:.6}", bin.uncertainty.width_x),
                format!("{:.6}", bin.uncertainty.width_y),
                format!("{:.6}", bin.uncertainty.width_diff),
                bin.count.to_string(),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}

/// Write every reprojected localization to CSV.
pub fn write_derived_records_csv(path: &Path, records: &[DerivedRecord]) -> Result<()> {
    let mut csv_writer = create_csv_writer(path)?;
    let path_str = path.display().to_string();
    let csv_err = |e| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer
        .write_record([
            "radial_distance",
            "sphere_radius",
            "depth",
            "width_x",
            "width_y",
            "width_diff",
        ])
        .map_err(csv_err)?;

    for r in records {
        csv_writer
            .write_record(&[
                format!("{:.6}", r.radial_distance),
                format!("{:.6}", r.sphere_radius),
                format!("{:.6}", r.depth),
                format!("{:.6}", r.width_x),
                format!("{:.6}", r.width_y),
                format!("{:.6}", r.width_diff),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}
