//! Loader for whitespace-delimited localization tables.
//!
//! Each data row holds at least four numeric fields: `x y width_x width_y`,
//! all in nanometers. Extra columns are ignored. Blank lines and lines
//! starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Number of leading columns every data row must provide.
pub const REQUIRED_COLUMNS: usize = 4;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Line {line}: expected at least 4 columns, found {found}")]
    MissingColumns { line: usize, found: usize },

    #[error("Line {line}: invalid number '{value}'")]
    ParseError { line: usize, value: String },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// One detected fluorophore: position and fitted PSF widths (nm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Localization {
    pub x: f64,
    pub y: f64,
    pub width_x: f64,
    pub width_y: f64,
}

impl Localization {
    pub fn new(x: f64, y: f64, width_x: f64, width_y: f64) -> Self {
        Self {
            x,
            y,
            width_x,
            width_y,
        }
    }
}

/// In-memory localization table.
#[derive(Debug, Clone, Default)]
pub struct LocalizationTable {
    /// Rows in file order.
    pub records: Vec<Localization>,
    /// Source file path.
    pub source_path: Option<PathBuf>,
}

impl LocalizationTable {
    /// Creates a table from records that did not come from a file.
    pub fn from_records(records: Vec<Localization>) -> Self {
        Self {
            records,
            source_path: None,
        }
    }

    /// Returns the number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Localization> {
        self.records.iter()
    }
}

/// Load a localization table from a whitespace-delimited text file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a row has fewer than four
/// columns or a non-numeric field, or the file holds no data rows.
pub fn load_localizations<P: AsRef<Path>>(path: P) -> Result<LocalizationTable> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let records = parse_localizations(BufReader::new(file))?;
    if records.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    log::debug!("Loaded {} localizations from {}", records.len(), path.display());

    Ok(LocalizationTable {
        records,
        source_path: Some(path.to_path_buf()),
    })
}

/// Parse localization rows from any buffered reader.
///
/// Line numbers in errors are 1-based.
pub fn parse_localizations<R: BufRead>(reader: R) -> Result<Vec<Localization>> {
    let mut records = Vec::with_capacity(4096);

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let stripped = line.trim();

        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = stripped.split_whitespace().collect();
        if fields.len() < REQUIRED_COLUMNS {
            return Err(LoaderError::MissingColumns {
                line: line_no,
                found: fields.len(),
            });
        }

        let mut values = [0.0f64; REQUIRED_COLUMNS];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field.parse().map_err(|_| LoaderError::ParseError {
                line: line_no,
                value: field.to_string(),
            })?;
        }

        let [x, y, width_x, width_y] = values;
        records.push(Localization::new(x, y, width_x, width_y));
    }

    Ok(records)
}
