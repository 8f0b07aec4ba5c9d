//! Core data types and I/O operations.

pub mod loaders;
pub mod transforms;
pub mod writers;

pub use loaders::{load_localizations, Localization, LoaderError, LocalizationTable};
pub use transforms::{reproject, sphere_cap_depth, DerivedRecord};
pub use writers::{
    write_bin_statistics_csv, write_calibration_table, write_derived_records_csv, WriteError,
};
