//! Configuration types for the calibration pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Widths at or above this value (nm) are treated as failed fits.
pub const DEFAULT_MAX_WIDTH: f64 = 2000.0;

/// Default name of the exported calibration table.
pub const DEFAULT_CALIBRATION_FILE: &str = "Results_calibration_astigmatism.txt";

/// Errors raised while loading, saving or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid display mode {0}: expected 0, 1, 2 or 3")]
    InvalidDisplayMode(u8),

    #[error("invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Which plot, if any, is rendered after the calibration table is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DisplayMode {
    /// No plot.
    None,
    /// Width difference against depth for every reprojected localization.
    PointCloud,
    /// Averaged widths with standard-error bars.
    #[default]
    AveragedCurve,
    /// Number of localizations contributing to each depth sample.
    MoleculeCounts,
}

impl TryFrom<u8> for DisplayMode {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DisplayMode::None),
            1 => Ok(DisplayMode::PointCloud),
            2 => Ok(DisplayMode::AveragedCurve),
            3 => Ok(DisplayMode::MoleculeCounts),
            other => Err(ConfigError::InvalidDisplayMode(other)),
        }
    }
}

impl From<DisplayMode> for u8 {
    fn from(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::None => 0,
            DisplayMode::PointCloud => 1,
            DisplayMode::AveragedCurve => 2,
            DisplayMode::MoleculeCounts => 3,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplayMode::None => "none",
            DisplayMode::PointCloud => "point cloud",
            DisplayMode::AveragedCurve => "averaged curve",
            DisplayMode::MoleculeCounts => "molecule counts",
        };
        write!(f, "{}", name)
    }
}

/// Location of the localization table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Whitespace-delimited file with x, y, width_x, width_y columns (nm)
    #[serde(default = "default_input_path")]
    pub path: PathBuf,
}

fn default_input_path() -> PathBuf {
    PathBuf::from("Localization_data_astigmatism.txt")
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
        }
    }
}

/// Geometry of the calibration microsphere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SphereConfig {
    /// Projected center of the sphere [x, y] in nm
    #[serde(default = "default_center")]
    pub center: [f64; 2],

    /// Sphere radius in nm, used for both the disk filter and the depth
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_center() -> [f64; 2] {
    [12540.0, 17190.0]
}

fn default_radius() -> f64 {
    7500.0
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            center: default_center(),
            radius: default_radius(),
        }
    }
}

/// Localization sanity filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Upper bound (exclusive) on both fitted widths, in nm
    #[serde(default = "default_max_width")]
    pub max_width: f64,
}

fn default_max_width() -> f64 {
    DEFAULT_MAX_WIDTH
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
        }
    }
}

/// Sliding-window averaging over depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AveragingConfig {
    /// Full width of the centered averaging window (nm)
    #[serde(default = "default_averaging_width")]
    pub averaging_width: f64,

    /// Axial range of the calibration (nm); one sample per nm from 0
    #[serde(default = "default_depth_range")]
    pub depth_range: f64,
}

fn default_averaging_width() -> f64 {
    50.0
}

fn default_depth_range() -> f64 {
    800.0
}

impl Default for AveragingConfig {
    fn default() -> Self {
        Self {
            averaging_width: default_averaging_width(),
            depth_range: default_depth_range(),
        }
    }
}

/// Plot selection and destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub mode: DisplayMode,

    /// PNG written when `mode` is not `None`
    #[serde(default = "default_plot_path")]
    pub plot_path: PathBuf,
}

fn default_plot_path() -> PathBuf {
    PathBuf::from("calibration_plot.png")
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::default(),
            plot_path: default_plot_path(),
        }
    }
}

/// Output files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Calibration table (overwritten if present)
    #[serde(default = "default_calibration_path")]
    pub calibration_path: PathBuf,

    /// Optional CSV with per-bin means, standard errors and counts
    #[serde(default)]
    pub statistics_path: Option<PathBuf>,

    /// Optional CSV with every reprojected localization
    #[serde(default)]
    pub records_path: Option<PathBuf>,
}

fn default_calibration_path() -> PathBuf {
    PathBuf::from(DEFAULT_CALIBRATION_FILE)
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            calibration_path: default_calibration_path(),
            statistics_path: None,
            records_path: None,
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub sphere: SphereConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub averaging: AveragingConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that every numeric parameter is usable by the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("sphere.center[0]", self.sphere.center[0]),
            ("sphere.center[1]", self.sphere.center[1]),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field,
                    value,
                    reason: "must be finite",
                });
            }
        }

        for (field, value) in [
            ("sphere.radius", self.sphere.radius),
            ("filter.max_width", self.filter.max_width),
            ("averaging.averaging_width", self.averaging.averaging_width),
            ("averaging.depth_range", self.averaging.depth_range),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field,
                    value,
                    reason: "must be a positive number",
                });
            }
        }

        Ok(())
    }
}
