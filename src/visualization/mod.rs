//! Calibration plots rendered to PNG with plotters.
//!
//! Three views are available, selected by [`DisplayMode`]:
//! the raw point cloud, the averaged curve with error bars, and the number
//! of localizations per depth sample. NaN bins are skipped and empty inputs
//! produce empty axes.

use std::path::{Path, PathBuf};

use log::info;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::DisplayMode;
use crate::core::transforms::DerivedRecord;
use crate::processors::averaging::CalibrationCurve;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
const DEFAULT_WIDTH: u32 = 1280;

/// Default plot height in pixels.
const DEFAULT_HEIGHT: u32 = 800;

const WIDTH_X_COLOR: RGBColor = RGBColor(0, 128, 0);
const WIDTH_Y_COLOR: RGBColor = BLUE;
const WIDTH_DIFF_COLOR: RGBColor = RED;

/// Width channel of the averaged curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthChannel {
    X,
    Y,
    Diff,
}

impl WidthChannel {
    pub const ALL: [WidthChannel; 3] = [WidthChannel::X, WidthChannel::Y, WidthChannel::Diff];

    fn label(self) -> &'static str {
        match self {
            WidthChannel::X => "w_x",
            WidthChannel::Y => "w_y",
            WidthChannel::Diff => "w_x - w_y",
        }
    }

    fn color(self) -> RGBColor {
        match self {
            WidthChannel::X => WIDTH_X_COLOR,
            WidthChannel::Y => WIDTH_Y_COLOR,
            WidthChannel::Diff => WIDTH_DIFF_COLOR,
        }
    }
}

/// One error-bar point: (depth, mean - sem, mean, mean + sem).
pub type ErrorBarPoint = (f64, f64, f64, f64);

/// Error-bar points for one channel, skipping empty (NaN) bins.
pub fn error_bar_points(curve: &CalibrationCurve, channel: WidthChannel) -> Vec<ErrorBarPoint> {
    curve
        .iter()
        .filter_map(|bin| {
            let (mean, sem) = match channel {
                WidthChannel::X => (bin.mean.width_x, bin.uncertainty.width_x),
                WidthChannel::Y => (bin.mean.width_y, bin.uncertainty.width_y),
                WidthChannel::Diff => (bin.mean.width_diff, bin.uncertainty.width_diff),
            };
            (mean.is_finite() && sem.is_finite())
                .then_some((bin.depth, mean - sem, mean, mean + sem))
        })
        .collect()
}

/// (depth, width_diff) for every record with a finite depth.
pub fn point_cloud_points(records: &[DerivedRecord]) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter(|r| r.depth.is_finite() && r.width_diff.is_finite())
        .map(|r| (r.depth, r.width_diff))
        .collect()
}

/// (depth, count) for every bin.
pub fn molecule_count_points(curve: &CalibrationCurve) -> Vec<(f64, f64)> {
    curve.iter().map(|b| (b.depth, b.count as f64)).collect()
}

/// Render the plot selected by `mode`.
///
/// Returns the written PNG path, or `None` when `mode` is [`DisplayMode::None`].
pub fn render(
    mode: DisplayMode,
    output_path: &Path,
    records: &[DerivedRecord],
    curve: &CalibrationCurve,
    depth_range: f64,
) -> Result<Option<PathBuf>> {
    match mode {
        DisplayMode::None => return Ok(None),
        DisplayMode::PointCloud => plot_point_cloud(output_path, records, depth_range)?,
        DisplayMode::AveragedCurve => plot_averaged_curve(output_path, curve, depth_range)?,
        DisplayMode::MoleculeCounts => plot_molecule_counts(output_path, curve, depth_range)?,
    }

    info!("Rendered {} plot to {}", mode, output_path.display());
    Ok(Some(output_path.to_path_buf()))
}

fn plotting_error<E: std::fmt::Display>(e: E) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Scatter of width difference against depth, x axis clamped to [0, depth_range].
pub fn plot_point_cloud(output_path: &Path, records: &[DerivedRecord], depth_range: f64) -> Result<()> {
    let points = point_cloud_points(records);
    let (y_min, y_max) = padded_bounds(points.iter().map(|p| p.1));

    ensure_parent_dirs(output_path)?;
    let root = BitMapBackend::new(output_path, (DEFAULT_WIDTH, DEFAULT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plotting_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..depth_range, y_min..y_max)
        .map_err(plotting_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Depth (nm)")
        .y_desc("PSF width (nm)")
        .draw()
        .map_err(plotting_error)?;

    chart
        .draw_series(
            points
                .iter()
                .filter(|(x, _)| (0.0..=depth_range).contains(x))
                .map(|&(x, y)| Cross::new((x, y), 3, WIDTH_DIFF_COLOR)),
        )
        .map_err(plotting_error)?
        .label(WidthChannel::Diff.label())
        .legend(|(x, y)| Cross::new((x + 10, y), 3, WIDTH_DIFF_COLOR));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plotting_error)?;

    root.present().map_err(plotting_error)?;

    Ok(())
}

/// Averaged widths with standard-error bars for all three channels.
pub fn plot_averaged_curve(output_path: &Path, curve: &CalibrationCurve, depth_range: f64) -> Result<()> {
    let series: Vec<(WidthChannel, Vec<ErrorBarPoint>)> = WidthChannel::ALL
        .iter()
        .map(|&channel| (channel, error_bar_points(curve, channel)))
        .collect();

    let (y_min, y_max) = padded_bounds(
        series
            .iter()
            .flat_map(|(_, pts)| pts.iter().flat_map(|&(_, lo, _, hi)| [lo, hi])),
    );

    ensure_parent_dirs(output_path)?;
    let root = BitMapBackend::new(output_path, (DEFAULT_WIDTH, DEFAULT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plotting_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..depth_range.max(1.0), y_min..y_max)
        .map_err(plotting_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Depth (nm)")
        .y_desc("PSF width (nm)")
        .draw()
        .map_err(plotting_error)?;

    for (channel, points) in &series {
        let color = channel.color();

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, lo, mean, hi)| ErrorBar::new_vertical(x, lo, mean, hi, color.filled(), 4)),
            )
            .map_err(plotting_error)?;

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|&(x, _, mean, _)| (x, mean)),
                color.stroke_width(3),
            ))
            .map_err(plotting_error)?
            .label(channel.label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plotting_error)?;

    root.present().map_err(plotting_error)?;

    Ok(())
}

/// Number of localizations contributing to each depth sample.
pub fn plot_molecule_counts(output_path: &Path, curve: &CalibrationCurve, depth_range: f64) -> Result<()> {
    let points = molecule_count_points(curve);
    let y_max = points.iter().map(|p| p.1).fold(0.0, f64::max).max(1.0) * 1.05;

    ensure_parent_dirs(output_path)?;
    let root = BitMapBackend::new(output_path, (DEFAULT_WIDTH, DEFAULT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plotting_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..depth_range.max(1.0), 0.0..y_max)
        .map_err(plotting_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Depth (nm)")
        .y_desc("Number of molecules detected")
        .draw()
        .map_err(plotting_error)?;

    chart
        .draw_series(LineSeries::new(points, BLACK.stroke_width(3)))
        .map_err(plotting_error)?;

    root.present().map_err(plotting_error)?;

    Ok(())
}

/// Min/max of the finite values with 5% padding; (-1, 1) when there are none.
fn padded_bounds<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let mut min = f64::MAX;
    let mut max = f64::MIN;

    for v in values.into_iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }

    if min > max {
        return (-1.0, 1.0);
    }
    if (max - min).abs() < f64::EPSILON {
        min -= 1.0;
        max += 1.0;
    }

    let padding = (max - min) * 0.05;
    (min - padding, max + padding)
}
