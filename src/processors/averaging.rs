//! Sliding-window averaging of PSF widths over depth.
//!
//! One bin per integer depth sample `d` in `[0, depth_range)`. A record at
//! depth `z` contributes to bin `d` iff `|z - d| < averaging_width / 2`, so
//! neighbouring windows overlap whenever the width exceeds 1 nm. Bins are
//! computed in parallel; each one only reads the shared record slice.

use log::{debug, warn};
use rayon::prelude::*;

use crate::core::transforms::DerivedRecord;

/// Mean and standard error of one quantity over a set of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinStatistics {
    pub mean: f64,
    /// Population standard deviation divided by sqrt(count).
    pub standard_error: f64,
}

/// The three width channels tracked for each bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthTriple {
    pub width_x: f64,
    pub width_y: f64,
    pub width_diff: f64,
}

impl WidthTriple {
    pub const NAN: WidthTriple = WidthTriple {
        width_x: f64::NAN,
        width_y: f64::NAN,
        width_diff: f64::NAN,
    };
}

/// Averaged widths for one depth sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBin {
    pub depth: f64,
    pub mean: WidthTriple,
    pub uncertainty: WidthTriple,
    /// Number of records inside the window.
    pub count: usize,
}

impl DepthBin {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Depth bins in increasing depth order.
#[derive(Debug, Clone, Default)]
pub struct CalibrationCurve {
    pub bins: Vec<DepthBin>,
}

impl CalibrationCurve {
    #[inline]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Number of bins with at least one contributing record.
    pub fn populated_bins(&self) -> usize {
        self.bins.iter().filter(|b| !b.is_empty()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DepthBin> {
        self.bins.iter()
    }
}

/// Number of integer depth samples in `[0, depth_range)`.
#[inline]
pub fn sample_count(depth_range: f64) -> usize {
    if depth_range > 0.0 {
        depth_range.ceil() as usize
    } else {
        0
    }
}

/// Mean and standard error of `values`; NaN for both when empty.
pub fn bin_statistics(values: &[f64]) -> BinStatistics {
    if values.is_empty() {
        return BinStatistics {
            mean: f64::NAN,
            standard_error: f64::NAN,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

    BinStatistics {
        mean,
        standard_error: variance.sqrt() / n.sqrt(),
    }
}

/// Returns true if a record at `depth` falls in the window centered on `center`.
#[inline]
pub fn in_window(depth: f64, center: f64, averaging_width: f64) -> bool {
    (depth - center).abs() < averaging_width / 2.0
}

/// Average one window centered on `depth`.
pub fn average_bin(records: &[DerivedRecord], depth: f64, averaging_width: f64) -> DepthBin {
    let window: Vec<&DerivedRecord> = records
        .iter()
        .filter(|r| in_window(r.depth, depth, averaging_width))
        .collect();

    if window.is_empty() {
        return DepthBin {
            depth,
            mean: WidthTriple::NAN,
            uncertainty: WidthTriple::NAN,
            count: 0,
        };
    }

    let wx: Vec<f64> = window.iter().map(|r| r.width_x).collect();
    let wy: Vec<f64> = window.iter().map(|r| r.width_y).collect();
    let wd: Vec<f64> = window.iter().map(|r| r.width_diff).collect();

    let (sx, sy, sd) = (bin_statistics(&wx), bin_statistics(&wy), bin_statistics(&wd));

    DepthBin {
        depth,
        mean: WidthTriple {
            width_x: sx.mean,
            width_y: sy.mean,
            width_diff: sd.mean,
        },
        uncertainty: WidthTriple {
            width_x: sx.standard_error,
            width_y: sy.standard_error,
            width_diff: sd.standard_error,
        },
        count: window.len(),
    }
}

/// Build the calibration curve: one averaged bin per integer depth sample.
///
/// # Arguments
///
/// * `records` - Reprojected localizations
/// * `depth_range` - Axial range; samples are 0, 1, ... below this value
/// * `averaging_width` - Full width of the centered window
pub fn average_depth_bins(
    records: &[DerivedRecord],
    depth_range: f64,
    averaging_width: f64,
) -> CalibrationCurve {
    let n_samples = sample_count(depth_range);

    let bins: Vec<DepthBin> = (0..n_samples)
        .into_par_iter()
        .map(|k| average_bin(records, k as f64, averaging_width))
        .collect();

    let curve = CalibrationCurve { bins };
    let populated = curve.populated_bins();

    debug!(
        "Averaged {} records into {} depth bins ({} populated, window {} nm)",
        records.len(),
        n_samples,
        populated,
        averaging_width
    );

    if populated < n_samples {
        warn!(
            "{} of {} depth bins have no localizations and are reported as NaN",
            n_samples - populated,
            n_samples
        );
    }

    curve
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(depth: f64, wx: f64, wy: f64) -> DerivedRecord {
        DerivedRecord {
            radial_distance: 0.0,
            sphere_radius: 7500.0,
            depth,
            width_x: wx,
            width_y: wy,
            width_diff: wx - wy,
        }
    }

    #[test]
    fn test_sample_count() {
        assert_eq!(sample_count(800.0), 800);
        assert_eq!(sample_count(800.5), 801);
        assert_eq!(sample_count(1.0), 1);
        assert_eq!(sample_count(0.0), 0);
    }

    #[test]
    fn test_bin_statistics_population_std() {
        let stats = bin_statistics(&[0.0, 20.0]);
        assert_eq!(stats.mean, 10.0);
        // population std = 10, divided by sqrt(2)
        assert!((stats.standard_error - 10.0 / 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_bin_statistics_identical_values() {
        let stats = bin_statistics(&[42.0; 7]);
        assert_eq!(stats.mean, 42.0);
        assert_eq!(stats.standard_error, 0.0);
    }

    #[test]
    fn test_bin_statistics_empty() {
        let stats = bin_statistics(&[]);
        assert!(stats.mean.is_nan());
        assert!(stats.standard_error.is_nan());
    }

    #[test]
    fn test_window_is_centered() {
        let records = vec![record(100.0, 300.0, 200.0)];
        let curve = average_depth_bins(&records, 200.0, 50.0);

        for bin in curve.iter() {
            let d = bin.depth as usize;
            let expected = (76..=124).contains(&d);
            assert_eq!(bin.count == 1, expected, "bin {}", d);
        }
        assert_eq!(curve.bins[75].count, 0);
        assert_eq!(curve.bins[125].count, 0);
        assert_eq!(curve.bins[76].mean.width_diff, 100.0);
    }

    #[test]
    fn test_order_independence() {
        let records: Vec<DerivedRecord> = (0..50)
            .map(|i| {
                let f = i as f64;
                record((f * 7.3) % 40.0, 200.0 + f, 250.0 - 2.0 * f)
            })
            .collect();
        let mut reversed = records.clone();
        reversed.reverse();

        let a = average_depth_bins(&records, 40.0, 10.0);
        let b = average_depth_bins(&reversed, 40.0, 10.0);

        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.count, y.count);
            assert!((x.mean.width_x - y.mean.width_x).abs() < 1e-9);
            assert!((x.mean.width_diff - y.mean.width_diff).abs() < 1e-9);
            assert!((x.uncertainty.width_y - y.uncertainty.width_y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_bins_are_nan() {
        let curve = average_depth_bins(&[], 10.0, 50.0);

        assert_eq!(curve.len(), 10);
        assert_eq!(curve.populated_bins(), 0);
        for bin in curve.iter() {
            assert_eq!(bin.count, 0);
            assert!(bin.mean.width_x.is_nan());
            assert!(bin.mean.width_diff.is_nan());
            assert!(bin.uncertainty.width_y.is_nan());
        }
    }

    #[test]
    fn test_bins_in_increasing_depth() {
        let curve = average_depth_bins(&[record(3.0, 1.0, 1.0)], 25.0, 4.0);
        let depths: Vec<f64> = curve.iter().map(|b| b.depth).collect();
        let expected: Vec<f64> = (0..25).map(|d| d as f64).collect();
        assert_eq!(depths, expected);
    }

    #[test]
    fn test_uncertainty_per_channel() {
        let records = vec![record(0.0, 100.0, 100.0), record(0.0, 100.0, 80.0)];
        let bin = average_bin(&records, 0.0, 50.0);

        assert_eq!(bin.count, 2);
        assert_eq!(bin.mean.width_x, 100.0);
        assert_eq!(bin.mean.width_y, 90.0);
        assert_eq!(bin.mean.width_diff, 10.0);
        assert_eq!(bin.uncertainty.width_x, 0.0);
        assert!((bin.uncertainty.width_y - 10.0 / 2f64.sqrt()).abs() < 1e-12);
    }
}
