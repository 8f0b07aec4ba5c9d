//! Sphere-surface reprojection of filtered localizations.
//!
//! Fluorophores coat a sphere of known radius resting on the coverslip, so a
//! localization at planar distance `r` from the projected center sits at a
//! height `R - sqrt(R^2 - r^2)` above the tangent plane. That height is the
//! depth against which the PSF widths are calibrated.

use rayon::prelude::*;

use crate::processors::filtering::FilteredLocalization;

/// A localization with its reconstructed depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedRecord {
    /// Planar distance to the projected sphere center (nm).
    pub radial_distance: f64,
    /// Radius of the sphere the record was projected onto (nm).
    pub sphere_radius: f64,
    /// Height above the sphere's tangent plane (nm).
    pub depth: f64,
    pub width_x: f64,
    pub width_y: f64,
    /// `width_x - width_y`, the astigmatism signal.
    pub width_diff: f64,
}

/// Spherical-cap height at planar distance `radial_distance` from the center.
///
/// The radicand is clamped at zero so rounding right at the rim yields a
/// depth of `radius` instead of NaN.
#[inline]
pub fn sphere_cap_depth(radial_distance: f64, radius: f64) -> f64 {
    let radicand = (radius * radius - radial_distance * radial_distance).max(0.0);
    radius - radicand.sqrt()
}

/// Map each filtered localization to depth on a sphere of `radius`.
///
/// Output order follows input order.
pub fn reproject(filtered: &[FilteredLocalization], radius: f64) -> Vec<DerivedRecord> {
    filtered
        .par_iter()
        .map(|f| {
            let radial_distance = f.squared_distance.sqrt();
            DerivedRecord {
                radial_distance,
                sphere_radius: radius,
                depth: sphere_cap_depth(radial_distance, radius),
                width_x: f.record.width_x,
                width_y: f.record.width_y,
                width_diff: f.record.width_x - f.record.width_y,
            }
        })
        .collect()
}
