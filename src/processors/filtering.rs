//! Disk-containment and width-sanity filtering of localizations.

use log::{debug, warn};

use crate::core::loaders::{Localization, LocalizationTable};

/// A localization that passed the filter, with its squared planar distance
/// to the sphere center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredLocalization {
    pub record: Localization,
    pub squared_distance: f64,
}

/// Squared planar distance between a localization and `center`.
#[inline]
pub fn squared_distance(record: &Localization, center: [f64; 2]) -> f64 {
    let dx = record.x - center[0];
    let dy = record.y - center[1];
    dx * dx + dy * dy
}

/// Check one localization against the disk and width predicate.
///
/// Returns the localization with its squared distance if it lies strictly
/// inside the disk and both widths are strictly below `max_width`.
#[inline]
pub fn filter_one(
    record: &Localization,
    center: [f64; 2],
    radius: f64,
    max_width: f64,
) -> Option<FilteredLocalization> {
    let d2 = squared_distance(record, center);
    let keep = d2 < radius * radius && record.width_x < max_width && record.width_y < max_width;
    keep.then_some(FilteredLocalization {
        record: *record,
        squared_distance: d2,
    })
}

/// Returns true if the localization passes [`filter_one`].
#[inline]
pub fn passes_filter(record: &Localization, center: [f64; 2], radius: f64, max_width: f64) -> bool {
    filter_one(record, center, radius, max_width).is_some()
}

/// Keep localizations inside the projected sphere disk with sane widths.
///
/// Row order is preserved. An empty result is not an error.
///
/// # Arguments
///
/// * `table` - Loaded localizations
/// * `center` - Projected sphere center [x, y] (nm)
/// * `radius` - Sphere radius (nm)
/// * `max_width` - Exclusive upper bound on both widths (nm)
pub fn filter_localizations(
    table: &LocalizationTable,
    center: [f64; 2],
    radius: f64,
    max_width: f64,
) -> Vec<FilteredLocalization> {
    let kept: Vec<FilteredLocalization> = table
        .iter()
        .filter_map(|record| filter_one(record, center, radius, max_width))
        .collect();

    debug!(
        "Filter kept {} of {} localizations (radius {} nm, max width {} nm)",
        kept.len(),
        table.len(),
        radius,
        max_width
    );

    if kept.is_empty() {
        warn!("No localizations inside the sphere disk; the calibration will be empty");
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(f64, f64, f64, f64)]) -> LocalizationTable {
        LocalizationTable::from_records(
            rows.iter()
                .map(|&(x, y, wx, wy)| Localization::new(x, y, wx, wy))
                .collect(),
        )
    }

    #[test]
    fn test_filter_keeps_points_inside_disk() {
        let t = table(&[
            (0.0, 0.0, 100.0, 100.0),
            (3.0, 0.0, 100.0, 100.0),
            (10.0, 0.0, 100.0, 100.0),
        ]);

        let kept = filter_localizations(&t, [0.0, 0.0], 5.0, 2000.0);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].squared_distance, 0.0);
        assert_eq!(kept[1].squared_distance, 9.0);
    }

    #[test]
    fn test_filter_boundary_is_excluded() {
        // (3, 4) lies exactly on a radius-5 circle
        let t = table(&[(3.0, 4.0, 100.0, 100.0), (3.0, 3.9, 100.0, 100.0)]);

        let kept = filter_localizations(&t, [0.0, 0.0], 5.0, 2000.0);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].record.y, 3.9);
    }

    #[test]
    fn test_filter_width_threshold() {
        let t = table(&[
            (0.0, 0.0, 1999.0, 1999.0),
            (0.0, 0.0, 2000.0, 100.0),
            (0.0, 0.0, 100.0, 2000.0),
            (0.0, 0.0, 2500.0, 2500.0),
        ]);

        let kept = filter_localizations(&t, [0.0, 0.0], 5.0, 2000.0);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].record.width_x, 1999.0);
    }

    #[test]
    fn test_filter_matches_predicate() {
        let center = [12540.0, 17190.0];
        let radius = 7500.0;
        let rows: Vec<(f64, f64, f64, f64)> = (0..200)
            .map(|i| {
                let f = i as f64;
                (
                    center[0] + (f * 97.0) % 16000.0 - 8000.0,
                    center[1] + (f * 53.0) % 16000.0 - 8000.0,
                    (f * 31.0) % 2500.0,
                    (f * 17.0) % 2500.0,
                )
            })
            .collect();
        let t = table(&rows);

        let kept = filter_localizations(&t, center, radius, 2000.0);
        let expected: Vec<FilteredLocalization> = t
            .iter()
            .filter_map(|r| filter_one(r, center, radius, 2000.0))
            .collect();
        assert_eq!(kept, expected);
        assert!(!kept.is_empty());

        for record in t.iter() {
            assert_eq!(
                passes_filter(record, center, radius, 2000.0),
                filter_one(record, center, radius, 2000.0).is_some()
            );
        }
    }

    #[test]
    fn test_filter_one_boundary_cases() {
        let center = [0.0, 0.0];

        // (3, 4) lies exactly on a radius-5 circle
        assert_eq!(filter_one(&Localization::new(3.0, 4.0, 100.0, 100.0), center, 5.0, 2000.0), None);
        assert!(!passes_filter(&Localization::new(3.0, 4.0, 100.0, 100.0), center, 5.0, 2000.0));

        let inside = Localization::new(3.0, 3.9, 100.0, 100.0);
        let kept = filter_one(&inside, center, 5.0, 2000.0).unwrap();
        assert_eq!(kept.record, inside);
        assert!((kept.squared_distance - (9.0 + 3.9 * 3.9)).abs() < 1e-12);
        assert!(passes_filter(&inside, center, 5.0, 2000.0));

        let wide = Localization::new(0.0, 0.0, 2000.0, 100.0);
        assert_eq!(filter_one(&wide, center, 5.0, 2000.0), None);
        assert!(!passes_filter(&wide, center, 5.0, 2000.0));
    }

    #[test]
    fn test_filter_empty_result() {
        let t = table(&[(100.0, 100.0, 10.0, 10.0)]);
        let kept = filter_localizations(&t, [0.0, 0.0], 5.0, 2000.0);
        assert!(kept.is_empty());
    }
}
