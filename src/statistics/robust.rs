//! Outlier-tolerant estimators over raw tick samples.
//!
//! All rounding uses round-half-up via integer arithmetic (`(a + b + 1) / 2`)
//! so results stay deterministic on unsigned integers with no floating-point
//! error at this stage.

use crate::types::Ticks;

/// Sorts integral values in ascending order by grouping equal values.
///
/// Far cheaper than a general sort when the number of distinct values is
/// small, which is typical for tick differences.
pub fn counting_sort(values: &mut [Ticks]) {
    // Unique values and their frequency. A linear scan beats a hash map for
    // the handful of distinct values we see in practice.
    let mut unique: Vec<(Ticks, usize)> = Vec::new();
    for &value in values.iter() {
        match unique.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => unique.push((value, 1)),
        }
    }

    unique.sort_unstable_by_key(|&(v, _)| v);

    let mut pos = 0;
    for (value, count) in unique {
        values[pos..pos + count].fill(value);
        pos += count;
    }
    assert_eq!(pos, values.len());
}

/// Index in `[idx_begin, idx_begin + half_count)` that minimizes
/// `sorted[i + half_count] - sorted[i]`.
fn min_range(sorted: &[Ticks], idx_begin: usize, half_count: usize) -> usize {
    let mut min_range = Ticks::MAX;
    let mut min_idx = idx_begin;

    for idx in idx_begin..idx_begin + half_count {
        assert!(
            sorted[idx] <= sorted[idx + half_count],
            "mode estimator requires sorted input"
        );
        let range = sorted[idx + half_count] - sorted[idx];
        if range < min_range {
            min_range = range;
            min_idx = idx;
        }
    }

    min_idx
}

/// Half-sample mode of a sorted ascending sample.
///
/// Repeatedly narrows to the minimal-spread window of half the current
/// length (Bickel's estimator, O(n log n)). Less affected by outliers in
/// highly skewed distributions than the mean or the median.
pub fn mode_of_sorted(sorted: &[Ticks]) -> Ticks {
    assert!(!sorted.is_empty());
    let mut idx_begin = 0;
    let mut half_count = sorted.len() / 2;
    while half_count > 1 {
        idx_begin = min_range(sorted, idx_begin, half_count);
        half_count >>= 1;
    }

    let x = sorted[idx_begin];
    if half_count == 0 {
        return x;
    }
    // half_count == 1: round-half-up average of the window boundaries.
    (x + sorted[idx_begin + 1] + 1) / 2
}

/// Robust mode estimate. Side effect: sorts `values`.
pub fn mode(values: &mut [Ticks]) -> Ticks {
    counting_sort(values);
    mode_of_sorted(values)
}

/// Median. Side effect: sorts `values`.
pub fn median(values: &mut [Ticks]) -> Ticks {
    assert!(!values.is_empty());
    values.sort_unstable();
    let half = values.len() / 2;
    if values.len() % 2 == 1 {
        return values[half];
    }
    (values[half] + values[half - 1] + 1) / 2
}

/// Median absolute deviation from `center`: a robust dispersion measure
/// immune to a small fraction of extreme outliers, unlike the standard
/// deviation.
pub fn median_abs_dev(values: &[Ticks], center: Ticks) -> Ticks {
    assert!(!values.is_empty());
    let mut abs_deviations: Vec<Ticks> = values
        .iter()
        .map(|&v| v.abs_diff(center))
        .collect();
    median(&mut abs_deviations)
}
