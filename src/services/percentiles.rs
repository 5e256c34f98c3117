/// Percentile helpers for already-sorted slices.
///
/// - Empty input => `None` (or `0.0` in [`calculate_percentiles`]).
/// - `percentile <= 0` => first element.
/// - `percentile >= 100` => last element.
/// - Otherwise the position `(p / 100) * (len - 1)` is interpolated linearly
///   between its neighbouring ranks (R-7).
use crate::services::simulation_types::CompletionWeekPercentiles;

/// Returns the interpolated percentile of a slice sorted in ascending order.
pub fn value_sorted(sorted_values: &[f64], percentile: f64) -> Option<f64> {
    let last = sorted_values.len().checked_sub(1)?;
    if percentile <= 0.0 {
        return sorted_values.first().copied();
    }
    if percentile >= 100.0 {
        return sorted_values.last().copied();
    }

    let position = (percentile / 100.0) * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    let low = sorted_values[lower];
    let high = sorted_values[upper.min(last)];
    Some(low + (high - low) * fraction)
}

pub fn calculate_percentiles(values: &[f64]) -> CompletionWeekPercentiles {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let at = |percentile: f64| value_sorted(&sorted, percentile).unwrap_or(0.0);

    CompletionWeekPercentiles {
        p50: at(50.0),
        p75: at(75.0),
        p90: at(90.0),
        p95: at(95.0),
        p99: at(99.0),
    }
}

/// Index of the value closest to `target`; the first one wins on ties.
pub fn closest_index<I>(values: I, target: f64) -> Option<usize>
where
    I: IntoIterator<Item = f64>,
{
    let mut best: Option<(usize, f64)> = None;
    for (idx, value) in values.into_iter().enumerate() {
        let distance = (value - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((idx, distance)),
        }
    }
    best.map(|(idx, _)| idx)
}
