//! Statistics over measurement series.

pub mod kde;

fn sorted(series: &[f64]) -> Vec<f64> {
    let mut sorted = series.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// The upper median: for an even number of samples this is the larger of the two middle values.
/// Returns `None` for an empty series.
pub fn median(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    Some(sorted(series)[series.len() / 2])
}

/// Divides every sample of `series` by the median of `baseline`, so the baseline's median lands
/// at 1.0.
pub fn normalize(series: &[f64], baseline: &[f64]) -> Option<Vec<f64>> {
    let median = median(baseline)?;
    Some(series.iter().map(|x| x / median).collect())
}
