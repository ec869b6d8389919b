/// Robust order statistics for bloom onset estimation.
///
/// Onset is the day of year by which an early fraction (20% by default) of
/// the flowering observations in a group have occurred.

use crate::model::PhenologyError;

/// Linear-interpolated percentile (Hyndman-Fan type 7).
///
/// Sorts a copy of `values`, takes the fractional rank `(n - 1) * p`, and
/// interpolates between the neighbouring order statistics. A single value is
/// returned unchanged.
///
/// Returns `PhenologyError::EmptySample` on empty input. Callers check their
/// minimum counts first, so this indicates a programming error upstream.
pub fn percentile(values: &[f64], p: f64) -> Result<f64, PhenologyError> {
    if values.is_empty() {
        return Err(PhenologyError::EmptySample);
    }
    if values.len() == 1 {
        return Ok(values[0]);
    }
    let mut seq = values.to_vec();
    seq.sort_by(|a, b| a.total_cmp(b));

    let idx = (seq.len() - 1) as f64 * p;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return Ok(seq[lo]);
    }
    let frac = idx - lo as f64;
    Ok(seq[lo] * (1.0 - frac) + seq[hi] * frac)
}

/// Onset estimate for a set of day-of-year values.
pub fn onset_estimate(doys: &[u32], p: f64) -> Result<f64, PhenologyError> {
    let values: Vec<f64> = doys.iter().map(|&d| d as f64).collect();
    percentile(&values, p)
}

/// Median with the midpoint average for even-length input.
pub fn median(values: &[f64]) -> Result<f64, PhenologyError> {
    if values.is_empty() {
        return Err(PhenologyError::EmptySample);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Sample standard deviation (n - 1 denominator). `None` below two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Rounds to `places` decimal digits, half away from zero.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
