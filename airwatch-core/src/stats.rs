//! Robust Statistics for Noisy Sensor Streams
//!
//! ## Overview
//!
//! Every evaluator in the engine reduces a window of readings to a handful of
//! numbers. Doing that in one place guarantees the same tie-breaking and
//! outlier handling everywhere:
//!
//! - **Median**: even-length input averages the two middle elements
//! - **Percentile**: linear interpolation between closest ranks,
//!   rank = p/100 × (n − 1), matching the common spreadsheet/numpy default
//! - **IQR trim**: Tukey fences at 1.5 × IQR outside the quartiles
//!
//! ## Absent Values
//!
//! Sensor fields may be empty. Absence is `None`, never zero, and every helper
//! here works on already-present values. [`present`] collects the finite
//! values out of an iterator of optional fields and drops the rest, so a
//! missing CO2 column cannot drag an average towards zero.
//!
//! ## Why Median?
//!
//! Filter efficiency is right-skewed: one cooking event produces a handful of
//! near-zero efficiencies while the filter is fine. The median ignores them
//! up to half the window; the mean does not.
//!
//! ```rust
//! use airwatch_core::stats;
//!
//! let efficiency = [83.0, 85.0, 73.0, 86.0, 83.0, 77.0];
//! assert_eq!(stats::median(&efficiency), Some(83.0));
//! assert_eq!(stats::median(&[]), None);
//! ```

/// Tukey fence multiplier for IQR trimming
pub const IQR_FENCE: f64 = 1.5;

/// Collect finite present values, dropping `None`, NaN and infinities
pub fn present<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Arithmetic mean, `None` for empty input
pub fn mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(finite.iter().sum::<f64>() / finite.len() as f64)
}

/// Median, averaging the two middle elements for even-length input
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted(values);
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Percentile `p` in [0, 100] with linear interpolation between ranks
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let sorted = sorted(values);
    percentile_of_sorted(&sorted, p)
}

fn percentile_of_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !p.is_finite() {
        return None;
    }
    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// First and third quartiles
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    let sorted = sorted(values);
    Some((
        percentile_of_sorted(&sorted, 25.0)?,
        percentile_of_sorted(&sorted, 75.0)?,
    ))
}

/// Drop values outside the Tukey fences `[Q1 − 1.5·IQR, Q3 + 1.5·IQR]`
///
/// Inputs shorter than four values are returned unchanged; quartiles of three
/// points are not meaningful enough to reject anything.
pub fn iqr_trim(values: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 4 {
        return finite;
    }
    let Some((q1, q3)) = quartiles(&finite) else {
        return finite;
    };
    let iqr = q3 - q1;
    let low = q1 - IQR_FENCE * iqr;
    let high = q3 + IQR_FENCE * iqr;
    finite.into_iter().filter(|v| *v >= low && *v <= high).collect()
}

/// Mean after IQR trimming
pub fn trimmed_mean(values: &[f64]) -> Option<f64> {
    mean(&iqr_trim(values))
}

/// Share of values strictly above `limit`, in [0, 1]
pub fn fraction_above(values: &[f64], limit: f64) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let above = finite.iter().filter(|v| **v > limit).count();
    Some(above as f64 / finite.len() as f64)
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
