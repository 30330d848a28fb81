//! The calibration objective: a weighted distance between two outbreak-size distributions,
//! computed from matched percentiles.
//!
//! Both samples are summarized at the ranks in [`PERCENTILE_RANKS`]; the score is the weighted
//! mean of the absolute differences, with the median carrying the most weight among the central
//! ranks and the 99th percentile the most overall. Scoring is deterministic.

use crate::error::OutbreakError;
use crate::numeric::{percentile_of_sorted, sorted_f64};

pub const PERCENTILE_RANKS: [f64; 7] = [10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0];
pub const PERCENTILE_WEIGHTS: [f64; 7] = [1.0, 1.5, 2.5, 1.5, 2.0, 2.5, 3.5];

/// The sample's values at each of [`PERCENTILE_RANKS`].
///
/// # Errors
/// `OutbreakError::InvalidInput` if `sample` is empty.
pub fn percentiles(sample: &[u64]) -> Result<[f64; 7], OutbreakError> {
    let sorted = sorted_f64(sample);
    let mut values = [0.0; 7];
    for (value, &rank) in values.iter_mut().zip(PERCENTILE_RANKS.iter()) {
        *value = percentile_of_sorted(&sorted, rank).ok_or_else(|| {
            OutbreakError::InvalidInput("cannot take percentiles of an empty sample".to_string())
        })?;
    }
    Ok(values)
}

/// Weighted mean absolute percentile difference between `observed` and `simulated`.
///
/// # Errors
/// `OutbreakError::InvalidInput` if either sample is empty or the score is not finite.
pub fn score(observed: &[u64], simulated: &[u64]) -> Result<f64, OutbreakError> {
    if observed.is_empty() {
        return Err(OutbreakError::InvalidInput(
            "observed sample is empty".to_string(),
        ));
    }
    if simulated.is_empty() {
        return Err(OutbreakError::InvalidInput(
            "simulated sample is empty".to_string(),
        ));
    }
    let observed = percentiles(observed)?;
    let simulated = percentiles(simulated)?;

    let weighted: f64 = observed
        .iter()
        .zip(simulated.iter())
        .zip(PERCENTILE_WEIGHTS.iter())
        .map(|((o, s), w)| w * (o - s).abs())
        .sum();
    let total_weight: f64 = PERCENTILE_WEIGHTS.iter().sum();
    let value = weighted / total_weight;
    if !value.is_finite() {
        return Err(OutbreakError::InvalidInput(format!(
            "score is not finite: {value}"
        )));
    }
    Ok(value)
}
