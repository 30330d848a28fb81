//! Goodness-of-fit diagnostics comparing an observed sample with the simulated sizes of a
//! calibrated model. These complement the calibration score and are reported alongside it; none of
//! them feed back into calibration.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::OutbreakError;
use crate::numeric::{mean, sorted_f64, std_dev, variance};
use crate::scoring::percentiles;

/// Bootstrap resamples used to estimate the spread of the simulated mean.
pub const BOOTSTRAP_RESAMPLES: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    /// Largest vertical distance between the two empirical CDFs.
    pub ks_statistic: f64,
    /// Asymptotic two-sample Kolmogorov-Smirnov p-value.
    pub ks_p_value: f64,
    /// Earth mover's distance between the two empirical distributions.
    pub wasserstein: f64,
    /// `var(simulated) / var(observed)`; `None` when the observed sample has no variance.
    pub variance_ratio: Option<f64>,
    pub tail95_error: f64,
    pub tail99_error: f64,
    /// Standard deviation of the simulated mean across bootstrap resamples.
    pub bootstrap_sd: f64,
}

/// Computes every diagnostic. The bootstrap draws from `rng`.
///
/// # Errors
/// `OutbreakError::InvalidInput` if either sample is empty.
pub fn fit_diagnostics<R: Rng>(
    rng: &mut R,
    observed: &[u64],
    simulated: &[u64],
) -> Result<FitDiagnostics, OutbreakError> {
    if observed.is_empty() || simulated.is_empty() {
        return Err(OutbreakError::InvalidInput(
            "fit diagnostics need two non-empty samples".to_string(),
        ));
    }
    let obs = sorted_f64(observed);
    let sim = sorted_f64(simulated);

    let ks_statistic = ks_statistic(&obs, &sim);
    #[allow(clippy::cast_precision_loss)]
    let effective_n = (obs.len() * sim.len()) as f64 / (obs.len() + sim.len()) as f64;
    let ks_p_value = kolmogorov_survival(effective_n.sqrt() * ks_statistic);

    let obs_percentiles = percentiles(observed)?;
    let sim_percentiles = percentiles(simulated)?;

    let observed_variance = variance(&obs).unwrap_or(0.0);
    let variance_ratio = if observed_variance > 0.0 {
        variance(&sim).map(|v| v / observed_variance)
    } else {
        None
    };

    Ok(FitDiagnostics {
        ks_statistic,
        ks_p_value,
        wasserstein: wasserstein(&obs, &sim),
        variance_ratio,
        tail95_error: (obs_percentiles[5] - sim_percentiles[5]).abs(),
        tail99_error: (obs_percentiles[6] - sim_percentiles[6]).abs(),
        bootstrap_sd: bootstrap_mean_sd(rng, &sim, BOOTSTRAP_RESAMPLES),
    })
}

#[allow(clippy::cast_precision_loss)]
fn ecdf(sorted: &[f64], x: f64) -> f64 {
    sorted.partition_point(|&v| v <= x) as f64 / sorted.len() as f64
}

/// Two-sample KS statistic of two ascending samples.
#[must_use]
pub fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .chain(b.iter())
        .map(|&x| (ecdf(a, x) - ecdf(b, x)).abs())
        .fold(0.0, f64::max)
}

/// Wasserstein-1 distance of two ascending samples: the area between their empirical CDFs.
#[must_use]
pub fn wasserstein(a: &[f64], b: &[f64]) -> f64 {
    let mut points: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    points.sort_by(f64::total_cmp);
    points
        .windows(2)
        .map(|w| (ecdf(a, w[0]) - ecdf(b, w[0])).abs() * (w[1] - w[0]))
        .sum()
}

/// `P(K > lambda)` for the Kolmogorov distribution.
#[must_use]
pub fn kolmogorov_survival(lambda: f64) -> f64 {
    // Below this the survival function equals one to double precision.
    if lambda < 0.2 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100_u32 {
        let j = f64::from(j);
        let term = (-2.0 * j * j * lambda * lambda).exp();
        sum += sign * term;
        if term < 1e-16 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

fn bootstrap_mean_sd<R: Rng>(rng: &mut R, sample: &[f64], resamples: usize) -> f64 {
    let means: Vec<f64> = (0..resamples)
        .filter_map(|_| {
            let resample: Vec<f64> = (0..sample.len())
                .map(|_| sample[rng.random_range(0..sample.len())])
                .collect();
            mean(&resample)
        })
        .collect();
    std_dev(&means).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::assert_almost_eq;
    use crate::numeric::ACC;

    #[test]
    fn identical_samples() {
        let sample = [3, 8, 8, 15, 40, 41];
        let mut rng = StdRng::seed_from_u64(1);
        let diagnostics = fit_diagnostics(&mut rng, &sample, &sample).unwrap();
        assert_eq!(diagnostics.ks_statistic, 0.0);
        assert_eq!(diagnostics.ks_p_value, 1.0);
        assert_eq!(diagnostics.wasserstein, 0.0);
        assert_almost_eq!(diagnostics.variance_ratio.unwrap(), 1.0, ACC);
        assert_eq!(diagnostics.tail95_error, 0.0);
        assert_eq!(diagnostics.tail99_error, 0.0);
        assert!(diagnostics.bootstrap_sd > 0.0);
    }

    #[test]
    fn shifted_samples() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [11.0, 12.0, 13.0, 14.0];
        assert_eq!(ks_statistic(&a, &b), 1.0);
        assert_almost_eq!(wasserstein(&a, &b), 10.0, ACC);
    }

    #[test]
    fn partial_overlap() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 3.0, 4.0];
        assert_almost_eq!(ks_statistic(&a, &b), 1.0 / 3.0, ACC);
        assert_almost_eq!(wasserstein(&a, &b), 1.0, ACC);
    }

    #[test]
    fn kolmogorov_reference_values() {
        // Well-known critical values of the Kolmogorov distribution.
        assert_almost_eq!(kolmogorov_survival(1.358_099), 0.05, 1e-5);
        assert_almost_eq!(kolmogorov_survival(1.627_624), 0.01, 1e-5);
        assert_eq!(kolmogorov_survival(0.0), 1.0);
        assert!(kolmogorov_survival(5.0) < 1e-20);
    }

    #[test]
    fn constant_observed_sample_has_no_variance_ratio() {
        let mut rng = StdRng::seed_from_u64(1);
        let diagnostics = fit_diagnostics(&mut rng, &[4, 4, 4], &[1, 5, 9]).unwrap();
        assert!(diagnostics.variance_ratio.is_none());
    }

    #[test]
    fn constant_simulated_sample_has_no_bootstrap_spread() {
        let mut rng = StdRng::seed_from_u64(1);
        let diagnostics = fit_diagnostics(&mut rng, &[1, 5, 9], &[7, 7, 7, 7]).unwrap();
        assert_eq!(diagnostics.bootstrap_sd, 0.0);
        assert_eq!(diagnostics.variance_ratio, Some(0.0));
    }

    #[test]
    fn empty_samples_are_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(fit_diagnostics(&mut rng, &[], &[1]).is_err());
        assert!(fit_diagnostics(&mut rng, &[1], &[]).is_err());
    }
}
