use rand::distr::Distribution;
use rand::seq::index::sample as choose_range;
use rand::Rng;
use rand_distr::Binomial;

use crate::error::OutbreakError;

/// Sampling helpers available on any generator. The simulator only talks to randomness through
/// these methods and [`DiscreteTable`](super::DiscreteTable).
pub trait RngSamplingExt: Rng + Sized {
    /// A uniform draw from `[0, 1)`.
    fn sample_uniform(&mut self) -> f64 {
        self.random::<f64>()
    }

    /// True with probability `p`. Values of `p` outside `[0, 1]` saturate rather than panic:
    /// `p <= 0` is never true and `p >= 1` is always true.
    fn sample_bool(&mut self, p: f64) -> bool {
        self.sample_uniform() < p
    }

    /// Gets a random sample from the specified distribution.
    fn sample_distr<T>(&mut self, distribution: impl Distribution<T>) -> T {
        distribution.sample(self)
    }

    /// Number of successes in `trials` independent trials with success probability `p`.
    ///
    /// # Errors
    /// `OutbreakError::InvalidParameter` if `p` is not a probability.
    fn sample_binomial(&mut self, trials: u64, p: f64) -> Result<u64, OutbreakError> {
        let binomial = Binomial::new(trials, p).map_err(|e| {
            OutbreakError::InvalidParameter(format!("binomial(n={trials}, p={p}): {e}"))
        })?;
        Ok(binomial.sample(self))
    }

    /// Picks `amount` distinct indices out of `0..length`, uniformly without replacement. The
    /// indices are returned in ascending order. Panics if `amount > length`.
    fn choose_without_replacement(&mut self, length: usize, amount: usize) -> Vec<usize> {
        let mut indexes = choose_range(self, length, amount).into_vec();
        indexes.sort_unstable();
        indexes
    }
}

impl<R: Rng> RngSamplingExt for R {}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::LogNormal;

    use super::*;

    #[test]
    fn sample_bool_saturates() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert!(!rng.sample_bool(0.0));
            assert!(!rng.sample_bool(-0.5));
            assert!(rng.sample_bool(1.0));
            assert!(rng.sample_bool(3.0));
        }
    }

    #[test]
    fn sample_bool_frequency() {
        let mut rng = StdRng::seed_from_u64(42);
        let hits = (0..10_000).filter(|_| rng.sample_bool(0.3)).count();
        // Expected 3000, sd ~46.
        assert!((2800..3200).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn sample_uniform_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let u = rng.sample_uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn binomial_bounds_and_errors() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert!(rng.sample_binomial(30, 0.02).unwrap() <= 30);
        }
        assert_eq!(rng.sample_binomial(30, 0.0).unwrap(), 0);
        assert_eq!(rng.sample_binomial(30, 1.0).unwrap(), 30);
        assert!(matches!(
            rng.sample_binomial(30, 1.5),
            Err(OutbreakError::InvalidParameter(_))
        ));
    }

    #[test]
    fn sample_distr_lognormal_is_positive() {
        let mut rng = StdRng::seed_from_u64(42);
        let distribution = LogNormal::new(3.5, 0.6).unwrap();
        for _ in 0..100 {
            let size: f64 = rng.sample_distr(&distribution);
            assert!(size > 0.0);
        }
    }

    #[test]
    fn choose_without_replacement_is_distinct() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let chosen = rng.choose_without_replacement(10, 3);
            assert_eq!(chosen.len(), 3);
            assert!(chosen.windows(2).all(|w| w[0] < w[1]));
            assert!(chosen.iter().all(|&i| i < 10));
        }
        assert!(rng.choose_without_replacement(5, 0).is_empty());
    }
}
