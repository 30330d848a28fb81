use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use crate::error::OutbreakError;

/// A finite set of values with fixed probabilities, sampled with a precomputed `WeightedIndex`.
/// Weights need not sum to one.
#[derive(Clone, Debug)]
pub struct DiscreteTable<T> {
    values: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T: Copy> DiscreteTable<T> {
    /// # Errors
    /// `OutbreakError::InvalidParameter` if the table is empty, a weight is negative or not
    /// finite, or every weight is zero.
    pub fn new(entries: &[(T, f64)]) -> Result<Self, OutbreakError> {
        let index = WeightedIndex::new(entries.iter().map(|(_, weight)| *weight))
            .map_err(|e| OutbreakError::InvalidParameter(format!("discrete table: {e}")))?;
        Ok(Self {
            values: entries.iter().map(|(value, _)| *value).collect(),
            index,
        })
    }

    /// Draws one value.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> T {
        self.values[self.index.sample(rng)]
    }

    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn samples_follow_weights() {
        let table = DiscreteTable::new(&[(1_u32, 0.6), (2, 0.3), (3, 0.1)]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0_usize; 3];
        for _ in 0..10_000 {
            counts[(table.sample(&mut rng) - 1) as usize] += 1;
        }
        // Expected 6000 / 3000 / 1000.
        assert!((5800..6200).contains(&counts[0]), "{counts:?}");
        assert!((2800..3200).contains(&counts[1]), "{counts:?}");
        assert!((850..1150).contains(&counts[2]), "{counts:?}");
    }

    #[test]
    fn zero_weight_is_never_drawn() {
        let table = DiscreteTable::new(&[(10_u32, 0.0), (20, 1.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert!((0..1000).all(|_| table.sample(&mut rng) == 20));
        assert_eq!(table.values(), &[10, 20]);
    }

    #[test]
    fn rejects_bad_weights() {
        assert!(DiscreteTable::<u32>::new(&[]).is_err());
        assert!(DiscreteTable::new(&[(1_u32, -1.0), (2, 2.0)]).is_err());
        assert!(DiscreteTable::new(&[(1_u32, 0.0)]).is_err());
    }
}
