//! Validation of calibrated parameters against held-out data.
//!
//! * [`kfold_validation`]: stratified k-fold cross-validation. The sample is split into
//!   quantile strata, every fold receives a share of every stratum, and each fold is scored once
//!   as the test set of a calibration run on the remaining folds.
//! * [`holdout_validation`]: a single random (unstratified) train/test split.
//! * [`full_calibration`]: one calibration over the whole sample, keeping the winning batch of
//!   simulated sizes for reporting.
//!
//! Both validation protocols report `test_score / train_score`. A ratio well above one means the
//! calibrated parameters fit the training data much better than unseen data.

use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::calibration::{Calibration, Calibrator};
use crate::error::OutbreakError;
use crate::numeric::{mean, percentile_of_sorted, sorted_f64, std_dev};
use crate::parameters::TransmissionParameters;
use crate::scoring::score;
use crate::simulation::OutbreakModel;

pub const DEFAULT_FOLDS: usize = 5;
/// Trials run at each fold's calibrated parameters to score its test set.
pub const FOLD_TEST_SIMS: usize = 200;
pub const HOLDOUT_TRAIN_FRACTION: f64 = 0.8;
/// Trials per grid cell, and for the test score, in holdout validation.
pub const HOLDOUT_SIMS: usize = 300;
/// Trials per grid cell in the final calibration.
pub const FULL_SIMS: usize = 500;
/// Interior cut points of the quantile strata.
pub const STRATA_CUT_PERCENTILES: [f64; 4] = [20.0, 40.0, 60.0, 80.0];

/// Stratum of every observation: the number of cut points (20th to 80th percentile of `data`)
/// that are less than or equal to it. Equal values always share a stratum.
#[must_use]
pub fn quantile_strata(data: &[u64]) -> Vec<usize> {
    let sorted = sorted_f64(data);
    let cuts: Vec<f64> = STRATA_CUT_PERCENTILES
        .iter()
        .filter_map(|&q| percentile_of_sorted(&sorted, q))
        .collect();
    data.iter()
        .map(|&value| {
            #[allow(clippy::cast_precision_loss)]
            let value = value as f64;
            cuts.iter().filter(|&&cut| cut <= value).count()
        })
        .collect()
}

/// A partition of the indices `0..n` of a sample into `k` disjoint test sets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoldAssignment {
    folds: Vec<Vec<usize>>,
}

impl FoldAssignment {
    /// Builds a stratified assignment. Indices are shuffled within each stratum, then strata are
    /// dealt to the folds round-robin in ascending order, continuing where the previous stratum
    /// stopped. Fold sizes therefore differ by at most one, and so does every fold's share of each
    /// stratum.
    ///
    /// # Errors
    /// `OutbreakError::InvalidInput` if `k < 2` or the sample has fewer than `k` observations.
    pub fn stratified<R: Rng>(
        rng: &mut R,
        data: &[u64],
        k: usize,
    ) -> Result<Self, OutbreakError> {
        if k < 2 {
            return Err(OutbreakError::InvalidInput(format!(
                "k-fold validation needs at least 2 folds, got {k}"
            )));
        }
        if data.len() < k {
            return Err(OutbreakError::InvalidInput(format!(
                "cannot split {} observations into {k} folds",
                data.len()
            )));
        }

        let strata = quantile_strata(data);
        let n_strata = strata.iter().copied().max().map_or(0, |max| max + 1);
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_strata];
        for (index, &stratum) in strata.iter().enumerate() {
            members[stratum].push(index);
        }

        let mut folds = vec![Vec::new(); k];
        let mut cursor = 0;
        for stratum in &mut members {
            stratum.shuffle(rng);
            for &index in stratum.iter() {
                folds[cursor].push(index);
                cursor = (cursor + 1) % k;
            }
        }
        Ok(Self { folds })
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.folds.len()
    }

    /// Test indices of every fold.
    #[must_use]
    pub fn folds(&self) -> &[Vec<usize>] {
        &self.folds
    }

    /// Test indices of fold `fold` (zero-based).
    #[must_use]
    pub fn test_indices(&self, fold: usize) -> &[usize] {
        &self.folds[fold]
    }

    /// Indices of every other fold, in fold order.
    #[must_use]
    pub fn train_indices(&self, fold: usize) -> Vec<usize> {
        self.folds
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != fold)
            .flat_map(|(_, indices)| indices.iter().copied())
            .collect()
    }
}

/// Result of validating one fold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoldRecord {
    /// Fold number, starting at 1.
    pub fold: usize,
    pub train_score: f64,
    pub test_score: f64,
    /// `test_score / train_score`.
    pub ratio: f64,
    pub parameters: TransmissionParameters,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KFoldReport {
    pub folds: Vec<FoldRecord>,
    pub mean_ratio: f64,
    /// Population standard deviation of the fold ratios.
    pub std_ratio: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldoutReport {
    pub n_train: usize,
    pub n_test: usize,
    pub train_score: f64,
    pub test_score: f64,
    pub ratio: f64,
    pub parameters: TransmissionParameters,
}

fn select(data: &[u64], indices: &[usize]) -> Vec<u64> {
    indices.iter().map(|&i| data[i]).collect()
}

// A training score of zero means the calibrated parameters reproduce the training percentiles
// exactly, which leaves the ratio undefined.
fn score_ratio(
    stage: &str,
    parameters: &TransmissionParameters,
    test_score: f64,
    train_score: f64,
) -> Result<f64, OutbreakError> {
    if train_score <= 0.0 {
        return Err(OutbreakError::InvalidInput(format!(
            "{stage}: training score is {train_score} at {parameters:?}, so the simulated sizes \
             match the training percentiles exactly and the test/train ratio is undefined"
        )));
    }
    Ok(test_score / train_score)
}

/// Stratified k-fold cross-validation. Each fold is calibrated with `calibrator` on the other
/// folds and then scored against its own observations with `test_sims` fresh trials.
///
/// # Errors
/// - `OutbreakError::InvalidInput` for fewer observations than folds, `k < 2`, `test_sims == 0`
///   or a zero training score.
/// - Any calibration or trial error.
pub fn kfold_validation<R: Rng>(
    rng: &mut R,
    model: &OutbreakModel,
    observed: &[u64],
    k: usize,
    calibrator: &Calibrator,
    test_sims: usize,
) -> Result<KFoldReport, OutbreakError> {
    if test_sims == 0 {
        return Err(OutbreakError::InvalidInput(
            "test scoring needs at least one trial".to_string(),
        ));
    }
    let assignment = FoldAssignment::stratified(rng, observed, k)?;
    info!("{k}-fold validation over {} observations", observed.len());

    let mut folds = Vec::with_capacity(k);
    for fold in 0..k {
        let train = select(observed, &assignment.train_indices(fold));
        let test = select(observed, assignment.test_indices(fold));

        let calibration = calibrator.calibrate(rng, model, &train)?;
        let parameters = *calibration.parameters();
        let simulated = model.simulate_batch(rng, &parameters, test_sims)?;
        let test_score = score(&test, &simulated)?;
        let train_score = calibration.score();
        let stage = format!("fold {}", fold + 1);
        let ratio = score_ratio(&stage, &parameters, test_score, train_score)?;

        info!(
            "fold {}: train {} / test {}, train score {train_score:.3}, test score {test_score:.3}, ratio {ratio:.3}",
            fold + 1,
            train.len(),
            test.len()
        );
        folds.push(FoldRecord {
            fold: fold + 1,
            train_score,
            test_score,
            ratio,
            parameters,
        });
    }

    let ratios: Vec<f64> = folds.iter().map(|record| record.ratio).collect();
    let mean_ratio = mean(&ratios).unwrap_or(f64::NAN);
    let std_ratio = std_dev(&ratios).unwrap_or(f64::NAN);
    info!("mean ratio {mean_ratio:.3} (std {std_ratio:.3})");
    Ok(KFoldReport {
        folds,
        mean_ratio,
        std_ratio,
    })
}

/// Holdout validation: a random split keeping `floor(train_fraction * n)` observations for
/// calibration and the rest for testing with `test_sims` fresh trials.
///
/// # Errors
/// - `OutbreakError::InvalidInput` if `train_fraction` is not in `(0, 1)`, either side of the
///   split is empty, `test_sims == 0`, or the training score is zero.
/// - Any calibration or trial error.
pub fn holdout_validation<R: Rng>(
    rng: &mut R,
    model: &OutbreakModel,
    observed: &[u64],
    train_fraction: f64,
    calibrator: &Calibrator,
    test_sims: usize,
) -> Result<HoldoutReport, OutbreakError> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(OutbreakError::InvalidInput(format!(
            "holdout train fraction must be in (0, 1), got {train_fraction}"
        )));
    }
    if test_sims == 0 {
        return Err(OutbreakError::InvalidInput(
            "test scoring needs at least one trial".to_string(),
        ));
    }
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let n_train = (observed.len() as f64 * train_fraction).floor() as usize;
    if n_train == 0 || n_train == observed.len() {
        return Err(OutbreakError::InvalidInput(format!(
            "a {train_fraction} split of {} observations leaves an empty side",
            observed.len()
        )));
    }

    let mut order: Vec<usize> = (0..observed.len()).collect();
    order.shuffle(rng);
    let (train_indices, test_indices) = order.split_at(n_train);
    let train = select(observed, train_indices);
    let test = select(observed, test_indices);
    info!("holdout validation: {} train / {} test", train.len(), test.len());

    let calibration = calibrator.calibrate(rng, model, &train)?;
    let parameters = *calibration.parameters();
    let simulated = model.simulate_batch(rng, &parameters, test_sims)?;
    let test_score = score(&test, &simulated)?;
    let train_score = calibration.score();
    let ratio = score_ratio("holdout", &parameters, test_score, train_score)?;
    info!("holdout: train score {train_score:.3}, test score {test_score:.3}, ratio {ratio:.3}");

    Ok(HoldoutReport {
        n_train: train.len(),
        n_test: test.len(),
        train_score,
        test_score,
        ratio,
        parameters,
    })
}

/// Calibrates on the whole sample. The returned [`Calibration`] always carries the winning
/// batch of simulated sizes.
///
/// # Errors
/// Any calibration error.
pub fn full_calibration<R: Rng>(
    rng: &mut R,
    model: &OutbreakModel,
    observed: &[u64],
    calibrator: &Calibrator,
) -> Result<Calibration, OutbreakError> {
    info!("full calibration over {} observations", observed.len());
    calibrator.clone().keeping_batch(true).calibrate(rng, model, observed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::calibration::ParameterGrid;
    use crate::parameters::DiseaseParameters;
    use crate::restaurant::{RestaurantConfiguration, RestaurantOverrides};

    fn small_calibrator() -> Calibrator {
        Calibrator::new(
            ParameterGrid {
                beta_handler_patron: vec![0.015, 0.03],
                prob_food_contamination: vec![0.1, 0.2],
                contamination_size_mean: vec![45.0],
                beta_staff_staff: vec![0.05, 0.2],
                contamination_size_std: 30.0,
            },
            40,
        )
    }

    const OBSERVED: [u64; 10] = [10, 12, 15, 20, 25, 30, 40, 55, 80, 120];

    #[test]
    fn strata_of_distinct_values() {
        // Cut points 14.4, 23.0, 34.0, 60.0.
        assert_eq!(
            quantile_strata(&OBSERVED),
            vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4]
        );
    }

    #[test]
    fn equal_values_share_a_stratum() {
        let strata = quantile_strata(&[5, 5, 5, 5, 5, 5]);
        assert!(strata.iter().all(|&s| s == strata[0]));
    }

    #[test]
    fn folds_partition_the_sample() {
        let mut rng = StdRng::seed_from_u64(3);
        for n in [5, 10, 25, 26, 49, 100] {
            let data: Vec<u64> = (0..n).map(|_| rng.random_range(0..500)).collect();
            let assignment = FoldAssignment::stratified(&mut rng, &data, 5).unwrap();
            assert_eq!(assignment.k(), 5);

            let mut seen = HashSet::new();
            for fold in assignment.folds() {
                assert!(!fold.is_empty());
                assert!(fold.len() == n as usize / 5 || fold.len() == n as usize / 5 + 1);
                for &index in fold {
                    assert!(seen.insert(index), "index {index} in two folds");
                }
            }
            assert_eq!(seen.len(), n as usize);
        }
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn folds_preserve_stratum_proportions() {
        let mut rng = StdRng::seed_from_u64(11);
        for n in [25_usize, 40, 77, 250] {
            let data: Vec<u64> = (0..n).map(|_| rng.random_range(0..300)).collect();
            let strata = quantile_strata(&data);
            let assignment = FoldAssignment::stratified(&mut rng, &data, 5).unwrap();
            for stratum in 0..5 {
                let total = strata.iter().filter(|&&s| s == stratum).count();
                let overall = total as f64 / n as f64;
                for fold in assignment.folds() {
                    let count = fold.iter().filter(|&&i| strata[i] == stratum).count();
                    assert!((count as f64 - total as f64 / 5.0).abs() < 1.0);
                    let share = count as f64 / fold.len() as f64;
                    assert!(
                        (share - overall).abs() <= 2.0 / fold.len() as f64,
                        "n = {n}, stratum {stratum}: {share} vs {overall}"
                    );
                }
            }
        }
    }

    #[test]
    fn train_and_test_are_complementary() {
        let mut rng = StdRng::seed_from_u64(5);
        let assignment = FoldAssignment::stratified(&mut rng, &OBSERVED, 5).unwrap();
        for fold in 0..5 {
            let mut all = assignment.train_indices(fold);
            all.extend_from_slice(assignment.test_indices(fold));
            all.sort_unstable();
            assert_eq!(all, (0..10).collect::<Vec<_>>());
        }
    }

    #[test]
    fn too_few_observations_for_folds() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(
            FoldAssignment::stratified(&mut rng, &[1, 2, 3], 5),
            Err(OutbreakError::InvalidInput(_))
        ));
        assert!(matches!(
            FoldAssignment::stratified(&mut rng, &[1, 2, 3], 1),
            Err(OutbreakError::InvalidInput(_))
        ));
    }

    #[test]
    fn kfold_reports_every_fold() {
        let model = OutbreakModel::standard().unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let report = kfold_validation(&mut rng, &model, &OBSERVED, 5, &small_calibrator(), 50)
            .unwrap();
        assert_eq!(report.folds.len(), 5);
        for (i, record) in report.folds.iter().enumerate() {
            assert_eq!(record.fold, i + 1);
            assert!(record.train_score > 0.0);
            assert!(record.test_score > 0.0);
            assert_eq!(record.ratio, record.test_score / record.train_score);
        }
        assert!(report.mean_ratio.is_finite() && report.mean_ratio > 0.0);
        assert!(report.std_ratio.is_finite() && report.std_ratio >= 0.0);
    }

    #[test]
    fn holdout_split_sizes() {
        let model = OutbreakModel::standard().unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let report =
            holdout_validation(&mut rng, &model, &OBSERVED, 0.8, &small_calibrator(), 50).unwrap();
        assert_eq!(report.n_train, 8);
        assert_eq!(report.n_test, 2);
        assert!(report.ratio.is_finite());
    }

    #[test]
    fn holdout_rejects_empty_sides() {
        let model = OutbreakModel::standard().unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        for (data, fraction) in [(&[4_u64][..], 0.8), (&OBSERVED[..], 0.0), (&OBSERVED[..], 1.0)] {
            assert!(matches!(
                holdout_validation(&mut rng, &model, data, fraction, &small_calibrator(), 10),
                Err(OutbreakError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn zero_training_score_is_an_error() {
        let parameters = TransmissionParameters::default();
        assert!(matches!(
            score_ratio("holdout", &parameters, 1.0, 0.0),
            Err(OutbreakError::InvalidInput(_))
        ));
        assert_eq!(score_ratio("holdout", &parameters, 3.0, 2.0).unwrap(), 1.5);
    }

    #[test]
    fn exact_training_fit_names_fold_and_parameters() {
        // No transmission at all: every trial ends with exactly the two seeded infections.
        let restaurant = RestaurantConfiguration {
            n_food_handlers: 3,
            n_other_staff: 3,
            init_infected: 2,
            patrons_per_shift: 100,
            patrons_per_handler: 30,
            shifts_per_day: 2,
            max_days: 5,
        };
        let model = OutbreakModel::new(
            RestaurantOverrides::fixed(restaurant),
            DiseaseParameters::default(),
        )
        .unwrap();
        let silent = TransmissionParameters {
            beta_staff_staff: 0.0,
            beta_handler_patron: 0.0,
            beta_other_patron: 0.0,
            prob_food_contamination: 0.0,
            ..TransmissionParameters::default()
        };
        let calibrator = Calibrator::new(
            ParameterGrid {
                beta_handler_patron: vec![0.0],
                prob_food_contamination: vec![0.0],
                contamination_size_mean: vec![45.0],
                beta_staff_staff: vec![0.0],
                contamination_size_std: 30.0,
            },
            10,
        )
        .with_base(silent);

        let observed = [2_u64; 10];
        let mut rng = StdRng::seed_from_u64(12);
        let message = match kfold_validation(&mut rng, &model, &observed, 5, &calibrator, 10) {
            Err(OutbreakError::InvalidInput(message)) => message,
            other => panic!("unexpected result: {other:?}"),
        };
        assert!(message.starts_with("fold 1:"), "{message}");
        assert!(message.contains("beta_staff_staff: 0.0"), "{message}");
    }

    #[test]
    fn full_calibration_keeps_batch() {
        let model = OutbreakModel::standard().unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let calibration = full_calibration(&mut rng, &model, &OBSERVED, &small_calibrator()).unwrap();
        assert_eq!(calibration.simulated.map(|s| s.len()), Some(40));
    }
}
