use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use restaurant_outbreak::calibration::{Calibrator, FAST_SIMS};
use restaurant_outbreak::simulation::OutbreakModel;
use restaurant_outbreak::validation::{
    kfold_validation, quantile_strata, FoldAssignment, DEFAULT_FOLDS, FOLD_TEST_SIMS,
};

const OBSERVED: [u64; 10] = [10, 12, 15, 20, 25, 30, 40, 55, 80, 120];

#[test]
fn kfold_with_fast_calibrator_reports_five_folds() {
    let model = OutbreakModel::standard().unwrap();
    let calibrator = Calibrator::fast();
    assert_eq!(calibrator.n_sims(), FAST_SIMS);
    assert_eq!(calibrator.grid().len(), 240);

    let mut rng = StdRng::seed_from_u64(20);
    let report = kfold_validation(
        &mut rng,
        &model,
        &OBSERVED,
        DEFAULT_FOLDS,
        &calibrator,
        FOLD_TEST_SIMS,
    )
    .unwrap();

    assert_eq!(report.folds.len(), 5);
    for record in &report.folds {
        assert!(record.train_score > 0.0);
        assert!(record.test_score > 0.0);
        assert!(record.ratio.is_finite());
    }
    assert!(report.mean_ratio.is_finite());
    assert!(report.mean_ratio > 0.0);
}

#[test]
#[allow(clippy::cast_precision_loss)]
fn stratified_folds_on_skewed_samples() {
    let mut rng = StdRng::seed_from_u64(77);
    for n in 25..60 {
        // Heavy-tailed sizes with many ties, like real outbreak counts.
        let data: Vec<u64> = (0..n)
            .map(|_| {
                let u: f64 = rng.random();
                (5.0 / (1.0 - u).sqrt()).floor() as u64
            })
            .collect();
        let strata = quantile_strata(&data);
        let assignment = FoldAssignment::stratified(&mut rng, &data, 5).unwrap();

        let mut seen = HashSet::new();
        for fold in assignment.folds() {
            assert!(!fold.is_empty());
            for &index in fold {
                assert!(seen.insert(index));
            }
        }
        assert_eq!(seen.len(), n);

        for stratum in 0..5 {
            let total = strata.iter().filter(|&&s| s == stratum).count();
            let overall = total as f64 / n as f64;
            for fold in assignment.folds() {
                let count = fold.iter().filter(|&&i| strata[i] == stratum).count();
                let share = count as f64 / fold.len() as f64;
                assert!((share - overall).abs() <= 2.0 / fold.len() as f64);
            }
        }
    }
}
