use rand::rngs::StdRng;
use rand::SeedableRng;
use restaurant_outbreak::numeric::{mean, std_dev};
use restaurant_outbreak::parameters::{PolicySettings, TransmissionParameters};
use restaurant_outbreak::simulation::OutbreakModel;

const TRIALS: usize = 4000;

#[allow(clippy::cast_precision_loss)]
fn as_f64(sizes: &[u64]) -> Vec<f64> {
    sizes.iter().map(|&s| s as f64).collect()
}

#[test]
#[allow(clippy::cast_precision_loss)]
fn compliance_without_policies_changes_nothing() {
    let model = OutbreakModel::standard().unwrap();
    let transmission = TransmissionParameters::default();
    let half = PolicySettings {
        compliance: 0.5,
        ..PolicySettings::baseline()
    };
    let none = PolicySettings::baseline();

    let a = as_f64(
        &model
            .simulate_batch_with_policy(&mut StdRng::seed_from_u64(1), &transmission, &half, TRIALS)
            .unwrap(),
    );
    let b = as_f64(
        &model
            .simulate_batch_with_policy(&mut StdRng::seed_from_u64(2), &transmission, &none, TRIALS)
            .unwrap(),
    );

    // Independent streams: the means differ only by simulation noise.
    let standard_error = ((std_dev(&a).unwrap().powi(2) + std_dev(&b).unwrap().powi(2))
        / TRIALS as f64)
        .sqrt();
    let difference = (mean(&a).unwrap() - mean(&b).unwrap()).abs();
    assert!(
        difference < 4.0 * standard_error,
        "difference {difference} vs standard error {standard_error}"
    );

    // The same stream gives the very same outbreaks.
    let same = model
        .simulate_batch_with_policy(&mut StdRng::seed_from_u64(1), &transmission, &none, TRIALS)
        .unwrap();
    assert_eq!(as_f64(&same), a);
}

#[test]
fn stronger_interventions_do_not_raise_the_mean() {
    let model = OutbreakModel::standard().unwrap();
    let transmission = TransmissionParameters::default();
    let mut rng = StdRng::seed_from_u64(5);
    let mut run = |policy: PolicySettings| {
        let sizes = model
            .simulate_batch_with_policy(&mut rng, &transmission, &policy, TRIALS)
            .unwrap();
        mean(&as_f64(&sizes)).unwrap()
    };
    let baseline = run(PolicySettings::baseline());
    let strict = run(PolicySettings::hygiene_only(1.0, 0.4));
    let combined = run(PolicySettings::combined(1.0, 0.4));
    assert!(strict < baseline);
    assert!(combined < baseline);
}
