use criterion::{criterion_group, criterion_main, Criterion};
use restaurant_outbreak::calibration::{Calibrator, ParameterGrid};
use restaurant_outbreak::parameters::{PolicySettings, TransmissionParameters};
use restaurant_outbreak::random::seeded_stream;
use restaurant_outbreak::simulation::OutbreakModel;

static SEED: u64 = 123;
static CELL_SIMS: usize = 200;
static OBSERVED: [u64; 10] = [10, 12, 15, 20, 25, 30, 40, 55, 80, 120];

pub fn criterion_benchmark(c: &mut Criterion) {
    let model = OutbreakModel::standard().expect("standard model");
    let transmission = TransmissionParameters::default();

    c.bench_function("single trial", |bencher| {
        let mut rng = seeded_stream(SEED, "single_trial");
        bencher.iter(|| model.simulate(&mut rng, &transmission).unwrap());
    });

    c.bench_function("single trial with combined policy", |bencher| {
        let mut rng = seeded_stream(SEED, "policy_trial");
        let policy = PolicySettings::combined(0.8, 0.4);
        bencher.iter(|| {
            model
                .simulate_with_policy(&mut rng, &transmission, &policy)
                .unwrap()
        });
    });

    let one_cell = ParameterGrid {
        beta_handler_patron: vec![transmission.beta_handler_patron],
        prob_food_contamination: vec![transmission.prob_food_contamination],
        contamination_size_mean: vec![transmission.contamination_size_mean],
        beta_staff_staff: vec![transmission.beta_staff_staff],
        contamination_size_std: transmission.contamination_size_std,
    };
    let calibrator = Calibrator::new(one_cell, CELL_SIMS);
    c.bench_function("calibration cell", |bencher| {
        let mut rng = seeded_stream(SEED, "calibration_cell");
        bencher.iter(|| calibrator.calibrate(&mut rng, &model, &OBSERVED).unwrap());
    });
}

criterion_group!(simulation_benches, criterion_benchmark);
criterion_main!(simulation_benches);
