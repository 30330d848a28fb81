//! The grid calibrator: an exhaustive search over a Cartesian grid of transmission parameters for
//! the combination whose simulated outbreak sizes best match an observed sample.
//!
//! Every grid cell is evaluated with `n_sims` fresh simulator trials and scored with
//! [`scoring::score`](crate::scoring::score). The lowest score wins; ties keep the cell visited
//! first. Cells are visited in a fixed nested order (handler-to-patron probability outermost,
//! then contamination probability, then contamination size mean, staff-to-staff probability
//! innermost), so for a given random stream the result is reproducible.
//!
//! There is no pruning or early stopping: a search costs `|grid| * n_sims` trials. The fast
//! variant ([`Calibrator::fast`], 240 cells of 200 trials) exists for repeated use inside
//! cross-validation; the full variant ([`Calibrator::full`], 1200 cells) is used once per final
//! fit and also keeps the winning batch of simulated sizes.
//!
//! Any error in any cell aborts the whole search.

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::OutbreakError;
use crate::numeric::linspace;
use crate::parameters::TransmissionParameters;
use crate::progress::{finish_custom_progress, increment_custom_progress, init_custom_progress_bar};
use crate::scoring::score;
use crate::simulation::{OutbreakModel, OutbreakSize};

/// Trials per cell used by the fast calibrator.
pub const FAST_SIMS: usize = 200;
/// Contamination size standard deviation held fixed by both built-in grids.
pub const FIXED_CONTAMINATION_STD: f64 = 30.0;

/// Candidate values for each searched parameter. `contamination_size_std` is not searched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    pub beta_handler_patron: Vec<f64>,
    pub prob_food_contamination: Vec<f64>,
    pub contamination_size_mean: Vec<f64>,
    pub beta_staff_staff: Vec<f64>,
    #[serde(default = "fixed_contamination_std")]
    pub contamination_size_std: f64,
}

fn fixed_contamination_std() -> f64 {
    FIXED_CONTAMINATION_STD
}

impl ParameterGrid {
    /// The coarse grid, 5 x 4 x 3 x 4 = 240 cells.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            beta_handler_patron: linspace(0.015, 0.035, 5),
            prob_food_contamination: linspace(0.10, 0.22, 4),
            contamination_size_mean: linspace(35.0, 65.0, 3),
            beta_staff_staff: vec![0.01, 0.05, 0.1, 0.2],
            contamination_size_std: FIXED_CONTAMINATION_STD,
        }
    }

    /// The fine grid, 8 x 6 x 5 x 5 = 1200 cells.
    #[must_use]
    pub fn full() -> Self {
        Self {
            beta_handler_patron: linspace(0.015, 0.035, 8),
            prob_food_contamination: linspace(0.10, 0.22, 6),
            contamination_size_mean: linspace(35.0, 65.0, 5),
            beta_staff_staff: vec![0.01, 0.03, 0.05, 0.1, 0.2],
            contamination_size_std: FIXED_CONTAMINATION_STD,
        }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.beta_handler_patron.len()
            * self.prob_food_contamination.len()
            * self.contamination_size_mean.len()
            * self.beta_staff_staff.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every cell in search order. Fields the grid does not search (`beta_other_patron`) come
    /// from `base`.
    pub fn cells<'a>(
        &'a self,
        base: &'a TransmissionParameters,
    ) -> impl Iterator<Item = TransmissionParameters> + 'a {
        self.beta_handler_patron.iter().flat_map(move |&beta_handler_patron| {
            self.prob_food_contamination
                .iter()
                .flat_map(move |&prob_food_contamination| {
                    self.contamination_size_mean
                        .iter()
                        .flat_map(move |&contamination_size_mean| {
                            self.beta_staff_staff
                                .iter()
                                .map(move |&beta_staff_staff| TransmissionParameters {
                                    beta_staff_staff,
                                    beta_handler_patron,
                                    prob_food_contamination,
                                    contamination_size_mean,
                                    contamination_size_std: self.contamination_size_std,
                                    ..*base
                                })
                        })
                })
        })
    }
}

/// A score and the parameters that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score: f64,
    pub parameters: TransmissionParameters,
}

/// The outcome of a calibration run.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    /// The minimum-score cell.
    pub best: ScoreRecord,
    /// The simulated sizes of the winning cell, when the calibrator keeps them.
    pub simulated: Option<Vec<OutbreakSize>>,
}

impl Calibration {
    #[must_use]
    pub fn parameters(&self) -> &TransmissionParameters {
        &self.best.parameters
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.best.score
    }
}

#[derive(Clone, Debug)]
pub struct Calibrator {
    grid: ParameterGrid,
    n_sims: usize,
    base: TransmissionParameters,
    keep_batch: bool,
    progress: bool,
}

impl Calibrator {
    #[must_use]
    pub fn new(grid: ParameterGrid, n_sims: usize) -> Self {
        Self {
            grid,
            n_sims,
            base: TransmissionParameters::default(),
            keep_batch: false,
            progress: false,
        }
    }

    /// The coarse variant: fast grid, 200 trials per cell, winning batch discarded.
    #[must_use]
    pub fn fast() -> Self {
        Self::new(ParameterGrid::fast(), FAST_SIMS)
    }

    /// The fine variant: full grid, `n_sims` trials per cell, winning batch kept.
    #[must_use]
    pub fn full(n_sims: usize) -> Self {
        Self::new(ParameterGrid::full(), n_sims).keeping_batch(true)
    }

    /// Values for the parameters the grid does not search.
    #[must_use]
    pub fn with_base(mut self, base: TransmissionParameters) -> Self {
        self.base = base;
        self
    }

    #[must_use]
    pub fn with_grid(mut self, grid: ParameterGrid) -> Self {
        self.grid = grid;
        self
    }

    #[must_use]
    pub fn keeping_batch(mut self, keep_batch: bool) -> Self {
        self.keep_batch = keep_batch;
        self
    }

    /// Shows a console progress bar with one tick per grid cell.
    #[must_use]
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn grid(&self) -> &ParameterGrid {
        &self.grid
    }

    #[must_use]
    pub fn n_sims(&self) -> usize {
        self.n_sims
    }

    /// Searches the grid for the parameters that best reproduce `observed`.
    ///
    /// # Errors
    /// - `OutbreakError::InvalidInput` if `observed` is empty, the grid has no cells, or
    ///   `n_sims` is zero.
    /// - Any error raised by a trial or by scoring, which aborts the search.
    pub fn calibrate<R: Rng>(
        &self,
        rng: &mut R,
        model: &OutbreakModel,
        observed: &[u64],
    ) -> Result<Calibration, OutbreakError> {
        if observed.is_empty() {
            return Err(OutbreakError::InvalidInput(
                "cannot calibrate against an empty sample".to_string(),
            ));
        }
        if self.grid.is_empty() {
            return Err(OutbreakError::InvalidInput(
                "parameter grid has no cells".to_string(),
            ));
        }
        if self.n_sims == 0 {
            return Err(OutbreakError::InvalidInput(
                "calibration needs at least one trial per grid cell".to_string(),
            ));
        }

        info!(
            "calibrating against {} observations: {} grid cells x {} trials",
            observed.len(),
            self.grid.len(),
            self.n_sims
        );
        if self.progress {
            init_custom_progress_bar("Calibrating", self.grid.len());
        }
        let result = self.search(rng, model, observed);
        if self.progress {
            finish_custom_progress();
        }
        let (best, simulated) = result?;

        info!(
            "best score {:.4} at {:?}",
            best.score, best.parameters
        );
        Ok(Calibration {
            best,
            simulated: self.keep_batch.then_some(simulated),
        })
    }

    fn search<R: Rng>(
        &self,
        rng: &mut R,
        model: &OutbreakModel,
        observed: &[u64],
    ) -> Result<(ScoreRecord, Vec<OutbreakSize>), OutbreakError> {
        let mut best: Option<(ScoreRecord, Vec<OutbreakSize>)> = None;
        for (cell, parameters) in self.grid.cells(&self.base).enumerate() {
            let simulated = model.simulate_batch(rng, &parameters, self.n_sims)?;
            let cell_score = score(observed, &simulated)?;
            if self.progress {
                increment_custom_progress();
            }
            if best
                .as_ref()
                .is_none_or(|(record, _)| cell_score < record.score)
            {
                debug!("cell {cell}: new best score {cell_score:.4}");
                best = Some((
                    ScoreRecord {
                        score: cell_score,
                        parameters,
                    },
                    simulated,
                ));
            }
        }
        best.ok_or_else(|| OutbreakError::InvalidInput("parameter grid has no cells".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::parameters::DiseaseParameters;
    use crate::restaurant::{RestaurantConfiguration, RestaurantOverrides};

    fn fixed_model() -> OutbreakModel {
        let configuration = RestaurantConfiguration {
            n_food_handlers: 4,
            n_other_staff: 4,
            init_infected: 1,
            patrons_per_shift: 100,
            patrons_per_handler: 30,
            shifts_per_day: 2,
            max_days: 5,
        };
        OutbreakModel::new(
            RestaurantOverrides::fixed(configuration),
            DiseaseParameters::default(),
        )
        .unwrap()
    }

    fn silent_base() -> TransmissionParameters {
        TransmissionParameters {
            beta_other_patron: 0.0,
            ..TransmissionParameters::default()
        }
    }

    fn tiny_grid() -> ParameterGrid {
        ParameterGrid {
            beta_handler_patron: vec![0.0],
            prob_food_contamination: vec![0.0],
            contamination_size_mean: vec![30.0, 60.0],
            beta_staff_staff: vec![0.5, 0.0],
            contamination_size_std: 10.0,
        }
    }

    #[test]
    fn built_in_grid_sizes() {
        assert_eq!(ParameterGrid::fast().len(), 240);
        assert_eq!(ParameterGrid::full().len(), 1200);
        assert_eq!(ParameterGrid::fast().cells(&TransmissionParameters::default()).count(), 240);
        let fast = ParameterGrid::fast();
        assert_eq!(fast.beta_handler_patron[4], 0.035);
        assert_eq!(fast.prob_food_contamination[3], 0.22);
    }

    #[test]
    fn cells_follow_nested_order() {
        let grid = ParameterGrid {
            beta_handler_patron: vec![1.0, 2.0],
            prob_food_contamination: vec![0.1, 0.2],
            contamination_size_mean: vec![40.0],
            beta_staff_staff: vec![0.01, 0.02],
            contamination_size_std: 30.0,
        };
        let base = TransmissionParameters {
            beta_other_patron: 0.123,
            ..TransmissionParameters::default()
        };
        let cells: Vec<_> = grid.cells(&base).collect();
        assert_eq!(cells.len(), 8);
        let keys: Vec<(f64, f64, f64)> = cells
            .iter()
            .map(|c| (c.beta_handler_patron, c.prob_food_contamination, c.beta_staff_staff))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1.0, 0.1, 0.01),
                (1.0, 0.1, 0.02),
                (1.0, 0.2, 0.01),
                (1.0, 0.2, 0.02),
                (2.0, 0.1, 0.01),
                (2.0, 0.1, 0.02),
                (2.0, 0.2, 0.01),
                (2.0, 0.2, 0.02),
            ]
        );
        assert!(cells.iter().all(|c| c.beta_other_patron == 0.123));
        assert!(cells.iter().all(|c| c.contamination_size_std == 30.0));
    }

    #[test]
    fn finds_the_exact_cell_and_keeps_first_tie() {
        // Without any transmission every trial yields exactly the one seeded case. The two
        // silent cells tie at zero; the first one (mean 30) must win.
        let calibrator = Calibrator::new(tiny_grid(), 100)
            .with_base(silent_base())
            .keeping_batch(true);
        let mut rng = StdRng::seed_from_u64(42);
        let calibration = calibrator
            .calibrate(&mut rng, &fixed_model(), &[1, 1, 1, 1])
            .unwrap();
        assert_eq!(calibration.score(), 0.0);
        assert_eq!(calibration.parameters().beta_staff_staff, 0.0);
        assert_eq!(calibration.parameters().contamination_size_mean, 30.0);
        let simulated = calibration.simulated.unwrap();
        assert_eq!(simulated.len(), 100);
        assert!(simulated.iter().all(|&size| size == 1));
    }

    #[test]
    fn same_stream_same_result() {
        let grid = ParameterGrid {
            beta_handler_patron: vec![0.01, 0.03],
            prob_food_contamination: vec![0.1, 0.2],
            contamination_size_mean: vec![40.0],
            beta_staff_staff: vec![0.05, 0.2],
            contamination_size_std: 30.0,
        };
        let calibrator = Calibrator::new(grid, 50);
        let model = OutbreakModel::standard().unwrap();
        let observed = [10, 12, 15, 20, 25, 30, 40, 55, 80, 120];
        let first = calibrator
            .calibrate(&mut StdRng::seed_from_u64(7), &model, &observed)
            .unwrap();
        let second = calibrator
            .calibrate(&mut StdRng::seed_from_u64(7), &model, &observed)
            .unwrap();
        assert_eq!(first, second);
        assert!(first.simulated.is_none());
        assert!(first.score() >= 0.0);
    }

    #[test]
    fn rejects_degenerate_requests() {
        let model = fixed_model();
        let mut rng = StdRng::seed_from_u64(1);
        let empty_grid = ParameterGrid {
            beta_staff_staff: Vec::new(),
            ..tiny_grid()
        };
        for calibrator in [
            Calibrator::new(empty_grid, 10),
            Calibrator::new(tiny_grid(), 0),
        ] {
            assert!(matches!(
                calibrator.calibrate(&mut rng, &model, &[1, 2, 3]),
                Err(OutbreakError::InvalidInput(_))
            ));
        }
        assert!(matches!(
            Calibrator::new(tiny_grid(), 10).calibrate(&mut rng, &model, &[]),
            Err(OutbreakError::InvalidInput(_))
        ));
    }

    #[test]
    fn a_failing_cell_aborts_the_search() {
        let grid = ParameterGrid {
            beta_handler_patron: vec![0.01, 1.5],
            ..tiny_grid()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            Calibrator::new(grid, 10).calibrate(&mut rng, &fixed_model(), &[1, 2]),
            Err(OutbreakError::InvalidParameter(_))
        ));
    }

    #[test]
    fn grid_deserializes_with_default_std() {
        let grid: ParameterGrid = serde_json::from_str(
            r#"{"beta_handler_patron": [0.02], "prob_food_contamination": [0.1],
                "contamination_size_mean": [45.0], "beta_staff_staff": [0.1]}"#,
        )
        .unwrap();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.contamination_size_std, 30.0);
    }
}
