//! Settings of a full calibration and policy analysis run, loaded from a JSON file.
//!
//! Every field has a default, so an empty object `{}` is a valid configuration and any subset of
//! fields may be given:
//!
//! ```json
//! {
//!     "folds": 5,
//!     "full_sims": 500,
//!     "base_transmission": { "beta_other_patron": 0.002 },
//!     "restaurant": { "max_days": 7 },
//!     "run_scenarios": false
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::{Calibrator, ParameterGrid, FAST_SIMS};
use crate::error::OutbreakError;
use crate::parameters::{DiseaseParameters, TransmissionParameters};
use crate::restaurant::{RestaurantOverrides, RestaurantSampler};
use crate::scenarios::SCENARIO_SIMS;
use crate::simulation::OutbreakModel;
use crate::validation::{
    DEFAULT_FOLDS, FOLD_TEST_SIMS, FULL_SIMS, HOLDOUT_SIMS, HOLDOUT_TRAIN_FRACTION,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Number of k-fold validation folds.
    pub folds: usize,
    /// Trials per grid cell of the fast calibrator used inside folds.
    pub fold_calibration_sims: usize,
    /// Trials used to score each fold's test set.
    pub fold_test_sims: usize,
    pub holdout_train_fraction: f64,
    /// Trials per grid cell, and for the test score, in holdout validation.
    pub holdout_sims: usize,
    /// Trials per grid cell of the final calibration.
    pub full_sims: usize,
    pub scenario_sims: usize,
    pub run_scenarios: bool,
    /// Values of the parameters the grids do not search.
    pub base_transmission: TransmissionParameters,
    pub disease: DiseaseParameters,
    pub restaurant: RestaurantOverrides,
    pub fast_grid: ParameterGrid,
    pub full_grid: ParameterGrid,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            folds: DEFAULT_FOLDS,
            fold_calibration_sims: FAST_SIMS,
            fold_test_sims: FOLD_TEST_SIMS,
            holdout_train_fraction: HOLDOUT_TRAIN_FRACTION,
            holdout_sims: HOLDOUT_SIMS,
            full_sims: FULL_SIMS,
            scenario_sims: SCENARIO_SIMS,
            run_scenarios: true,
            base_transmission: TransmissionParameters::default(),
            disease: DiseaseParameters::default(),
            restaurant: RestaurantOverrides::default(),
            fast_grid: ParameterGrid::fast(),
            full_grid: ParameterGrid::full(),
        }
    }
}

fn probability(name: &str, value: f64) -> Result<(), OutbreakError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(OutbreakError::InvalidInput(format!(
            "{name} must be a probability in [0, 1], got {value}"
        )))
    }
}

fn positive_count(name: &str, value: usize) -> Result<(), OutbreakError> {
    if value == 0 {
        return Err(OutbreakError::InvalidInput(format!(
            "{name} must be at least 1"
        )));
    }
    Ok(())
}

fn check_grid(name: &str, grid: &ParameterGrid) -> Result<(), OutbreakError> {
    if grid.is_empty() {
        return Err(OutbreakError::InvalidInput(format!("{name} has no cells")));
    }
    for &p in grid
        .beta_handler_patron
        .iter()
        .chain(&grid.prob_food_contamination)
        .chain(&grid.beta_staff_staff)
    {
        probability(name, p)?;
    }
    if grid.contamination_size_mean.iter().any(|&m| m <= 0.0) {
        return Err(OutbreakError::InvalidInput(format!(
            "{name} has a non-positive contamination size mean"
        )));
    }
    if grid.contamination_size_std < 0.0 {
        return Err(OutbreakError::InvalidInput(format!(
            "{name} has a negative contamination size std"
        )));
    }
    Ok(())
}

impl PipelineConfig {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    /// `OutbreakError::IoError` or `OutbreakError::JsonError` if the file cannot be read or
    /// parsed, `OutbreakError::InvalidInput` if a value is out of range.
    pub fn load(path: &Path) -> Result<Self, OutbreakError> {
        let reader = BufReader::new(File::open(path)?);
        let config: PipelineConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every setting once, so that the simulator can run without range checks.
    ///
    /// # Errors
    /// `OutbreakError::InvalidInput` naming the first offending setting.
    pub fn validate(&self) -> Result<(), OutbreakError> {
        if self.folds < 2 {
            return Err(OutbreakError::InvalidInput(format!(
                "folds must be at least 2, got {}",
                self.folds
            )));
        }
        positive_count("fold_calibration_sims", self.fold_calibration_sims)?;
        positive_count("fold_test_sims", self.fold_test_sims)?;
        positive_count("holdout_sims", self.holdout_sims)?;
        positive_count("full_sims", self.full_sims)?;
        positive_count("scenario_sims", self.scenario_sims)?;
        if !(self.holdout_train_fraction > 0.0 && self.holdout_train_fraction < 1.0) {
            return Err(OutbreakError::InvalidInput(format!(
                "holdout_train_fraction must be in (0, 1), got {}",
                self.holdout_train_fraction
            )));
        }

        let t = &self.base_transmission;
        probability("beta_staff_staff", t.beta_staff_staff)?;
        probability("beta_handler_patron", t.beta_handler_patron)?;
        probability("beta_other_patron", t.beta_other_patron)?;
        probability("prob_food_contamination", t.prob_food_contamination)?;
        t.contamination_lognormal()
            .map_err(|e| OutbreakError::InvalidInput(e.to_string()))?;

        let d = &self.disease;
        probability("prob_symptomatic", d.prob_symptomatic)?;
        if d.latent_period < 0.0 || d.infectious_period < 0.0 {
            return Err(OutbreakError::InvalidInput(
                "disease periods must not be negative".to_string(),
            ));
        }

        RestaurantSampler::new(self.restaurant)?;
        check_grid("fast_grid", &self.fast_grid)?;
        check_grid("full_grid", &self.full_grid)?;
        Ok(())
    }

    /// The model every stage of the pipeline simulates.
    ///
    /// # Errors
    /// `OutbreakError::InvalidInput` if the restaurant overrides are inconsistent.
    pub fn model(&self) -> Result<OutbreakModel, OutbreakError> {
        OutbreakModel::new(self.restaurant, self.disease)
    }

    /// Calibrator used inside k-fold validation.
    #[must_use]
    pub fn fold_calibrator(&self) -> Calibrator {
        Calibrator::new(self.fast_grid.clone(), self.fold_calibration_sims)
            .with_base(self.base_transmission)
    }

    /// Calibrator used for holdout validation.
    #[must_use]
    pub fn holdout_calibrator(&self) -> Calibrator {
        Calibrator::new(self.full_grid.clone(), self.holdout_sims)
            .with_base(self.base_transmission)
    }

    /// Calibrator used for the final fit.
    #[must_use]
    pub fn full_calibrator(&self) -> Calibrator {
        Calibrator::new(self.full_grid.clone(), self.full_sims)
            .with_base(self.base_transmission)
            .keeping_batch(true)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_object_gives_defaults() {
        let file = write_config("{}");
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.folds, 5);
        assert_eq!(config.fold_test_sims, 200);
        assert_eq!(config.holdout_sims, 300);
        assert_eq!(config.full_sims, 500);
        assert_eq!(config.scenario_sims, 1500);
        assert_eq!(config.fast_grid.len(), 240);
        assert_eq!(config.full_grid.len(), 1200);
    }

    #[test]
    fn partial_settings_keep_other_defaults() {
        let file = write_config(
            r#"{"folds": 3, "base_transmission": {"beta_other_patron": 0.002},
                "restaurant": {"max_days": 7, "init_infected": 1}, "run_scenarios": false}"#,
        );
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.folds, 3);
        assert_eq!(config.base_transmission.beta_other_patron, 0.002);
        assert_eq!(config.base_transmission.beta_staff_staff, 0.1);
        assert_eq!(config.restaurant.max_days, 7);
        assert_eq!(config.restaurant.init_infected, Some(1));
        assert!(config.restaurant.n_food_handlers.is_none());
        assert!(!config.run_scenarios);
        assert_eq!(
            config.fold_calibrator().grid(),
            &ParameterGrid::fast()
        );
        assert_eq!(config.full_calibrator().n_sims(), 500);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for json in [
            r#"{"folds": 1}"#,
            r#"{"holdout_train_fraction": 1.0}"#,
            r#"{"full_sims": 0}"#,
            r#"{"base_transmission": {"beta_staff_staff": 1.5}}"#,
            r#"{"base_transmission": {"contamination_size_mean": 0.0}}"#,
            r#"{"disease": {"prob_symptomatic": -0.1}}"#,
            r#"{"restaurant": {"init_infected": 9}}"#,
            r#"{"fast_grid": {"beta_handler_patron": [], "prob_food_contamination": [0.1],
                "contamination_size_mean": [45.0], "beta_staff_staff": [0.1]}}"#,
        ] {
            let file = write_config(json);
            assert!(
                matches!(
                    PipelineConfig::load(file.path()),
                    Err(OutbreakError::InvalidInput(_))
                ),
                "{json} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_files() {
        let file = write_config(r#"{"folds": "five"}"#);
        assert!(matches!(
            PipelineConfig::load(file.path()),
            Err(OutbreakError::JsonError(_))
        ));
        let unknown = write_config(r#"{"fold": 5}"#);
        assert!(matches!(
            PipelineConfig::load(unknown.path()),
            Err(OutbreakError::JsonError(_))
        ));
        assert!(matches!(
            PipelineConfig::load(Path::new("/nonexistent/config.json")),
            Err(OutbreakError::IoError(_))
        ));
    }
}
