//! Parameter sets fed to the outbreak simulator.
//!
//! Every struct here has a `Default` carrying the documented baseline values and derives serde so
//! that it can be read from a pipeline configuration file and written alongside results.
//!
//! None of these values are range-checked on the simulation path. Probabilities are expected in
//! `[0, 1]`, periods and contamination sizes positive; a value a random distribution cannot accept
//! surfaces as [`OutbreakError::InvalidParameter`] when a trial is prepared or run.

use serde::{Deserialize, Serialize};

use crate::error::OutbreakError;

/// Natural history of the illness in a staff member.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseParameters {
    /// Days from infection until the member becomes infectious.
    pub latent_period: f64,
    /// Days an infectious member stays infectious.
    pub infectious_period: f64,
    /// Probability that a member becoming infectious shows symptoms.
    pub prob_symptomatic: f64,
}

impl Default for DiseaseParameters {
    fn default() -> Self {
        Self {
            latent_period: 1.0,
            infectious_period: 3.0,
            prob_symptomatic: 0.7,
        }
    }
}

/// The transmission parameters searched by the grid calibrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmissionParameters {
    /// Per-day probability that one infectious member infects one susceptible coworker.
    pub beta_staff_staff: f64,
    /// Per-patron probability that a working infectious handler infects a patron it serves.
    pub beta_handler_patron: f64,
    /// Per-patron probability, per infectious non-handler, of infecting a patron in the shift.
    pub beta_other_patron: f64,
    /// Per-shift probability of a food contamination event while a handler is infectious.
    pub prob_food_contamination: f64,
    /// Mean number of patrons infected by one contamination event.
    pub contamination_size_mean: f64,
    /// Standard deviation of the contamination event size.
    pub contamination_size_std: f64,
}

impl Default for TransmissionParameters {
    fn default() -> Self {
        Self {
            beta_staff_staff: 0.1,
            beta_handler_patron: 0.02,
            beta_other_patron: 0.001,
            prob_food_contamination: 0.15,
            contamination_size_mean: 45.0,
            contamination_size_std: 30.0,
        }
    }
}

impl TransmissionParameters {
    /// Parameters `(mu, sigma)` of the underlying normal distribution of a log-normal whose mean
    /// and standard deviation are `contamination_size_mean` and `contamination_size_std`.
    ///
    /// # Errors
    /// `OutbreakError::InvalidParameter` if the mean is not positive or the result is not finite.
    pub fn contamination_lognormal(&self) -> Result<(f64, f64), OutbreakError> {
        let mean = self.contamination_size_mean;
        let std = self.contamination_size_std;
        if mean <= 0.0 {
            return Err(OutbreakError::InvalidParameter(format!(
                "contamination_size_mean must be positive, got {mean}"
            )));
        }
        let sigma = (1.0 + (std / mean).powi(2)).ln().sqrt();
        let mu = mean.ln() - sigma * sigma / 2.0;
        if !(mu.is_finite() && sigma.is_finite()) {
            return Err(OutbreakError::InvalidParameter(format!(
                "contamination size mean {mean} / std {std} give a non-finite log-normal"
            )));
        }
        Ok((mu, sigma))
    }
}

/// The intervention overlay for the policy-aware simulator. Both policies are independently
/// toggleable; `compliance` scales whichever ones are active and has no effect otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Exclude symptomatic workers from work.
    pub exclusion: bool,
    /// Hygiene measures reducing transmission and contamination probabilities.
    pub hygiene: bool,
    /// Fraction (0 to 1) of adherence to the active policies.
    pub compliance: f64,
    /// Daily exclusion probability of a symptomatic worker at full compliance.
    pub xi_max: f64,
    /// Daily probability that an excluded worker returns to work, recovered.
    pub omega: f64,
    /// Transmission multiplier under fully complied hygiene (0.7 moderate, 0.4 strict).
    pub beta_mult: f64,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            exclusion: false,
            hygiene: false,
            compliance: 0.0,
            xi_max: 0.4,
            omega: 0.2,
            beta_mult: 0.70,
        }
    }
}

impl PolicySettings {
    /// No intervention at all.
    #[must_use]
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Exclusion of symptomatic workers only.
    #[must_use]
    pub fn exclusion_only(compliance: f64) -> Self {
        Self {
            exclusion: true,
            compliance,
            ..Self::default()
        }
    }

    /// Hygiene only, with the given full-compliance multiplier.
    #[must_use]
    pub fn hygiene_only(compliance: f64, beta_mult: f64) -> Self {
        Self {
            hygiene: true,
            compliance,
            beta_mult,
            ..Self::default()
        }
    }

    /// Both policies.
    #[must_use]
    pub fn combined(compliance: f64, beta_mult: f64) -> Self {
        Self {
            exclusion: true,
            hygiene: true,
            compliance,
            beta_mult,
            ..Self::default()
        }
    }

    /// Multiplier applied to staff-to-staff, handler-to-patron and contamination probabilities:
    /// `1 - (1 - beta_mult) * compliance` under hygiene, exactly `1.0` otherwise.
    #[must_use]
    pub fn hygiene_factor(&self) -> f64 {
        if self.hygiene {
            1.0 - (1.0 - self.beta_mult) * self.compliance
        } else {
            1.0
        }
    }

    /// Daily probability that a symptomatic, working member is excluded; zero without the
    /// exclusion policy.
    #[must_use]
    pub fn exclusion_rate(&self) -> f64 {
        if self.exclusion {
            self.compliance * self.xi_max
        } else {
            0.0
        }
    }

    /// The probabilities a trial actually uses once the hygiene policy is applied.
    #[must_use]
    pub fn effective_rates(&self, transmission: &TransmissionParameters) -> EffectiveRates {
        if !self.hygiene {
            return EffectiveRates::unadjusted(transmission);
        }
        let factor = self.hygiene_factor();
        EffectiveRates {
            beta_staff_staff: transmission.beta_staff_staff * factor,
            beta_handler_patron: transmission.beta_handler_patron * factor,
            prob_food_contamination: transmission.prob_food_contamination * factor,
        }
    }
}

/// The hygiene-adjustable probabilities of a trial.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectiveRates {
    pub beta_staff_staff: f64,
    pub beta_handler_patron: f64,
    pub prob_food_contamination: f64,
}

impl EffectiveRates {
    #[must_use]
    pub fn unadjusted(transmission: &TransmissionParameters) -> Self {
        Self {
            beta_staff_staff: transmission.beta_staff_staff,
            beta_handler_patron: transmission.beta_handler_patron,
            prob_food_contamination: transmission.prob_food_contamination,
        }
    }
}
