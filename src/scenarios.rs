//! Named policy scenarios run at calibrated parameters, and the table that summarizes them.
//!
//! [`standard_scenarios`] enumerates sixteen scenarios: a baseline, exclusion alone, moderate
//! (`beta_mult = 0.7`) and strict (`beta_mult = 0.4`) hygiene alone, and each hygiene level
//! combined with exclusion, every intervention at 30%, 60% and 100% compliance. The first scenario
//! of a run is the reference that reductions are measured against.

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::OutbreakError;
use crate::numeric::{mean, percentile_of_sorted, sorted_f64, std_dev};
use crate::parameters::{PolicySettings, TransmissionParameters};
use crate::simulation::{OutbreakModel, OutbreakSize};

pub const SCENARIO_COMPLIANCE_LEVELS: [f64; 3] = [0.3, 0.6, 1.0];
pub const HYGIENE_LEVELS: [(&str, f64); 2] = [("Moderate", 0.7), ("Strict", 0.4)];
/// Trials per scenario in a standard analysis.
pub const SCENARIO_SIMS: usize = 1500;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub policy: PolicySettings,
}

impl Scenario {
    #[must_use]
    pub fn new(name: impl Into<String>, policy: PolicySettings) -> Self {
        Self {
            name: name.into(),
            policy,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(compliance: f64) -> u32 {
    (compliance * 100.0).round() as u32
}

/// The sixteen standard scenarios, baseline first.
#[must_use]
pub fn standard_scenarios() -> Vec<Scenario> {
    let mut scenarios = vec![Scenario::new("A_Baseline", PolicySettings::baseline())];
    for compliance in SCENARIO_COMPLIANCE_LEVELS {
        scenarios.push(Scenario::new(
            format!("B_Exclusion_{}%", percent(compliance)),
            PolicySettings::exclusion_only(compliance),
        ));
    }
    for (level, beta_mult) in HYGIENE_LEVELS {
        for compliance in SCENARIO_COMPLIANCE_LEVELS {
            scenarios.push(Scenario::new(
                format!("C_{level}_{}%", percent(compliance)),
                PolicySettings::hygiene_only(compliance, beta_mult),
            ));
        }
    }
    for (level, beta_mult) in HYGIENE_LEVELS {
        for compliance in SCENARIO_COMPLIANCE_LEVELS {
            scenarios.push(Scenario::new(
                format!("D_{level}_Combined_{}%", percent(compliance)),
                PolicySettings::combined(compliance, beta_mult),
            ));
        }
    }
    scenarios
}

/// Simulated sizes of one scenario.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioOutcome {
    pub name: String,
    pub sizes: Vec<OutbreakSize>,
}

/// Runs `n_sims` policy-aware trials per scenario, in order, all from `rng`.
///
/// # Errors
/// `OutbreakError::InvalidInput` if `n_sims` is zero; any trial error.
pub fn run_scenarios<R: Rng>(
    rng: &mut R,
    model: &OutbreakModel,
    parameters: &TransmissionParameters,
    scenarios: &[Scenario],
    n_sims: usize,
) -> Result<Vec<ScenarioOutcome>, OutbreakError> {
    if n_sims == 0 {
        return Err(OutbreakError::InvalidInput(
            "scenarios need at least one trial each".to_string(),
        ));
    }
    scenarios
        .iter()
        .map(|scenario| {
            info!("running scenario {} ({n_sims} trials)", scenario.name);
            let sizes =
                model.simulate_batch_with_policy(rng, parameters, &scenario.policy, n_sims)?;
            Ok(ScenarioOutcome {
                name: scenario.name.clone(),
                sizes,
            })
        })
        .collect()
}

/// One row of the scenario table. Reductions are percentages relative to the reference scenario
/// and are `None` when the reference statistic is zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    pub mean_reduction_pct: Option<f64>,
    pub median_reduction_pct: Option<f64>,
    pub cases_averted: f64,
}

struct Moments {
    mean: f64,
    median: f64,
    std: f64,
    p25: f64,
    p75: f64,
    p95: f64,
}

fn moments(outcome: &ScenarioOutcome) -> Result<Moments, OutbreakError> {
    let sorted = sorted_f64(&outcome.sizes);
    let empty = || OutbreakError::InvalidInput(format!("scenario {} has no trials", outcome.name));
    let at = |q: f64| percentile_of_sorted(&sorted, q).ok_or_else(empty);
    Ok(Moments {
        mean: mean(&sorted).ok_or_else(empty)?,
        median: at(50.0)?,
        std: std_dev(&sorted).ok_or_else(empty)?,
        p25: at(25.0)?,
        p75: at(75.0)?,
        p95: at(95.0)?,
    })
}

fn reduction(reference: f64, value: f64) -> Option<f64> {
    (reference != 0.0).then(|| (reference - value) / reference * 100.0)
}

/// Summarizes every outcome against the first one.
///
/// # Errors
/// `OutbreakError::InvalidInput` if `outcomes` is empty or any outcome has no trials.
pub fn summarize(outcomes: &[ScenarioOutcome]) -> Result<Vec<ScenarioSummary>, OutbreakError> {
    let reference = outcomes
        .first()
        .ok_or_else(|| OutbreakError::InvalidInput("no scenarios to summarize".to_string()))?;
    let reference = moments(reference)?;

    outcomes
        .iter()
        .map(|outcome| {
            let m = moments(outcome)?;
            Ok(ScenarioSummary {
                scenario: outcome.name.clone(),
                mean: m.mean,
                median: m.median,
                std: m.std,
                p25: m.p25,
                p75: m.p75,
                p95: m.p95,
                mean_reduction_pct: reduction(reference.mean, m.mean),
                median_reduction_pct: reduction(reference.median, m.median),
                cases_averted: reference.mean - m.mean,
            })
        })
        .collect()
}
