//! The outbreak simulator: a discrete-time, agent-based model of one restaurant's staff, and of
//! the patrons they infect, over a horizon of a few days.
//!
//! One call to [`OutbreakModel::simulate`] is one stochastic trial. It returns a single number,
//! the cumulative count of staff infections (seeded ones included) plus patron infections.
//! [`OutbreakModel::simulate_with_policy`] runs the same process with a [`PolicySettings`]
//! overlay: hygiene scales the adjustable probabilities, exclusion removes symptomatic members
//! from work. With both policies off it consumes the random stream exactly like the policy-free
//! variant.
//!
//! Each simulated day runs these steps in order:
//! 1. progression of every member (`E -> Ia | Is`, `Ia | Is -> R`);
//! 2. exclusion and reinstatement, if the exclusion policy is active;
//! 3. staff-to-staff transmission;
//! 4. per shift, patron exposure from working infectious handlers and other staff, and at most
//!    one food contamination event.
//!
//! A symptomatic member skips each contact evaluation independently with probability one half,
//! both per staff pair and again per shift.
//!
//! Parameters are not range-checked here. Supplying probabilities in `[0, 1]` and a positive
//! contamination mean is the caller's responsibility; values the random distributions reject
//! come back as [`OutbreakError::InvalidParameter`].

use log::trace;
use rand::distr::Distribution;
use rand::Rng;
use rand_distr::{Binomial, LogNormal};

use crate::error::OutbreakError;
use crate::parameters::{DiseaseParameters, EffectiveRates, PolicySettings, TransmissionParameters};
use crate::random::RngSamplingExt;
use crate::restaurant::{RestaurantConfiguration, RestaurantOverrides, RestaurantSampler};
use crate::staff::{DiseaseState, StaffId, StaffMember};

/// Cumulative staff plus patron infections of one trial.
pub type OutbreakSize = u64;

/// Probability that a symptomatic member sits out one contact evaluation.
pub const SYMPTOMATIC_SKIP_PROBABILITY: f64 = 0.5;

/// The fixed part of the model: how restaurants are drawn and how the illness progresses.
#[derive(Clone, Debug)]
pub struct OutbreakModel {
    sampler: RestaurantSampler,
    disease: DiseaseParameters,
}

impl OutbreakModel {
    /// # Errors
    /// `OutbreakError::InvalidInput` if the restaurant overrides are inconsistent.
    pub fn new(
        overrides: RestaurantOverrides,
        disease: DiseaseParameters,
    ) -> Result<Self, OutbreakError> {
        Ok(Self {
            sampler: RestaurantSampler::new(overrides)?,
            disease,
        })
    }

    /// Sampled restaurants and the default disease parameters.
    ///
    /// # Errors
    /// Only if the built-in restaurant tables were invalid.
    pub fn standard() -> Result<Self, OutbreakError> {
        Self::new(RestaurantOverrides::default(), DiseaseParameters::default())
    }

    #[must_use]
    pub fn disease(&self) -> &DiseaseParameters {
        &self.disease
    }

    #[must_use]
    pub fn restaurant_overrides(&self) -> &RestaurantOverrides {
        self.sampler.overrides()
    }

    /// Builds the distributions a trial needs once, so that batches of trials with the same
    /// parameters do not rebuild them. `policy: None` is the policy-free variant.
    ///
    /// # Errors
    /// `OutbreakError::InvalidParameter` if the handler-to-patron probability or the
    /// contamination size moments are not usable.
    pub fn prepare(
        &self,
        transmission: &TransmissionParameters,
        policy: Option<&PolicySettings>,
    ) -> Result<PreparedTrial<'_>, OutbreakError> {
        let rates = match policy {
            Some(policy) => policy.effective_rates(transmission),
            None => EffectiveRates::unadjusted(transmission),
        };
        let patrons_per_handler = self.sampler.overrides().patrons_per_handler;
        let handler_patron = Binomial::new(patrons_per_handler, rates.beta_handler_patron)
            .map_err(|e| {
                OutbreakError::InvalidParameter(format!(
                    "handler-to-patron binomial(n={patrons_per_handler}, p={}): {e}",
                    rates.beta_handler_patron
                ))
            })?;
        let (mu, sigma) = transmission.contamination_lognormal()?;
        let contamination = LogNormal::new(mu, sigma).map_err(|e| {
            OutbreakError::InvalidParameter(format!("contamination log-normal: {e}"))
        })?;
        let exclusion = policy.filter(|p| p.exclusion).map(|p| Exclusion {
            rate: p.exclusion_rate(),
            omega: p.omega,
        });

        Ok(PreparedTrial {
            model: self,
            rates,
            beta_other_patron: transmission.beta_other_patron,
            handler_patron,
            contamination,
            exclusion,
        })
    }

    /// One policy-free trial.
    ///
    /// # Errors
    /// See [`OutbreakModel::prepare`] and [`PreparedTrial::run`].
    pub fn simulate<R: Rng>(
        &self,
        rng: &mut R,
        transmission: &TransmissionParameters,
    ) -> Result<OutbreakSize, OutbreakError> {
        self.prepare(transmission, None)?.run(rng)
    }

    /// One trial under the given policies.
    ///
    /// # Errors
    /// See [`OutbreakModel::prepare`] and [`PreparedTrial::run`].
    pub fn simulate_with_policy<R: Rng>(
        &self,
        rng: &mut R,
        transmission: &TransmissionParameters,
        policy: &PolicySettings,
    ) -> Result<OutbreakSize, OutbreakError> {
        self.prepare(transmission, Some(policy))?.run(rng)
    }

    /// `n_sims` independent policy-free trials.
    ///
    /// # Errors
    /// The first error any trial hits; no partial batch is returned.
    pub fn simulate_batch<R: Rng>(
        &self,
        rng: &mut R,
        transmission: &TransmissionParameters,
        n_sims: usize,
    ) -> Result<Vec<OutbreakSize>, OutbreakError> {
        self.prepare(transmission, None)?.run_batch(rng, n_sims)
    }

    /// `n_sims` independent trials under the given policies.
    ///
    /// # Errors
    /// The first error any trial hits; no partial batch is returned.
    pub fn simulate_batch_with_policy<R: Rng>(
        &self,
        rng: &mut R,
        transmission: &TransmissionParameters,
        policy: &PolicySettings,
        n_sims: usize,
    ) -> Result<Vec<OutbreakSize>, OutbreakError> {
        self.prepare(transmission, Some(policy))?.run_batch(rng, n_sims)
    }
}

#[derive(Clone, Copy, Debug)]
struct Exclusion {
    rate: f64,
    omega: f64,
}

/// A model bound to one parameter set, ready to run trials.
#[derive(Debug)]
pub struct PreparedTrial<'a> {
    model: &'a OutbreakModel,
    rates: EffectiveRates,
    beta_other_patron: f64,
    handler_patron: Binomial,
    contamination: LogNormal<f64>,
    exclusion: Option<Exclusion>,
}

/// Points in a trial at which a [`TrialObserver`] sees the roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TrialPhase {
    Seeded,
    Progression,
    Exclusion,
    StaffTransmission,
}

/// Receives the roster after every phase that can change a member. Used by tests to check
/// per-member invariants; trials themselves retain no trajectory.
pub(crate) trait TrialObserver {
    fn observe(&mut self, day: u32, phase: TrialPhase, staff: &[StaffMember]);
}

impl TrialObserver for () {
    fn observe(&mut self, _day: u32, _phase: TrialPhase, _staff: &[StaffMember]) {}
}

impl PreparedTrial<'_> {
    #[must_use]
    pub fn rates(&self) -> &EffectiveRates {
        &self.rates
    }

    /// Runs one trial.
    ///
    /// # Errors
    /// `OutbreakError::InvalidParameter` if the other-staff-to-patron probability
    /// `beta_other_patron * count` leaves `[0, 1]`.
    pub fn run<R: Rng>(&self, rng: &mut R) -> Result<OutbreakSize, OutbreakError> {
        self.run_observed(rng, &mut ())
    }

    /// Runs `n_sims` trials.
    ///
    /// # Errors
    /// The first error any trial hits.
    pub fn run_batch<R: Rng>(
        &self,
        rng: &mut R,
        n_sims: usize,
    ) -> Result<Vec<OutbreakSize>, OutbreakError> {
        (0..n_sims).map(|_| self.run(rng)).collect()
    }

    pub(crate) fn run_observed<R: Rng, O: TrialObserver>(
        &self,
        rng: &mut R,
        observer: &mut O,
    ) -> Result<OutbreakSize, OutbreakError> {
        let disease = &self.model.disease;
        let restaurant = self.model.sampler.sample(rng);
        let total_staff = restaurant.total_staff();

        let mut staff: Vec<StaffMember> = (0..total_staff)
            .map(|i| StaffMember::new(StaffId(i), i < restaurant.n_food_handlers))
            .collect();
        for index in rng.choose_without_replacement(total_staff, restaurant.init_infected) {
            staff[index] = staff[index].infected(0.0);
        }
        observer.observe(0, TrialPhase::Seeded, &staff);

        let mut staff_infections = restaurant.init_infected as u64;
        let mut patron_infections: u64 = 0;

        for day in 0..restaurant.max_days {
            for member in &mut staff {
                *member = member.progressed(day, disease, || {
                    rng.sample_bool(disease.prob_symptomatic)
                });
            }
            observer.observe(day, TrialPhase::Progression, &staff);

            if let Some(exclusion) = self.exclusion {
                for member in &mut staff {
                    if member.is_symptomatic() && !member.excluded && rng.sample_bool(exclusion.rate)
                    {
                        *member = member.excluded();
                    }
                }
                for member in &mut staff {
                    if member.excluded && rng.sample_bool(exclusion.omega) {
                        *member = member.reinstated();
                    }
                }
                observer.observe(day, TrialPhase::Exclusion, &staff);
            }

            // Nobody becomes infectious or stops being infectious for the rest of the day.
            let infectious: Vec<StaffId> = staff
                .iter()
                .filter(|member| member.is_active_infectious())
                .map(|member| member.id)
                .collect();

            for s in 0..total_staff {
                if staff[s].state != DiseaseState::Susceptible || staff[s].excluded {
                    continue;
                }
                for &StaffId(z) in &infectious {
                    if staff[z].is_symptomatic() && rng.sample_bool(SYMPTOMATIC_SKIP_PROBABILITY)
                    {
                        continue;
                    }
                    if rng.sample_bool(self.rates.beta_staff_staff) {
                        let time = f64::from(day) + rng.sample_uniform();
                        staff[s] = staff[s].infected(time);
                        staff_infections += 1;
                        break;
                    }
                }
            }
            observer.observe(day, TrialPhase::StaffTransmission, &staff);

            for _ in 0..restaurant.shifts_per_day {
                patron_infections += self.run_shift(rng, &restaurant, &staff, &infectious)?;
            }
        }

        trace!("trial: {staff_infections} staff and {patron_infections} patron infections");
        Ok(staff_infections + patron_infections)
    }

    /// Patron infections caused during one shift.
    fn run_shift<R: Rng>(
        &self,
        rng: &mut R,
        restaurant: &RestaurantConfiguration,
        staff: &[StaffMember],
        infectious: &[StaffId],
    ) -> Result<u64, OutbreakError> {
        let mut working_handlers: u64 = 0;
        let mut working_other: u64 = 0;
        for &StaffId(i) in infectious {
            let member = &staff[i];
            if member.is_symptomatic() && rng.sample_bool(SYMPTOMATIC_SKIP_PROBABILITY) {
                continue;
            }
            if member.is_handler {
                working_handlers += 1;
            } else {
                working_other += 1;
            }
        }

        let mut infections: u64 = 0;
        for _ in 0..working_handlers {
            infections += self.handler_patron.sample(rng);
        }
        if working_other > 0 {
            #[allow(clippy::cast_precision_loss)]
            let p = self.beta_other_patron * working_other as f64;
            infections += rng.sample_binomial(restaurant.patrons_per_shift, p)?;
        }
        if working_handlers > 0 && rng.sample_bool(self.rates.prob_food_contamination) {
            let raw: f64 = rng.sample_distr(&self.contamination);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let size = restaurant.clamp_contamination_size(raw as u64);
            infections += size;
        }
        Ok(infections)
    }
}
