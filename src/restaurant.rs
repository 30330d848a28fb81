//! The restaurant a trial takes place in: staff composition, initial infections and patron
//! volumes. A fresh [`RestaurantConfiguration`] is drawn for every trial from fixed discrete
//! distributions, except for the fields a caller pins through [`RestaurantOverrides`].

use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::OutbreakError;
use crate::random::DiscreteTable;

/// Number of food handlers and its probability.
pub const FOOD_HANDLER_DISTRIBUTION: [(usize, f64); 5] =
    [(3, 0.1), (4, 0.2), (5, 0.4), (6, 0.2), (7, 0.1)];
/// Number of other (non-handler) staff and its probability.
pub const OTHER_STAFF_DISTRIBUTION: [(usize, f64); 4] = [(3, 0.2), (4, 0.3), (5, 0.3), (6, 0.2)];
/// Number of staff infected at the start of the trial and its probability.
pub const INITIAL_INFECTED_DISTRIBUTION: [(usize, f64); 3] = [(1, 0.6), (2, 0.3), (3, 0.1)];
/// Patrons served per shift and its probability.
pub const PATRONS_PER_SHIFT_DISTRIBUTION: [(u64, f64); 5] =
    [(100, 0.2), (125, 0.2), (150, 0.3), (175, 0.2), (200, 0.1)];

/// Lower bound on the size of a food contamination event.
pub const MIN_CONTAMINATION_SIZE: u64 = 10;
/// Largest share of a shift's patrons one contamination event can infect.
pub const MAX_CONTAMINATION_SHARE: f64 = 0.9;

/// One concrete restaurant. Immutable for the duration of a trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantConfiguration {
    pub n_food_handlers: usize,
    pub n_other_staff: usize,
    pub init_infected: usize,
    pub patrons_per_shift: u64,
    pub patrons_per_handler: u64,
    pub shifts_per_day: u32,
    pub max_days: u32,
}

impl RestaurantConfiguration {
    #[must_use]
    pub fn total_staff(&self) -> usize {
        self.n_food_handlers + self.n_other_staff
    }

    /// `floor(0.9 * patrons_per_shift)`, the cap on one contamination event.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn max_contamination_size(&self) -> u64 {
        (self.patrons_per_shift as f64 * MAX_CONTAMINATION_SHARE).floor() as u64
    }

    /// Clamps a raw contamination draw to `[10, max_contamination_size()]`. The upper clamp is
    /// applied first, so the lower bound wins when the cap is below 10.
    #[must_use]
    pub fn clamp_contamination_size(&self, raw: u64) -> u64 {
        raw.min(self.max_contamination_size())
            .max(MIN_CONTAMINATION_SIZE)
    }
}

/// Fields of a [`RestaurantConfiguration`] that are fixed by the caller. `None` means "sample it
/// for every trial"; the remaining fields have fixed documented defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantOverrides {
    pub n_food_handlers: Option<usize>,
    pub n_other_staff: Option<usize>,
    pub init_infected: Option<usize>,
    pub patrons_per_shift: Option<u64>,
    /// Patrons each working handler serves per shift. Default 30.
    pub patrons_per_handler: u64,
    /// Default 2.
    pub shifts_per_day: u32,
    /// Simulation horizon in days. Default 5.
    pub max_days: u32,
    /// Length of a shift in hours. Descriptive only; default 8.
    pub shift_hours: f64,
}

impl Default for RestaurantOverrides {
    fn default() -> Self {
        Self {
            n_food_handlers: None,
            n_other_staff: None,
            init_infected: None,
            patrons_per_shift: None,
            patrons_per_handler: 30,
            shifts_per_day: 2,
            max_days: 5,
            shift_hours: 8.0,
        }
    }
}

impl RestaurantOverrides {
    /// Every field pinned, for fully controlled trials.
    #[must_use]
    pub fn fixed(configuration: RestaurantConfiguration) -> Self {
        Self {
            n_food_handlers: Some(configuration.n_food_handlers),
            n_other_staff: Some(configuration.n_other_staff),
            init_infected: Some(configuration.init_infected),
            patrons_per_shift: Some(configuration.patrons_per_shift),
            patrons_per_handler: configuration.patrons_per_handler,
            shifts_per_day: configuration.shifts_per_day,
            max_days: configuration.max_days,
            ..Self::default()
        }
    }
}

/// Draws restaurant configurations. Validates the overrides once, on construction, so that every
/// configuration it produces has `init_infected <= total_staff`.
#[derive(Clone, Debug)]
pub struct RestaurantSampler {
    overrides: RestaurantOverrides,
    food_handlers: DiscreteTable<usize>,
    other_staff: DiscreteTable<usize>,
    initial_infected: DiscreteTable<usize>,
    patrons_per_shift: DiscreteTable<u64>,
}

impl RestaurantSampler {
    /// # Errors
    /// `OutbreakError::InvalidInput` if the overrides allow a restaurant without staff or with
    /// more initially infected members than staff.
    pub fn new(overrides: RestaurantOverrides) -> Result<Self, OutbreakError> {
        let sampler = Self {
            overrides,
            food_handlers: DiscreteTable::new(&FOOD_HANDLER_DISTRIBUTION)?,
            other_staff: DiscreteTable::new(&OTHER_STAFF_DISTRIBUTION)?,
            initial_infected: DiscreteTable::new(&INITIAL_INFECTED_DISTRIBUTION)?,
            patrons_per_shift: DiscreteTable::new(&PATRONS_PER_SHIFT_DISTRIBUTION)?,
        };

        let min_staff = overrides
            .n_food_handlers
            .unwrap_or_else(|| min_of(sampler.food_handlers.values()))
            + overrides
                .n_other_staff
                .unwrap_or_else(|| min_of(sampler.other_staff.values()));
        let max_infected = overrides
            .init_infected
            .unwrap_or_else(|| max_of(sampler.initial_infected.values()));
        if min_staff == 0 {
            return Err(OutbreakError::InvalidInput(
                "a restaurant needs at least one staff member".to_string(),
            ));
        }
        if max_infected > min_staff {
            return Err(OutbreakError::InvalidInput(format!(
                "up to {max_infected} initially infected staff but as few as {min_staff} staff"
            )));
        }
        Ok(sampler)
    }

    #[must_use]
    pub fn overrides(&self) -> &RestaurantOverrides {
        &self.overrides
    }

    /// Materializes one configuration. Absent fields are drawn in the order handlers, other
    /// staff, initially infected, patrons per shift.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> RestaurantConfiguration {
        let overrides = &self.overrides;
        let n_food_handlers = overrides
            .n_food_handlers
            .unwrap_or_else(|| self.food_handlers.sample(rng));
        let n_other_staff = overrides
            .n_other_staff
            .unwrap_or_else(|| self.other_staff.sample(rng));
        let init_infected = overrides
            .init_infected
            .unwrap_or_else(|| self.initial_infected.sample(rng));
        let patrons_per_shift = overrides
            .patrons_per_shift
            .unwrap_or_else(|| self.patrons_per_shift.sample(rng));

        let configuration = RestaurantConfiguration {
            n_food_handlers,
            n_other_staff,
            init_infected,
            patrons_per_shift,
            patrons_per_handler: overrides.patrons_per_handler,
            shifts_per_day: overrides.shifts_per_day,
            max_days: overrides.max_days,
        };
        trace!("sampled restaurant {configuration:?}");
        configuration
    }
}

fn min_of(values: &[usize]) -> usize {
    values.iter().copied().min().unwrap_or(0)
}

fn max_of(values: &[usize]) -> usize {
    values.iter().copied().max().unwrap_or(0)
}
