//! Staff members and their disease state transitions.
//!
//! A [`StaffMember`] is a small `Copy` value addressed by its [`StaffId`], the position in the
//! trial's roster. Transitions are methods that take a member by value and return the updated
//! member, so a trial step reads the current roster and writes new records without aliasing.
//! States only move forward along `S -> E -> {Ia | Is} -> R`.

use serde::{Deserialize, Serialize};

use crate::parameters::DiseaseParameters;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseState {
    Susceptible,
    /// Infected, not yet infectious.
    Exposed,
    InfectiousAsymptomatic,
    InfectiousSymptomatic,
    Recovered,
}

impl DiseaseState {
    #[must_use]
    pub fn is_infectious(self) -> bool {
        matches!(
            self,
            DiseaseState::InfectiousAsymptomatic | DiseaseState::InfectiousSymptomatic
        )
    }

    /// Whether `next` may directly follow `self` within one simulated day.
    #[must_use]
    pub fn may_become(self, next: DiseaseState) -> bool {
        use DiseaseState::{
            Exposed, InfectiousAsymptomatic, InfectiousSymptomatic, Recovered, Susceptible,
        };
        self == next
            || matches!(
                (self, next),
                (Susceptible, Exposed)
                    | (Exposed, InfectiousAsymptomatic | InfectiousSymptomatic)
                    | (InfectiousAsymptomatic | InfectiousSymptomatic, Recovered)
            )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StaffId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaffMember {
    pub id: StaffId,
    pub state: DiseaseState,
    /// Simulated time (in days) at which the member was infected; `None` while susceptible.
    pub infection_time: Option<f64>,
    pub is_handler: bool,
    /// Currently kept away from work by the exclusion policy. Never set when that policy is
    /// inactive.
    pub excluded: bool,
}

impl StaffMember {
    /// A susceptible, working member.
    #[must_use]
    pub fn new(id: StaffId, is_handler: bool) -> Self {
        Self {
            id,
            state: DiseaseState::Susceptible,
            infection_time: None,
            is_handler,
            excluded: false,
        }
    }

    /// Infectious and at work, so able to transmit.
    #[must_use]
    pub fn is_active_infectious(&self) -> bool {
        self.state.is_infectious() && !self.excluded
    }

    #[must_use]
    pub fn is_symptomatic(&self) -> bool {
        self.state == DiseaseState::InfectiousSymptomatic
    }

    /// `S -> E` at `time`. Members that are not susceptible are returned unchanged.
    #[must_use]
    pub fn infected(self, time: f64) -> Self {
        if self.state != DiseaseState::Susceptible {
            return self;
        }
        Self {
            state: DiseaseState::Exposed,
            infection_time: Some(time),
            ..self
        }
    }

    /// Applies at most one progression step at the start of `day`:
    /// * `E -> Is | Ia` once `latent_period` has elapsed since infection. `symptomatic` is only
    ///   called in that case, and decides which infectious state is entered.
    /// * `Ia | Is -> R` once `latent_period + infectious_period` has elapsed.
    #[must_use]
    pub fn progressed(
        self,
        day: u32,
        disease: &DiseaseParameters,
        symptomatic: impl FnOnce() -> bool,
    ) -> Self {
        let Some(infection_time) = self.infection_time else {
            return self;
        };
        let elapsed = f64::from(day) - infection_time;
        match self.state {
            DiseaseState::Exposed if elapsed >= disease.latent_period => Self {
                state: if symptomatic() {
                    DiseaseState::InfectiousSymptomatic
                } else {
                    DiseaseState::InfectiousAsymptomatic
                },
                ..self
            },
            DiseaseState::InfectiousAsymptomatic | DiseaseState::InfectiousSymptomatic
                if elapsed >= disease.latent_period + disease.infectious_period =>
            {
                Self {
                    state: DiseaseState::Recovered,
                    ..self
                }
            }
            _ => self,
        }
    }

    /// Removed from work by the exclusion policy. The disease clock keeps running.
    #[must_use]
    pub fn excluded(self) -> Self {
        Self {
            excluded: true,
            ..self
        }
    }

    /// Back at work after exclusion, no longer infectious.
    #[must_use]
    pub fn reinstated(self) -> Self {
        Self {
            excluded: false,
            state: DiseaseState::Recovered,
            ..self
        }
    }
}
