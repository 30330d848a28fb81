//! Simulation and calibration of foodborne illness outbreaks in restaurants
//!
//! The crate models how an illness spreads among the staff of a single restaurant over a few
//! days, and from the staff to the patrons they serve, and fits the transmission parameters of
//! that model to a sample of observed outbreak sizes.
//!
//! It is organized in layers, each using only the ones before it:
//! * [`random`]: explicit, seedable random streams and the draws the simulator needs.
//! * [`simulation`]: the agent-based outbreak simulator, with and without the exclusion and
//!   hygiene policies described by [`parameters::PolicySettings`].
//! * [`scoring`]: the percentile-weighted distance between observed and simulated sizes.
//! * [`calibration`]: an exhaustive search over a grid of transmission parameters.
//! * [`validation`]: stratified k-fold and holdout validation of the calibrated parameters.
//!
//! Around these sit fit diagnostics ([`metrics`]), named policy scenarios ([`scenarios`]), input
//! loading ([`data`], [`config`]), output writing ([`report`]) and the command line pipeline
//! ([`runner`]).
//!
//! No component holds a global random generator. Every entry point takes `&mut R` with
//! `R: rand::Rng`, so a run is reproducible from a single seed:
//!
//! ```rust
//! use restaurant_outbreak::parameters::TransmissionParameters;
//! use restaurant_outbreak::random::seeded_stream;
//! use restaurant_outbreak::simulation::OutbreakModel;
//!
//! let model = OutbreakModel::standard().unwrap();
//! let mut rng = seeded_stream(42, "example");
//! let sizes = model
//!     .simulate_batch(&mut rng, &TransmissionParameters::default(), 100)
//!     .unwrap();
//! assert_eq!(sizes.len(), 100);
//! ```
pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod log;
pub mod macros;
pub mod metrics;
pub mod numeric;
pub mod parameters;
pub mod progress;
pub mod random;
pub mod report;
pub mod restaurant;
pub mod runner;
pub mod scenarios;
pub mod scoring;
pub mod simulation;
pub mod staff;
pub mod validation;

pub use error::OutbreakError;

// Re-export for consumers that want to build their own streams
pub use rand;
