//! The `log` module configures the crate's logging. This is not to be confused with _reporting_
//! (see [`crate::report`]), which writes calibration and validation results to files.
//!
//! The five logging macros `error!`, `warn!`, `info!`, `debug!` and `trace!` are re-exported
//! here. Calibration and validation stages log at `info`, new best grid cells at `debug`, and
//! sampled restaurant configurations at `trace`.
//!
//! Logging is _disabled_ by default. It can be enabled from code:
//!
//! ```rust
//! use restaurant_outbreak::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! pub fn setup_logging() {
//!     // Enable `info` log messages globally.
//!     set_log_level(LevelFilter::Info);
//!     // Show every new best cell found by the grid calibrator.
//!     set_module_filter("restaurant_outbreak::calibration", LevelFilter::Debug);
//! }
//! ```
//!
//! or from a level specification such as `"info"` or
//! `"warn,restaurant_outbreak::validation=debug"` via [`set_log_level_from_spec`], which is what
//! the `--log-level` command line option uses.
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

#[cfg(all(feature = "logging", feature = "progress_bar"))]
mod progress_bar_encoder;

pub use log::{debug, error, info, trace, warn, LevelFilter};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::OutbreakError;
#[cfg(feature = "logging")]
use log4rs::Handle;
use std::sync::LazyLock;
use std::sync::{Mutex, MutexGuard};

// Logging disabled
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// The maximum level for one module path (e.g. `"restaurant_outbreak::calibration"`).
#[derive(Debug, PartialEq)]
struct ModuleLogConfiguration {
    module: String,
    level: LevelFilter,
}

impl From<(&str, LevelFilter)> for ModuleLogConfiguration {
    fn from((module, level): (&str, LevelFilter)) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

/// Holds the global level and per-module filters, and a handle to the installed logger.
///
/// A module filter replaces the global level for that module in either direction, so it can
/// raise a module above the global level as well as lower it. No filters are installed by
/// default.
///
/// Loggers are installed globally, so only the one instance in `LOG_CONFIGURATION` exists. The
/// public API are free functions that lock it and call the matching method.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// Level for modules without their own filter. `LevelFilter::Off` disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    module_configurations: HashMap<String, ModuleLogConfiguration>,

    #[cfg(feature = "logging")]
    /// Handle to the `log4rs` logger.
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_configurations: HashMap::new(),

            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    /// Returns true if the configuration was mutated, false otherwise.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) -> bool {
        match self.module_configurations.entry(module.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().level == level {
                    return false;
                }
                entry.get_mut().level = level;
            }
            Entry::Vacant(entry) => {
                entry.insert((module, level).into());
            }
        }
        true
    }

    fn set_module_filters(&mut self, module_filters: &[(&str, LevelFilter)]) {
        let mut mutated = false;
        for (module, level) in module_filters {
            mutated |= self.insert_module_filter(module, *level);
        }
        if mutated {
            self.set_config();
        }
    }

    fn remove_module_filter(&mut self, module: &str) {
        if self.module_configurations.remove(module).is_some() {
            self.set_config();
        }
    }
}

// The public API

/// Enables all log messages. Equivalent to `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    get_log_configuration().set_log_level(level);
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    get_log_configuration().set_module_filters(&[(module_path, level_filter)]);
}

/// Sets the level filters for a set of modules in one go.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    get_log_configuration().set_module_filters(module_filters);
}

/// Removes a module-specific level filter; the global level applies to the module again.
pub fn remove_module_filter(module_path: &str) {
    get_log_configuration().remove_module_filter(module_path);
}

/// Applies a comma separated level specification. A bare level (`info`) sets the global level;
/// `module=level` pairs set module filters. When only module pairs are given, the global level
/// is raised to the most verbose of them so the messages are not dropped at the root.
///
/// # Errors
/// `OutbreakError::InvalidInput` for an unknown level name or an empty module path.
pub fn set_log_level_from_spec(spec: &str) -> Result<(), OutbreakError> {
    let mut global: Option<LevelFilter> = None;
    let mut modules: Vec<(String, LevelFilter)> = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((module, level)) => {
                let module = module.trim();
                if module.is_empty() {
                    return Err(OutbreakError::InvalidInput(format!(
                        "missing module path in log level `{part}`"
                    )));
                }
                modules.push((module.to_string(), parse_level(level)?));
            }
            None => global = Some(parse_level(part)?),
        }
    }

    let global = global.unwrap_or_else(|| {
        modules
            .iter()
            .map(|(_, level)| *level)
            .max()
            .unwrap_or(LevelFilter::Off)
    });
    let mut configuration = get_log_configuration();
    let filters: Vec<(&str, LevelFilter)> = modules
        .iter()
        .map(|(module, level)| (module.as_str(), *level))
        .collect();
    configuration.global_log_level = global;
    configuration.set_module_filters(&filters);
    configuration.set_config();
    Ok(())
}

fn parse_level(level: &str) -> Result<LevelFilter, OutbreakError> {
    LevelFilter::from_str(level.trim())
        .map_err(|_| OutbreakError::InvalidInput(format!("unknown log level `{level}`")))
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}
