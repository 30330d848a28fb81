//! Console progress bar for long calibration runs.
//!
//! A full grid calibration evaluates every grid cell with hundreds of simulated outbreaks, so a
//! run can take minutes. When the `progress_bar` feature is enabled and a [`Calibrator`] opts in
//! with [`Calibrator::with_progress`], one tick is recorded per evaluated grid cell.
//!
//! Only one progress bar can be active at a time; starting a new one replaces the previous one.
//! Without the `progress_bar` feature every function here is a no-op.
//!
//! [`Calibrator`]: crate::calibration::Calibrator
//! [`Calibrator::with_progress`]: crate::calibration::Calibrator::with_progress

use crate::log::trace;
#[cfg(feature = "progress_bar")]
use progress_bar::{
    finalize_progress_bar, inc_progress_bar, init_progress_bar, set_progress_bar_action, Color,
    Style,
};

/// Initializes a progress bar with the given label and number of steps.
pub fn init_custom_progress_bar(label: &str, max_value: usize) {
    trace!("initializing progress bar with label {label} and max value {max_value}");
    #[cfg(feature = "progress_bar")]
    {
        init_progress_bar(max_value);
        set_progress_bar_action(label, Color::Blue, Style::Bold);
    }
}

/// Increments the progress bar by one step.
pub fn increment_custom_progress() {
    #[cfg(feature = "progress_bar")]
    inc_progress_bar();
}

/// Completes the progress bar and moves the cursor past it.
pub fn finish_custom_progress() {
    #[cfg(feature = "progress_bar")]
    finalize_progress_bar();
}
