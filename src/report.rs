//! Writing run outputs to disk.
//!
//! Every output goes to `<directory>/<file_prefix><name>`. Tables are CSV files written through
//! serde with the `csv` crate; summaries are pretty-printed JSON. An existing file is only
//! replaced when [`ReportOptions::overwrite`] is set.

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use csv::Writer;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::OutbreakError;
use crate::metrics::FitDiagnostics;
use crate::parameters::TransmissionParameters;
use crate::scenarios::ScenarioSummary;
use crate::simulation::OutbreakSize;
use crate::validation::{FoldRecord, HoldoutReport, KFoldReport};

pub const SIMULATED_SIZES_FILE: &str = "simulated_sizes.csv";
pub const KFOLD_FILE: &str = "kfold.csv";
pub const HOLDOUT_FILE: &str = "holdout.csv";
pub const PARAMETERS_FILE: &str = "parameters.json";
pub const DIAGNOSTICS_FILE: &str = "diagnostics.json";
pub const SCENARIOS_FILE: &str = "scenarios.csv";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportOptions {
    pub directory: PathBuf,
    pub file_prefix: String,
    pub overwrite: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_prefix: String::new(),
            overwrite: false,
        }
    }
}

impl ReportOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut Self {
        self.directory = directory;
        self
    }

    pub fn file_prefix(&mut self, file_prefix: &str) -> &mut Self {
        self.file_prefix = file_prefix.to_string();
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut Self {
        self.overwrite = overwrite;
        self
    }

    /// Full path of the output called `name`.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}{name}", self.file_prefix))
    }

    /// Fails if any of the named outputs already exists and overwriting is disabled. Call it
    /// before writing a set of outputs so that a conflict leaves none of them written.
    ///
    /// # Errors
    /// `OutbreakError::InvalidInput` naming every existing file.
    pub fn check_writable(&self, names: &[&str]) -> Result<(), OutbreakError> {
        if self.overwrite {
            return Ok(());
        }
        let existing: Vec<String> = names
            .iter()
            .map(|name| self.path(name))
            .filter(|path| path.exists())
            .map(|path| path.display().to_string())
            .collect();
        if existing.is_empty() {
            Ok(())
        } else {
            Err(OutbreakError::InvalidInput(format!(
                "output files already exist: {}",
                existing.join(", ")
            )))
        }
    }

    // Creates the output directory if needed and opens the file, refusing to replace an existing
    // one unless overwriting is enabled.
    fn create(&self, name: &str) -> Result<(PathBuf, File), OutbreakError> {
        self.check_writable(&[name])?;
        create_dir_all(&self.directory)?;
        let path = self.path(name);
        let file = File::create(&path)?;
        Ok((path, file))
    }

    /// Writes one CSV row per item, with a header taken from the row type.
    ///
    /// # Errors
    /// `OutbreakError::InvalidInput` if the file exists and overwriting is disabled; I/O and CSV
    /// errors otherwise.
    pub fn write_csv<T: Serialize>(
        &self,
        name: &str,
        rows: impl IntoIterator<Item = T>,
    ) -> Result<PathBuf, OutbreakError> {
        let (path, file) = self.create(name)?;
        let mut writer = Writer::from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("wrote {}", path.display());
        Ok(path)
    }

    /// Writes `value` as pretty-printed JSON.
    ///
    /// # Errors
    /// `OutbreakError::InvalidInput` if the file exists and overwriting is disabled; I/O and JSON
    /// errors otherwise.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, OutbreakError> {
        let (path, file) = self.create(name)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        info!("wrote {}", path.display());
        Ok(path)
    }
}

/// `simulated_sizes.csv`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedSizeRow {
    pub size: OutbreakSize,
}

/// `kfold.csv`: a [`FoldRecord`] with its parameters spelled out as columns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoldRow {
    pub fold: usize,
    pub train_score: f64,
    pub test_score: f64,
    pub ratio: f64,
    pub beta_staff_staff: f64,
    pub beta_handler_patron: f64,
    pub beta_other_patron: f64,
    pub prob_food_contamination: f64,
    pub contamination_size_mean: f64,
    pub contamination_size_std: f64,
}

impl From<&FoldRecord> for FoldRow {
    fn from(record: &FoldRecord) -> Self {
        let p = &record.parameters;
        Self {
            fold: record.fold,
            train_score: record.train_score,
            test_score: record.test_score,
            ratio: record.ratio,
            beta_staff_staff: p.beta_staff_staff,
            beta_handler_patron: p.beta_handler_patron,
            beta_other_patron: p.beta_other_patron,
            prob_food_contamination: p.prob_food_contamination,
            contamination_size_mean: p.contamination_size_mean,
            contamination_size_std: p.contamination_size_std,
        }
    }
}

/// `holdout.csv`, a single row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldoutRow {
    pub n_train: usize,
    pub n_test: usize,
    pub train_score: f64,
    pub test_score: f64,
    pub ratio: f64,
    pub beta_staff_staff: f64,
    pub beta_handler_patron: f64,
    pub beta_other_patron: f64,
    pub prob_food_contamination: f64,
    pub contamination_size_mean: f64,
    pub contamination_size_std: f64,
}

impl From<&HoldoutReport> for HoldoutRow {
    fn from(report: &HoldoutReport) -> Self {
        let p = &report.parameters;
        Self {
            n_train: report.n_train,
            n_test: report.n_test,
            train_score: report.train_score,
            test_score: report.test_score,
            ratio: report.ratio,
            beta_staff_staff: p.beta_staff_staff,
            beta_handler_patron: p.beta_handler_patron,
            beta_other_patron: p.beta_other_patron,
            prob_food_contamination: p.prob_food_contamination,
            contamination_size_mean: p.contamination_size_mean,
            contamination_size_std: p.contamination_size_std,
        }
    }
}

/// `parameters.json`: the final fit and the validation ratios of the stages that ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub parameters: TransmissionParameters,
    pub score: f64,
    pub observations: usize,
    pub kfold_mean_ratio: Option<f64>,
    pub kfold_std_ratio: Option<f64>,
    pub holdout_ratio: Option<f64>,
}

/// Writes the batch of simulated sizes from the final calibration.
///
/// # Errors
/// See [`ReportOptions::write_csv`].
pub fn write_simulated_sizes(
    options: &ReportOptions,
    sizes: &[OutbreakSize],
) -> Result<PathBuf, OutbreakError> {
    options.write_csv(
        SIMULATED_SIZES_FILE,
        sizes.iter().map(|&size| SimulatedSizeRow { size }),
    )
}

/// # Errors
/// See [`ReportOptions::write_csv`].
pub fn write_kfold(options: &ReportOptions, report: &KFoldReport) -> Result<PathBuf, OutbreakError> {
    options.write_csv(KFOLD_FILE, report.folds.iter().map(FoldRow::from))
}

/// # Errors
/// See [`ReportOptions::write_csv`].
pub fn write_holdout(
    options: &ReportOptions,
    report: &HoldoutReport,
) -> Result<PathBuf, OutbreakError> {
    options.write_csv(HOLDOUT_FILE, [HoldoutRow::from(report)])
}

/// # Errors
/// See [`ReportOptions::write_json`].
pub fn write_parameters(
    options: &ReportOptions,
    summary: &CalibrationSummary,
) -> Result<PathBuf, OutbreakError> {
    options.write_json(PARAMETERS_FILE, summary)
}

/// # Errors
/// See [`ReportOptions::write_json`].
pub fn write_diagnostics(
    options: &ReportOptions,
    diagnostics: &FitDiagnostics,
) -> Result<PathBuf, OutbreakError> {
    options.write_json(DIAGNOSTICS_FILE, diagnostics)
}

/// # Errors
/// See [`ReportOptions::write_csv`].
pub fn write_scenarios(
    options: &ReportOptions,
    rows: &[ScenarioSummary],
) -> Result<PathBuf, OutbreakError> {
    options.write_csv(SCENARIOS_FILE, rows)
}
