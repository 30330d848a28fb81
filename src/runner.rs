use std::path::{Path, PathBuf};

use clap::{Args, Command, FromArgMatches as _};
use log::info;

use crate::calibration::Calibration;
use crate::config::PipelineConfig;
use crate::data::load_observed_sizes;
use crate::error::OutbreakError;
use crate::log::set_log_level_from_spec;
use crate::metrics::{fit_diagnostics, FitDiagnostics};
use crate::random::{fork_stream, seeded_stream};
use crate::report::{
    write_diagnostics, write_holdout, write_kfold, write_parameters, write_scenarios,
    write_simulated_sizes, CalibrationSummary, ReportOptions, DIAGNOSTICS_FILE, HOLDOUT_FILE,
    KFOLD_FILE, PARAMETERS_FILE, SCENARIOS_FILE, SIMULATED_SIZES_FILE,
};
use crate::scenarios::{run_scenarios, standard_scenarios, summarize, ScenarioSummary};
use crate::validation::{
    full_calibration, holdout_validation, kfold_validation, HoldoutReport, KFoldReport,
};

/// Command line arguments of the calibration pipeline.
#[derive(Args, Debug)]
pub struct BaseArgs {
    /// CSV file of observed outbreak sizes (first column, no header)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path for a pipeline config file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Directory for report output
    #[arg(short, long, default_value = "")]
    pub output_dir: String,

    /// Prefix for every output file name
    #[arg(long, default_value = "")]
    pub file_prefix: String,

    /// Replace existing output files
    #[arg(long)]
    pub overwrite: bool,

    /// Log level, e.g. `info` or `warn,restaurant_outbreak::calibration=debug`
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Do not show calibration progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Skip k-fold validation
    #[arg(long)]
    pub skip_kfold: bool,

    /// Skip holdout validation
    #[arg(long)]
    pub skip_holdout: bool,

    /// Skip the policy scenarios
    #[arg(long)]
    pub skip_scenarios: bool,
}

fn create_cli() -> Command {
    let cli = Command::new("restaurant-outbreak");
    BaseArgs::augment_args(cli)
}

/// Which optional stages of the pipeline run. Full calibration and diagnostics always run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stages {
    pub kfold: bool,
    pub holdout: bool,
    pub scenarios: bool,
    pub progress: bool,
}

impl Default for Stages {
    fn default() -> Self {
        Self {
            kfold: true,
            holdout: true,
            scenarios: true,
            progress: false,
        }
    }
}

/// Everything a pipeline run produces.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub observations: usize,
    pub kfold: Option<KFoldReport>,
    pub holdout: Option<HoldoutReport>,
    pub calibration: Calibration,
    pub diagnostics: FitDiagnostics,
    pub scenarios: Option<Vec<ScenarioSummary>>,
}

impl PipelineOutput {
    #[must_use]
    pub fn summary(&self) -> CalibrationSummary {
        CalibrationSummary {
            parameters: *self.calibration.parameters(),
            score: self.calibration.score(),
            observations: self.observations,
            kfold_mean_ratio: self.kfold.as_ref().map(|report| report.mean_ratio),
            kfold_std_ratio: self.kfold.as_ref().map(|report| report.std_ratio),
            holdout_ratio: self.holdout.as_ref().map(|report| report.ratio),
        }
    }

    /// Names of the output files [`write_reports`] produces for this run.
    #[must_use]
    pub fn report_files(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.calibration.simulated.is_some() {
            names.push(SIMULATED_SIZES_FILE);
        }
        if self.kfold.is_some() {
            names.push(KFOLD_FILE);
        }
        if self.holdout.is_some() {
            names.push(HOLDOUT_FILE);
        }
        names.push(PARAMETERS_FILE);
        names.push(DIAGNOSTICS_FILE);
        if self.scenarios.is_some() {
            names.push(SCENARIOS_FILE);
        }
        names
    }
}

/// Runs k-fold validation, holdout validation, the full calibration, fit diagnostics and the
/// policy scenarios on `observed`.
///
/// The seed builds one process stream, from which every stage forks its own stream up front, so
/// skipping a stage leaves the results of the others unchanged.
///
/// # Errors
/// The first error of any stage.
pub fn run_pipeline(
    config: &PipelineConfig,
    observed: &[u64],
    seed: u64,
    stages: Stages,
) -> Result<PipelineOutput, OutbreakError> {
    let model = config.model()?;
    let mut process = seeded_stream(seed, "pipeline");
    let mut kfold_rng = fork_stream(&mut process, "kfold");
    let mut holdout_rng = fork_stream(&mut process, "holdout");
    let mut full_rng = fork_stream(&mut process, "full_calibration");
    let mut diagnostics_rng = fork_stream(&mut process, "diagnostics");
    let mut scenario_rng = fork_stream(&mut process, "scenarios");

    let kfold = if stages.kfold {
        let calibrator = config.fold_calibrator().with_progress(stages.progress);
        Some(kfold_validation(
            &mut kfold_rng,
            &model,
            observed,
            config.folds,
            &calibrator,
            config.fold_test_sims,
        )?)
    } else {
        None
    };

    let holdout = if stages.holdout {
        let calibrator = config.holdout_calibrator().with_progress(stages.progress);
        Some(holdout_validation(
            &mut holdout_rng,
            &model,
            observed,
            config.holdout_train_fraction,
            &calibrator,
            config.holdout_sims,
        )?)
    } else {
        None
    };

    let calibrator = config.full_calibrator().with_progress(stages.progress);
    let calibration = full_calibration(&mut full_rng, &model, observed, &calibrator)?;
    let simulated = calibration.simulated.as_deref().unwrap_or_default();
    let diagnostics = fit_diagnostics(&mut diagnostics_rng, observed, simulated)?;
    info!("fit diagnostics: {diagnostics:?}");

    let scenarios = if stages.scenarios && config.run_scenarios {
        let outcomes = run_scenarios(
            &mut scenario_rng,
            &model,
            calibration.parameters(),
            &standard_scenarios(),
            config.scenario_sims,
        )?;
        Some(summarize(&outcomes)?)
    } else {
        None
    };

    Ok(PipelineOutput {
        observations: observed.len(),
        kfold,
        holdout,
        calibration,
        diagnostics,
        scenarios,
    })
}

/// Writes every output of a pipeline run. All target files are checked before the first is
/// written, so a run that would replace an existing file without `overwrite` writes nothing.
///
/// # Errors
/// `OutbreakError::InvalidInput` if an output exists and overwriting is disabled, otherwise the
/// first report that fails to be written.
pub fn write_reports(options: &ReportOptions, output: &PipelineOutput) -> Result<(), OutbreakError> {
    options.check_writable(&output.report_files())?;
    if let Some(simulated) = &output.calibration.simulated {
        write_simulated_sizes(options, simulated)?;
    }
    if let Some(kfold) = &output.kfold {
        write_kfold(options, kfold)?;
    }
    if let Some(holdout) = &output.holdout {
        write_holdout(options, holdout)?;
    }
    write_parameters(options, &output.summary())?;
    write_diagnostics(options, &output.diagnostics)?;
    if let Some(scenarios) = &output.scenarios {
        write_scenarios(options, scenarios)?;
    }
    Ok(())
}

/// Parses the command line and runs the whole pipeline.
///
/// # Errors
/// Returns an error if argument parsing, input loading, any stage or report writing fails
pub fn run_with_args() -> Result<PipelineOutput, Box<dyn std::error::Error>> {
    let cli = create_cli();
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    run_with_args_internal(base_args_matches)
}

fn run_with_args_internal(args: BaseArgs) -> Result<PipelineOutput, Box<dyn std::error::Error>> {
    if let Some(spec) = &args.log_level {
        set_log_level_from_spec(spec)?;
    }

    // Optionally read the pipeline settings from a file
    let config = if args.config.is_empty() {
        PipelineConfig::default()
    } else {
        println!("Loading pipeline config from: {}", args.config);
        PipelineConfig::load(Path::new(&args.config))?
    };

    let observed = load_observed_sizes(&args.data)?;
    println!(
        "Loaded {} outbreak sizes from {}",
        observed.len(),
        args.data.display()
    );

    let mut options = ReportOptions::new();
    if !args.output_dir.is_empty() {
        options.directory(PathBuf::from(&args.output_dir));
    }
    options.file_prefix(&args.file_prefix).overwrite(args.overwrite);

    let stages = Stages {
        kfold: !args.skip_kfold,
        holdout: !args.skip_holdout,
        scenarios: !args.skip_scenarios,
        progress: !args.no_progress,
    };
    let output = run_pipeline(&config, &observed, args.random_seed, stages)?;
    write_reports(&options, &output)?;

    let summary = output.summary();
    println!("Calibrated parameters (score {:.4}):", summary.score);
    println!("{}", serde_json::to_string_pretty(&summary.parameters)?);
    Ok(output)
}
