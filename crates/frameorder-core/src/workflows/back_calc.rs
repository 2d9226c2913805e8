use crate::core::io::run_file::{RunFile, RunFileError};
use crate::core::models::motion::MotionalModel;
use crate::engine::config::{ConfigError, TargetConfig};
use crate::engine::error::EvaluationError;
use crate::engine::target::{BackCalculation, FrameOrderTarget};
use itertools::Itertools;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Failed to read the run file: {source}")]
    RunFile {
        #[from]
        source: RunFileError,
    },

    #[error("Invalid run configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Target function evaluation failed: {source}")]
    Evaluation {
        #[from]
        source: EvaluationError,
    },

    #[error("The run file gives no parameter vector to evaluate")]
    MissingParameters,
}

/// Everything back-calculated for one parameter vector of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct BackCalcReport {
    pub model: MotionalModel,
    pub parameter_names: Vec<&'static str>,
    pub parameters: Vec<f64>,
    pub result: BackCalculation,
}

impl fmt::Display for BackCalcReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: {}", self.model)?;
        for (name, value) in self.parameter_names.iter().zip(&self.parameters) {
            writeln!(f, "  {name:<16} {value:>14.6}")?;
        }
        for (a, chi2) in self.result.chi2.iter().enumerate() {
            let counts = [("RDC", &self.result.rdc[a]), ("PCS", &self.result.pcs[a])]
                .into_iter()
                .filter_map(|(kind, values)| {
                    values.as_ref().map(|v| format!("{} {kind}", v.len()))
                })
                .join(", ");
            writeln!(f, "Alignment {a} ({counts}): chi2 = {chi2:.6}")?;
        }
        if let Some(points) = self.result.accepted_points {
            writeln!(f, "Accepted integration points: {points}")?;
        }
        write!(f, "Total chi2: {:.6}", self.result.total_chi2)
    }
}

/// Back-calculates the observables of a run at the run's parameter vector.
#[instrument(skip_all, name = "back_calc_workflow")]
pub fn run(run: &RunFile) -> Result<BackCalcReport, WorkflowError> {
    let parameters = run
        .parameters
        .clone()
        .ok_or(WorkflowError::MissingParameters)?;
    let target = FrameOrderTarget::new(TargetConfig::from_run_file(run)?)?;

    info!(
        model = %target.model(),
        parameters = parameters.len(),
        "Back-calculating RDC and PCS data."
    );
    let result = target.back_calculate(&parameters)?;
    info!(total_chi2 = result.total_chi2, "Back-calculation finished.");

    Ok(BackCalcReport {
        model: target.model(),
        parameter_names: target.parameter_names(),
        parameters,
        result,
    })
}

/// Loads a run file and back-calculates it.
pub fn run_from_path(path: &Path) -> Result<BackCalcReport, WorkflowError> {
    let run_file = RunFile::load(path)?;
    run(&run_file)
}
