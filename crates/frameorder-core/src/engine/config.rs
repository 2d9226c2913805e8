use crate::core::integration::QuadratureSettings;
use crate::core::io::run_file::RunFile;
use crate::core::models::dataset::AlignmentData;
use crate::core::models::motion::MotionalModel;
use crate::core::pcs::quadrature::PCS_QUADRATURE;
use nalgebra::DMatrix;
use thiserror::Error;

/// Sobol points used by the quasi-random integrator unless overridden.
pub const DEFAULT_INTEGRATION_POINTS: usize = 500;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Unknown motional model '{0}'")]
    UnknownModel(String),

    #[error("RDC data is present but no interatomic unit vectors were given")]
    MissingRdcVectors,

    #[error("RDC data is present but no dipolar constants were given")]
    MissingDipolarConstants,

    #[error("PCS data is present but no atomic positions were given")]
    MissingAtomicPositions,

    #[error("PCS data of alignment {alignment} needs both a temperature and a proton frequency")]
    MissingPcsConditions { alignment: usize },

    #[error("PCS data of alignment {alignment} needs a positive, finite temperature and proton frequency")]
    InvalidPcsConditions { alignment: usize },

    #[error("Weight {index} of the {what} must be finite and non-negative")]
    InvalidWeight { what: String, index: usize },

    #[error("Error {index} of the {what} must be finite and positive")]
    InvalidError { what: String, index: usize },

    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Scaling matrix must be {expected}x{expected}, found {rows}x{cols}")]
    ScalingShape {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Quasi-random integration needs a positive number of points")]
    ZeroIntegrationPoints,
}

/// How the PCS is averaged over the motional support.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntegrationMode {
    /// Nested adaptive quadrature over `(σ, φ, θ)`.
    Quadrature,
    /// Rejection sampling over a fixed Sobol point set.
    QuasiRandom { points: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetConfig {
    pub model: MotionalModel,
    /// The pivot is part of the parameter vector.
    pub pivot_opt: bool,
    /// The average domain translation is part of the parameter vector.
    pub translation_opt: bool,
    /// The average position rotates about the motional pivot rather than
    /// `ave_pos_pivot`.
    pub ave_pos_piv_sync: bool,
    pub integration: IntegrationMode,
    /// Report the quasi-random standard error of every PCS estimate.
    pub error_flag: bool,
    pub pcs_quadrature: QuadratureSettings,
    /// Settings of the 1-D integrals inside the pseudo-ellipse matrices.
    pub matrix_quadrature: QuadratureSettings,
    /// Applied as `p · S` to every incoming parameter vector.
    pub scaling: Option<DMatrix<f64>>,
    pub alignments: Vec<AlignmentData>,
    /// Interatomic unit vectors, one per RDC entry.
    pub rdc_vectors: Option<Vec<[f64; 3]>>,
    pub dipolar_constants: Option<Vec<f64>>,
    /// Atomic positions of the moving domain, one per PCS entry.
    pub atomic_positions: Option<Vec<[f64; 3]>>,
    pub pivot: Option<[f64; 3]>,
    pub ave_pos_pivot: Option<[f64; 3]>,
    pub paramag_centre: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
enum ModelChoice {
    Known(MotionalModel),
    Named(String),
}

#[derive(Default)]
pub struct TargetConfigBuilder {
    model: Option<ModelChoice>,
    pivot_opt: Option<bool>,
    translation_opt: Option<bool>,
    ave_pos_piv_sync: Option<bool>,
    quad_int: Option<bool>,
    num_int_pts: Option<usize>,
    error_flag: Option<bool>,
    pcs_quadrature: Option<QuadratureSettings>,
    matrix_quadrature: Option<QuadratureSettings>,
    scaling: Option<DMatrix<f64>>,
    alignments: Vec<AlignmentData>,
    rdc_vectors: Option<Vec<[f64; 3]>>,
    dipolar_constants: Option<Vec<f64>>,
    atomic_positions: Option<Vec<[f64; 3]>>,
    pivot: Option<[f64; 3]>,
    ave_pos_pivot: Option<[f64; 3]>,
    paramag_centre: Option<[f64; 3]>,
}

impl TargetConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: MotionalModel) -> Self {
        self.model = Some(ModelChoice::Known(model));
        self
    }
    /// Selects the model by name; an unknown name fails in [`build`](Self::build).
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model = Some(ModelChoice::Named(name.into()));
        self
    }
    pub fn pivot_opt(mut self, flag: bool) -> Self {
        self.pivot_opt = Some(flag);
        self
    }
    pub fn translation_opt(mut self, flag: bool) -> Self {
        self.translation_opt = Some(flag);
        self
    }
    pub fn ave_pos_piv_sync(mut self, flag: bool) -> Self {
        self.ave_pos_piv_sync = Some(flag);
        self
    }
    pub fn quad_int(mut self, flag: bool) -> Self {
        self.quad_int = Some(flag);
        self
    }
    pub fn num_int_pts(mut self, n: usize) -> Self {
        self.num_int_pts = Some(n);
        self
    }
    pub fn error_flag(mut self, flag: bool) -> Self {
        self.error_flag = Some(flag);
        self
    }
    pub fn pcs_quadrature(mut self, settings: QuadratureSettings) -> Self {
        self.pcs_quadrature = Some(settings);
        self
    }
    pub fn matrix_quadrature(mut self, settings: QuadratureSettings) -> Self {
        self.matrix_quadrature = Some(settings);
        self
    }
    pub fn scaling(mut self, matrix: DMatrix<f64>) -> Self {
        self.scaling = Some(matrix);
        self
    }
    pub fn alignment(mut self, alignment: AlignmentData) -> Self {
        self.alignments.push(alignment);
        self
    }
    pub fn alignments(mut self, alignments: Vec<AlignmentData>) -> Self {
        self.alignments = alignments;
        self
    }
    pub fn rdc_vectors(mut self, vectors: Vec<[f64; 3]>) -> Self {
        self.rdc_vectors = Some(vectors);
        self
    }
    pub fn dipolar_constants(mut self, constants: Vec<f64>) -> Self {
        self.dipolar_constants = Some(constants);
        self
    }
    pub fn atomic_positions(mut self, positions: Vec<[f64; 3]>) -> Self {
        self.atomic_positions = Some(positions);
        self
    }
    pub fn pivot(mut self, pivot: [f64; 3]) -> Self {
        self.pivot = Some(pivot);
        self
    }
    pub fn ave_pos_pivot(mut self, pivot: [f64; 3]) -> Self {
        self.ave_pos_pivot = Some(pivot);
        self
    }
    pub fn paramag_centre(mut self, centre: [f64; 3]) -> Self {
        self.paramag_centre = Some(centre);
        self
    }

    pub fn build(self) -> Result<TargetConfig, ConfigError> {
        let model = match self.model.ok_or(ConfigError::MissingParameter("model"))? {
            ModelChoice::Known(model) => model,
            ModelChoice::Named(name) => name
                .parse()
                .map_err(|_| ConfigError::UnknownModel(name))?,
        };
        let integration = if self.quad_int.unwrap_or(false) {
            IntegrationMode::Quadrature
        } else {
            IntegrationMode::QuasiRandom {
                points: self.num_int_pts.unwrap_or(DEFAULT_INTEGRATION_POINTS),
            }
        };
        Ok(TargetConfig {
            model,
            pivot_opt: self.pivot_opt.unwrap_or(false),
            translation_opt: self.translation_opt.unwrap_or(false),
            ave_pos_piv_sync: self.ave_pos_piv_sync.unwrap_or(true),
            integration,
            error_flag: self.error_flag.unwrap_or(false),
            pcs_quadrature: self.pcs_quadrature.unwrap_or(PCS_QUADRATURE),
            matrix_quadrature: self.matrix_quadrature.unwrap_or_default(),
            scaling: self.scaling,
            alignments: self.alignments,
            rdc_vectors: self.rdc_vectors,
            dipolar_constants: self.dipolar_constants,
            atomic_positions: self.atomic_positions,
            pivot: self.pivot,
            ave_pos_pivot: self.ave_pos_pivot,
            paramag_centre: self.paramag_centre,
        })
    }
}

impl TargetConfig {
    /// Builds the configuration a run file describes.
    pub fn from_run_file(run: &RunFile) -> Result<Self, ConfigError> {
        let mut builder = TargetConfigBuilder::new()
            .model_name(run.model.as_str())
            .alignments(run.alignments.clone());

        if let Some(flag) = run.pivot_opt {
            builder = builder.pivot_opt(flag);
        }
        if let Some(flag) = run.translation_opt {
            builder = builder.translation_opt(flag);
        }
        if let Some(flag) = run.ave_pos_piv_sync {
            builder = builder.ave_pos_piv_sync(flag);
        }
        if let Some(flag) = run.integration.quad_int {
            builder = builder.quad_int(flag);
        }
        if let Some(flag) = run.integration.error_flag {
            builder = builder.error_flag(flag);
        }
        if let Some(n) = run.integration.num_int_pts {
            builder = builder.num_int_pts(n);
        }
        if let Some(settings) = run.integration.pcs_quadrature {
            builder = builder.pcs_quadrature(settings);
        }
        if let Some(settings) = run.integration.matrix_quadrature {
            builder = builder.matrix_quadrature(settings);
        }
        if let Some(rows) = &run.scaling {
            builder = builder.scaling(scaling_matrix(rows)?);
        }

        let structure = &run.structure;
        if let Some(vectors) = &structure.rdc_vectors {
            builder = builder.rdc_vectors(vectors.clone());
        }
        if let Some(constants) = &structure.dipolar_constants {
            builder = builder.dipolar_constants(constants.clone());
        }
        if let Some(positions) = &structure.atomic_positions {
            builder = builder.atomic_positions(positions.clone());
        }
        if let Some(pivot) = structure.pivot {
            builder = builder.pivot(pivot);
        }
        if let Some(pivot) = structure.ave_pos_pivot {
            builder = builder.ave_pos_pivot(pivot);
        }
        if let Some(centre) = structure.paramag_centre {
            builder = builder.paramag_centre(centre);
        }

        builder.build()
    }
}

fn scaling_matrix(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, ConfigError> {
    let ncols = rows.first().map_or(0, Vec::len);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != ncols {
            return Err(ConfigError::LengthMismatch {
                what: format!("scaling row {i}"),
                expected: ncols,
                found: row.len(),
            });
        }
    }
    Ok(DMatrix::from_row_iterator(
        rows.len(),
        ncols,
        rows.iter().flatten().copied(),
    ))
}
