use super::config::{ConfigError, IntegrationMode, TargetConfig};
use super::data::{DEFAULT_PCS_ERROR, DEFAULT_RDC_ERROR, Observables, to_vectors};
use super::error::EvaluationError;
use super::geometry::pivot_geometry;
use super::params::{ParameterLayout, Unpacked, unscale};
use super::registry::{ModelEntry, entry};
use crate::core::alignment::{pcs_constant_angstrom, rdc_tensor};
use crate::core::frame_order::{Support, rotate_first_degree, rotate_frame_order};
use crate::core::integration::QuadratureSettings;
use crate::core::models::dataset::ObservableSet;
use crate::core::models::motion::MotionalModel;
use crate::core::pcs::{PcsAlignment, PcsAverages, PcsProblem, quadrature, quasi_random};
use crate::core::sampling::{SobolError, SobolSet};
use crate::core::utils::geometry::euler_to_r_zyz;
use crate::core::utils::tensor::{Tensor5, reduce_tensor, rotate_tensor, tensor_5d_to_3x3};
use nalgebra::{DMatrix, Matrix3, Vector3};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// Accepted Sobol fractions below this are reported as poorly sampled.
const LOW_ACCEPTANCE_FRACTION: f64 = 0.01;

#[derive(Debug, Clone)]
struct PcsData {
    observables: Observables,
    /// Distance-free PCS constant of the alignment's temperature and field.
    constant: f64,
}

#[derive(Debug, Clone)]
struct PreparedAlignment {
    full_tensor: Tensor5,
    full_in_ref_frame: bool,
    rdc: Option<Observables>,
    pcs: Option<PcsData>,
}

/// Back-calculated data of one parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct BackCalculation {
    /// Per alignment, `None` without RDC data. Missing entries are `NaN`.
    pub rdc: Vec<Option<Vec<f64>>>,
    /// Per alignment, `None` without PCS data. Missing entries are `NaN`.
    pub pcs: Vec<Option<Vec<f64>>>,
    /// Quasi-random standard errors of the PCS, when estimated.
    pub pcs_errors: Vec<Option<Vec<f64>>>,
    /// `{Axx, Ayy, Axy, Axz, Ayz}` of every motion-reduced tensor.
    pub reduced_tensors: Vec<[f64; 5]>,
    /// Lab frame first degree frame order matrix `⟨R⟩`.
    pub first_degree: Matrix3<f64>,
    /// Chi-squared contribution of each alignment.
    pub chi2: Vec<f64>,
    pub total_chi2: f64,
    /// Sobol points inside the support, for quasi-random integration.
    pub accepted_points: Option<usize>,
}

struct Calculation {
    reduced: Vec<Tensor5>,
    first_degree: Option<Matrix3<f64>>,
    rdc: Vec<Option<Vec<f64>>>,
    pcs: Vec<Option<Vec<f64>>>,
    pcs_errors: Vec<Option<Vec<f64>>>,
    accepted: Option<usize>,
}

/// The frame order chi-squared target function of one optimisation run.
///
/// Construction validates and prepares all static data once. Every call to
/// [`evaluate`](Self::evaluate) then works only on local values, so the
/// target can be shared between threads.
#[derive(Debug)]
pub struct FrameOrderTarget {
    model: MotionalModel,
    entry: &'static ModelEntry,
    layout: ParameterLayout,
    integration: IntegrationMode,
    error_flag: bool,
    pcs_quadrature: QuadratureSettings,
    matrix_quadrature: QuadratureSettings,
    scaling: Option<DMatrix<f64>>,
    ave_pos_piv_sync: bool,
    alignments: Vec<PreparedAlignment>,
    rdc_vectors: Vec<Vector3<f64>>,
    dipolar_constants: Vec<f64>,
    atoms: Vec<Vector3<f64>>,
    pivot: Vector3<f64>,
    ave_pos_pivot: Vector3<f64>,
    paramag_centre: Vector3<f64>,
    sobol: OnceLock<Result<SobolSet, SobolError>>,
    low_acceptance_warned: AtomicBool,
}

fn check_len(what: impl Into<String>, expected: usize, found: usize) -> Result<(), ConfigError> {
    if expected == found {
        Ok(())
    } else {
        Err(ConfigError::LengthMismatch {
            what: what.into(),
            expected,
            found,
        })
    }
}

fn check_set(
    set: &ObservableSet,
    kind: &str,
    alignment: usize,
    expected: usize,
) -> Result<(), ConfigError> {
    let what = |field: &str| format!("{kind} {field} of alignment {alignment}");
    check_len(what("values"), expected, set.values.len())?;
    if let Some(errors) = &set.errors {
        check_len(what("errors"), expected, errors.len())?;
        // NaN errors fall back to the default.
        if let Some(index) = errors.iter().position(|&e| !e.is_nan() && !positive_finite(e)) {
            return Err(ConfigError::InvalidError {
                what: what("data"),
                index,
            });
        }
    }
    if let Some(weights) = &set.weights {
        check_len(what("weights"), expected, weights.len())?;
        if let Some(index) = weights.iter().position(|&w| !(w.is_finite() && w >= 0.0)) {
            return Err(ConfigError::InvalidWeight {
                what: what("data"),
                index,
            });
        }
    }
    Ok(())
}

fn positive_finite(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

fn vector_or_zero(v: Option<[f64; 3]>) -> Vector3<f64> {
    v.map_or_else(Vector3::zeros, Vector3::from)
}

fn nan_where_missing(mut values: Vec<f64>, missing: &[bool]) -> Vec<f64> {
    for (value, &missing) in values.iter_mut().zip(missing) {
        if missing {
            *value = f64::NAN;
        }
    }
    values
}

impl FrameOrderTarget {
    #[instrument(skip_all, name = "frame_order_target_setup")]
    pub fn new(config: TargetConfig) -> Result<Self, ConfigError> {
        let entry = entry(config.model);
        let layout = ParameterLayout::new(entry, config.pivot_opt, config.translation_opt);

        if let Some(scaling) = &config.scaling {
            let n = layout.len();
            if scaling.nrows() != n || scaling.ncols() != n {
                return Err(ConfigError::ScalingShape {
                    expected: n,
                    rows: scaling.nrows(),
                    cols: scaling.ncols(),
                });
            }
        }
        if matches!(config.integration, IntegrationMode::QuasiRandom { points: 0 }) {
            return Err(ConfigError::ZeroIntegrationPoints);
        }

        let has_rdc = config.alignments.iter().any(|a| a.rdc.is_some());
        let has_pcs = config.alignments.iter().any(|a| a.pcs.is_some());

        let (rdc_vectors, rdc_vector_missing) = if has_rdc {
            let coordinates = config
                .rdc_vectors
                .as_deref()
                .ok_or(ConfigError::MissingRdcVectors)?;
            let constants = config
                .dipolar_constants
                .as_deref()
                .ok_or(ConfigError::MissingDipolarConstants)?;
            check_len("dipolar constants", coordinates.len(), constants.len())?;
            to_vectors(coordinates)
        } else {
            (Vec::new(), Vec::new())
        };

        let (atoms, atom_missing) = if has_pcs {
            let positions = config
                .atomic_positions
                .as_deref()
                .ok_or(ConfigError::MissingAtomicPositions)?;
            if !config.pivot_opt && config.pivot.is_none() {
                return Err(ConfigError::MissingParameter("pivot"));
            }
            if config.paramag_centre.is_none() {
                return Err(ConfigError::MissingParameter("paramag_centre"));
            }
            if !config.ave_pos_piv_sync && config.ave_pos_pivot.is_none() {
                return Err(ConfigError::MissingParameter("ave_pos_pivot"));
            }
            to_vectors(positions)
        } else {
            (Vec::new(), Vec::new())
        };

        let mut alignments = Vec::with_capacity(config.alignments.len());
        for (a, data) in config.alignments.iter().enumerate() {
            let rdc = match &data.rdc {
                Some(set) => {
                    check_set(set, "RDC", a, rdc_vectors.len())?;
                    Some(Observables::prepare(set, DEFAULT_RDC_ERROR, &rdc_vector_missing))
                }
                None => None,
            };
            let pcs = match &data.pcs {
                Some(set) => {
                    check_set(set, "PCS", a, atoms.len())?;
                    let (Some(temperature), Some(frequency)) = (data.temperature, data.frequency)
                    else {
                        return Err(ConfigError::MissingPcsConditions { alignment: a });
                    };
                    if !positive_finite(temperature) || !positive_finite(frequency) {
                        return Err(ConfigError::InvalidPcsConditions { alignment: a });
                    }
                    Some(PcsData {
                        observables: Observables::prepare(set, DEFAULT_PCS_ERROR, &atom_missing),
                        constant: pcs_constant_angstrom(temperature, frequency),
                    })
                }
                None => None,
            };
            alignments.push(PreparedAlignment {
                full_tensor: Tensor5::from(data.tensor),
                full_in_ref_frame: data.full_in_ref_frame,
                rdc,
                pcs,
            });
        }

        info!(
            model = %config.model,
            parameters = layout.len(),
            alignments = alignments.len(),
            rdc_alignments = alignments.iter().filter(|a| a.rdc.is_some()).count(),
            pcs_alignments = alignments.iter().filter(|a| a.pcs.is_some()).count(),
            integration = ?config.integration,
            "Frame order target initialised."
        );

        Ok(Self {
            model: config.model,
            entry,
            layout,
            integration: config.integration,
            error_flag: config.error_flag,
            pcs_quadrature: config.pcs_quadrature,
            matrix_quadrature: config.matrix_quadrature,
            scaling: config.scaling,
            ave_pos_piv_sync: config.ave_pos_piv_sync,
            alignments,
            rdc_vectors,
            dipolar_constants: config.dipolar_constants.unwrap_or_default(),
            atoms,
            pivot: vector_or_zero(config.pivot),
            ave_pos_pivot: vector_or_zero(config.ave_pos_pivot),
            paramag_centre: vector_or_zero(config.paramag_centre),
            sobol: OnceLock::new(),
            low_acceptance_warned: AtomicBool::new(false),
        })
    }

    pub fn model(&self) -> MotionalModel {
        self.model
    }

    pub fn parameter_count(&self) -> usize {
        self.layout.len()
    }

    pub fn parameter_names(&self) -> Vec<&'static str> {
        self.layout.names()
    }

    /// Which alignments carry RDC data.
    pub fn rdc_flags(&self) -> Vec<bool> {
        self.alignments.iter().map(|a| a.rdc.is_some()).collect()
    }

    /// Which alignments carry PCS data.
    pub fn pcs_flags(&self) -> Vec<bool> {
        self.alignments.iter().map(|a| a.pcs.is_some()).collect()
    }

    /// The weighted chi-squared of a (possibly scaled) parameter vector.
    pub fn evaluate(&self, params: &[f64]) -> Result<f64, EvaluationError> {
        let calculation = self.calculate(params, false)?;
        Ok(self.chi2(&calculation).iter().sum())
    }

    /// Back-calculates every observable for a parameter vector.
    pub fn back_calculate(&self, params: &[f64]) -> Result<BackCalculation, EvaluationError> {
        let calculation = self.calculate(params, true)?;
        let chi2 = self.chi2(&calculation);
        let total_chi2 = chi2.iter().sum();

        let rdc = calculation
            .rdc
            .into_iter()
            .zip(&self.alignments)
            .map(|(values, alignment)| {
                values
                    .zip(alignment.rdc.as_ref())
                    .map(|(v, obs)| nan_where_missing(v, &obs.missing))
            })
            .collect();
        let pcs = calculation
            .pcs
            .into_iter()
            .zip(&self.alignments)
            .map(|(values, alignment)| {
                values
                    .zip(alignment.pcs.as_ref())
                    .map(|(v, data)| nan_where_missing(v, &data.observables.missing))
            })
            .collect();

        Ok(BackCalculation {
            rdc,
            pcs,
            pcs_errors: calculation.pcs_errors,
            reduced_tensors: calculation
                .reduced
                .iter()
                .map(|t| [t[0], t[1], t[2], t[3], t[4]])
                .collect(),
            first_degree: calculation.first_degree.unwrap_or_else(Matrix3::identity),
            chi2,
            total_chi2,
            accepted_points: calculation.accepted,
        })
    }

    fn chi2(&self, calculation: &Calculation) -> Vec<f64> {
        self.alignments
            .iter()
            .enumerate()
            .map(|(a, alignment)| {
                let rdc = alignment
                    .rdc
                    .as_ref()
                    .zip(calculation.rdc[a].as_ref())
                    .map_or(0.0, |(obs, calc)| obs.chi2(calc));
                let pcs = alignment
                    .pcs
                    .as_ref()
                    .zip(calculation.pcs[a].as_ref())
                    .map_or(0.0, |(data, calc)| data.observables.chi2(calc));
                rdc + pcs
            })
            .collect()
    }

    fn calculate(
        &self,
        params: &[f64],
        with_first_degree: bool,
    ) -> Result<Calculation, EvaluationError> {
        let expected = self.layout.len();
        if params.len() != expected {
            return Err(EvaluationError::ParameterCount {
                expected,
                found: params.len(),
            });
        }
        let params = unscale(params, self.scaling.as_ref());
        let unpacked = self.layout.unpack(&params)?;

        let shape = (self.entry.build)(unpacked.shape, &self.matrix_quadrature);
        let frame_order = rotate_frame_order(&shape.second_degree(), &unpacked.eigen_frame);
        let first_degree = with_first_degree
            .then(|| rotate_first_degree(&shape.first_degree(), &unpacked.eigen_frame));
        let [alpha, beta, gamma] = unpacked.ave_pos;
        let r_ave = euler_to_r_zyz(alpha, beta, gamma);

        let reduced: Vec<Tensor5> = self
            .alignments
            .iter()
            .map(|alignment| reduce_tensor(&frame_order, &alignment.full_tensor))
            .collect();

        let rdc = self
            .alignments
            .iter()
            .zip(&reduced)
            .map(|(alignment, reduced)| {
                alignment.rdc.as_ref().map(|obs| {
                    let tensor = rotate_tensor(
                        &r_ave,
                        &tensor_5d_to_3x3(reduced),
                        alignment.full_in_ref_frame,
                    );
                    self.back_calc_rdc(&tensor, &obs.missing)
                })
            })
            .collect();

        let mut pcs = vec![None; self.alignments.len()];
        let mut pcs_errors = vec![None; self.alignments.len()];
        let mut accepted = None;
        if self.alignments.iter().any(|a| a.pcs.is_some()) {
            let (indices, averages) = self.back_calc_pcs(&unpacked, &r_ave, &shape.support())?;
            accepted = averages.accepted;
            for (&a, values) in indices.iter().zip(averages.values) {
                pcs[a] = Some(values);
            }
            if let Some(errors) = averages.errors {
                for (&a, errors) in indices.iter().zip(errors) {
                    pcs_errors[a] = Some(errors);
                }
            }
        }

        Ok(Calculation {
            reduced,
            first_degree,
            rdc,
            pcs,
            pcs_errors,
            accepted,
        })
    }

    fn back_calc_rdc(&self, tensor: &Matrix3<f64>, missing: &[bool]) -> Vec<f64> {
        self.rdc_vectors
            .iter()
            .zip(&self.dipolar_constants)
            .zip(missing)
            .map(|((mu, &dj), &missing)| {
                if missing {
                    0.0
                } else {
                    rdc_tensor(dj, mu, tensor)
                }
            })
            .collect()
    }

    /// PCS averages of the alignments with PCS data, and their indices.
    fn back_calc_pcs(
        &self,
        unpacked: &Unpacked,
        r_ave: &Matrix3<f64>,
        support: &Support,
    ) -> Result<(Vec<usize>, PcsAverages), EvaluationError> {
        let pivot = unpacked.pivot.unwrap_or(self.pivot);
        let ave_pos_pivot = if self.ave_pos_piv_sync {
            pivot
        } else {
            self.ave_pos_pivot
        };
        let geometry = pivot_geometry(
            &self.atoms,
            r_ave,
            &ave_pos_pivot,
            &unpacked.translation,
            &pivot,
            &self.paramag_centre,
        );

        let (indices, alignments): (Vec<usize>, Vec<PcsAlignment>) = self
            .alignments
            .iter()
            .enumerate()
            .filter_map(|(a, alignment)| {
                alignment.pcs.as_ref().map(|data| {
                    let pcs = PcsAlignment {
                        constant: data.constant,
                        tensor: tensor_5d_to_3x3(&alignment.full_tensor),
                        pivot_atom: geometry.pivot_atom(alignment.full_in_ref_frame),
                        missing: &data.observables.missing,
                    };
                    (a, pcs)
                })
            })
            .unzip();
        let problem = PcsProblem {
            eigen_frame: unpacked.eigen_frame,
            ln_pivot: geometry.ln_pivot,
            alignments,
        };

        Ok((indices, self.average_pcs(&problem, support)?))
    }

    fn average_pcs(
        &self,
        problem: &PcsProblem,
        support: &Support,
    ) -> Result<PcsAverages, EvaluationError> {
        if support.is_rigid() {
            return Ok(problem.rigid());
        }
        let points = match self.integration {
            IntegrationMode::Quadrature => {
                return Ok(quadrature::average_pcs(problem, support, &self.pcs_quadrature));
            }
            IntegrationMode::QuasiRandom { points } => points,
        };

        let set = self.sobol_set(points)?;
        let averages = quasi_random::average_pcs(problem, support, set, self.error_flag);
        let accepted = averages.accepted.unwrap_or(0);

        if accepted == 0 {
            debug!(
                model = %self.model,
                points,
                "No Sobol point lies inside the motional support, falling back to quadrature."
            );
            return Ok(quadrature::average_pcs(problem, support, &self.pcs_quadrature));
        }
        if (accepted as f64) < LOW_ACCEPTANCE_FRACTION * set.len() as f64 {
            if !self.low_acceptance_warned.swap(true, Ordering::Relaxed) {
                warn!(
                    model = %self.model,
                    accepted,
                    points,
                    "Fewer than 1% of the Sobol points lie inside the motional support, PCS averages are poorly sampled."
                );
            } else {
                debug!(accepted, points, "Low Sobol acceptance.");
            }
        }
        Ok(averages)
    }

    fn sobol_set(&self, points: usize) -> Result<&SobolSet, EvaluationError> {
        self.sobol
            .get_or_init(|| SobolSet::generate(self.entry.sobol_dims, points))
            .as_ref()
            .map_err(|e| EvaluationError::from(e.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::{BOLTZMANN, MU0, field_strength};
    use crate::core::utils::geometry::spherical_to_cartesian;
    use crate::engine::config::TargetConfigBuilder;
    use crate::core::models::dataset::AlignmentData;
    use std::f64::consts::PI;

    const TEMPERATURE: f64 = 298.0;
    const FREQUENCY: f64 = 600.0e6;

    const TENSOR_A: [f64; 5] = [-1.2e-4, 3.4e-4, 0.8e-4, -1.5e-4, 0.6e-4];
    const TENSOR_B: [f64; 5] = [2.1e-4, -0.9e-4, -1.1e-4, 0.4e-4, 1.9e-4];

    fn rdc_vectors() -> Vec<[f64; 3]> {
        [[1.0f64, 2.0, 2.0], [0.0, -3.0, 4.0], [2.0, -1.0, 2.0], [6.0, 0.0, 8.0]]
            .iter()
            .map(|v| {
                let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
                [v[0] / n, v[1] / n, v[2] / n]
            })
            .collect()
    }

    fn atomic_positions() -> Vec<[f64; 3]> {
        vec![
            [14.0, -3.5, 9.0],
            [8.0, 11.0, -4.0],
            [-6.5, 12.0, 10.0],
            [10.0, 2.0, 15.0],
        ]
    }

    fn alignment(tensor: [f64; 5], rdc: Vec<f64>, pcs: Vec<f64>) -> AlignmentData {
        AlignmentData::new(tensor)
            .rdc(ObservableSet::new(rdc))
            .pcs(ObservableSet::new(pcs), TEMPERATURE, FREQUENCY)
    }

    fn two_alignments() -> Vec<AlignmentData> {
        vec![
            alignment(
                TENSOR_A,
                vec![3.1, -4.2, f64::NAN, 1.5],
                vec![1.2e-6, -0.4e-6, 2.2e-6, 0.7e-6],
            ),
            alignment(
                TENSOR_B,
                vec![-2.0, 5.5, 0.3, -1.0],
                vec![-0.8e-6, 1.9e-6, f64::NAN, -0.3e-6],
            ),
        ]
    }

    fn builder(model: MotionalModel, alignments: Vec<AlignmentData>) -> TargetConfigBuilder {
        TargetConfigBuilder::new()
            .model(model)
            .alignments(alignments)
            .rdc_vectors(rdc_vectors())
            .dipolar_constants(vec![-21_500.0; 4])
            .atomic_positions(atomic_positions())
            .pivot([1.0, 0.5, -0.5])
            .paramag_centre([-2.0, 1.0, 3.0])
    }

    fn target(model: MotionalModel, quad_int: bool) -> FrameOrderTarget {
        let config = builder(model, two_alignments())
            .quad_int(quad_int)
            .num_int_pts(2000)
            .build()
            .unwrap();
        FrameOrderTarget::new(config).unwrap()
    }

    fn params(model: MotionalModel) -> Vec<f64> {
        match model {
            MotionalModel::Rigid => vec![0.3, 0.9, -1.2],
            MotionalModel::Rotor => vec![0.3, 0.9, -1.2, 0.6, 2.0, 0.8],
            MotionalModel::FreeRotor => vec![0.9, -1.2, 0.6, 2.0],
            MotionalModel::IsoCone => vec![0.3, 0.9, -1.2, 0.6, 2.0, 0.5, 0.8],
            MotionalModel::IsoConeTorsionless => vec![0.3, 0.9, -1.2, 0.6, 2.0, 0.5],
            MotionalModel::IsoConeFreeRotor => vec![0.9, -1.2, 0.6, 2.0, 0.7],
            MotionalModel::PseudoEllipse => vec![0.3, 0.9, -1.2, 0.2, 1.1, -0.6, 0.7, 0.4, 0.8],
            MotionalModel::PseudoEllipseTorsionless => {
                vec![0.3, 0.9, -1.2, 0.2, 1.1, -0.6, 0.7, 0.4]
            }
            MotionalModel::PseudoEllipseFreeRotor => vec![0.3, 0.9, -1.2, 0.2, 1.1, -0.6, 0.7, 0.4],
            MotionalModel::Line => vec![0.3, 0.9, -1.2, 0.2, 1.1, -0.6, 0.5, 0.8],
            MotionalModel::LineTorsionless => vec![0.3, 0.9, -1.2, 0.2, 1.1, -0.6, 0.5],
            MotionalModel::LineFreeRotor => vec![0.3, 0.9, -1.2, 0.2, 1.1, -0.6, 0.5],
        }
    }

    #[test]
    fn every_model_returns_a_finite_non_negative_chi2() {
        for model in MotionalModel::ALL {
            let target = target(model, false);
            let chi2 = target.evaluate(&params(model)).unwrap();
            assert!(chi2.is_finite() && chi2 >= 0.0, "{model} gave {chi2}");
        }
    }

    #[test]
    fn quadrature_mode_returns_a_finite_non_negative_chi2() {
        for model in [
            MotionalModel::Rotor,
            MotionalModel::IsoConeTorsionless,
            MotionalModel::LineFreeRotor,
        ] {
            let chi2 = target(model, true).evaluate(&params(model)).unwrap();
            assert!(chi2.is_finite() && chi2 >= 0.0, "{model} gave {chi2}");
        }
    }

    #[test]
    fn repeated_evaluation_is_bit_identical() {
        let model = MotionalModel::PseudoEllipse;
        let target = target(model, false);
        let p = params(model);
        let first = target.evaluate(&p).unwrap();
        let second = target.evaluate(&p).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn wrong_parameter_count_is_an_evaluation_error() {
        let target = target(MotionalModel::IsoCone, false);
        assert_eq!(
            target.evaluate(&[0.0; 3]),
            Err(EvaluationError::ParameterCount {
                expected: 7,
                found: 3
            })
        );
    }

    #[test]
    fn small_iso_cone_approaches_the_rigid_model() {
        let rigid = target(MotionalModel::Rigid, true)
            .evaluate(&[0.3, 0.9, -1.2])
            .unwrap();
        let cone = target(MotionalModel::IsoCone, true)
            .evaluate(&[0.3, 0.9, -1.2, 0.6, 2.0, 1e-4, 1e-4])
            .unwrap();
        assert!((cone - rigid).abs() <= 1e-5 * rigid, "cone {cone}, rigid {rigid}");
    }

    #[test]
    fn reversing_the_alignment_order_keeps_the_total() {
        let model = MotionalModel::IsoCone;
        let forward = target(model, false);
        let mut reversed_data = two_alignments();
        reversed_data.reverse();
        let reversed = FrameOrderTarget::new(
            builder(model, reversed_data)
                .num_int_pts(2000)
                .build()
                .unwrap(),
        )
        .unwrap();

        let p = params(model);
        let a = forward.back_calculate(&p).unwrap();
        let b = reversed.back_calculate(&p).unwrap();
        assert_eq!(a.chi2[0], b.chi2[1]);
        assert_eq!(a.chi2[1], b.chi2[0]);
        assert!((a.total_chi2 - b.total_chi2).abs() <= 1e-12 * a.total_chi2);
    }

    #[test]
    fn missing_flag_on_zero_weight_point_keeps_chi2() {
        let model = MotionalModel::Line;
        let with_weights = |rdc_value: f64, pcs_value: f64| {
            let mut data = two_alignments();
            data[1].rdc = Some(
                ObservableSet::new(vec![-2.0, 5.5, rdc_value, -1.0])
                    .with_weights(vec![1.0, 1.0, 0.0, 1.0]),
            );
            data[0].pcs = Some(
                ObservableSet::new(vec![1.2e-6, pcs_value, 2.2e-6, 0.7e-6])
                    .with_weights(vec![1.0, 0.0, 1.0, 1.0]),
            );
            let config = builder(model, data).num_int_pts(1000).build().unwrap();
            FrameOrderTarget::new(config)
                .unwrap()
                .evaluate(&params(model))
                .unwrap()
        };
        let weighted = with_weights(0.3, -0.4e-6);
        let missing = with_weights(f64::NAN, f64::NAN);
        assert!((weighted - missing).abs() <= 1e-12 * weighted);
    }

    #[test]
    fn rigid_pcs_matches_the_point_dipole_formula() {
        let atom = [9.0, -4.0, 12.0];
        let centre = [-1.0, 2.0, 0.5];
        let data = vec![AlignmentData::new(TENSOR_A).pcs(
            ObservableSet::new(vec![1.0e-6]),
            TEMPERATURE,
            FREQUENCY,
        )];
        let config = TargetConfigBuilder::new()
            .model(MotionalModel::Rigid)
            .alignments(data)
            .atomic_positions(vec![atom])
            .pivot([3.0, 3.0, 3.0])
            .paramag_centre(centre)
            .build()
            .unwrap();
        let target = FrameOrderTarget::new(config).unwrap();
        let result = target.back_calculate(&[0.0, 0.0, 0.0]).unwrap();

        let v = Vector3::from(atom) - Vector3::from(centre);
        let a = tensor_5d_to_3x3(&Tensor5::from(TENSOR_A));
        let b0 = field_strength(FREQUENCY);
        let constant = MU0 / (4.0 * PI) * 15.0 * BOLTZMANN * TEMPERATURE / (b0 * b0);
        let r = v.norm() * 1e-10;
        let expected = constant / r.powi(5) * (v * 1e-10).dot(&(a * (v * 1e-10)));

        let pcs = result.pcs[0].as_ref().unwrap()[0];
        assert!((pcs - expected).abs() <= 1e-12 * expected.abs(), "{pcs} vs {expected}");
        assert!(result.rdc[0].is_none());
    }

    #[test]
    fn rigid_rdc_is_the_tensor_contraction() {
        let data = vec![AlignmentData::new(TENSOR_B).rdc(ObservableSet::new(vec![0.0; 4]))];
        let config = TargetConfigBuilder::new()
            .model(MotionalModel::Rigid)
            .alignments(data)
            .rdc_vectors(rdc_vectors())
            .dipolar_constants(vec![-21_500.0; 4])
            .build()
            .unwrap();
        let target = FrameOrderTarget::new(config).unwrap();
        let result = target.back_calculate(&[0.0, 0.0, 0.0]).unwrap();

        let a = tensor_5d_to_3x3(&Tensor5::from(TENSOR_B));
        for (value, mu) in result.rdc[0].as_ref().unwrap().iter().zip(rdc_vectors()) {
            let mu = Vector3::from(mu);
            assert!((value - -21_500.0 * mu.dot(&(a * mu))).abs() < 1e-10);
        }
        assert_eq!(result.reduced_tensors[0], TENSOR_B);
    }

    #[test]
    fn back_calculation_marks_missing_entries_and_sums_chi2() {
        let model = MotionalModel::Rotor;
        let target = target(model, false);
        let result = target.back_calculate(&params(model)).unwrap();
        assert!(result.rdc[0].as_ref().unwrap()[2].is_nan());
        assert!(result.pcs[1].as_ref().unwrap()[2].is_nan());
        assert!(result.pcs[0].as_ref().unwrap()[2].is_finite());
        assert_eq!(result.total_chi2, result.chi2.iter().sum::<f64>());
        assert_eq!(result.total_chi2, target.evaluate(&params(model)).unwrap());
        assert!(result.accepted_points.unwrap() > 0);
    }

    #[test]
    fn error_flag_reports_pcs_standard_errors() {
        let model = MotionalModel::IsoCone;
        let config = builder(model, two_alignments())
            .error_flag(true)
            .num_int_pts(1000)
            .build()
            .unwrap();
        let target = FrameOrderTarget::new(config).unwrap();
        let result = target.back_calculate(&params(model)).unwrap();
        let errors = result.pcs_errors[0].as_ref().unwrap();
        assert!(errors[0] > 0.0);
    }

    #[test]
    fn scaling_is_undone_before_unpacking() {
        let model = MotionalModel::IsoConeTorsionless;
        let p = params(model);
        let factors: [f64; 6] = [1.0, 1.0, 1.0, 2.0, 2.0, 0.5];
        let scaled: Vec<f64> = p.iter().zip(factors).map(|(x, s)| x / s).collect();
        let config = builder(model, two_alignments())
            .quad_int(true)
            .scaling(DMatrix::from_diagonal(&nalgebra::DVector::from_row_slice(&factors)))
            .build()
            .unwrap();
        let scaled_target = FrameOrderTarget::new(config).unwrap();
        let plain = target(model, true).evaluate(&p).unwrap();
        let unscaled = scaled_target.evaluate(&scaled).unwrap();
        assert!((plain - unscaled).abs() <= 1e-10 * plain);
    }

    #[test]
    fn free_rotor_reduced_tensor_is_symmetric_about_the_axis() {
        let target = target(MotionalModel::FreeRotor, false);
        let result = target.back_calculate(&[0.9, -1.2, 0.6, 2.0]).unwrap();
        let axis = spherical_to_cartesian(0.6, 2.0);
        for reduced in &result.reduced_tensors {
            let t = tensor_5d_to_3x3(&Tensor5::from(*reduced));
            let image = t * axis;
            assert!(image.cross(&axis).norm() < 1e-18, "{image:?}");
        }
    }

    #[test]
    fn construction_rejects_incomplete_data() {
        let no_vectors = TargetConfigBuilder::new()
            .model(MotionalModel::Rotor)
            .alignment(AlignmentData::new(TENSOR_A).rdc(ObservableSet::new(vec![1.0])))
            .build()
            .unwrap();
        assert_eq!(
            FrameOrderTarget::new(no_vectors).unwrap_err(),
            ConfigError::MissingRdcVectors
        );

        let no_positions = TargetConfigBuilder::new()
            .model(MotionalModel::Rotor)
            .alignment(AlignmentData::new(TENSOR_A).pcs(
                ObservableSet::new(vec![1.0]),
                TEMPERATURE,
                FREQUENCY,
            ))
            .build()
            .unwrap();
        assert_eq!(
            FrameOrderTarget::new(no_positions).unwrap_err(),
            ConfigError::MissingAtomicPositions
        );

        let mut data = two_alignments();
        data[1].frequency = None;
        let no_frequency = builder(MotionalModel::Rotor, data).build().unwrap();
        assert_eq!(
            FrameOrderTarget::new(no_frequency).unwrap_err(),
            ConfigError::MissingPcsConditions { alignment: 1 }
        );

        let mut data = two_alignments();
        data[0].frequency = Some(0.0);
        let zero_frequency = builder(MotionalModel::Rotor, data).build().unwrap();
        assert_eq!(
            FrameOrderTarget::new(zero_frequency).unwrap_err(),
            ConfigError::InvalidPcsConditions { alignment: 0 }
        );

        for temperature in [f64::NAN, -298.0, f64::INFINITY] {
            let mut data = two_alignments();
            data[1].temperature = Some(temperature);
            let config = builder(MotionalModel::Rotor, data).build().unwrap();
            assert_eq!(
                FrameOrderTarget::new(config).unwrap_err(),
                ConfigError::InvalidPcsConditions { alignment: 1 }
            );
        }
    }

    #[test]
    fn construction_rejects_negative_or_non_finite_weights() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let mut data = two_alignments();
            data[0].rdc = Some(
                ObservableSet::new(vec![3.1, -4.2, 0.5, 1.5]).with_weights(vec![1.0, bad, 1.0, 1.0]),
            );
            let config = builder(MotionalModel::Rotor, data).build().unwrap();
            assert_eq!(
                FrameOrderTarget::new(config).unwrap_err(),
                ConfigError::InvalidWeight {
                    what: "RDC data of alignment 0".to_string(),
                    index: 1
                }
            );
        }
    }

    #[test]
    fn construction_rejects_non_positive_errors_but_keeps_nan_defaults() {
        for bad in [0.0, -0.1e-6, f64::INFINITY] {
            let mut data = two_alignments();
            data[1].pcs = Some(
                ObservableSet::new(vec![-0.8e-6, 1.9e-6, 0.4e-6, -0.3e-6])
                    .with_errors(vec![0.1e-6, 0.1e-6, 0.1e-6, bad]),
            );
            let config = builder(MotionalModel::Rotor, data).build().unwrap();
            assert_eq!(
                FrameOrderTarget::new(config).unwrap_err(),
                ConfigError::InvalidError {
                    what: "PCS data of alignment 1".to_string(),
                    index: 3
                }
            );
        }

        let mut data = two_alignments();
        data[1].pcs = Some(
            ObservableSet::new(vec![-0.8e-6, 1.9e-6, 0.4e-6, -0.3e-6])
                .with_errors(vec![0.1e-6, f64::NAN, 0.1e-6, 0.1e-6]),
        );
        let config = builder(MotionalModel::Rotor, data).build().unwrap();
        let chi2 = FrameOrderTarget::new(config)
            .unwrap()
            .evaluate(&params(MotionalModel::Rotor))
            .unwrap();
        assert!(chi2.is_finite() && chi2 >= 0.0);
    }

    fn quadrature_chi2(model: MotionalModel, p: &[f64]) -> f64 {
        target(model, true).evaluate(p).unwrap()
    }

    fn assert_close(a: f64, b: f64, rel: f64) {
        assert!((a - b).abs() <= rel * b.abs(), "{a} vs {b}");
    }

    // The Euler eigenframe puts its z-axis at polar angle beta and azimuth
    // gamma, and a circular cone is symmetric about it for any alpha.
    #[test]
    fn circular_pseudo_ellipse_matches_the_iso_cone() {
        let (axis_theta, axis_phi, cone) = (0.6, 2.0, 0.5);
        let iso = quadrature_chi2(
            MotionalModel::IsoCone,
            &[0.3, 0.9, -1.2, axis_theta, axis_phi, cone, 0.8],
        );
        let ellipse = quadrature_chi2(
            MotionalModel::PseudoEllipse,
            &[0.3, 0.9, -1.2, 0.4, axis_theta, axis_phi, cone, cone, 0.8],
        );
        assert_close(ellipse, iso, 1e-6);
    }

    #[test]
    fn circular_torsionless_pseudo_ellipse_matches_the_iso_cone() {
        let iso = quadrature_chi2(
            MotionalModel::IsoConeTorsionless,
            &[0.3, 0.9, -1.2, 0.6, 2.0, 0.5],
        );
        let ellipse = quadrature_chi2(
            MotionalModel::PseudoEllipseTorsionless,
            &[0.3, 0.9, -1.2, -1.1, 0.6, 2.0, 0.5, 0.5],
        );
        assert_close(ellipse, iso, 1e-6);
    }

    #[test]
    fn circular_free_rotor_pseudo_ellipse_matches_the_iso_cone_order_parameter() {
        let cone: f64 = 0.5;
        let s1 = cone.cos() * (1.0 + cone.cos()) / 2.0;
        let iso = quadrature_chi2(
            MotionalModel::IsoConeFreeRotor,
            &[0.9, -1.2, 0.6, 2.0, s1],
        );
        let ellipse = quadrature_chi2(
            MotionalModel::PseudoEllipseFreeRotor,
            &[0.0, 0.9, -1.2, 0.7, 0.6, 2.0, cone, cone],
        );
        assert_close(ellipse, iso, 1e-6);
    }

    #[test]
    fn vanishing_pseudo_ellipse_approaches_the_rotor() {
        let rotor = quadrature_chi2(MotionalModel::Rotor, &[0.3, 0.9, -1.2, 0.6, 2.0, 0.8]);
        let ellipse = quadrature_chi2(
            MotionalModel::PseudoEllipse,
            &[0.3, 0.9, -1.2, 0.4, 0.6, 2.0, 1e-3, 1e-3, 0.8],
        );
        assert_close(ellipse, rotor, 1e-4);
    }

    #[test]
    fn back_calculation_reports_the_lab_frame_first_degree_matrix() {
        let target = target(MotionalModel::FreeRotor, false);
        let result = target.back_calculate(&[0.9, -1.2, 0.6, 2.0]).unwrap();
        let axis = spherical_to_cartesian(0.6, 2.0);
        assert!((result.first_degree - axis * axis.transpose()).abs().max() < 1e-14);

        let rigid = target_without_motion().back_calculate(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(rigid.first_degree, Matrix3::identity());
    }

    fn target_without_motion() -> FrameOrderTarget {
        FrameOrderTarget::new(builder(MotionalModel::Rigid, two_alignments()).build().unwrap())
            .unwrap()
    }

    #[test]
    fn optimised_pivot_moves_the_rigid_average_position() {
        let config = builder(MotionalModel::Rigid, two_alignments())
            .pivot_opt(true)
            .build()
            .unwrap();
        let target = FrameOrderTarget::new(config).unwrap();
        assert_eq!(target.parameter_count(), 6);

        let at_pivot = target.evaluate(&[1.0, 0.5, -0.5, 0.3, 0.9, -1.2]).unwrap();
        let fixed = target_without_motion().evaluate(&[0.3, 0.9, -1.2]).unwrap();
        let elsewhere = target.evaluate(&[4.0, -2.0, 3.0, 0.3, 0.9, -1.2]).unwrap();
        assert_close(at_pivot, fixed, 1e-12);
        assert!((elsewhere - at_pivot).abs() > 1e-6 * at_pivot);
    }

    #[test]
    fn construction_rejects_inconsistent_shapes() {
        let short = builder(MotionalModel::Rotor, two_alignments())
            .dipolar_constants(vec![1.0; 3])
            .build()
            .unwrap();
        assert!(matches!(
            FrameOrderTarget::new(short).unwrap_err(),
            ConfigError::LengthMismatch { expected: 4, found: 3, .. }
        ));

        let scaling = builder(MotionalModel::Rotor, two_alignments())
            .scaling(DMatrix::identity(5, 5))
            .build()
            .unwrap();
        assert_eq!(
            FrameOrderTarget::new(scaling).unwrap_err(),
            ConfigError::ScalingShape {
                expected: 6,
                rows: 5,
                cols: 5
            }
        );

        let no_points = builder(MotionalModel::Rotor, two_alignments())
            .num_int_pts(0)
            .build()
            .unwrap();
        assert_eq!(
            FrameOrderTarget::new(no_points).unwrap_err(),
            ConfigError::ZeroIntegrationPoints
        );
    }

    #[test]
    fn flags_and_names_describe_the_run() {
        let mut data = two_alignments();
        data[0].pcs = None;
        let target = FrameOrderTarget::new(
            builder(MotionalModel::LineTorsionless, data)
                .pivot_opt(true)
                .build()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(target.rdc_flags(), vec![true, true]);
        assert_eq!(target.pcs_flags(), vec![false, true]);
        assert_eq!(target.parameter_count(), 10);
        assert_eq!(target.parameter_names()[0], "pivot_x");
        assert_eq!(target.model(), MotionalModel::LineTorsionless);
    }
}
