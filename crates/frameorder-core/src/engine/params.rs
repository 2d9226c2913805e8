use super::error::EvaluationError;
use super::registry::{AxisForm, ModelEntry};
use crate::core::utils::geometry::{axis_to_axis_r, euler_to_r_zyz, spherical_to_cartesian};
use nalgebra::{DMatrix, Matrix3, RowDVector, Vector3};

const PIVOT: [&str; 3] = ["pivot_x", "pivot_y", "pivot_z"];
const TRANSLATION: [&str; 3] = ["ave_pos_x", "ave_pos_y", "ave_pos_z"];
const AVE_POS_ALPHA: &str = "ave_pos_alpha";
const AVE_POS_BETA_GAMMA: [&str; 2] = ["ave_pos_beta", "ave_pos_gamma"];

/// Order and meaning of the parameter vector for one model and toggle set:
/// `[pivot] [translation] [average position] [motional axis] [shape]`.
#[derive(Debug, Clone, Copy)]
pub struct ParameterLayout {
    entry: &'static ModelEntry,
    pivot_opt: bool,
    translation_opt: bool,
}

/// A parameter vector split into named quantities.
#[derive(Debug, Clone, PartialEq)]
pub struct Unpacked<'a> {
    pub pivot: Option<Vector3<f64>>,
    /// Zero unless the translation is optimised.
    pub translation: Vector3<f64>,
    /// z-y-z Euler angles of the average domain position.
    pub ave_pos: [f64; 3],
    /// Lab to motional eigenframe rotation.
    pub eigen_frame: Matrix3<f64>,
    pub shape: &'a [f64],
}

impl ParameterLayout {
    pub fn new(entry: &'static ModelEntry, pivot_opt: bool, translation_opt: bool) -> Self {
        Self {
            entry,
            pivot_opt,
            translation_opt,
        }
    }

    pub fn len(&self) -> usize {
        let block = |on: bool| if on { 3 } else { 0 };
        block(self.pivot_opt)
            + block(self.translation_opt)
            + if self.entry.ave_alpha { 3 } else { 2 }
            + self.entry.axis.parameter_names().len()
            + self.entry.shape_parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(self.len());
        if self.pivot_opt {
            names.extend(PIVOT);
        }
        if self.translation_opt {
            names.extend(TRANSLATION);
        }
        if self.entry.ave_alpha {
            names.push(AVE_POS_ALPHA);
        }
        names.extend(AVE_POS_BETA_GAMMA);
        names.extend(self.entry.axis.parameter_names());
        names.extend(self.entry.shape_parameters);
        names
    }

    pub fn unpack<'a>(&self, params: &'a [f64]) -> Result<Unpacked<'a>, EvaluationError> {
        let expected = self.len();
        if params.len() != expected {
            return Err(EvaluationError::ParameterCount {
                expected,
                found: params.len(),
            });
        }

        let mut rest = params;
        let mut take = |n: usize| {
            let (head, tail) = rest.split_at(n);
            rest = tail;
            head
        };
        let vector = |p: &[f64]| Vector3::new(p[0], p[1], p[2]);

        let pivot = self.pivot_opt.then(|| vector(take(3)));
        let translation = if self.translation_opt {
            vector(take(3))
        } else {
            Vector3::zeros()
        };
        let ave_pos = if self.entry.ave_alpha {
            let p = take(3);
            [p[0], p[1], p[2]]
        } else {
            let p = take(2);
            [0.0, p[0], p[1]]
        };
        let eigen_frame = match self.entry.axis {
            AxisForm::None => Matrix3::identity(),
            AxisForm::Spherical => {
                let p = take(2);
                let axis = spherical_to_cartesian(p[0], p[1]);
                axis_to_axis_r(&Vector3::z(), &axis).transpose()
            }
            AxisForm::Euler => {
                let p = take(3);
                euler_to_r_zyz(p[0], p[1], p[2]).transpose()
            }
        };
        let shape = take(self.entry.shape_parameters.len());

        Ok(Unpacked {
            pivot,
            translation,
            ave_pos,
            eigen_frame,
            shape,
        })
    }
}

/// Undoes the optimiser's parameter scaling, `p · S`.
pub fn unscale(params: &[f64], scaling: Option<&DMatrix<f64>>) -> Vec<f64> {
    match scaling {
        Some(s) => (RowDVector::from_row_slice(params) * s).iter().copied().collect(),
        None => params.to_vec(),
    }
}
