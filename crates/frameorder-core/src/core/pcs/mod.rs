//! Motion-averaged pseudo-contact shifts.
//!
//! The PCS is not linear in the rotation, so unlike the RDC it cannot be
//! averaged through a frame order matrix. Instead the single-state PCS is
//! integrated over the angular support of the motional model, either by
//! nested adaptive quadrature ([`quadrature`]) or by averaging over a
//! precomputed Sobol point set ([`quasi_random`]).

pub mod quadrature;
pub mod quasi_random;

use crate::core::alignment::pcs_point;
use crate::core::utils::geometry::tilt_torsion_r;
use nalgebra::{Matrix3, Vector3};

/// Per-alignment inputs of the PCS average.
#[derive(Debug, Clone)]
pub struct PcsAlignment<'a> {
    /// Distance-free PCS constant, in Ångström units.
    pub constant: f64,
    /// Full (unreduced) alignment tensor.
    pub tensor: Matrix3<f64>,
    /// Pivot to atom vectors at the average domain position, one per spin.
    pub pivot_atom: &'a [Vector3<f64>],
    pub missing: &'a [bool],
}

/// Everything the PCS integrators need for one evaluation.
#[derive(Debug, Clone)]
pub struct PcsProblem<'a> {
    /// Lab to motional eigenframe rotation.
    pub eigen_frame: Matrix3<f64>,
    /// Paramagnetic centre to pivot vector.
    pub ln_pivot: Vector3<f64>,
    pub alignments: Vec<PcsAlignment<'a>>,
}

impl PcsProblem<'_> {
    /// Lab frame rotation of the state `(θ, φ, σ)`: `Rᵀ · R'(θ, φ, σ) · R`.
    #[inline]
    pub fn state_rotation(&self, theta: f64, phi: f64, sigma: f64) -> Matrix3<f64> {
        let r = &self.eigen_frame;
        r.transpose() * tilt_torsion_r(theta, phi, sigma) * r
    }

    fn zeroed(&self) -> Vec<Vec<f64>> {
        self.alignments
            .iter()
            .map(|a| vec![0.0; a.pivot_atom.len()])
            .collect()
    }

    /// PCS values of the unmoved domain, the rigid limit of every model.
    pub fn rigid(&self) -> PcsAverages {
        let mut values = self.zeroed();
        for (alignment, out) in self.alignments.iter().zip(values.iter_mut()) {
            for (j, vector) in alignment.pivot_atom.iter().enumerate() {
                if !alignment.missing[j] {
                    out[j] = alignment.constant
                        * state_pcs(&Matrix3::identity(), vector, &self.ln_pivot, &alignment.tensor);
                }
            }
        }
        PcsAverages {
            values,
            errors: None,
            accepted: None,
        }
    }
}

/// Distance-free PCS of one atom in one rotational state, `vᵀAv / |v|⁵`.
#[inline]
pub fn state_pcs(
    rotation: &Matrix3<f64>,
    pivot_atom: &Vector3<f64>,
    ln_pivot: &Vector3<f64>,
    tensor: &Matrix3<f64>,
) -> f64 {
    let v = rotation * pivot_atom + ln_pivot;
    pcs_point(1.0, &v, tensor)
}

/// Averaged PCS values, indexed `[alignment][spin]`. Missing entries are zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PcsAverages {
    pub values: Vec<Vec<f64>>,
    /// Standard error of the quasi-random estimate, when requested.
    pub errors: Option<Vec<Vec<f64>>>,
    /// Number of Sobol points inside the support.
    pub accepted: Option<usize>,
}


#[cfg(test)]
mod tests {
    use super::test_support::Fixture;
    use super::*;

    #[test]
    fn rigid_pcs_uses_atom_to_centre_vector() {
        let fixture = Fixture::new();
        let problem = fixture.problem();
        let averages = problem.rigid();
        let alignment = &problem.alignments[0];
        let v = fixture.vectors[0] + problem.ln_pivot;
        let expected = alignment.constant * v.dot(&(alignment.tensor * v)) / v.norm().powi(5);
        assert!((averages.values[0][0] - expected).abs() < 1e-15 * expected.abs().max(1.0));
        assert_eq!(averages.values[0][2], 0.0);
    }

    #[test]
    fn untilted_state_is_identity_rotation() {
        let fixture = Fixture::new();
        let r = fixture.problem().state_rotation(0.0, 0.0, 0.0);
        assert!((r - Matrix3::identity()).abs().max() < 1e-15);
    }
}
