//! Frame order matrices of the motional models.
//!
//! Every model describes a distribution of rotations `R'(θ, φ, σ)` in its
//! motional eigenframe. The second degree matrix holds `⟨R' ⊗ R'⟩` in
//! Kronecker layout and drives the RDC tensor averaging; the first degree
//! matrix holds `⟨R'⟩`. The angular [`Support`] of the same distribution is
//! what the PCS integrators sample.

pub mod iso_cone;
pub mod line;
pub mod moments;
pub mod pseudo_ellipse;
pub mod rotor;
pub mod support;

use crate::core::utils::geometry::{Matrix9, kron};
use nalgebra::Matrix3;
use std::fmt;

pub use iso_cone::{IsoCone, iso_cone_s1_to_theta};
pub use line::Line;
pub use pseudo_ellipse::{DEGENERATE_NORMALISER, PseudoEllipse};
pub use rotor::{Rigid, Rotor};
pub use support::{Support, Tilt, Torsion};

/// A motional model instantiated with its current amplitude parameters.
pub trait MotionShape: fmt::Debug + Send + Sync {
    /// `⟨R' ⊗ R'⟩` in the motional eigenframe.
    fn second_degree(&self) -> Matrix9;

    /// `⟨R'⟩` in the motional eigenframe.
    fn first_degree(&self) -> Matrix3<f64>;

    fn support(&self) -> Support;
}

/// Rotates an eigenframe matrix into the lab frame.
///
/// `r` maps lab vectors into the eigenframe, so the lab-frame matrix is
/// `(R ⊗ R)ᵀ · D · (R ⊗ R)`.
pub fn rotate_frame_order(frame_order: &Matrix9, r: &Matrix3<f64>) -> Matrix9 {
    let rx2 = kron(r);
    rx2.transpose() * frame_order * rx2
}

/// Lab frame first degree matrix, `Rᵀ · ⟨R'⟩ · R`.
pub fn rotate_first_degree(frame_order: &Matrix3<f64>, r: &Matrix3<f64>) -> Matrix3<f64> {
    r.transpose() * frame_order * r
}
