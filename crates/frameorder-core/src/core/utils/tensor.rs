use super::geometry::Matrix9;
use nalgebra::{Matrix3, Vector5};

/// Five independent components `{Axx, Ayy, Axy, Axz, Ayz}` of a traceless
/// symmetric alignment tensor.
pub type Tensor5 = Vector5<f64>;

pub fn tensor_5d_to_3x3(a: &Tensor5) -> Matrix3<f64> {
    Matrix3::new(
        a[0],
        a[2],
        a[3],
        a[2],
        a[1],
        a[4],
        a[3],
        a[4],
        -a[0] - a[1],
    )
}

pub fn tensor_3x3_to_5d(t: &Matrix3<f64>) -> Tensor5 {
    Tensor5::new(t[(0, 0)], t[(1, 1)], t[(0, 1)], t[(0, 2)], t[(1, 2)])
}

/// Averages a full tensor through a second degree frame order matrix.
///
/// Component `m` of the result contracts column `c(m)` of the matrix, with
/// `c = [0, 4, 1, 2, 5]` picking out `{xx, yy, xy, xz, yz}`.
pub fn reduce_tensor(frame_order: &Matrix9, full: &Tensor5) -> Tensor5 {
    const COLUMNS: [usize; 5] = [0, 4, 1, 2, 5];

    let mut reduced = Tensor5::zeros();
    for (m, &col) in COLUMNS.iter().enumerate() {
        let d = |row: usize| frame_order[(row, col)];
        reduced[m] = (d(0) - d(8)) * full[0]
            + (d(4) - d(8)) * full[1]
            + (d(1) + d(3)) * full[2]
            + (d(2) + d(6)) * full[3]
            + (d(5) + d(7)) * full[4];
    }
    reduced
}

/// Rotates a 3×3 tensor: `Rᵀ·T·R` in the forward sense, `R·T·Rᵀ` otherwise.
pub fn rotate_tensor(r: &Matrix3<f64>, tensor: &Matrix3<f64>, forward: bool) -> Matrix3<f64> {
    if forward {
        r.transpose() * tensor * r
    } else {
        r * tensor * r.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::geometry::{euler_to_r_zyz, kron};

    const TOLERANCE: f64 = 1e-14;

    fn sample_tensor() -> Tensor5 {
        Tensor5::new(-1.2e-4, 3.4e-4, 0.7e-4, -2.1e-4, 0.5e-4)
    }

    #[test]
    fn five_component_form_round_trips_through_full_matrix() {
        let a = sample_tensor();
        let full = tensor_5d_to_3x3(&a);
        assert_eq!(tensor_3x3_to_5d(&full), a);
        assert_eq!(full, full.transpose());
        assert!(full.trace().abs() < TOLERANCE);
    }

    #[test]
    fn reducing_through_identity_leaves_tensor_unchanged() {
        let a = sample_tensor();
        let reduced = reduce_tensor(&Matrix9::identity(), &a);
        assert!((reduced - a).norm() < TOLERANCE);
    }

    #[test]
    fn reducing_through_single_state_matrix_rotates_tensor() {
        let r = euler_to_r_zyz(0.3, 1.2, -0.7);
        let a = sample_tensor();
        let reduced = tensor_5d_to_3x3(&reduce_tensor(&kron(&r), &a));
        let expected = r.transpose() * tensor_5d_to_3x3(&a) * r;
        assert!((reduced - expected).norm() < TOLERANCE);
    }

    #[test]
    fn forward_and_inverse_rotations_undo_each_other() {
        let r = euler_to_r_zyz(2.1, 0.4, 1.0);
        let t = tensor_5d_to_3x3(&sample_tensor());
        let there = rotate_tensor(&r, &t, true);
        let back = rotate_tensor(&r, &there, false);
        assert!((back - t).norm() < TOLERANCE);
        assert!((there - r.transpose() * t * r).norm() < TOLERANCE);
    }
}
