use itertools::iproduct;
use nalgebra::{Matrix3, Rotation3, SMatrix, Unit, Vector3};
use std::f64::consts::PI;

/// Second degree frame order super-matrix, in Kronecker layout.
pub type Matrix9 = SMatrix<f64, 9, 9>;

/// The z-y-z Euler rotation `Rz(gamma) · Ry(beta) · Rz(alpha)`.
pub fn euler_to_r_zyz(alpha: f64, beta: f64, gamma: f64) -> Matrix3<f64> {
    let (sin_a, cos_a) = alpha.sin_cos();
    let (sin_b, cos_b) = beta.sin_cos();
    let (sin_g, cos_g) = gamma.sin_cos();

    Matrix3::new(
        -sin_a * sin_g + cos_a * cos_b * cos_g,
        -cos_a * sin_g - sin_a * cos_b * cos_g,
        sin_b * cos_g,
        sin_a * cos_g + cos_a * cos_b * sin_g,
        cos_a * cos_g - sin_a * cos_b * sin_g,
        sin_b * sin_g,
        -cos_a * sin_b,
        sin_a * sin_b,
        cos_b,
    )
}

/// Rotation taking the direction of `from` onto the direction of `to`.
///
/// Antiparallel vectors have no unique minimal rotation; a half turn about an
/// axis perpendicular to `from` is returned instead.
pub fn axis_to_axis_r(from: &Vector3<f64>, to: &Vector3<f64>) -> Matrix3<f64> {
    match Rotation3::rotation_between(from, to) {
        Some(rotation) => rotation.into_inner(),
        None => {
            let helper = if from.x.abs() < 0.9 {
                Vector3::x()
            } else {
                Vector3::y()
            };
            let axis = Unit::new_normalize(from.cross(&helper));
            Rotation3::from_axis_angle(&axis, PI).into_inner()
        }
    }
}

/// Unit vector for the polar angle `theta` and azimuthal angle `phi`.
pub fn spherical_to_cartesian(theta: f64, phi: f64) -> Vector3<f64> {
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();
    Vector3::new(cos_p * sin_t, sin_p * sin_t, cos_t)
}

/// Kronecker product `R ⊗ R`, element `[3i+k, 3j+l] = R[i,j] · R[k,l]`.
pub fn kron(r: &Matrix3<f64>) -> Matrix9 {
    let mut out = Matrix9::zeros();
    for (i, j, k, l) in iproduct!(0..3, 0..3, 0..3, 0..3) {
        out[(3 * i + k, 3 * j + l)] = r[(i, j)] * r[(k, l)];
    }
    out
}

/// Rotation of a single tilt-torsion state in the motional eigenframe.
///
/// `theta` tilts the z-axis towards the azimuth `phi` and `sigma` is the torsion
/// about the tilted axis. At `sigma = 0` this is the torsionless tilt rotation.
pub fn tilt_torsion_r(theta: f64, phi: f64, sigma: f64) -> Matrix3<f64> {
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();
    let (sin_sp, cos_sp) = (sigma - phi).sin_cos();

    Matrix3::new(
        cos_p * cos_t * cos_sp - sin_p * sin_sp,
        -cos_p * cos_t * sin_sp - sin_p * cos_sp,
        cos_p * sin_t,
        sin_p * cos_t * cos_sp + cos_p * sin_sp,
        -sin_p * cos_t * sin_sp + cos_p * cos_sp,
        sin_p * sin_t,
        -sin_t * cos_sp,
        sin_t * sin_sp,
        cos_t,
    )
}

/// Normalised sinc, `sin(πx) / (πx)`.
#[inline]
pub fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let y = PI * x;
        y.sin() / y
    }
}

/// `1 - cos(x)` without cancellation for small `x`.
#[inline]
pub fn one_minus_cos(x: f64) -> f64 {
    let half = (0.5 * x).sin();
    2.0 * half * half
}
