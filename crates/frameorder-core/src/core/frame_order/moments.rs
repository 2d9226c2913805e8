use crate::core::utils::geometry::Matrix9;
use itertools::iproduct;
use nalgebra::Matrix3;

/// Trigonometric moments of a symmetric angle distribution.
///
/// Odd moments (`⟨sin⟩`, `⟨sin·cos⟩`) vanish for every distribution used here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleMoments {
    pub cos: f64,
    pub cos2: f64,
    pub sin2: f64,
}

impl AngleMoments {
    pub const FIXED: AngleMoments = AngleMoments {
        cos: 1.0,
        cos2: 1.0,
        sin2: 0.0,
    };

    pub const FREE: AngleMoments = AngleMoments {
        cos: 0.0,
        cos2: 0.5,
        sin2: 0.5,
    };

    /// Uniform distribution on `[-σmax, σmax]`, given `sinc(σmax/π)` and
    /// `sinc(2σmax/π)`.
    pub fn from_sinc_terms(s1: f64, s2: f64) -> Self {
        Self {
            cos: s1,
            cos2: 0.5 * (1.0 + s2),
            sin2: 0.5 * (1.0 - s2),
        }
    }

    /// Polar angle on `[0, θmax]` with `sin θ` weighting.
    pub fn sine_weighted(theta_max: f64) -> Self {
        let c = theta_max.cos();
        let cos2 = (1.0 + c + c * c) / 3.0;
        Self {
            cos: 0.5 * (1.0 + c),
            cos2,
            sin2: (2.0 - c - c * c) / 3.0,
        }
    }

    #[inline]
    fn single(&self, factor: Factor) -> f64 {
        match factor {
            Factor::One => 1.0,
            Factor::Cos => self.cos,
            Factor::Sin => 0.0,
        }
    }

    #[inline]
    fn pair(&self, a: Factor, b: Factor) -> f64 {
        use Factor::*;
        match (a, b) {
            (One, One) => 1.0,
            (One, Cos) | (Cos, One) => self.cos,
            (Cos, Cos) => self.cos2,
            (Sin, Sin) => self.sin2,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Factor {
    One,
    Cos,
    Sin,
}

/// `sign · f(θ) · g(σ)`.
#[derive(Debug, Clone, Copy)]
struct Monomial {
    sign: f64,
    tilt: Factor,
    torsion: Factor,
}

const fn mono(sign: f64, tilt: Factor, torsion: Factor) -> Monomial {
    Monomial {
        sign,
        tilt,
        torsion,
    }
}

/// Elements of the tilt-torsion rotation with the tilt held in the x-z plane
/// (`φ = 0`), each a single product of a tilt and a torsion factor.
const PLANAR_ROTATION: [[Monomial; 3]; 3] = {
    use Factor::*;
    [
        [mono(1.0, Cos, Cos), mono(-1.0, Cos, Sin), mono(1.0, Sin, One)],
        [mono(1.0, One, Sin), mono(1.0, One, Cos), mono(0.0, One, One)],
        [mono(-1.0, Sin, Cos), mono(1.0, Sin, Sin), mono(1.0, Cos, One)],
    ]
};

/// Second degree frame order matrix for independent tilt and torsion
/// distributions restricted to the x-z plane.
///
/// The line tilt is symmetric under `θ → -θ`, which is the `φ = π` branch, so
/// only even tilt moments survive alongside `⟨cos θ⟩`.
pub fn planar_second_degree(tilt: &AngleMoments, torsion: &AngleMoments) -> Matrix9 {
    let mut out = Matrix9::zeros();
    for (i, j, k, l) in iproduct!(0..3, 0..3, 0..3, 0..3) {
        let a = PLANAR_ROTATION[i][j];
        let b = PLANAR_ROTATION[k][l];
        let sign = a.sign * b.sign;
        if sign != 0.0 {
            out[(3 * i + k, 3 * j + l)] =
                sign * tilt.pair(a.tilt, b.tilt) * torsion.pair(a.torsion, b.torsion);
        }
    }
    out
}

pub fn planar_first_degree(tilt: &AngleMoments, torsion: &AngleMoments) -> Matrix3<f64> {
    Matrix3::from_fn(|i, j| {
        let m = PLANAR_ROTATION[i][j];
        m.sign * tilt.single(m.tilt) * torsion.single(m.torsion)
    })
}
