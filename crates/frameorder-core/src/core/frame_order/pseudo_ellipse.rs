use super::MotionShape;
use super::support::{Support, Tilt, Torsion};
use crate::core::integration::{QuadratureSettings, quad};
use crate::core::utils::geometry::{Matrix9, one_minus_cos};
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

/// Cone normaliser substituted when the pseudo-ellipse has no area, so that
/// the frame order matrix collapses smoothly to zero rather than dividing by
/// zero.
pub const DEGENERATE_NORMALISER: f64 = 1e100;

/// Polar boundary of the pseudo-elliptic cone at azimuth `phi`.
#[inline]
pub fn tmax_pseudo_ellipse(phi: f64, theta_x: f64, theta_y: f64) -> f64 {
    if theta_x == 0.0 || theta_y == 0.0 {
        return 0.0;
    }
    let (sin_p, cos_p) = phi.sin_cos();
    theta_x * theta_y / ((cos_p * theta_y).powi(2) + (sin_p * theta_x).powi(2)).sqrt()
}

/// `∫_{-π}^{π} (1 - cos θmax(φ)) dφ`, the area of the pseudo-elliptic cone.
pub fn pec(theta_x: f64, theta_y: f64, settings: &QuadratureSettings) -> f64 {
    quad(
        |phi| one_minus_cos(tmax_pseudo_ellipse(phi, theta_x, theta_y)),
        -PI,
        PI,
        settings,
    )
}

/// [`pec`], saturated at [`DEGENERATE_NORMALISER`] for a zero-area cone.
pub fn cone_normaliser(theta_x: f64, theta_y: f64, settings: &QuadratureSettings) -> f64 {
    match pec(theta_x, theta_y, settings) {
        0.0 => DEGENERATE_NORMALISER,
        area => area,
    }
}

/// Trigonometric values of the cone boundary at one azimuth.
#[derive(Debug, Clone, Copy)]
struct Edge {
    /// `cos²φ`
    c2: f64,
    /// `sin²φ`
    s2: f64,
    /// `cos θmax`
    ct: f64,
    /// `sin² θmax`
    st2: f64,
}

impl Edge {
    #[inline]
    fn at(phi: f64, theta_x: f64, theta_y: f64) -> Self {
        let (sin_p, cos_p) = phi.sin_cos();
        let (sin_t, cos_t) = tmax_pseudo_ellipse(phi, theta_x, theta_y).sin_cos();
        Self {
            c2: cos_p * cos_p,
            s2: sin_p * sin_p,
            ct: cos_t,
            st2: sin_t * sin_t,
        }
    }
}

/// Pseudo-elliptic cone with torsion, torsionless or free rotor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PseudoEllipse {
    pub theta_x: f64,
    pub theta_y: f64,
    pub torsion: Torsion,
    pub settings: QuadratureSettings,
}

impl PseudoEllipse {
    pub fn new(theta_x: f64, theta_y: f64, torsion: Torsion) -> Self {
        Self {
            theta_x: theta_x.abs(),
            theta_y: theta_y.abs(),
            torsion,
            settings: QuadratureSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: QuadratureSettings) -> Self {
        self.settings = settings;
        self
    }

    fn integral<F>(&self, f: F) -> f64
    where
        F: Fn(&Edge) -> f64,
    {
        quad(
            |phi| f(&Edge::at(phi, self.theta_x, self.theta_y)),
            -PI,
            PI,
            &self.settings,
        )
    }

    fn normaliser(&self) -> f64 {
        cone_normaliser(self.theta_x, self.theta_y, &self.settings)
    }

    fn with_torsion(&self) -> Matrix9 {
        let (s1, s2) = self.torsion.sinc_terms();
        let fact = 1.0 / (12.0 * self.normaliser());
        let q = |f: fn(&Edge, f64) -> f64| self.integral(|e| f(e, s2));
        let mut m = Matrix9::zeros();

        m[(0, 0)] = fact * (4.0 * PI * (s2 + 2.0) + q(integrand::d00));
        m[(1, 1)] = fact * (4.0 * PI * s2 + q(integrand::d11));
        m[(2, 2)] = fact * 2.0 * s1 * (5.0 * PI - q(integrand::d22));
        m[(4, 4)] = fact * (4.0 * PI * (s2 + 2.0) + q(integrand::d44));
        m[(5, 5)] = fact * 2.0 * s1 * (5.0 * PI - q(integrand::d55));
        m[(8, 8)] = 4.0 * fact * (2.0 * PI - q(integrand::d88));
        m[(3, 3)] = m[(1, 1)];
        m[(6, 6)] = m[(2, 2)];
        m[(7, 7)] = m[(5, 5)];

        m[(0, 4)] = fact * (4.0 * PI * (2.0 - s2) + q(integrand::d04));
        m[(4, 0)] = fact * (4.0 * PI * (2.0 - s2) + q(integrand::d40));
        m[(0, 8)] = 4.0 * fact * (2.0 * PI - q(integrand::d08));
        m[(8, 0)] = fact * (8.0 * PI + q(integrand::d80));
        m[(4, 8)] = 4.0 * fact * (2.0 * PI - q(integrand::d48));
        m[(8, 4)] = fact * (8.0 * PI - q(integrand::d84));

        m[(1, 3)] = fact * (4.0 * PI * s2 + q(integrand::d13));
        m[(3, 1)] = m[(1, 3)];
        m[(2, 6)] = -fact * 4.0 * s1 * (2.0 * PI + q(integrand::d26));
        m[(6, 2)] = m[(2, 6)];
        m[(5, 7)] = -fact * 4.0 * s1 * (2.0 * PI + q(integrand::d57));
        m[(7, 5)] = m[(5, 7)];
        m
    }

    fn torsionless(&self) -> Matrix9 {
        let fact = 1.0 / (6.0 * self.normaliser());
        let q = |f: fn(&Edge) -> f64| self.integral(f);
        let mut m = Matrix9::zeros();

        m[(0, 0)] = fact * (6.0 * PI + q(torsionless::d00));
        m[(1, 1)] = fact * (2.0 * PI + q(torsionless::d11));
        m[(2, 2)] = fact * (5.0 * PI + q(torsionless::d22));
        m[(4, 4)] = fact * (6.0 * PI + q(torsionless::d44));
        m[(5, 5)] = fact * (5.0 * PI + q(torsionless::d55));
        m[(8, 8)] = fact * q(torsionless::d88);
        m[(3, 3)] = m[(1, 1)];
        m[(6, 6)] = m[(2, 2)];
        m[(7, 7)] = m[(5, 5)];

        m[(0, 4)] = fact * (2.0 * PI + q(torsionless::d04));
        m[(0, 8)] = fact * (4.0 * PI + q(torsionless::d08));
        m[(4, 8)] = fact * (4.0 * PI + q(torsionless::d48));
        m[(4, 0)] = m[(0, 4)];
        m[(8, 0)] = m[(0, 8)];
        m[(8, 4)] = m[(4, 8)];

        m[(1, 3)] = m[(0, 4)];
        m[(3, 1)] = m[(0, 4)];
        m[(2, 6)] = -m[(0, 8)];
        m[(6, 2)] = -m[(0, 8)];
        m[(5, 7)] = -m[(4, 8)];
        m[(7, 5)] = -m[(4, 8)];
        m
    }
}

impl MotionShape for PseudoEllipse {
    fn second_degree(&self) -> Matrix9 {
        match self.torsion {
            Torsion::Fixed => self.torsionless(),
            _ => self.with_torsion(),
        }
    }

    fn first_degree(&self) -> Matrix3<f64> {
        let (s1, _) = self.torsion.sinc_terms();
        let fact = 1.0 / (2.0 * self.normaliser());
        let xx = self.integral(|e| 2.0 * (1.0 - e.ct) * e.s2 + e.c2 * e.st2);
        let yy = self.integral(|e| 2.0 * (1.0 - e.ct) * e.c2 + e.s2 * e.st2);
        let zz = self.integral(|e| e.st2);
        Matrix3::from_diagonal(&Vector3::new(
            fact * s1 * xx,
            fact * s1 * yy,
            fact * zz,
        ))
    }

    fn support(&self) -> Support {
        Support::new(Tilt::ellipse(self.theta_x, self.theta_y), self.torsion)
    }
}

/// φ-integrands of the torsional pseudo-ellipse, `s2 = sinc(2σmax/π)`.
mod integrand {
    use super::Edge;

    pub fn d00(e: &Edge, s2: f64) -> f64 {
        let Edge { c2, ct, st2, .. } = *e;
        s2 * (2.0 * st2 * c2 * ((2.0 * c2 - 1.0) * ct - 6.0 * (c2 - 1.0))
            - 2.0 * ct * (2.0 * c2 * (4.0 * c2 - 5.0) + 3.0))
            + 2.0 * c2 * ct * (st2 + 2.0)
            - 6.0 * ct
    }

    pub fn d04(e: &Edge, s2: f64) -> f64 {
        let Edge { c2, s2: sp2, ct, st2 } = *e;
        s2 * (2.0 * st2 * c2 * ((2.0 * sp2 - 1.0) * ct - 6.0 * sp2)
            + 2.0 * ct * (2.0 * c2 * (4.0 * c2 - 5.0) + 3.0))
            + 2.0 * c2 * ct * (st2 + 2.0)
            - 6.0 * ct
    }

    pub fn d08(e: &Edge, _: f64) -> f64 {
        e.ct * e.c2 * (e.st2 + 2.0)
    }

    pub fn d11(e: &Edge, s2: f64) -> f64 {
        let Edge { c2, s2: sp2, ct, st2 } = *e;
        s2 * ((4.0 * c2 * ((1.0 - c2) * ct + 3.0 * (c2 - 1.0)) + 3.0) * st2
            - 16.0 * c2 * sp2 * ct)
            + 3.0 * st2
    }

    pub fn d13(e: &Edge, s2: f64) -> f64 {
        let Edge { c2, s2: sp2, ct, st2 } = *e;
        let cs = c2 * sp2;
        s2 * (st2 * (4.0 * cs * ct - 12.0 * cs + 3.0) - 16.0 * cs * ct) - 3.0 * st2
    }

    pub fn d22(e: &Edge, _: f64) -> f64 {
        2.0 * e.c2 * e.ct.powi(3) + 3.0 * (1.0 - e.c2) * e.ct * e.ct
    }

    pub fn d26(e: &Edge, _: f64) -> f64 {
        e.c2 * (e.ct.powi(3) - 3.0 * e.ct)
    }

    pub fn d40(e: &Edge, s2: f64) -> f64 {
        let Edge { c2, s2: sp2, ct, st2 } = *e;
        s2 * (2.0 * st2 * sp2 * ((2.0 * c2 - 1.0) * ct - 6.0 * c2)
            + 2.0 * ct * (2.0 * sp2 * (4.0 * sp2 - 5.0) + 3.0))
            + 2.0 * sp2 * ct * (st2 + 2.0)
            - 6.0 * ct
    }

    pub fn d44(e: &Edge, s2: f64) -> f64 {
        let Edge { c2, s2: sp2, ct, st2 } = *e;
        s2 * (2.0 * st2 * sp2 * ((2.0 * sp2 - 1.0) * ct + 6.0 * c2)
            - 2.0 * ct * (2.0 * sp2 * (4.0 * sp2 - 5.0) + 3.0))
            + 2.0 * sp2 * ct * (st2 + 2.0)
            - 6.0 * ct
    }

    pub fn d48(e: &Edge, _: f64) -> f64 {
        e.ct * e.s2 * (e.st2 + 2.0)
    }

    pub fn d55(e: &Edge, _: f64) -> f64 {
        2.0 * e.s2 * e.ct.powi(3) + 3.0 * (1.0 - e.s2) * e.ct * e.ct
    }

    pub fn d57(e: &Edge, _: f64) -> f64 {
        e.s2 * (e.ct.powi(3) - 3.0 * e.ct)
    }

    pub fn d80(e: &Edge, s2: f64) -> f64 {
        s2 * (2.0 * (1.0 - 2.0 * e.c2) * e.ct * (e.st2 + 2.0)) + 2.0 * e.ct.powi(3) - 6.0 * e.ct
    }

    pub fn d84(e: &Edge, s2: f64) -> f64 {
        s2 * (2.0 * (1.0 - 2.0 * e.c2) * e.ct * (e.st2 + 2.0)) - 2.0 * e.ct.powi(3) + 6.0 * e.ct
    }

    pub fn d88(e: &Edge, _: f64) -> f64 {
        e.ct.powi(3)
    }
}

/// φ-integrands of the torsionless pseudo-ellipse.
mod torsionless {
    use super::Edge;

    pub fn d00(e: &Edge) -> f64 {
        let Edge { c2, s2, ct, st2 } = *e;
        (2.0 * c2 * c2 * ct + 6.0 * c2 * s2) * st2 - (6.0 * s2 * s2 + 2.0 * c2 * c2) * ct
    }

    pub fn d04(e: &Edge) -> f64 {
        let Edge { c2, s2, ct, st2 } = *e;
        (2.0 * c2 * s2 * ct - 6.0 * c2 * s2) * st2 - 8.0 * c2 * s2 * ct
    }

    pub fn d08(e: &Edge) -> f64 {
        2.0 * e.c2 * e.ct.powi(3) - 6.0 * e.c2 * e.ct
    }

    pub fn d11(e: &Edge) -> f64 {
        let Edge { c2, s2, ct, st2 } = *e;
        (2.0 * c2 * s2 * ct + 3.0 * s2 * s2 + 3.0 * c2 * c2) * st2 - 8.0 * c2 * s2 * ct
    }

    pub fn d22(e: &Edge) -> f64 {
        (2.0 * e.s2 - 2.0) * e.ct.powi(3) - 3.0 * e.s2 * e.ct * e.ct
    }

    pub fn d44(e: &Edge) -> f64 {
        let Edge { c2, s2, ct, st2 } = *e;
        (2.0 * s2 * s2 * ct + 6.0 * c2 * s2) * st2 - (2.0 * s2 * s2 + 6.0 * c2 * c2) * ct
    }

    pub fn d48(e: &Edge) -> f64 {
        2.0 * e.s2 * e.ct.powi(3) - 6.0 * e.s2 * e.ct
    }

    pub fn d55(e: &Edge) -> f64 {
        (2.0 * e.c2 - 2.0) * e.ct.powi(3) - 3.0 * e.c2 * e.ct * e.ct
    }

    pub fn d88(e: &Edge) -> f64 {
        2.0 - 2.0 * e.ct.powi(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame_order::iso_cone::IsoCone;
    use crate::core::utils::geometry::{kron, tilt_torsion_r};

    /// Product Gauss-Legendre (midpoint) average of `R ⊗ R` over the cone.
    fn brute_force(theta_x: f64, theta_y: f64, sigma_max: f64) -> Matrix9 {
        let (np, nt, ns) = (200, 60, if sigma_max > 0.0 { 40 } else { 1 });
        let mut sum = Matrix9::zeros();
        let mut norm = 0.0;
        for ip in 0..np {
            let phi = -PI + (ip as f64 + 0.5) * 2.0 * PI / np as f64;
            let tmax = tmax_pseudo_ellipse(phi, theta_x, theta_y);
            for it in 0..nt {
                let theta = (it as f64 + 0.5) * tmax / nt as f64;
                let w = theta.sin() * tmax;
                for is in 0..ns {
                    let sigma = if ns == 1 {
                        0.0
                    } else {
                        -sigma_max + (is as f64 + 0.5) * 2.0 * sigma_max / ns as f64
                    };
                    sum += kron(&tilt_torsion_r(theta, phi, sigma)) * w;
                    norm += w;
                }
            }
        }
        sum / norm
    }

    fn max_diff(a: &Matrix9, b: &Matrix9) -> f64 {
        (a - b).abs().max()
    }

    #[test]
    fn torsional_matrix_matches_direct_average() {
        let pe = PseudoEllipse::new(0.6, 0.35, Torsion::limited(0.8));
        let closed = pe.second_degree();
        assert!(max_diff(&closed, &brute_force(0.6, 0.35, 0.8)) < 1e-3);
    }

    #[test]
    fn torsionless_matrix_matches_direct_average() {
        let pe = PseudoEllipse::new(0.6, 0.35, Torsion::Fixed);
        assert!(max_diff(&pe.second_degree(), &brute_force(0.6, 0.35, 0.0)) < 1e-3);
    }

    #[test]
    fn torsional_formula_at_zero_torsion_equals_torsionless_formula() {
        let pe = PseudoEllipse::new(0.9, 0.4, Torsion::Fixed);
        assert!(max_diff(&pe.with_torsion(), &pe.torsionless()) < 1e-8);
    }

    #[test]
    fn circular_pseudo_ellipse_equals_isotropic_cone() {
        let torsion = Torsion::limited(0.5);
        let pe = PseudoEllipse::new(0.7, 0.7, torsion).second_degree();
        let iso = IsoCone::new(0.7, torsion).second_degree();
        assert!(max_diff(&pe, &iso) < 1e-8);
    }

    #[test]
    fn free_rotor_torsion_terms_are_exactly_zero() {
        let m = PseudoEllipse::new(0.5, 0.3, Torsion::Free).second_degree();
        assert_eq!(m[(2, 2)], 0.0);
        assert_eq!(m[(2, 6)], 0.0);
        assert_eq!(m[(5, 7)], 0.0);
        assert!(m[(8, 8)] > 0.0);
    }

    #[test]
    fn degenerate_cone_saturates_normaliser() {
        assert_eq!(tmax_pseudo_ellipse(0.3, 0.0, 0.5), 0.0);
        let settings = QuadratureSettings::default();
        assert_eq!(cone_normaliser(0.0, 0.5, &settings), DEGENERATE_NORMALISER);
        let m = PseudoEllipse::new(0.0, 0.5, Torsion::limited(0.2)).second_degree();
        assert!(m.iter().all(|x| x.is_finite() && x.abs() < 1e-90));
    }

    #[test]
    fn first_degree_matches_direct_average() {
        let pe = PseudoEllipse::new(0.6, 0.35, Torsion::limited(0.8));
        let first = pe.first_degree();
        let (np, nt, ns) = (200, 60, 40);
        let mut sum = Matrix3::zeros();
        let mut norm = 0.0;
        for ip in 0..np {
            let phi = -PI + (ip as f64 + 0.5) * 2.0 * PI / np as f64;
            let tmax = tmax_pseudo_ellipse(phi, 0.6, 0.35);
            for it in 0..nt {
                let theta = (it as f64 + 0.5) * tmax / nt as f64;
                let w = theta.sin() * tmax;
                for is in 0..ns {
                    let sigma = -0.8 + (is as f64 + 0.5) * 1.6 / ns as f64;
                    sum += tilt_torsion_r(theta, phi, sigma) * w;
                    norm += w;
                }
            }
        }
        let brute = sum / norm;
        assert!((first - brute).abs().max() < 1e-3);
    }

    #[test]
    fn pec_of_circular_cone_is_cap_area() {
        let area = pec(0.4, 0.4, &QuadratureSettings::default());
        assert!((area - 2.0 * PI * (1.0 - 0.4f64.cos())).abs() < 1e-9);
    }
}
