use super::MotionShape;
use super::support::{Support, Tilt, Torsion, fold_half_angle};
use crate::core::utils::geometry::Matrix9;
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::TAU;

/// Cone half-angle for the order parameter `S1 = cos θ (1 + cos θ) / 2` of the
/// free-rotor isotropic cone.
///
/// Order parameters below `-1/8` have no real solution and map to `2π`, those
/// above one map to zero.
pub fn iso_cone_s1_to_theta(s1: f64) -> f64 {
    if s1 < -0.125 {
        TAU
    } else if s1 > 1.0 {
        0.0
    } else {
        (0.5 * ((8.0 * s1 + 1.0).sqrt() - 1.0)).acos()
    }
}

/// Isotropic (circular) cone with torsion, torsionless or free rotor.
///
/// The torsionless and free-rotor forms are the general closed form with the
/// torsion sinc terms fixed at one or zero respectively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoCone {
    pub theta_max: f64,
    pub torsion: Torsion,
}

impl IsoCone {
    pub fn new(theta_max: f64, torsion: Torsion) -> Self {
        Self {
            theta_max: fold_half_angle(theta_max),
            torsion,
        }
    }

    pub fn free_rotor_from_order_parameter(s1: f64) -> Self {
        Self::new(iso_cone_s1_to_theta(s1), Torsion::Free)
    }
}

impl MotionShape for IsoCone {
    fn second_degree(&self) -> Matrix9 {
        let c = self.theta_max.cos();
        let c2 = c * c;
        let (ss, s2) = self.torsion.sinc_terms();

        let fact_sinc2 = s2 * (c2 + 4.0 * c + 7.0) / 24.0;
        let fact_cos2 = (c2 + c + 4.0) / 12.0;
        let fact_cos = (c + 1.0) / 4.0;
        let tilt_torsion = ss * (2.0 * c2 + 5.0 * c + 5.0) / 12.0;
        let axial_cross = -(c2 + c - 2.0) / 6.0;
        let torsion_cross = ss * (c2 + c - 2.0) / 6.0;

        let mut m = Matrix9::zeros();
        m[(0, 0)] = fact_sinc2 + fact_cos2;
        m[(4, 4)] = m[(0, 0)];
        m[(1, 1)] = fact_sinc2 + fact_cos;
        m[(3, 3)] = m[(1, 1)];
        for i in [2, 5, 6, 7] {
            m[(i, i)] = tilt_torsion;
        }
        m[(8, 8)] = (c2 + c + 1.0) / 3.0;

        m[(0, 4)] = fact_cos2 - fact_sinc2;
        m[(4, 0)] = m[(0, 4)];
        for (i, j) in [(0, 8), (8, 0), (4, 8), (8, 4)] {
            m[(i, j)] = axial_cross;
        }
        m[(1, 3)] = fact_sinc2 - fact_cos;
        m[(3, 1)] = m[(1, 3)];
        for (i, j) in [(2, 6), (6, 2), (5, 7), (7, 5)] {
            m[(i, j)] = torsion_cross;
        }
        m
    }

    fn first_degree(&self) -> Matrix3<f64> {
        let c = self.theta_max.cos();
        let (ss, _) = self.torsion.sinc_terms();
        let xy = ss * (3.0 + c) / 4.0;
        Matrix3::from_diagonal(&Vector3::new(xy, xy, (1.0 + c) / 2.0))
    }

    fn support(&self) -> Support {
        Support::new(Tilt::cone(self.theta_max), self.torsion)
    }
}
