use super::MotionShape;
use super::moments::{AngleMoments, planar_first_degree, planar_second_degree};
use super::support::{Support, Tilt, Torsion, fold_half_angle};
use crate::core::utils::geometry::Matrix9;
use nalgebra::Matrix3;

/// Tilt restricted to the eigenframe x-z plane, `θ ∈ [-θmax, θmax]` with the
/// same `sin θ` weighting as the cones, plus torsion about the tilted axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub theta_max: f64,
    pub torsion: Torsion,
}

impl Line {
    pub fn new(theta_max: f64, torsion: Torsion) -> Self {
        Self {
            theta_max: fold_half_angle(theta_max),
            torsion,
        }
    }

    fn tilt_moments(&self) -> AngleMoments {
        AngleMoments::sine_weighted(self.theta_max)
    }
}

impl MotionShape for Line {
    fn second_degree(&self) -> Matrix9 {
        planar_second_degree(&self.tilt_moments(), &self.torsion.moments())
    }

    fn first_degree(&self) -> Matrix3<f64> {
        planar_first_degree(&self.tilt_moments(), &self.torsion.moments())
    }

    fn support(&self) -> Support {
        Support::new(Tilt::line(self.theta_max), self.torsion)
    }
}
