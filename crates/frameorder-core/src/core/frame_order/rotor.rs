use super::MotionShape;
use super::moments::{AngleMoments, planar_first_degree, planar_second_degree};
use super::support::{Support, Tilt, Torsion};
use crate::core::utils::geometry::Matrix9;
use nalgebra::Matrix3;

/// No motion: both frame order matrices are the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rigid;

impl MotionShape for Rigid {
    fn second_degree(&self) -> Matrix9 {
        Matrix9::identity()
    }

    fn first_degree(&self) -> Matrix3<f64> {
        Matrix3::identity()
    }

    fn support(&self) -> Support {
        Support::RIGID
    }
}

/// Torsion about the eigenframe z-axis, limited or free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotor {
    pub torsion: Torsion,
}

impl Rotor {
    pub fn new(torsion: Torsion) -> Self {
        Self { torsion }
    }
}

impl MotionShape for Rotor {
    fn second_degree(&self) -> Matrix9 {
        planar_second_degree(&AngleMoments::FIXED, &self.torsion.moments())
    }

    fn first_degree(&self) -> Matrix3<f64> {
        planar_first_degree(&AngleMoments::FIXED, &self.torsion.moments())
    }

    fn support(&self) -> Support {
        Support::new(Tilt::Fixed, self.torsion)
    }
}
