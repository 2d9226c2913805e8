use super::moments::AngleMoments;
use super::pseudo_ellipse::{cone_normaliser, tmax_pseudo_ellipse};
use crate::core::integration::QuadratureSettings;
use crate::core::utils::geometry::{one_minus_cos, sinc};
use std::f64::consts::{PI, TAU};

/// Folds a half-angle onto `[0, π]`, preserving its cosine.
pub fn fold_half_angle(theta: f64) -> f64 {
    let t = theta.abs() % TAU;
    if t > PI { TAU - t } else { t }
}

/// Region of the tilt (θ, φ) explored by a motional model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tilt {
    /// No tilt, the motional axis stays on the eigenframe z-axis.
    Fixed,
    /// Circular cone of half-angle `theta_max`.
    Cone { theta_max: f64 },
    /// Pseudo-elliptic cone with half-angles along x and y.
    Ellipse { theta_x: f64, theta_y: f64 },
    /// Tilt confined to the x-z plane, `θ ∈ [-theta_max, theta_max]`.
    Line { theta_max: f64 },
}

impl Tilt {
    pub fn cone(theta_max: f64) -> Self {
        match fold_half_angle(theta_max) {
            0.0 => Tilt::Fixed,
            theta_max => Tilt::Cone { theta_max },
        }
    }

    pub fn line(theta_max: f64) -> Self {
        match fold_half_angle(theta_max) {
            0.0 => Tilt::Fixed,
            theta_max => Tilt::Line { theta_max },
        }
    }

    /// Zero opening angles are kept: the degenerate ellipse is handled by the
    /// saturated cone normaliser.
    pub fn ellipse(theta_x: f64, theta_y: f64) -> Self {
        Tilt::Ellipse {
            theta_x: theta_x.abs(),
            theta_y: theta_y.abs(),
        }
    }

    /// Upper polar bound of the region at azimuth `phi`.
    #[inline]
    pub fn theta_max(&self, phi: f64) -> f64 {
        match *self {
            Tilt::Fixed => 0.0,
            Tilt::Cone { theta_max } | Tilt::Line { theta_max } => theta_max,
            Tilt::Ellipse { theta_x, theta_y } => tmax_pseudo_ellipse(phi, theta_x, theta_y),
        }
    }

    /// The `sin θ`-weighted area of the region, in the same convention as the
    /// frame order matrix normalisation.
    pub fn normaliser(&self, settings: &QuadratureSettings) -> f64 {
        match *self {
            Tilt::Fixed => 1.0,
            Tilt::Cone { theta_max } => 2.0 * PI * one_minus_cos(theta_max),
            Tilt::Ellipse { theta_x, theta_y } => cone_normaliser(theta_x, theta_y, settings),
            Tilt::Line { theta_max } => 2.0 * one_minus_cos(theta_max),
        }
    }
}

/// Torsional freedom about the tilted motional axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Torsion {
    Fixed,
    Limited { sigma_max: f64 },
    Free,
}

impl Torsion {
    pub fn limited(sigma_max: f64) -> Self {
        match sigma_max.abs() {
            0.0 => Torsion::Fixed,
            sigma_max => Torsion::Limited { sigma_max },
        }
    }

    #[inline]
    pub fn sigma_max(&self) -> f64 {
        match *self {
            Torsion::Fixed => 0.0,
            Torsion::Limited { sigma_max } => sigma_max,
            Torsion::Free => PI,
        }
    }

    /// `(sinc(σmax/π), sinc(2σmax/π))`, exactly zero for the free rotor.
    pub fn sinc_terms(&self) -> (f64, f64) {
        match *self {
            Torsion::Fixed => (1.0, 1.0),
            Torsion::Limited { sigma_max } => (sinc(sigma_max / PI), sinc(2.0 * sigma_max / PI)),
            Torsion::Free => (0.0, 0.0),
        }
    }

    pub fn moments(&self) -> AngleMoments {
        match *self {
            Torsion::Fixed => AngleMoments::FIXED,
            Torsion::Free => AngleMoments::FREE,
            Torsion::Limited { .. } => {
                let (s1, s2) = self.sinc_terms();
                AngleMoments::from_sinc_terms(s1, s2)
            }
        }
    }

    pub fn normaliser(&self) -> f64 {
        match self {
            Torsion::Fixed => 1.0,
            _ => 2.0 * self.sigma_max(),
        }
    }
}

/// The full angular support of a motional model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Support {
    pub tilt: Tilt,
    pub torsion: Torsion,
}

impl Support {
    pub const RIGID: Support = Support {
        tilt: Tilt::Fixed,
        torsion: Torsion::Fixed,
    };

    pub fn new(tilt: Tilt, torsion: Torsion) -> Self {
        Self { tilt, torsion }
    }

    pub fn is_rigid(&self) -> bool {
        matches!(self.tilt, Tilt::Fixed) && matches!(self.torsion, Torsion::Fixed)
    }

    /// Maps a quasi-random sample onto the region, or rejects it.
    ///
    /// Coordinates the region does not vary are pinned to zero, and a line
    /// tilt takes its direction from the half of the azimuth range `phi` falls in.
    #[inline]
    pub fn accept(&self, theta: f64, phi: f64, sigma: f64) -> Option<(f64, f64, f64)> {
        let (theta, phi) = match self.tilt {
            Tilt::Fixed => (0.0, 0.0),
            Tilt::Cone { theta_max } if theta <= theta_max => (theta, phi),
            Tilt::Ellipse { theta_x, theta_y }
                if theta <= tmax_pseudo_ellipse(phi, theta_x, theta_y) =>
            {
                (theta, phi)
            }
            Tilt::Line { theta_max } if theta <= theta_max => {
                (theta, if phi < PI { 0.0 } else { PI })
            }
            _ => return None,
        };
        let sigma = match self.torsion {
            Torsion::Fixed => 0.0,
            Torsion::Limited { sigma_max } if sigma.abs() <= sigma_max => sigma,
            Torsion::Free => sigma,
            _ => return None,
        };
        Some((theta, phi, sigma))
    }
}
