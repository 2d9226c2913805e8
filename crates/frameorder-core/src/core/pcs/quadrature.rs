use super::{PcsAverages, PcsProblem, state_pcs};
use crate::core::frame_order::{Support, Tilt, Torsion};
use crate::core::integration::{QuadratureSettings, quad};
use std::f64::consts::PI;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Quadrature tolerances suited to PCS values of order `1e-6`.
pub const PCS_QUADRATURE: QuadratureSettings = QuadratureSettings {
    abs_tol: 1e-15,
    rel_tol: 1e-8,
    max_intervals: 50,
};

/// Tilt part of the support integral, `∫∫ sin θ f(θ, φ) dθ dφ`, unnormalised.
fn tilt_integral<F>(tilt: &Tilt, f: F, settings: &QuadratureSettings) -> f64
where
    F: Fn(f64, f64) -> f64,
{
    let polar = |phi: f64, theta_max: f64| {
        quad(|theta| theta.sin() * f(theta, phi), 0.0, theta_max, settings)
    };
    match *tilt {
        Tilt::Fixed => f(0.0, 0.0),
        Tilt::Line { theta_max } => quad(
            |theta| theta.sin() * (f(theta, 0.0) + f(theta, PI)),
            0.0,
            theta_max,
            settings,
        ),
        Tilt::Cone { .. } | Tilt::Ellipse { .. } => {
            quad(|phi| polar(phi, tilt.theta_max(phi)), -PI, PI, settings)
        }
    }
}

/// Mean of `f(θ, φ, σ)` over a motional support, using the same `sin θ`
/// measure and normalisers as the frame order matrices.
///
/// Torsion is the outermost integral, the polar tilt the innermost.
pub fn support_average<F>(support: &Support, f: F, settings: &QuadratureSettings) -> f64
where
    F: Fn(f64, f64, f64) -> f64,
{
    let over_tilt =
        |sigma: f64| tilt_integral(&support.tilt, |theta, phi| f(theta, phi, sigma), settings);
    let total = match support.torsion {
        Torsion::Fixed => over_tilt(0.0),
        torsion => {
            let sigma_max = torsion.sigma_max();
            quad(over_tilt, -sigma_max, sigma_max, settings)
        }
    };
    total / (support.tilt.normaliser(settings) * support.torsion.normaliser())
}

/// Averages every non-missing PCS by deterministic nested quadrature.
pub fn average_pcs(
    problem: &PcsProblem,
    support: &Support,
    settings: &QuadratureSettings,
) -> PcsAverages {
    let work: Vec<(usize, usize)> = problem
        .alignments
        .iter()
        .enumerate()
        .flat_map(|(a, alignment)| (0..alignment.pivot_atom.len()).map(move |j| (a, j)))
        .filter(|&(a, j)| !problem.alignments[a].missing[j])
        .collect();

    #[cfg(not(feature = "parallel"))]
    let iterator = work.iter();

    #[cfg(feature = "parallel")]
    let iterator = work.par_iter();

    let results: Vec<f64> = iterator
        .map(|&(a, j)| {
            let alignment = &problem.alignments[a];
            let pivot_atom = &alignment.pivot_atom[j];
            let mean = support_average(
                support,
                |theta, phi, sigma| {
                    let rotation = problem.state_rotation(theta, phi, sigma);
                    state_pcs(&rotation, pivot_atom, &problem.ln_pivot, &alignment.tensor)
                },
                settings,
            );
            alignment.constant * mean
        })
        .collect();

    let mut values = problem.zeroed();
    for (&(a, j), value) in work.iter().zip(results) {
        values[a][j] = value;
    }
    PcsAverages {
        values,
        errors: None,
        accepted: None,
    }
}
