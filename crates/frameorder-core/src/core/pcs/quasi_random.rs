use super::{PcsAverages, PcsProblem, state_pcs};
use crate::core::frame_order::Support;
use crate::core::sampling::{AngleDim, SobolSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Sobol points handled by one worker. Partial sums are merged in chunk order,
/// so the result does not depend on the thread count.
pub const CHUNK_SIZE: usize = 256;

/// Running sums over the accepted points of one chunk, flattened over
/// `(alignment, spin)`.
#[derive(Debug, Clone, PartialEq)]
struct PartialSums {
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    accepted: usize,
}

impl PartialSums {
    fn zeros(len: usize, with_squares: bool) -> Self {
        Self {
            sum: vec![0.0; len],
            sum_sq: if with_squares { vec![0.0; len] } else { Vec::new() },
            accepted: 0,
        }
    }

    fn merge(mut self, other: PartialSums) -> Self {
        for (a, b) in self.sum.iter_mut().zip(&other.sum) {
            *a += b;
        }
        for (a, b) in self.sum_sq.iter_mut().zip(&other.sum_sq) {
            *a += b;
        }
        self.accepted += other.accepted;
        self
    }
}

/// Column of each coordinate in the Sobol set, if sampled.
#[derive(Debug, Clone, Copy)]
struct Columns {
    theta: Option<usize>,
    phi: Option<usize>,
    sigma: Option<usize>,
}

impl Columns {
    fn of(set: &SobolSet) -> Self {
        Self {
            theta: set.position(AngleDim::Theta),
            phi: set.position(AngleDim::Phi),
            sigma: set.position(AngleDim::Sigma),
        }
    }

    #[inline]
    fn read(&self, point: &[f64]) -> (f64, f64, f64) {
        let get = |column: Option<usize>| column.map_or(0.0, |c| point[c]);
        (get(self.theta), get(self.phi), get(self.sigma))
    }
}

fn accumulate_chunk(
    problem: &PcsProblem,
    support: &Support,
    columns: Columns,
    points: &[f64],
    width: usize,
    offsets: &[usize],
    with_squares: bool,
) -> PartialSums {
    let len = offsets.last().copied().unwrap_or(0);
    let mut partial = PartialSums::zeros(len, with_squares);

    for point in points.chunks_exact(width) {
        let (theta, phi, sigma) = columns.read(point);
        let Some((theta, phi, sigma)) = support.accept(theta, phi, sigma) else {
            continue;
        };
        partial.accepted += 1;
        let rotation = problem.state_rotation(theta, phi, sigma);

        for (a, alignment) in problem.alignments.iter().enumerate() {
            for (j, pivot_atom) in alignment.pivot_atom.iter().enumerate() {
                if alignment.missing[j] {
                    continue;
                }
                let value = state_pcs(&rotation, pivot_atom, &problem.ln_pivot, &alignment.tensor);
                let index = offsets[a] + j;
                partial.sum[index] += value;
                if with_squares {
                    partial.sum_sq[index] += value * value;
                }
            }
        }
    }
    partial
}

/// Averages every non-missing PCS over the Sobol points inside the support.
///
/// The mean divides by the accepted point count. With `error_flag` the
/// standard error `c·sqrt(|⟨x²⟩ - ⟨x⟩²| / n)` of each estimate is returned as
/// well. When no point is accepted all values are zero and the caller decides
/// how to fall back.
pub fn average_pcs(
    problem: &PcsProblem,
    support: &Support,
    set: &SobolSet,
    error_flag: bool,
) -> PcsAverages {
    let mut offsets = Vec::with_capacity(problem.alignments.len() + 1);
    offsets.push(0);
    for alignment in &problem.alignments {
        offsets.push(offsets[offsets.len() - 1] + alignment.pivot_atom.len());
    }

    let columns = Columns::of(set);
    let width = set.dims().len();
    let total = PartialSums::zeros(offsets[offsets.len() - 1], error_flag);

    let merged = if width == 0 {
        total
    } else {
        #[cfg(not(feature = "parallel"))]
        let iterator = set.angles().chunks(CHUNK_SIZE * width);

        #[cfg(feature = "parallel")]
        let iterator = set.angles().par_chunks(CHUNK_SIZE * width);

        let partials: Vec<PartialSums> = iterator
            .map(|chunk| {
                accumulate_chunk(problem, support, columns, chunk, width, &offsets, error_flag)
            })
            .collect();
        partials.into_iter().fold(total, PartialSums::merge)
    };

    let n = merged.accepted as f64;
    let mut values = problem.zeroed();
    let mut errors = error_flag.then(|| problem.zeroed());

    if merged.accepted > 0 {
        for (a, alignment) in problem.alignments.iter().enumerate() {
            let c = alignment.constant;
            for j in 0..alignment.pivot_atom.len() {
                if alignment.missing[j] {
                    continue;
                }
                let index = offsets[a] + j;
                let mean = merged.sum[index] / n;
                values[a][j] = c * mean;
                if let Some(errors) = errors.as_mut() {
                    let variance = merged.sum_sq[index] / n - mean * mean;
                    errors[a][j] = c * (variance.abs() / n).sqrt();
                }
            }
        }
    }

    PcsAverages {
        values,
        errors,
        accepted: Some(merged.accepted),
    }
}
