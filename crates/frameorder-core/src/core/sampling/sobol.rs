use serde::Deserialize;
use std::f64::consts::PI;
use thiserror::Error;
use tracing::debug;

const BITS: usize = 32;
const SCALE: f64 = 4_294_967_296.0;

/// Primitive polynomial data `(degree s, coefficients a, initial m_k)` for the
/// dimensions after the first, from the Joe–Kuo tables.
const DIRECTION_DATA: [(u32, u32, &[u32]); 7] = [
    (1, 0, &[1]),
    (2, 1, &[1, 3]),
    (3, 1, &[1, 3, 1]),
    (3, 2, &[1, 1, 1]),
    (4, 1, &[1, 1, 3, 3]),
    (4, 4, &[1, 3, 5, 13]),
    (5, 2, &[1, 1, 5, 5, 17]),
];

pub const MAX_DIMENSIONS: usize = DIRECTION_DATA.len() + 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SobolError {
    #[error("Sobol sequences are limited to {max} dimensions, {requested} requested")]
    TooManyDimensions { requested: usize, max: usize },
}

/// Angular coordinate that a Sobol dimension is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleDim {
    /// Polar tilt, `acos(2u - 1)`, uniform over the sphere.
    Theta,
    /// Azimuth, `2πu`.
    Phi,
    /// Torsion, `2π(u - 0.5)`.
    Sigma,
}

impl AngleDim {
    #[inline]
    pub fn map(self, u: f64) -> f64 {
        match self {
            AngleDim::Theta => (2.0 * u - 1.0).acos(),
            AngleDim::Phi => 2.0 * PI * u,
            AngleDim::Sigma => 2.0 * PI * (u - 0.5),
        }
    }
}

/// Unit-cube Sobol sequence generator (Antonov–Saleev Gray-code ordering).
#[derive(Debug, Clone)]
pub struct SobolSequence {
    directions: Vec<[u32; BITS]>,
    state: Vec<u32>,
    index: u64,
}

impl SobolSequence {
    pub fn new(dimensions: usize) -> Result<Self, SobolError> {
        if dimensions > MAX_DIMENSIONS {
            return Err(SobolError::TooManyDimensions {
                requested: dimensions,
                max: MAX_DIMENSIONS,
            });
        }
        let directions = (0..dimensions).map(direction_numbers).collect();
        Ok(Self {
            directions,
            state: vec![0; dimensions],
            index: 0,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.directions.len()
    }

    /// Writes the next point into `out`; the first point is the origin.
    pub fn next_into(&mut self, out: &mut [f64]) {
        for (value, &x) in out.iter_mut().zip(&self.state) {
            *value = x as f64 / SCALE;
        }
        let bit = self.index.trailing_ones() as usize;
        for (x, v) in self.state.iter_mut().zip(&self.directions) {
            *x ^= v[bit.min(BITS - 1)];
        }
        self.index += 1;
    }
}

fn direction_numbers(dimension: usize) -> [u32; BITS] {
    let mut v = [0u32; BITS];
    if dimension == 0 {
        for (k, vk) in v.iter_mut().enumerate() {
            *vk = 1 << (BITS - 1 - k);
        }
        return v;
    }

    let (s, a, m) = DIRECTION_DATA[dimension - 1];
    let s = s as usize;
    for k in 0..s.min(BITS) {
        v[k] = m[k] << (BITS - 1 - k);
    }
    for k in s..BITS {
        v[k] = v[k - s] ^ (v[k - s] >> s);
        for j in 1..s {
            if (a >> (s - 1 - j)) & 1 == 1 {
                v[k] ^= v[k - j];
            }
        }
    }
    v
}

/// A precomputed set of Sobol points mapped onto angles, row-major `n × m`.
#[derive(Debug, Clone, PartialEq)]
pub struct SobolSet {
    dims: Vec<AngleDim>,
    angles: Vec<f64>,
}

impl SobolSet {
    pub fn generate(dims: &[AngleDim], n: usize) -> Result<Self, SobolError> {
        let m = dims.len();
        let mut sequence = SobolSequence::new(m)?;
        let mut unit = vec![0.0; m];
        let mut angles = Vec::with_capacity(n * m);

        for _ in 0..n {
            sequence.next_into(&mut unit);
            angles.extend(dims.iter().zip(&unit).map(|(dim, &u)| dim.map(u)));
        }
        debug!(points = n, dimensions = ?dims, "Generated Sobol angle set.");

        Ok(Self {
            dims: dims.to_vec(),
            angles,
        })
    }

    pub fn dims(&self) -> &[AngleDim] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        if self.dims.is_empty() {
            0
        } else {
            self.angles.len() / self.dims.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Column of the given coordinate, if the set samples it.
    pub fn position(&self, dim: AngleDim) -> Option<usize> {
        self.dims.iter().position(|&d| d == dim)
    }

    /// Rows of angles, one slice per point.
    pub fn points(&self) -> std::slice::ChunksExact<'_, f64> {
        self.angles.chunks_exact(self.dims.len().max(1))
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }
}
