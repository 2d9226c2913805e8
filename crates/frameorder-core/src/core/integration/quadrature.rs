use serde::Deserialize;
use tracing::trace;

/// Kronrod abscissae on `[0, 1]`, odd indices are the Gauss points.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_639_206_854_697_526_329,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.586_087_235_467_691_130_294_144_845_693_013,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.0,
];

const WGK: [f64; 8] = [
    0.022_935_322_010_529_224_963_732_008_058_970,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.209_482_141_084_727_828_012_999_174_891_714,
];

const WG: [f64; 4] = [
    0.129_484_966_168_869_693_270_611_432_679_082,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.417_959_183_673_469_387_755_102_040_816_327,
];

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuadratureSettings {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_intervals: usize,
}

impl Default for QuadratureSettings {
    fn default() -> Self {
        Self {
            abs_tol: 1.49e-8,
            rel_tol: 1.49e-8,
            max_intervals: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integral {
    pub value: f64,
    pub abs_error: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

fn gauss_kronrod<F>(f: &F, a: f64, b: f64) -> Segment
where
    F: Fn(f64) -> f64,
{
    let centre = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let fc = f(centre);
    let mut kronrod = fc * WGK[7];
    let mut gauss = fc * WG[3];

    for (j, (&x, &w)) in XGK[..7].iter().zip(&WGK[..7]).enumerate() {
        let dx = half * x;
        let pair = f(centre - dx) + f(centre + dx);
        kronrod += w * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Segment {
        a,
        b,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    }
}

/// Globally adaptive Gauss–Kronrod (7/15) integration of `f` over `[a, b]`.
///
/// The interval with the largest error estimate is bisected until the summed
/// estimate meets the tolerance or `max_intervals` is reached, in which case
/// the best estimate is returned unconverged. The subdivision order is fixed,
/// so results are reproducible bit for bit.
pub fn integrate<F>(f: F, a: f64, b: f64, settings: &QuadratureSettings) -> Integral
where
    F: Fn(f64) -> f64,
{
    if a == b {
        return Integral {
            value: 0.0,
            abs_error: 0.0,
            converged: true,
        };
    }

    let mut segments = vec![gauss_kronrod(&f, a, b)];
    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let abs_error: f64 = segments.iter().map(|s| s.error).sum();
        let tolerance = settings.abs_tol.max(settings.rel_tol * value.abs());

        if abs_error <= tolerance {
            return Integral {
                value,
                abs_error,
                converged: true,
            };
        }
        if segments.len() >= settings.max_intervals.max(1) {
            trace!(value, abs_error, "Quadrature reached the interval limit.");
            return Integral {
                value,
                abs_error,
                converged: false,
            };
        }

        let worst = segments
            .iter()
            .enumerate()
            .fold(0, |best, (i, s)| if s.error > segments[best].error { i } else { best });
        let Segment { a: lo, b: hi, .. } = segments[worst];
        let mid = 0.5 * (lo + hi);
        segments[worst] = gauss_kronrod(&f, lo, mid);
        segments.insert(worst + 1, gauss_kronrod(&f, mid, hi));
    }
}

/// Value-only form of [`integrate`].
#[inline]
pub fn quad<F>(f: F, a: f64, b: f64, settings: &QuadratureSettings) -> f64
where
    F: Fn(f64) -> f64,
{
    integrate(f, a, b, settings).value
}
