use crate::core::models::dataset::ObservableSet;
use nalgebra::Vector3;

/// Error used for every PCS entry when no PCS error is given. PCS values are
/// plain fractions, so this is 0.1 ppm.
pub const DEFAULT_PCS_ERROR: f64 = 0.1e-6;
/// Error used for every RDC entry when no RDC error is given, in Hz.
pub const DEFAULT_RDC_ERROR: f64 = 1.0;

/// Observables ready for the chi-squared sum.
///
/// Missing entries hold `(0, 1)` and are flagged; every error already
/// carries its weight as `error / sqrt(weight)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observables {
    pub values: Vec<f64>,
    pub errors: Vec<f64>,
    pub missing: Vec<bool>,
}

impl Observables {
    /// `missing_vector` flags entries whose interatomic vector or atomic
    /// position is unknown.
    pub fn prepare(set: &ObservableSet, default_error: f64, missing_vector: &[bool]) -> Self {
        let len = set.values.len();
        let mut values = Vec::with_capacity(len);
        let mut errors = Vec::with_capacity(len);
        let mut missing = Vec::with_capacity(len);

        for (i, &value) in set.values.iter().enumerate() {
            let weight = set.weights.as_ref().map_or(1.0, |w| w[i]);
            if value.is_nan() || missing_vector.get(i).copied().unwrap_or(false) {
                values.push(0.0);
                errors.push(1.0);
                missing.push(true);
                continue;
            }
            let error = match set.errors.as_ref().map(|e| e[i]) {
                Some(error) if !error.is_nan() => error,
                _ => default_error,
            };
            values.push(value);
            errors.push(error / weight.sqrt());
            missing.push(false);
        }

        Self {
            values,
            errors,
            missing,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `Σ ((obs - calc) / err)²` over the non-missing entries.
    pub fn chi2(&self, calculated: &[f64]) -> f64 {
        self.values
            .iter()
            .zip(&self.errors)
            .zip(calculated)
            .zip(&self.missing)
            .filter(|(_, missing)| !**missing)
            .map(|(((obs, err), calc), _)| {
                let r = (obs - calc) / err;
                r * r
            })
            .sum()
    }
}

/// Converts coordinates to vectors, flagging those with a `NaN` component.
/// Flagged vectors are zeroed so they never reach the arithmetic.
pub fn to_vectors(coordinates: &[[f64; 3]]) -> (Vec<Vector3<f64>>, Vec<bool>) {
    coordinates
        .iter()
        .map(|c| {
            let v = Vector3::from(*c);
            if v.iter().any(|x| x.is_nan()) {
                (Vector3::zeros(), true)
            } else {
                (v, false)
            }
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_become_flagged_placeholders() {
        let set = ObservableSet::new(vec![1.0, f64::NAN, 3.0]).with_errors(vec![0.5, 0.5, 0.5]);
        let prepared = Observables::prepare(&set, DEFAULT_RDC_ERROR, &[]);
        assert_eq!(prepared.values, vec![1.0, 0.0, 3.0]);
        assert_eq!(prepared.errors, vec![0.5, 1.0, 0.5]);
        assert_eq!(prepared.missing, vec![false, true, false]);
    }

    #[test]
    fn unknown_vectors_mark_entries_missing() {
        let set = ObservableSet::new(vec![1.0, 2.0]);
        let prepared = Observables::prepare(&set, DEFAULT_RDC_ERROR, &[false, true]);
        assert_eq!(prepared.missing, vec![false, true]);
        assert_eq!(prepared.values[1], 0.0);
    }

    #[test]
    fn weights_scale_errors_by_inverse_square_root() {
        let set = ObservableSet::new(vec![1.0, 2.0])
            .with_errors(vec![2.0, 2.0])
            .with_weights(vec![4.0, 0.25]);
        let prepared = Observables::prepare(&set, DEFAULT_RDC_ERROR, &[]);
        assert_eq!(prepared.errors, vec![1.0, 4.0]);
    }

    #[test]
    fn absent_errors_use_the_data_type_default() {
        let set = ObservableSet::new(vec![1.0e-6, 2.0e-6]).with_errors(vec![f64::NAN, 0.2e-6]);
        let prepared = Observables::prepare(&set, DEFAULT_PCS_ERROR, &[]);
        assert_eq!(prepared.errors, vec![DEFAULT_PCS_ERROR, 0.2e-6]);
    }

    #[test]
    fn zero_weight_entries_do_not_contribute() {
        let set = ObservableSet::new(vec![1.0, 5.0]).with_weights(vec![1.0, 0.0]);
        let prepared = Observables::prepare(&set, DEFAULT_RDC_ERROR, &[]);
        assert_eq!(prepared.chi2(&[0.0, 0.0]), 1.0);
    }

    #[test]
    fn chi2_skips_missing_entries() {
        let set = ObservableSet::new(vec![2.0, f64::NAN]).with_errors(vec![0.5, 0.5]);
        let prepared = Observables::prepare(&set, DEFAULT_RDC_ERROR, &[]);
        assert_eq!(prepared.chi2(&[1.0, 100.0]), 4.0);
    }

    #[test]
    fn nan_coordinates_are_zeroed_and_flagged() {
        let (vectors, missing) = to_vectors(&[[1.0, 2.0, 3.0], [f64::NAN, 0.0, 0.0]]);
        assert_eq!(vectors[1], Vector3::zeros());
        assert_eq!(missing, vec![false, true]);
    }
}
