//! Experimental input data of a frame order analysis.

use serde::Deserialize;

/// Measured values of one data type in one alignment medium, one entry per
/// spin or interatomic pair. `NaN` marks a missing measurement.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservableSet {
    pub values: Vec<f64>,
    #[serde(default)]
    pub errors: Option<Vec<f64>>,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

impl ObservableSet {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            errors: None,
            weights: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<f64>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }
}

/// Data recorded in one alignment medium.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlignmentData {
    /// `{Axx, Ayy, Axy, Axz, Ayz}` of the full alignment tensor.
    pub tensor: [f64; 5],
    /// Whether `tensor` is the full tensor in the reference domain frame
    /// rather than its reduced counterpart.
    #[serde(default = "default_full_in_ref_frame")]
    pub full_in_ref_frame: bool,
    #[serde(default)]
    pub rdc: Option<ObservableSet>,
    #[serde(default)]
    pub pcs: Option<ObservableSet>,
    /// PCS temperature, in Kelvin.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Spectrometer proton frequency, in Hz.
    #[serde(default)]
    pub frequency: Option<f64>,
}

fn default_full_in_ref_frame() -> bool {
    true
}

impl AlignmentData {
    pub fn new(tensor: [f64; 5]) -> Self {
        Self {
            tensor,
            full_in_ref_frame: true,
            rdc: None,
            pcs: None,
            temperature: None,
            frequency: None,
        }
    }

    pub fn full_in_ref_frame(mut self, full: bool) -> Self {
        self.full_in_ref_frame = full;
        self
    }

    pub fn rdc(mut self, set: ObservableSet) -> Self {
        self.rdc = Some(set);
        self
    }

    pub fn pcs(mut self, set: ObservableSet, temperature: f64, frequency: f64) -> Self {
        self.pcs = Some(set);
        self.temperature = Some(temperature);
        self.frequency = Some(frequency);
        self
    }
}
