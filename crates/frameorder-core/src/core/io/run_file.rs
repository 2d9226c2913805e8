use crate::core::integration::QuadratureSettings;
use crate::core::models::dataset::AlignmentData;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Integration choices of a run.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationSection {
    #[serde(default)]
    pub quad_int: Option<bool>,
    #[serde(default)]
    pub num_int_pts: Option<usize>,
    #[serde(default)]
    pub error_flag: Option<bool>,
    #[serde(default)]
    pub pcs_quadrature: Option<QuadratureSettings>,
    #[serde(default)]
    pub matrix_quadrature: Option<QuadratureSettings>,
}

/// Structural inputs shared by every alignment.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureSection {
    #[serde(default)]
    pub rdc_vectors: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    pub dipolar_constants: Option<Vec<f64>>,
    #[serde(default)]
    pub atomic_positions: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    pub pivot: Option<[f64; 3]>,
    #[serde(default)]
    pub ave_pos_pivot: Option<[f64; 3]>,
    #[serde(default)]
    pub paramag_centre: Option<[f64; 3]>,
}

/// A frame order run described in TOML.
///
/// ```toml
/// model = "iso cone"
/// parameters = [0.1, 0.2, 0.3, 0.5, 1.0, 0.4, 0.6]
///
/// [integration]
/// quad_int = false
/// num_int_pts = 500
///
/// [structure]
/// atomic_positions = [[12.0, -3.1, 8.4]]
/// pivot = [1.0, 0.0, 0.0]
/// paramag_centre = [0.0, 0.0, 0.0]
///
/// [[alignments]]
/// tensor = [-1.2e-4, 3.4e-4, 0.8e-4, -1.5e-4, 0.6e-4]
/// temperature = 298.0
/// frequency = 600.0e6
/// pcs = { values = [1.2e-6] }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    /// Motional model name or alias.
    pub model: String,
    #[serde(default)]
    pub pivot_opt: Option<bool>,
    #[serde(default)]
    pub translation_opt: Option<bool>,
    #[serde(default)]
    pub ave_pos_piv_sync: Option<bool>,
    /// Parameter vector to evaluate, in the model's layout.
    #[serde(default)]
    pub parameters: Option<Vec<f64>>,
    /// Rows of the parameter scaling matrix.
    #[serde(default)]
    pub scaling: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub integration: IntegrationSection,
    #[serde(default)]
    pub structure: StructureSection,
    #[serde(default)]
    pub alignments: Vec<AlignmentData>,
}

impl RunFile {
    pub fn load(path: &Path) -> Result<Self, RunFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| RunFileError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| RunFileError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}

#[derive(Debug, Error)]
pub enum RunFileError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}
