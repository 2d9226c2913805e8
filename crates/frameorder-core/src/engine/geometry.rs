use nalgebra::{Matrix3, Vector3};

/// Pivot-centred vectors of one evaluation. Rebuilt on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotGeometry {
    /// Pivot to atom vectors with the average position rotation applied.
    pub forward: Vec<Vector3<f64>>,
    /// Pivot to atom vectors with the inverse average position rotation.
    pub reverse: Vec<Vector3<f64>>,
    /// Paramagnetic centre to pivot vector.
    pub ln_pivot: Vector3<f64>,
}

impl PivotGeometry {
    /// Pivot to atom vectors for a tensor given in (`true`) or out of the
    /// reference domain frame.
    pub fn pivot_atom(&self, full_in_ref_frame: bool) -> &[Vector3<f64>] {
        if full_in_ref_frame {
            &self.forward
        } else {
            &self.reverse
        }
    }
}

/// Places the atoms at the average domain position.
///
/// Each atom is rotated by `r_ave` about `ave_pos_pivot`, shifted by
/// `translation` and expressed relative to `pivot`.
pub fn pivot_geometry(
    atoms: &[Vector3<f64>],
    r_ave: &Matrix3<f64>,
    ave_pos_pivot: &Vector3<f64>,
    translation: &Vector3<f64>,
    pivot: &Vector3<f64>,
    paramag_centre: &Vector3<f64>,
) -> PivotGeometry {
    let shift = ave_pos_pivot + translation - pivot;
    let r_inv = r_ave.transpose();
    let place = |r: &Matrix3<f64>| -> Vec<Vector3<f64>> {
        atoms
            .iter()
            .map(|atom| r * (atom - ave_pos_pivot) + shift)
            .collect()
    };

    PivotGeometry {
        forward: place(r_ave),
        reverse: place(&r_inv),
        ln_pivot: pivot - paramag_centre,
    }
}
