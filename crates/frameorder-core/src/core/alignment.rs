use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

/// Permeability of free space, in T·m/A.
pub const MU0: f64 = 4.0 * PI * 1e-7;
/// Boltzmann's constant, in J/K.
pub const BOLTZMANN: f64 = 1.380_650_4e-23;
/// Proton gyromagnetic ratio, in rad/(s·T).
pub const PROTON_GYROMAGNETIC_RATIO: f64 = 26.752_221_2e7;

/// Converts metres to Ångström for the cubed distance in the PCS constant.
const ANGSTROM_CUBED_PER_METRE_CUBED: f64 = 1e30;

/// Magnetic field strength in Tesla for a proton frequency in Hz.
#[inline]
pub fn field_strength(proton_frequency: f64) -> f64 {
    2.0 * PI * proton_frequency / PROTON_GYROMAGNETIC_RATIO
}

/// PCS constant `mu0/(4π) · 15kT / (B0² r³)`, with `r` in metres.
#[inline]
pub fn pcs_constant(temperature: f64, field: f64, distance: f64) -> f64 {
    MU0 / (4.0 * PI) * 15.0 * BOLTZMANN * temperature / (field * field) / distance.powi(3)
}

/// PCS constant with the distance dependence removed and Ångström units, for a
/// spectrometer proton frequency in Hz.
pub fn pcs_constant_angstrom(temperature: f64, proton_frequency: f64) -> f64 {
    pcs_constant(temperature, field_strength(proton_frequency), 1.0)
        * ANGSTROM_CUBED_PER_METRE_CUBED
}

#[inline]
pub fn pcs_tensor(dj: f64, v: &Vector3<f64>, a: &Matrix3<f64>) -> f64 {
    dj * v.dot(&(a * v))
}

#[inline]
pub fn rdc_tensor(dj: f64, mu: &Vector3<f64>, a: &Matrix3<f64>) -> f64 {
    dj * mu.dot(&(a * mu))
}

/// PCS of a single state for a paramagnetic centre to atom vector `v` with
/// `c` the distance-free PCS constant: `c · vᵀAv / |v|⁵`.
#[inline]
pub fn pcs_point(c: f64, v: &Vector3<f64>, a: &Matrix3<f64>) -> f64 {
    let length = v.norm();
    pcs_tensor(c / length.powi(5), v, a)
}
