//! Static strategy table of the motional models.
//!
//! Each [`ModelEntry`] fixes what a model reads from the parameter vector and
//! how it turns its amplitude parameters into a [`MotionShape`]. The entry is
//! looked up once when a target is built.

use crate::core::frame_order::{
    IsoCone, Line, MotionShape, PseudoEllipse, Rigid, Rotor, Torsion,
};
use crate::core::integration::QuadratureSettings;
use crate::core::models::motion::MotionalModel;
use crate::core::sampling::AngleDim;

/// How the motional eigenframe is given in the parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisForm {
    /// The eigenframe is the lab frame.
    None,
    /// Polar and azimuthal angles of the motional z-axis.
    Spherical,
    /// z-y-z Euler angles of the full eigenframe.
    Euler,
}

impl AxisForm {
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            AxisForm::None => &[],
            AxisForm::Spherical => &["axis_theta", "axis_phi"],
            AxisForm::Euler => &["eigen_alpha", "eigen_beta", "eigen_gamma"],
        }
    }
}

pub type ShapeBuilder = fn(&[f64], &QuadratureSettings) -> Box<dyn MotionShape>;

#[derive(Debug)]
pub struct ModelEntry {
    pub model: MotionalModel,
    /// The average position carries its first Euler angle. Models whose
    /// torsion is free about an axis through the lab z-axis cannot resolve it.
    pub ave_alpha: bool,
    pub axis: AxisForm,
    pub shape_parameters: &'static [&'static str],
    pub sobol_dims: &'static [AngleDim],
    pub build: ShapeBuilder,
}

const TORSION: [AngleDim; 1] = [AngleDim::Sigma];
const TILT: [AngleDim; 2] = [AngleDim::Theta, AngleDim::Phi];
const TILT_TORSION: [AngleDim; 3] = [AngleDim::Theta, AngleDim::Phi, AngleDim::Sigma];

static RIGID: ModelEntry = ModelEntry {
    model: MotionalModel::Rigid,
    ave_alpha: true,
    axis: AxisForm::None,
    shape_parameters: &[],
    sobol_dims: &[],
    build: |_, _| Box::new(Rigid),
};

static ROTOR: ModelEntry = ModelEntry {
    model: MotionalModel::Rotor,
    ave_alpha: true,
    axis: AxisForm::Spherical,
    shape_parameters: &["cone_sigma_max"],
    sobol_dims: &TORSION,
    build: |p, _| Box::new(Rotor::new(Torsion::limited(p[0]))),
};

static FREE_ROTOR: ModelEntry = ModelEntry {
    model: MotionalModel::FreeRotor,
    ave_alpha: false,
    axis: AxisForm::Spherical,
    shape_parameters: &[],
    sobol_dims: &TORSION,
    build: |_, _| Box::new(Rotor::new(Torsion::Free)),
};

static ISO_CONE: ModelEntry = ModelEntry {
    model: MotionalModel::IsoCone,
    ave_alpha: true,
    axis: AxisForm::Spherical,
    shape_parameters: &["cone_theta", "cone_sigma_max"],
    sobol_dims: &TILT_TORSION,
    build: |p, _| Box::new(IsoCone::new(p[0], Torsion::limited(p[1]))),
};

static ISO_CONE_TORSIONLESS: ModelEntry = ModelEntry {
    model: MotionalModel::IsoConeTorsionless,
    ave_alpha: true,
    axis: AxisForm::Spherical,
    shape_parameters: &["cone_theta"],
    sobol_dims: &TILT,
    build: |p, _| Box::new(IsoCone::new(p[0], Torsion::Fixed)),
};

static ISO_CONE_FREE_ROTOR: ModelEntry = ModelEntry {
    model: MotionalModel::IsoConeFreeRotor,
    ave_alpha: false,
    axis: AxisForm::Spherical,
    shape_parameters: &["cone_s1"],
    sobol_dims: &TILT_TORSION,
    build: |p, _| Box::new(IsoCone::free_rotor_from_order_parameter(p[0])),
};

static PSEUDO_ELLIPSE: ModelEntry = ModelEntry {
    model: MotionalModel::PseudoEllipse,
    ave_alpha: true,
    axis: AxisForm::Euler,
    shape_parameters: &["cone_theta_x", "cone_theta_y", "cone_sigma_max"],
    sobol_dims: &TILT_TORSION,
    build: |p, settings| {
        Box::new(PseudoEllipse::new(p[0], p[1], Torsion::limited(p[2])).with_settings(*settings))
    },
};

static PSEUDO_ELLIPSE_TORSIONLESS: ModelEntry = ModelEntry {
    model: MotionalModel::PseudoEllipseTorsionless,
    ave_alpha: true,
    axis: AxisForm::Euler,
    shape_parameters: &["cone_theta_x", "cone_theta_y"],
    sobol_dims: &TILT,
    build: |p, settings| {
        Box::new(PseudoEllipse::new(p[0], p[1], Torsion::Fixed).with_settings(*settings))
    },
};

static PSEUDO_ELLIPSE_FREE_ROTOR: ModelEntry = ModelEntry {
    model: MotionalModel::PseudoEllipseFreeRotor,
    ave_alpha: true,
    axis: AxisForm::Euler,
    shape_parameters: &["cone_theta_x", "cone_theta_y"],
    sobol_dims: &TILT_TORSION,
    build: |p, settings| {
        Box::new(PseudoEllipse::new(p[0], p[1], Torsion::Free).with_settings(*settings))
    },
};

static LINE: ModelEntry = ModelEntry {
    model: MotionalModel::Line,
    ave_alpha: true,
    axis: AxisForm::Euler,
    shape_parameters: &["cone_theta", "cone_sigma_max"],
    sobol_dims: &TILT_TORSION,
    build: |p, _| Box::new(Line::new(p[0], Torsion::limited(p[1]))),
};

static LINE_TORSIONLESS: ModelEntry = ModelEntry {
    model: MotionalModel::LineTorsionless,
    ave_alpha: true,
    axis: AxisForm::Euler,
    shape_parameters: &["cone_theta"],
    sobol_dims: &TILT,
    build: |p, _| Box::new(Line::new(p[0], Torsion::Fixed)),
};

static LINE_FREE_ROTOR: ModelEntry = ModelEntry {
    model: MotionalModel::LineFreeRotor,
    ave_alpha: true,
    axis: AxisForm::Euler,
    shape_parameters: &["cone_theta"],
    sobol_dims: &TILT_TORSION,
    build: |p, _| Box::new(Line::new(p[0], Torsion::Free)),
};

pub fn entry(model: MotionalModel) -> &'static ModelEntry {
    match model {
        MotionalModel::Rigid => &RIGID,
        MotionalModel::Rotor => &ROTOR,
        MotionalModel::FreeRotor => &FREE_ROTOR,
        MotionalModel::IsoCone => &ISO_CONE,
        MotionalModel::IsoConeTorsionless => &ISO_CONE_TORSIONLESS,
        MotionalModel::IsoConeFreeRotor => &ISO_CONE_FREE_ROTOR,
        MotionalModel::PseudoEllipse => &PSEUDO_ELLIPSE,
        MotionalModel::PseudoEllipseTorsionless => &PSEUDO_ELLIPSE_TORSIONLESS,
        MotionalModel::PseudoEllipseFreeRotor => &PSEUDO_ELLIPSE_FREE_ROTOR,
        MotionalModel::Line => &LINE,
        MotionalModel::LineTorsionless => &LINE_TORSIONLESS,
        MotionalModel::LineFreeRotor => &LINE_FREE_ROTOR,
    }
}
