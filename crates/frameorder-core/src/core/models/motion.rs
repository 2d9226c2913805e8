use phf::{Map, phf_map};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of motional models of inter-domain dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum MotionalModel {
    Rigid,
    Rotor,
    FreeRotor,
    IsoCone,
    IsoConeTorsionless,
    IsoConeFreeRotor,
    PseudoEllipse,
    PseudoEllipseTorsionless,
    PseudoEllipseFreeRotor,
    Line,
    LineTorsionless,
    LineFreeRotor,
}

static MODEL_NAMES: Map<&'static str, MotionalModel> = phf_map! {
    "rigid" => MotionalModel::Rigid,
    "rotor" => MotionalModel::Rotor,
    "free rotor" => MotionalModel::FreeRotor,
    "free-rotor" => MotionalModel::FreeRotor,
    "iso cone" => MotionalModel::IsoCone,
    "iso-cone" => MotionalModel::IsoCone,
    "iso cone, torsionless" => MotionalModel::IsoConeTorsionless,
    "iso-cone-torsionless" => MotionalModel::IsoConeTorsionless,
    "iso cone, free rotor" => MotionalModel::IsoConeFreeRotor,
    "iso-cone-free-rotor" => MotionalModel::IsoConeFreeRotor,
    "pseudo-ellipse" => MotionalModel::PseudoEllipse,
    "pseudo-ellipse, torsionless" => MotionalModel::PseudoEllipseTorsionless,
    "pseudo-ellipse-torsionless" => MotionalModel::PseudoEllipseTorsionless,
    "pseudo-ellipse, free rotor" => MotionalModel::PseudoEllipseFreeRotor,
    "pseudo-ellipse-free-rotor" => MotionalModel::PseudoEllipseFreeRotor,
    "line" => MotionalModel::Line,
    "line, torsionless" => MotionalModel::LineTorsionless,
    "line-torsionless" => MotionalModel::LineTorsionless,
    "line, free rotor" => MotionalModel::LineFreeRotor,
    "line-free-rotor" => MotionalModel::LineFreeRotor,
};

impl MotionalModel {
    pub const ALL: [MotionalModel; 12] = [
        MotionalModel::Rigid,
        MotionalModel::Rotor,
        MotionalModel::FreeRotor,
        MotionalModel::IsoCone,
        MotionalModel::IsoConeTorsionless,
        MotionalModel::IsoConeFreeRotor,
        MotionalModel::PseudoEllipse,
        MotionalModel::PseudoEllipseTorsionless,
        MotionalModel::PseudoEllipseFreeRotor,
        MotionalModel::Line,
        MotionalModel::LineTorsionless,
        MotionalModel::LineFreeRotor,
    ];

    /// Canonical name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            MotionalModel::Rigid => "rigid",
            MotionalModel::Rotor => "rotor",
            MotionalModel::FreeRotor => "free rotor",
            MotionalModel::IsoCone => "iso cone",
            MotionalModel::IsoConeTorsionless => "iso cone, torsionless",
            MotionalModel::IsoConeFreeRotor => "iso cone, free rotor",
            MotionalModel::PseudoEllipse => "pseudo-ellipse",
            MotionalModel::PseudoEllipseTorsionless => "pseudo-ellipse, torsionless",
            MotionalModel::PseudoEllipseFreeRotor => "pseudo-ellipse, free rotor",
            MotionalModel::Line => "line",
            MotionalModel::LineTorsionless => "line, torsionless",
            MotionalModel::LineFreeRotor => "line, free rotor",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown motional model '{0}'")]
pub struct ParseMotionalModelError(pub String);

impl FromStr for MotionalModel {
    type Err = ParseMotionalModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MODEL_NAMES
            .get(s.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| ParseMotionalModelError(s.to_string()))
    }
}

impl TryFrom<String> for MotionalModel {
    type Error = ParseMotionalModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for MotionalModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
