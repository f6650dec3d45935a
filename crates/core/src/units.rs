//! Unit definitions and conversions.
//!
//! Every unit is a linear scaling of its SI counterpart, so conversion is a multiply on the way in
//! and a divide on the way out. Values inside the simulator are always SI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{KG_PER_LBM, M_PER_FT, M_PER_NM, N_PER_LBF, SECONDS_PER_HOUR};

/// Physical dimension of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Mass,
    Length,
    Speed,
    Force,
    Angle,
    Time,
    Dimensionless,
}

/// Supported measurement units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Unit {
    Kilogram,
    PoundMass,
    Meter,
    Foot,
    Kilometer,
    NauticalMile,
    MeterPerSecond,
    FootPerSecond,
    FootPerMinute,
    Knot,
    Newton,
    PoundForce,
    Radian,
    Degree,
    Second,
    Minute,
    Hour,
    Unitless,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("unknown unit `{0}`")]
    Unknown(String),
    #[error("cannot convert {from} to {to}: incompatible dimensions")]
    Incompatible { from: Unit, to: Unit },
}

impl Unit {
    /// Dimension measured by this unit.
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Kilogram | Unit::PoundMass => Dimension::Mass,
            Unit::Meter | Unit::Foot | Unit::Kilometer | Unit::NauticalMile => Dimension::Length,
            Unit::MeterPerSecond | Unit::FootPerSecond | Unit::FootPerMinute | Unit::Knot => {
                Dimension::Speed
            }
            Unit::Newton | Unit::PoundForce => Dimension::Force,
            Unit::Radian | Unit::Degree => Dimension::Angle,
            Unit::Second | Unit::Minute | Unit::Hour => Dimension::Time,
            Unit::Unitless => Dimension::Dimensionless,
        }
    }

    /// Number of SI units in one of this unit.
    pub fn si_factor(self) -> f64 {
        match self {
            Unit::Kilogram => 1.0,
            Unit::PoundMass => KG_PER_LBM,
            Unit::Meter => 1.0,
            Unit::Foot => M_PER_FT,
            Unit::Kilometer => 1_000.0,
            Unit::NauticalMile => M_PER_NM,
            Unit::MeterPerSecond => 1.0,
            Unit::FootPerSecond => M_PER_FT,
            Unit::FootPerMinute => M_PER_FT / 60.0,
            Unit::Knot => M_PER_NM / SECONDS_PER_HOUR,
            Unit::Newton => 1.0,
            Unit::PoundForce => N_PER_LBF,
            Unit::Radian => 1.0,
            Unit::Degree => std::f64::consts::PI / 180.0,
            Unit::Second => 1.0,
            Unit::Minute => 60.0,
            Unit::Hour => SECONDS_PER_HOUR,
            Unit::Unitless => 1.0,
        }
    }

    /// SI unit of the same dimension.
    pub fn si(self) -> Unit {
        match self.dimension() {
            Dimension::Mass => Unit::Kilogram,
            Dimension::Length => Unit::Meter,
            Dimension::Speed => Unit::MeterPerSecond,
            Dimension::Force => Unit::Newton,
            Dimension::Angle => Unit::Radian,
            Dimension::Time => Unit::Second,
            Dimension::Dimensionless => Unit::Unitless,
        }
    }

    #[inline]
    pub fn to_si(self, value: f64) -> f64 {
        value * self.si_factor()
    }

    #[inline]
    pub fn from_si(self, value: f64) -> f64 {
        value / self.si_factor()
    }

    /// Convert `value` expressed in `self` into `target`.
    pub fn convert(self, value: f64, target: Unit) -> Result<f64, UnitError> {
        if self.dimension() != target.dimension() {
            return Err(UnitError::Incompatible {
                from: self,
                to: target,
            });
        }
        if self == target {
            return Ok(value);
        }
        Ok(target.from_si(self.to_si(value)))
    }

    /// Canonical symbol, also used for serialization.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Kilogram => "kg",
            Unit::PoundMass => "lbm",
            Unit::Meter => "m",
            Unit::Foot => "ft",
            Unit::Kilometer => "km",
            Unit::NauticalMile => "NM",
            Unit::MeterPerSecond => "m/s",
            Unit::FootPerSecond => "ft/s",
            Unit::FootPerMinute => "ft/min",
            Unit::Knot => "kn",
            Unit::Newton => "N",
            Unit::PoundForce => "lbf",
            Unit::Radian => "rad",
            Unit::Degree => "deg",
            Unit::Second => "s",
            Unit::Minute => "min",
            Unit::Hour => "h",
            Unit::Unitless => "unitless",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim() {
            "kg" => Unit::Kilogram,
            "lbm" | "lb" => Unit::PoundMass,
            "m" => Unit::Meter,
            "ft" => Unit::Foot,
            "km" => Unit::Kilometer,
            "NM" | "nmi" => Unit::NauticalMile,
            "m/s" => Unit::MeterPerSecond,
            "ft/s" => Unit::FootPerSecond,
            "ft/min" => Unit::FootPerMinute,
            "kn" | "kt" | "knot" => Unit::Knot,
            "N" => Unit::Newton,
            "lbf" => Unit::PoundForce,
            "rad" => Unit::Radian,
            "deg" => Unit::Degree,
            "s" | "sec" => Unit::Second,
            "min" => Unit::Minute,
            "h" | "hr" => Unit::Hour,
            "unitless" | "" => Unit::Unitless,
            other => return Err(UnitError::Unknown(other.to_string())),
        };
        Ok(unit)
    }
}

impl TryFrom<String> for Unit {
    type Error = UnitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Unit> for &'static str {
    fn from(unit: Unit) -> Self {
        unit.symbol()
    }
}

/// A value tagged with its unit, written `{ val: .., units: ".." }` in manifests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    #[serde(rename = "val")]
    pub value: f64,
    #[serde(rename = "units", default = "unitless")]
    pub unit: Unit,
}

fn unitless() -> Unit {
    Unit::Unitless
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Dimensionless quantity.
    pub fn scalar(value: f64) -> Self {
        Self::new(value, Unit::Unitless)
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Value in SI units.
    pub fn si(&self) -> f64 {
        self.unit.to_si(self.value)
    }

    /// Value converted into `unit`.
    pub fn in_units(&self, unit: Unit) -> Result<f64, UnitError> {
        self.unit.convert(self.value, unit)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}
