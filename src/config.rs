use ron::extensions::Extensions;
use serde::{Deserialize, Serialize};

use crate::error::{QuadError, Result};

/// Physical constants and properties of the quadcopter.
///
/// # Fields
///
/// * `gravity` - Gravitational acceleration (m/s²)
/// * `mass` - Total mass of the vehicle (kg)
/// * `length` - Distance from the center to each rotor (m)
/// * `inertia` - Principal moments of inertia `[Ixx, Iyy, Izz]` (kg⋅m²)
/// * `thrust_to_drag` - Thrust to drag constant coupling rotor thrust to yaw moment (m)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalConfig {
    pub gravity: f64,
    pub mass: f64,
    pub length: f64,
    pub inertia: [f64; 3],
    pub thrust_to_drag: f64,
}

impl Default for PhysicalConfig {
    fn default() -> Self {
        Self {
            gravity: 9.806,
            mass: 0.468,
            length: 0.17,
            inertia: [0.0023, 0.0023, 0.0046],
            thrust_to_drag: 0.016,
        }
    }
}

impl PhysicalConfig {
    /// Returns a copy of `self` with every field present in `overrides` replaced.
    pub fn merged(&self, overrides: &ConfigOverrides) -> Self {
        Self {
            gravity: overrides.gravity.unwrap_or(self.gravity),
            mass: overrides.mass.unwrap_or(self.mass),
            length: overrides.length.unwrap_or(self.length),
            inertia: overrides.inertia.unwrap_or(self.inertia),
            thrust_to_drag: overrides.thrust_to_drag.unwrap_or(self.thrust_to_drag),
        }
    }

    /// Rejects non-positive mass, arm length, inertia or thrust-to-drag, and
    /// non-finite gravity.
    pub fn validate(&self) -> Result<()> {
        if !self.gravity.is_finite() {
            return Err(QuadError::InvalidConfig {
                field: "gravity",
                value: self.gravity,
            });
        }
        let positive = [
            ("mass", self.mass),
            ("length", self.length),
            ("inertia.xx", self.inertia[0]),
            ("inertia.yy", self.inertia[1]),
            ("inertia.zz", self.inertia[2]),
            ("thrustToDrag", self.thrust_to_drag),
        ];
        for (field, value) in positive {
            // also catches NaN
            if !(value > 0.0 && value.is_finite()) {
                return Err(QuadError::InvalidConfig { field, value });
            }
        }
        Ok(())
    }
}

/// Partial overlay on [`PhysicalConfig`]. Missing keys keep their defaults and
/// unrecognized keys are ignored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverrides {
    pub gravity: Option<f64>,
    pub mass: Option<f64>,
    pub length: Option<f64>,
    pub inertia: Option<[f64; 3]>,
    pub thrust_to_drag: Option<f64>,
}

impl ConfigOverrides {
    /// Parses overrides from RON text, e.g. `(mass: 0.5, thrustToDrag: 0.02)`.
    pub fn from_ron(text: &str) -> Result<Self> {
        let options = ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
        Ok(options.from_str(text)?)
    }
}
