//! International Standard Atmosphere (ISA) up to the middle stratosphere.

use flight_core::constants::G0;

/// Specific gas constant for dry air (J/(kg·K)).
const R_AIR: f64 = 287.052_87;
/// Heat capacity ratio for air.
const GAMMA: f64 = 1.4;
/// Sea-level standard density (kg/m³).
pub const SEA_LEVEL_DENSITY: f64 = 1.225;

#[derive(Debug, Clone, Copy)]
struct Layer {
    /// Base geopotential altitude (m).
    base_altitude: f64,
    /// Temperature at the layer base (K).
    base_temperature: f64,
    /// Pressure at the layer base (Pa).
    base_pressure: f64,
    /// Temperature lapse rate (K/m).
    lapse_rate: f64,
}

const LAYERS: [Layer; 3] = [
    // Troposphere
    Layer {
        base_altitude: 0.0,
        base_temperature: 288.15,
        base_pressure: 101_325.0,
        lapse_rate: -0.0065,
    },
    // Tropopause, isothermal
    Layer {
        base_altitude: 11_000.0,
        base_temperature: 216.65,
        base_pressure: 22_632.06,
        lapse_rate: 0.0,
    },
    // Stratosphere 1
    Layer {
        base_altitude: 20_000.0,
        base_temperature: 216.65,
        base_pressure: 5_474.889,
        lapse_rate: 0.001,
    },
];

/// Upper validity bound of the table; higher altitudes are clamped.
const CEILING_M: f64 = 32_000.0;

/// Atmospheric properties at a single altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphereSample {
    pub temperature_k: f64,
    pub pressure_pa: f64,
    pub density_kg_m3: f64,
    pub speed_of_sound_m_s: f64,
}

impl AtmosphereSample {
    /// Density relative to sea level.
    pub fn density_ratio(&self) -> f64 {
        self.density_kg_m3 / SEA_LEVEL_DENSITY
    }
}

/// Standard-day properties at `altitude_m` (geopotential metres).
///
/// Altitudes below sea level extrapolate the tropospheric lapse rate.
pub fn standard_atmosphere(altitude_m: f64) -> AtmosphereSample {
    let h = altitude_m.min(CEILING_M);
    let layer = LAYERS
        .iter()
        .rev()
        .find(|layer| h >= layer.base_altitude)
        .unwrap_or(&LAYERS[0]);

    let dh = h - layer.base_altitude;
    let (temperature, pressure) = if layer.lapse_rate == 0.0 {
        let t = layer.base_temperature;
        (t, layer.base_pressure * (-G0 * dh / (R_AIR * t)).exp())
    } else {
        let t = layer.base_temperature + layer.lapse_rate * dh;
        let exponent = -G0 / (layer.lapse_rate * R_AIR);
        (
            t,
            layer.base_pressure * (t / layer.base_temperature).powf(exponent),
        )
    };

    AtmosphereSample {
        temperature_k: temperature,
        pressure_pa: pressure,
        density_kg_m3: pressure / (R_AIR * temperature),
        speed_of_sound_m_s: (GAMMA * R_AIR * temperature).sqrt(),
    }
}
