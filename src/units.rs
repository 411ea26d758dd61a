//! Minimal unit handling for absorption datasets.
//!
//! Datasets label their coordinates with a `units` attribute. Only the
//! spectral, pressure and temperature units needed to line up a request with a
//! dataset are understood here; anything else is reported as
//! [`CkdkitError::InvalidUnits`].

use std::fmt;
use std::str::FromStr;

use crate::ckdkit_errors::CkdkitError;
use crate::constants::NM_CM_INV;

/// Spectral unit of a dataset coordinate.
///
/// Wavelength units carry their factor to nanometers, wavenumber units their
/// factor to inverse centimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpectralUnit {
    Wavelength { to_nm: f64 },
    Wavenumber { to_cm_inv: f64 },
}

impl SpectralUnit {
    pub const NANOMETER: SpectralUnit = SpectralUnit::Wavelength { to_nm: 1.0 };
    pub const INVERSE_CENTIMETER: SpectralUnit = SpectralUnit::Wavenumber { to_cm_inv: 1.0 };

    pub fn is_wavenumber(&self) -> bool {
        matches!(self, SpectralUnit::Wavenumber { .. })
    }

    /// Convert a value expressed in this unit to a wavelength in nm.
    pub fn to_nm(&self, value: f64) -> f64 {
        match self {
            SpectralUnit::Wavelength { to_nm } => value * to_nm,
            SpectralUnit::Wavenumber { to_cm_inv } => NM_CM_INV / (value * to_cm_inv),
        }
    }

    /// Convert a wavelength in nm to a value expressed in this unit.
    pub fn from_nm(&self, wavelength: f64) -> f64 {
        match self {
            SpectralUnit::Wavelength { to_nm } => wavelength / to_nm,
            SpectralUnit::Wavenumber { to_cm_inv } => NM_CM_INV / wavelength / to_cm_inv,
        }
    }

    /// Convert a value expressed in this unit to a wavenumber in cm^-1.
    pub fn to_cm_inv(&self, value: f64) -> f64 {
        match self {
            SpectralUnit::Wavelength { .. } => NM_CM_INV / self.to_nm(value),
            SpectralUnit::Wavenumber { to_cm_inv } => value * to_cm_inv,
        }
    }
}

impl FromStr for SpectralUnit {
    type Err = CkdkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim() {
            "nm" | "nanometer" | "nanometers" => SpectralUnit::Wavelength { to_nm: 1.0 },
            "um" | "µm" | "micron" | "microns" | "micrometer" | "micrometers" => {
                SpectralUnit::Wavelength { to_nm: 1e3 }
            }
            "m" | "meter" | "meters" => SpectralUnit::Wavelength { to_nm: 1e9 },
            "cm" | "centimeter" | "centimeters" => SpectralUnit::Wavelength { to_nm: 1e7 },
            "angstrom" | "Å" => SpectralUnit::Wavelength { to_nm: 0.1 },
            "cm^-1" | "cm-1" | "1/cm" | "/cm" | "cm**-1" | "1 / centimeter" => {
                SpectralUnit::Wavenumber { to_cm_inv: 1.0 }
            }
            "m^-1" | "m-1" | "1/m" | "/m" | "m**-1" | "1 / meter" => {
                SpectralUnit::Wavenumber { to_cm_inv: 1e-2 }
            }
            other => return Err(CkdkitError::InvalidUnits(format!("spectral unit '{other}'"))),
        };
        Ok(unit)
    }
}

impl fmt::Display for SpectralUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectralUnit::Wavelength { to_nm } if *to_nm == 1.0 => write!(f, "nm"),
            SpectralUnit::Wavelength { to_nm } => write!(f, "{to_nm} nm"),
            SpectralUnit::Wavenumber { to_cm_inv } if *to_cm_inv == 1.0 => write!(f, "cm^-1"),
            SpectralUnit::Wavenumber { to_cm_inv } => write!(f, "{to_cm_inv} cm^-1"),
        }
    }
}

/// Pressure unit, stored as its factor to pascals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureUnit {
    to_pa: f64,
}

impl PressureUnit {
    pub const PASCAL: PressureUnit = PressureUnit { to_pa: 1.0 };

    pub fn to_pa(&self, value: f64) -> f64 {
        value * self.to_pa
    }

    pub fn from_pa(&self, value: f64) -> f64 {
        value / self.to_pa
    }
}

impl FromStr for PressureUnit {
    type Err = CkdkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let to_pa = match s.trim() {
            "Pa" | "pascal" | "pascals" => 1.0,
            "hPa" | "hectopascal" | "mbar" | "millibar" => 1e2,
            "kPa" | "kilopascal" => 1e3,
            "bar" => 1e5,
            "atm" | "atmosphere" => 101_325.0,
            other => return Err(CkdkitError::InvalidUnits(format!("pressure unit '{other}'"))),
        };
        Ok(PressureUnit { to_pa })
    }
}

/// Check that a temperature unit string denotes kelvins.
pub fn check_kelvin(units: &str) -> Result<(), CkdkitError> {
    match units.trim() {
        "K" | "kelvin" | "kelvins" => Ok(()),
        other => Err(CkdkitError::InvalidUnits(format!(
            "temperature unit '{other}' (only kelvins are supported)"
        ))),
    }
}
