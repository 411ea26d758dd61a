//! # Constants and type definitions for ckdkit
//!
//! This module centralizes the **default spectral ranges**, **conversion factors**,
//! **dataset naming conventions** and **common type aliases** used throughout the
//! crate.
//!
//! ## Overview
//!
//! - Default spectral range and sampling of grids and bin sets
//! - Wavelength ↔ wavenumber conversion factor
//! - Variable and dimension names expected in absorption datasets
//! - Names of the on-disk index files of an absorption database

// -------------------------------------------------------------------------------------------------
// Spectral units
// -------------------------------------------------------------------------------------------------

/// Wavelength, always expressed in nanometers inside the crate
pub type Nanometer = f64;

/// Wavenumber, always expressed in inverse centimeters inside the crate
pub type Wavenumber = f64;

/// λ [nm] = `NM_CM_INV` / ν [cm^-1]
pub const NM_CM_INV: f64 = 1e7;

/// Lower bound of the default spectral range (nm)
pub const SPECTRAL_RANGE_MIN: Nanometer = 280.0;

/// Upper bound of the default spectral range (nm)
pub const SPECTRAL_RANGE_MAX: Nanometer = 2400.0;

/// Default spacing of monochromatic grids (nm)
pub const DEFAULT_MONO_STEP: Nanometer = 1.0;

/// Default bin width of CKD grids and bin sets (nm)
pub const DEFAULT_BIN_WIDTH: Nanometer = 10.0;

/// Default tolerance when reconciling adjacent bin bounds (nm)
pub const DEFAULT_BOUND_EPSILON: Nanometer = 1e-6;

/// Relative tolerance used when counting steps of a regular range
pub const STEP_RTOL: f64 = 1e-9;

// -------------------------------------------------------------------------------------------------
// Absorption database layout
// -------------------------------------------------------------------------------------------------

/// Coarse index: one row per data file
pub const INDEX_FILENAME: &str = "index.csv";

/// Fine index: one row per spectral point (or bin) of each data file
pub const SPECTRAL_COVERAGE_FILENAME: &str = "spectral.csv";

/// Optional free-form metadata
pub const METADATA_FILENAME: &str = "metadata.json";

/// Extension of the data files
pub const DATASET_EXTENSION: &str = "nc";

/// Default number of datasets kept open by a database
pub const DEFAULT_CACHE_SIZE: usize = 8;

/// Environment variable overriding the location of the known databases
pub const DATA_DIR_ENV: &str = "CKDKIT_DATA_DIR";

// -------------------------------------------------------------------------------------------------
// Absorption dataset schema
// -------------------------------------------------------------------------------------------------

/// Absorption coefficient or cross section
pub const SIGMA_A: &str = "sigma_a";

/// Spectral coordinate (wavelength or wavenumber)
pub const W: &str = "w";

/// Cumulative probability coordinate of CKD datasets
pub const G: &str = "g";

/// Pressure coordinate
pub const P: &str = "p";

/// Temperature coordinate
pub const T: &str = "t";

/// Altitude dimension of evaluated profiles
pub const Z: &str = "z";

/// Prefix of the concentration coordinates (`x_H2O`, `x_CO2`, ...)
pub const X_PREFIX: &str = "x_";

/// Bin bounds variable of CKD datasets, dimensions `(wbv, w)`
pub const WBOUNDS: &str = "wbounds";

/// Bound dimension of `wbounds`: index 0 is the lower bound, 1 the upper bound
pub const WBV: &str = "wbv";

/// Quadrature error table variable of CKD datasets
pub const ERROR: &str = "error";

/// Node count coordinate of the quadrature error table
pub const NG: &str = "ng";

/// Attribute of `ng` naming the quadrature family the error table was computed with
pub const QUADRATURE_TYPE_ATTR: &str = "quadrature_type";

/// Attribute holding the units of a variable
pub const UNITS_ATTR: &str = "units";
