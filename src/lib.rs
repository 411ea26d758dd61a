//! Spectral discretization and absorption coefficient lookup for radiative
//! transfer computations.
//!
//! The [`spectral`] module builds monochromatic and correlated-k (CKD) spectral
//! grids, selects the parts relevant to a spectral response function and walks
//! them as spectral indices. The [`absorption`] module opens absorption
//! databases (directories of NetCDF datasets, see [`netcdf`]) and evaluates
//! absorption coefficients at those indices for a thermophysical profile.

pub mod absorption;
pub mod ckdkit_errors;
pub mod constants;
pub mod labeled_array;
pub mod netcdf;
pub mod quad;
pub mod spectral;
pub mod units;
