//! Interpretation of absorption datasets.
//!
//! An absorption dataset is a NetCDF file with:
//!
//! | name        | dimensions        | role                                         |
//! |-------------|-------------------|----------------------------------------------|
//! | `w`         | `(w)`             | spectral coordinate, `units` = nm, cm^-1, ... |
//! | `g`         | `(g)`             | CKD only: cumulative probability             |
//! | `p`, `t`    | `(p)`, `(t)`      | optional thermodynamic coordinates           |
//! | `x_<name>`  | `(x_<name>)`/`()` | optional concentration coordinates           |
//! | `sigma_a`   | any of the above  | absorption coefficient or cross section      |
//! | `wbounds`   | `(wbv, w)`        | CKD only: bin bounds, lower then upper       |
//! | `error`     | `(ng)`/`(w, ng)`  | CKD only: quadrature error table             |
//!
//! The helpers below turn these variables into crate types, converting the
//! spectral coordinate to nanometers where needed.

use crate::ckdkit_errors::CkdkitError;
use crate::constants::{
    Nanometer, ERROR, NG, QUADRATURE_TYPE_ATTR, SIGMA_A, W, WBOUNDS, WBV, X_PREFIX,
};
use crate::netcdf::Dataset;
use crate::quad::QuadType;
use crate::spectral::quad_policy::ErrorTable;
use crate::units::SpectralUnit;

/// Variables every absorption dataset must define
const REQUIRED_VARIABLES: [&str; 2] = [SIGMA_A, W];

fn schema_error(ds: &Dataset, message: impl std::fmt::Display) -> CkdkitError {
    CkdkitError::SchemaMismatch(format!("{}: {message}", ds.path()))
}

/// Check the variables shared by all absorption datasets.
pub fn check_common(ds: &Dataset) -> Result<(), CkdkitError> {
    for name in REQUIRED_VARIABLES {
        if !ds.has_variable(name) {
            return Err(schema_error(ds, format!("missing variable '{name}'")));
        }
    }
    let sigma_dims = ds.variable_dims(SIGMA_A)?;
    if !sigma_dims.iter().any(|d| d == W) {
        return Err(schema_error(ds, "'sigma_a' has no spectral dimension 'w'"));
    }
    Ok(())
}

/// Check the additional variables of CKD datasets.
pub fn check_ckd(ds: &Dataset) -> Result<(), CkdkitError> {
    check_common(ds)?;
    if !ds.has_variable(WBOUNDS) {
        return Err(schema_error(ds, format!("missing variable '{WBOUNDS}'")));
    }
    let sigma_dims = ds.variable_dims(SIGMA_A)?;
    if !sigma_dims.iter().any(|d| d == crate::constants::G) {
        return Err(schema_error(ds, "'sigma_a' has no 'g' dimension"));
    }
    Ok(())
}

/// Unit of the spectral coordinate; a missing `units` attribute means nm.
pub fn spectral_unit(ds: &Dataset) -> Result<SpectralUnit, CkdkitError> {
    match ds.units(W) {
        Some(units) => units.parse(),
        None => Ok(SpectralUnit::NANOMETER),
    }
}

/// Spectral coordinate in the dataset's own units.
pub fn w_native(ds: &Dataset) -> Result<Vec<f64>, CkdkitError> {
    ds.values(W)
}

/// Spectral coordinate converted to wavelengths (nm), in dataset order.
pub fn w_nm(ds: &Dataset) -> Result<Vec<Nanometer>, CkdkitError> {
    let unit = spectral_unit(ds)?;
    Ok(w_native(ds)?.into_iter().map(|w| unit.to_nm(w)).collect())
}

/// Bin bounds `(wmin, wmax)` in nm, one pair per entry of `w`, in dataset order.
///
/// With a wavenumber coordinate the lower wavenumber bound is the upper
/// wavelength bound; the pairs are returned with `wmin < wmax` either way.
pub fn bin_bounds_nm(ds: &Dataset) -> Result<Vec<(Nanometer, Nanometer)>, CkdkitError> {
    let unit = spectral_unit(ds)?;
    let bounds = ds.array(WBOUNDS)?;
    let n_w = ds
        .dim_len(W)
        .ok_or_else(|| schema_error(ds, "missing dimension 'w'"))?;
    let dims = bounds.dims().to_vec();
    let bounds = match dims.as_slice() {
        [a, b] if a == WBV && b == W => bounds,
        [a, b] if a == W && b == WBV => bounds.transpose(&[WBV, W])?,
        dims => {
            return Err(schema_error(
                ds,
                format!("'wbounds' has dimensions {dims:?}, expected (wbv, w)"),
            ))
        }
    };
    if bounds.shape() != [2, n_w] {
        return Err(schema_error(
            ds,
            format!("'wbounds' has shape {:?}, expected [2, {n_w}]", bounds.shape()),
        ));
    }
    let data = bounds.data();
    Ok((0..n_w)
        .map(|i| {
            let a = unit.to_nm(data[[0, i]]);
            let b = unit.to_nm(data[[1, i]]);
            (a.min(b), a.max(b))
        })
        .collect())
}

/// Quadrature family the error table was computed with.
pub fn error_table_kind(ds: &Dataset) -> Result<QuadType, CkdkitError> {
    match ds
        .attribute(NG, QUADRATURE_TYPE_ATTR)
        .and_then(|a| a.as_str())
    {
        Some(kind) => kind.parse(),
        None => Ok(QuadType::GaussLegendre),
    }
}

/// Quadrature error tables of a CKD dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorTables {
    /// One table for the whole dataset
    Shared(ErrorTable),
    /// One table per entry of `w`
    PerBin(Vec<ErrorTable>),
}

impl ErrorTables {
    pub fn for_bin(&self, index: usize) -> Option<&ErrorTable> {
        match self {
            ErrorTables::Shared(table) => Some(table),
            ErrorTables::PerBin(tables) => tables.get(index),
        }
    }
}

/// Read the `error` variable, or `None` if the dataset has no error table.
pub fn error_tables(ds: &Dataset) -> Result<Option<ErrorTables>, CkdkitError> {
    if !ds.has_variable(ERROR) {
        return Ok(None);
    }
    let ng: Vec<usize> = ds
        .values(NG)?
        .into_iter()
        .map(|n| {
            if n >= 1.0 && n.fract() == 0.0 {
                Ok(n as usize)
            } else {
                Err(schema_error(ds, format!("invalid node count {n} in 'ng'")))
            }
        })
        .collect::<Result<_, _>>()?;

    let error = ds.array(ERROR)?;
    let dims = error.dims().to_vec();
    match dims.as_slice() {
        [d] if d == NG => {
            let values: Vec<f64> = error.data().iter().copied().collect();
            Ok(Some(ErrorTables::Shared(ErrorTable::new(&ng, &values)?)))
        }
        [a, b] if (a == W && b == NG) || (a == NG && b == W) => {
            let error = if a == W {
                error
            } else {
                error.transpose(&[W, NG])?
            };
            let n_w = error.shape()[0];
            let tables = (0..n_w)
                .map(|i| {
                    let row = error.isel(W, i)?;
                    let values: Vec<f64> = row.data().iter().copied().collect();
                    ErrorTable::new(&ng, &values)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(ErrorTables::PerBin(tables)))
        }
        dims => Err(schema_error(
            ds,
            format!("'error' has dimensions {dims:?}, expected (ng) or (w, ng)"),
        )),
    }
}

/// Names of the concentration coordinates (`x_*` variables).
pub fn concentration_coordinates(ds: &Dataset) -> Vec<String> {
    ds.variable_names()
        .filter(|name| name.starts_with(X_PREFIX))
        .map(str::to_string)
        .collect()
}
