//! Evaluation of one absorption dataset on a thermophysical profile.
//!
//! Dimensions are processed in a fixed order: spectral, then pressure, then
//! temperature, then concentrations. The first thermophysical interpolation
//! replaces its coordinate by the altitude dimension `z`; the next ones are
//! pointwise along `z`.
//!
//! The result of every evaluation has dimensions `(w, z)`.

use itertools::Itertools;

use crate::absorption::error_handling::{
    handle, ErrorHandlingConfiguration, ErrorHandlingPolicy, InterpolationIssue,
};
use crate::absorption::schema;
use crate::absorption::thermoprops::ThermoProfile;
use crate::ckdkit_errors::CkdkitError;
use crate::constants::{Nanometer, G, P, SIGMA_A, T, W, Z};
use crate::labeled_array::{bracket, nearest, Bracket, InterpTarget, LabeledArray};
use crate::netcdf::Dataset;
use crate::units::{check_kelvin, PressureUnit};

fn range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .copied()
        .minmax_by(f64::total_cmp)
        .into_option()
        .unwrap_or((f64::NAN, f64::NAN))
}

fn out_of_bounds(dimension: &str, requested: &[f64], available: &[f64]) -> InterpolationIssue {
    let (requested_min, requested_max) = range(requested);
    let (min, max) = range(available);
    InterpolationIssue::OutOfBounds {
        dimension: dimension.to_string(),
        requested_min,
        requested_max,
        min,
        max,
    }
}

/// Linear interpolation of `sigma_a` at the wavelengths `w` (nm).
///
/// The interpolation happens in the dataset's own spectral coordinate, so a
/// wavenumber dataset is interpolated linearly in wavenumber.
pub(crate) fn eval_mono(
    ds: &Dataset,
    w: &[Nanometer],
    profile: &ThermoProfile,
    config: &ErrorHandlingConfiguration,
) -> Result<LabeledArray, CkdkitError> {
    let unit = schema::spectral_unit(ds)?;
    let coords = schema::w_native(ds)?;
    let targets: Vec<f64> = w.iter().map(|w| unit.from_nm(*w)).collect();
    let brackets: Vec<Bracket> = targets.iter().map(|x| bracket(&coords, *x)).collect();
    if brackets.iter().any(Bracket::is_out_of_bounds) {
        return Err(out_of_bounds(W, &targets, &coords).into_error());
    }
    let sigma = ds
        .array(SIGMA_A)?
        .interp(W, &brackets, f64::NAN, InterpTarget::Replace(W))?;
    interp_thermophysical(ds, sigma, profile, config)
}

/// `sigma_a` of the bins nearest to `w` (nm), linearly interpolated at `g`.
pub(crate) fn eval_ckd(
    ds: &Dataset,
    w: &[Nanometer],
    g: f64,
    profile: &ThermoProfile,
    config: &ErrorHandlingConfiguration,
) -> Result<LabeledArray, CkdkitError> {
    let unit = schema::spectral_unit(ds)?;
    let coords = schema::w_native(ds)?;
    let indices = w
        .iter()
        .map(|w| {
            nearest(&coords, unit.from_nm(*w)).ok_or_else(|| {
                CkdkitError::SchemaMismatch(format!("{}: empty spectral coordinate", ds.path()))
            })
        })
        .collect::<Result<Vec<usize>, _>>()?;
    let sigma = ds.array(SIGMA_A)?.take(W, &indices)?;

    let g_coords = ds.values(G)?;
    let g_bracket = bracket(&g_coords, g);
    if g_bracket.is_out_of_bounds() {
        return Err(out_of_bounds(G, &[g], &g_coords).into_error());
    }
    let sigma = sigma
        .interp(G, &[g_bracket], f64::NAN, InterpTarget::Replace(G))?
        .isel(G, 0)?;
    interp_thermophysical(ds, sigma, profile, config)
}

fn interp_thermophysical(
    ds: &Dataset,
    sigma: LabeledArray,
    profile: &ThermoProfile,
    config: &ErrorHandlingConfiguration,
) -> Result<LabeledArray, CkdkitError> {
    let pressure_unit = match ds.units(P) {
        Some(units) => units.parse()?,
        None => PressureUnit::PASCAL,
    };
    let p: Vec<f64> = profile.p().iter().map(|p| pressure_unit.from_pa(*p)).collect();
    let mut sigma = interp_coordinate(ds, sigma, P, Some(&p), &config.p)?;

    if let Some(units) = ds.units(T) {
        check_kelvin(units)?;
    }
    sigma = interp_coordinate(ds, sigma, T, Some(profile.t()), &config.t)?;

    for name in schema::concentration_coordinates(ds) {
        sigma = interp_coordinate(ds, sigma, &name, profile.concentration(&name), &config.x)?;
    }

    if !sigma.has_dim(Z) {
        sigma = sigma.broadcast_dim(Z, profile.n_layers());
    }
    sigma.transpose(&[W, Z]).map_err(|_| {
        CkdkitError::SchemaMismatch(format!(
            "{}: 'sigma_a' has unsupported dimensions {:?}",
            ds.path(),
            sigma.dims()
        ))
    })
}

/// Resolve dimension `dim` of `sigma` against the profile values `target`.
fn interp_coordinate(
    ds: &Dataset,
    sigma: LabeledArray,
    dim: &str,
    target: Option<&[f64]>,
    policy: &ErrorHandlingPolicy,
) -> Result<LabeledArray, CkdkitError> {
    let in_dataset = sigma.has_dim(dim);

    let Some(target) = target else {
        // Tabulated in the dataset, absent from the profile
        if in_dataset {
            if sigma.len_of(dim).unwrap_or(1) > 1 {
                handle(
                    policy.missing,
                    InterpolationIssue::Missing {
                        dimension: dim.to_string(),
                        detail: "not in the thermophysical profile".into(),
                    },
                )?;
            }
            return sigma.isel(dim, 0);
        }
        return Ok(sigma);
    };

    if !in_dataset {
        let issue = if ds.has_variable(dim) {
            InterpolationIssue::Scalar {
                dimension: dim.to_string(),
            }
        } else {
            InterpolationIssue::Missing {
                dimension: dim.to_string(),
                detail: format!("not in dataset '{}'", ds.path()),
            }
        };
        handle(policy.action_for(&issue), issue)?;
        return Ok(sigma);
    }

    let coords = ds.values(dim)?;
    if coords.len() == 1 {
        handle(
            policy.scalar,
            InterpolationIssue::Scalar {
                dimension: dim.to_string(),
            },
        )?;
        return sigma.isel(dim, 0);
    }

    let brackets: Vec<Bracket> = target.iter().map(|v| bracket(&coords, *v)).collect();
    if brackets.iter().any(Bracket::is_out_of_bounds) {
        handle(policy.bounds, out_of_bounds(dim, target, &coords))?;
    }
    let along = if sigma.has_dim(Z) {
        InterpTarget::Along(Z)
    } else {
        InterpTarget::Replace(Z)
    };
    sigma.interp(dim, &brackets, policy.fill_value, along)
}
