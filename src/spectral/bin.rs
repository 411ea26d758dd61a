//! # Spectral bins and bin sets
//!
//! A [`Bin`] is a wavelength interval `[wmin, wmax)` carrying the quadrature
//! rule used to integrate over the cumulative probability `g` inside the bin.
//! A [`BinSet`] is an ordered collection of bins, built either from regular
//! ranges, explicit bounds, a spectral response function or CKD absorption
//! datasets.
//!
//! ## Example
//!
//! ```rust
//! use ckdkit::quad::Quad;
//! use ckdkit::spectral::bin::BinSet;
//!
//! let bins = BinSet::arange(400.0, 420.0, 10.0, Quad::default()).unwrap();
//! assert_eq!(bins.len(), 2);
//! assert_eq!(bins.wcenters(), vec![405.0, 415.0]);
//! ```

use std::fmt;

use crate::absorption::schema;
use crate::ckdkit_errors::CkdkitError;
use crate::constants::{
    Nanometer, DEFAULT_BIN_WIDTH, SPECTRAL_RANGE_MAX, SPECTRAL_RANGE_MIN, STEP_RTOL,
};
use crate::netcdf::Dataset;
use crate::quad::Quad;
use crate::spectral::grid::select_bins;
use crate::spectral::index::SpectralIndex;
use crate::spectral::quad_policy::QuadSizingPolicy;
use crate::spectral::response::SpectralResponse;

/// A spectral bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    wmin: Nanometer,
    wmax: Nanometer,
    quad: Quad,
}

impl Bin {
    /// Arguments
    /// -----------------
    /// * `wmin`, `wmax`: bin bounds in nm, `0 <= wmin < wmax`.
    /// * `quad`: quadrature rule over `g`.
    pub fn new(wmin: Nanometer, wmax: Nanometer, quad: Quad) -> Result<Self, CkdkitError> {
        if !(wmin >= 0.0 && wmin < wmax && wmax.is_finite()) {
            return Err(CkdkitError::InvalidArgument(format!(
                "bin bounds must satisfy 0 <= wmin < wmax, got [{wmin}, {wmax}]"
            )));
        }
        Ok(Bin { wmin, wmax, quad })
    }

    /// Bin with the default two-point Gauss-Legendre rule.
    pub fn from_bounds(wmin: Nanometer, wmax: Nanometer) -> Result<Self, CkdkitError> {
        Self::new(wmin, wmax, Quad::default())
    }

    pub fn wmin(&self) -> Nanometer {
        self.wmin
    }

    pub fn wmax(&self) -> Nanometer {
        self.wmax
    }

    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    pub fn width(&self) -> Nanometer {
        self.wmax - self.wmin
    }

    pub fn wcenter(&self) -> Nanometer {
        0.5 * (self.wmin + self.wmax)
    }

    /// Whether `w` lies in `[wmin, wmax)`.
    pub fn contains(&self, w: Nanometer) -> bool {
        w >= self.wmin && w < self.wmax
    }

    pub fn pretty_repr(&self) -> String {
        format!("[{}, {}] nm ({})", self.wmin, self.wmax, self.quad.pretty_repr())
    }

    /// One CKD spectral index per quadrature node, with `g` mapped to [0, 1].
    pub fn spectral_indices(&self) -> impl Iterator<Item = SpectralIndex> + '_ {
        let w = self.wcenter();
        self.quad
            .eval_nodes(Some((0.0, 1.0)))
            .into_iter()
            .map(move |g| SpectralIndex::Ckd { w, g })
    }
}

impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_repr())
    }
}

/// Number of `step`-wide intervals needed to cover `[start, stop]`.
pub(crate) fn step_count(start: f64, stop: f64, step: f64) -> Result<usize, CkdkitError> {
    if !(step > 0.0) || !(start < stop) || !start.is_finite() || !stop.is_finite() {
        return Err(CkdkitError::InvalidArgument(format!(
            "invalid range: start = {start}, stop = {stop}, step = {step}"
        )));
    }
    let ratio = (stop - start) / step;
    Ok((ratio - ratio.abs() * STEP_RTOL).ceil().max(1.0) as usize)
}

/// An ordered collection of bins.
#[derive(Debug, Clone, PartialEq)]
pub struct BinSet {
    bins: Vec<Bin>,
}

impl BinSet {
    pub fn new(bins: Vec<Bin>) -> Self {
        BinSet { bins }
    }

    /// Contiguous bins of width `step` starting at `start`, covering `[start, stop]`.
    ///
    /// Arguments
    /// -----------------
    /// * `start`: lower bound of the first bin (nm).
    /// * `stop`: upper bound of the covered range (nm).
    /// * `step`: bin width (nm).
    /// * `quad`: quadrature rule attached to every bin.
    ///
    /// Return
    /// ----------
    /// * `ceil((stop - start) / step)` bins, or an error for an empty or
    ///   ill-defined range.
    pub fn arange(
        start: Nanometer,
        stop: Nanometer,
        step: Nanometer,
        quad: Quad,
    ) -> Result<Self, CkdkitError> {
        let n = step_count(start, stop, step)?;
        let bins = (0..n)
            .map(|i| {
                let wmin = start + i as f64 * step;
                Bin::new(wmin, wmin + step, quad.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BinSet { bins })
    }

    pub fn from_wavelength_bounds(
        wmins: &[Nanometer],
        wmaxs: &[Nanometer],
        quad: Quad,
    ) -> Result<Self, CkdkitError> {
        if wmins.len() != wmaxs.len() {
            return Err(CkdkitError::InvalidArgument(format!(
                "{} lower bounds for {} upper bounds",
                wmins.len(),
                wmaxs.len()
            )));
        }
        let bins = wmins
            .iter()
            .zip(wmaxs)
            .map(|(wmin, wmax)| Bin::new(*wmin, *wmax, quad.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BinSet { bins })
    }

    /// Regular bins covering the support of `srf`, keeping only those where the
    /// response is nonzero.
    ///
    /// The covering range is snapped outward to multiples of `step`.
    pub fn from_srf(
        srf: &SpectralResponse,
        step: Nanometer,
        quad: Quad,
    ) -> Result<Self, CkdkitError> {
        let (wmin, wmax) = srf.support();
        if !(step > 0.0) {
            return Err(CkdkitError::InvalidArgument(format!(
                "bin width must be strictly positive, got {step}"
            )));
        }
        let start = (wmin / step).floor() * step;
        let mut stop = (wmax / step).ceil() * step;
        if stop <= start {
            stop = start + step;
        }
        let all = Self::arange(start, stop, step, quad)?;
        let wmins: Vec<f64> = all.bins.iter().map(Bin::wmin).collect();
        let wmaxs: Vec<f64> = all.bins.iter().map(Bin::wmax).collect();
        let selected = select_bins(&wmins, &wmaxs, srf);
        Ok(BinSet {
            bins: selected.into_iter().map(|i| all.bins[i].clone()).collect(),
        })
    }

    /// Bins of a CKD absorption dataset with quadrature rules sized by `policy`.
    ///
    /// Bins are sorted by ascending wavelength, whatever the dataset's
    /// spectral coordinate.
    pub fn from_absorption_dataset(
        ds: &Dataset,
        policy: &QuadSizingPolicy,
    ) -> Result<Self, CkdkitError> {
        let mut bins = dataset_bins(ds, policy)?;
        bins.sort_by(|a, b| a.wmin.total_cmp(&b.wmin));
        Ok(BinSet { bins })
    }

    /// Bins of several CKD absorption datasets, merged and sorted.
    pub fn from_absorption_datasets<'a>(
        datasets: impl IntoIterator<Item = &'a Dataset>,
        policy: &QuadSizingPolicy,
    ) -> Result<Self, CkdkitError> {
        let mut bins = Vec::new();
        for ds in datasets {
            bins.extend(dataset_bins(ds, policy)?);
        }
        bins.sort_by(|a, b| a.wmin.total_cmp(&b.wmin));
        Ok(BinSet { bins })
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn wmins(&self) -> Vec<Nanometer> {
        self.bins.iter().map(Bin::wmin).collect()
    }

    pub fn wmaxs(&self) -> Vec<Nanometer> {
        self.bins.iter().map(Bin::wmax).collect()
    }

    pub fn wcenters(&self) -> Vec<Nanometer> {
        self.bins.iter().map(Bin::wcenter).collect()
    }

    /// Spectral indices of every node of every bin, bin by bin.
    pub fn spectral_indices(&self) -> impl Iterator<Item = SpectralIndex> + '_ {
        self.bins.iter().flat_map(Bin::spectral_indices)
    }
}

impl Default for BinSet {
    /// 10 nm bins over the default spectral range, two-point Gauss-Legendre rules.
    fn default() -> Self {
        let n = ((SPECTRAL_RANGE_MAX - SPECTRAL_RANGE_MIN) / DEFAULT_BIN_WIDTH).round() as usize;
        let bins = (0..n)
            .map(|i| {
                let wmin = SPECTRAL_RANGE_MIN + i as f64 * DEFAULT_BIN_WIDTH;
                Bin {
                    wmin,
                    wmax: wmin + DEFAULT_BIN_WIDTH,
                    quad: Quad::default(),
                }
            })
            .collect();
        BinSet { bins }
    }
}

impl<'a> IntoIterator for &'a BinSet {
    type Item = &'a Bin;
    type IntoIter = std::slice::Iter<'a, Bin>;

    fn into_iter(self) -> Self::IntoIter {
        self.bins.iter()
    }
}

fn dataset_bins(ds: &Dataset, policy: &QuadSizingPolicy) -> Result<Vec<Bin>, CkdkitError> {
    schema::check_ckd(ds)?;
    let bounds = schema::bin_bounds_nm(ds)?;
    let kind = schema::error_table_kind(ds)?;
    let tables = if policy.requires_error_table() {
        Some(schema::error_tables(ds)?.ok_or_else(|| {
            CkdkitError::SchemaMismatch(format!(
                "{}: no quadrature error table, required by {policy:?}",
                ds.path()
            ))
        })?)
    } else {
        None
    };
    bounds
        .into_iter()
        .enumerate()
        .map(|(i, (wmin, wmax))| {
            let table = tables.as_ref().and_then(|t| t.for_bin(i));
            Bin::new(wmin, wmax, policy.make_quad(table, kind)?)
        })
        .collect()
}
