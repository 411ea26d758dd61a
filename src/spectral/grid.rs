//! # Spectral grids
//!
//! A spectral grid is the set of spectral points a computation iterates over.
//!
//! * [`MonoGrid`]: sorted, unique wavelengths (monochromatic mode).
//! * [`CkdGrid`]: contiguous bins described by parallel `wmins` / `wmaxs` /
//!   `wcenters` arrays (correlated-k mode).
//! * [`SpectralGrid`]: either of the above, dispatched on the spectral mode.
//!
//! ## Construction
//!
//! CKD grids built from independently generated datasets may have adjacent
//! bounds that disagree by a rounding error. [`CkdGrid::new`] reconciles them
//! according to a [`FixBounds`] policy when the mismatch does not exceed
//! `epsilon`, and fails with [`CkdkitError::BinBoundMismatch`] otherwise.
//!
//! ## Selection
//!
//! [`SpectralGrid::select`] narrows a grid down to the points where a
//! [`SpectralResponse`] is relevant:
//!
//! | response | mono                        | ckd                                        |
//! |----------|-----------------------------|--------------------------------------------|
//! | delta    | delta wavelengths           | bins containing a delta, `wmin < w <= wmax` |
//! | uniform  | `wmin <= w <= wmax`         | bins intersecting `[wmin, wmax]`           |
//! | band     | `srf(w) > 0`                | bins where the cumulative integral changes |
//!
//! A delta wavelength on a boundary shared by two bins selects the lower bin;
//! the lower end of the first bin is closed; a delta outside every bin
//! selects nothing.
//!
//! ## Traversal
//!
//! [`SpectralGrid::walk_indices`] enumerates the [`SpectralIndex`] values of a
//! grid. In CKD mode each bin contributes one index per quadrature node, the
//! quadrature rule being sized by a [`QuadSizingPolicy`] (which needs the
//! error tables of an [`AbsorptionDatabase`] unless it is fixed).

use itertools::Itertools;
use log::debug;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::absorption::AbsorptionDatabase;
use crate::ckdkit_errors::CkdkitError;
use crate::constants::{
    Nanometer, DEFAULT_BIN_WIDTH, DEFAULT_MONO_STEP, SPECTRAL_RANGE_MAX, SPECTRAL_RANGE_MIN,
};
use crate::quad::{Quad, QuadType};
use crate::spectral::bin::{step_count, Bin, BinSet};
use crate::spectral::index::{SpectralIndex, SpectralMode};
use crate::spectral::quad_policy::QuadSizingPolicy;
use crate::spectral::response::SpectralResponse;

/// How to resolve a small mismatch between the upper bound of a bin and the
/// lower bound of the next one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixBounds {
    /// Any mismatch is an error.
    Raise,
    /// The upper bound of bin `i` takes the lower bound of bin `i + 1`.
    #[default]
    KeepMin,
    /// The lower bound of bin `i + 1` takes the upper bound of bin `i`.
    KeepMax,
}

// -------------------------------------------------------------------------------------------------
// Selection helpers
// -------------------------------------------------------------------------------------------------

/// Indices of the bins `[wmins[i], wmaxs[i]]` selected by `srf`.
///
/// Bins must be sorted by ascending `wmin` and must not overlap.
pub(crate) fn select_bins(
    wmins: &[Nanometer],
    wmaxs: &[Nanometer],
    srf: &SpectralResponse,
) -> Vec<usize> {
    match srf {
        SpectralResponse::Delta(delta) => delta
            .wavelengths()
            .iter()
            .filter_map(|w| {
                // First bin whose upper bound reaches w
                let i = wmaxs.partition_point(|wmax| wmax < w);
                (i < wmaxs.len() && *w >= wmins[i]).then_some(i)
            })
            .dedup()
            .collect(),
        SpectralResponse::Uniform(uniform) => (0..wmins.len())
            .filter(|i| wmaxs[*i] > uniform.wmin() && wmins[*i] < uniform.wmax())
            .collect(),
        SpectralResponse::Band(band) => {
            let lower = band.cumulative_at(wmins);
            let upper = band.cumulative_at(wmaxs);
            (0..wmins.len()).filter(|i| upper[*i] != lower[*i]).collect()
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Monochromatic grid
// -------------------------------------------------------------------------------------------------

/// Sorted unique wavelengths.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoGrid {
    wavelengths: Vec<Nanometer>,
}

impl MonoGrid {
    /// Sort and deduplicate `wavelengths`, which must be strictly positive.
    pub fn new(wavelengths: &[Nanometer]) -> Result<Self, CkdkitError> {
        if let Some(w) = wavelengths.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(CkdkitError::InvalidArgument(format!(
                "grid wavelengths must be strictly positive, got {w}"
            )));
        }
        let wavelengths = wavelengths
            .iter()
            .copied()
            .sorted_by(f64::total_cmp)
            .dedup()
            .collect();
        Ok(MonoGrid { wavelengths })
    }

    /// Wavelengths of the database's spectral coverage.
    pub fn from_absorption_database(db: &AbsorptionDatabase) -> Result<Self, CkdkitError> {
        check_mode(db, SpectralMode::Mono)?;
        let wavelengths: Vec<f64> = db
            .spectral_coverage()
            .rows()
            .iter()
            .map(|row| row.wavelength)
            .collect();
        Self::new(&wavelengths)
    }

    pub fn wavelengths(&self) -> &[Nanometer] {
        &self.wavelengths
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    pub fn select(&self, srf: &SpectralResponse) -> MonoGrid {
        let wavelengths = match srf {
            SpectralResponse::Delta(delta) => delta.wavelengths().to_vec(),
            SpectralResponse::Uniform(uniform) => self
                .wavelengths
                .iter()
                .copied()
                .filter(|w| *w >= uniform.wmin() && *w <= uniform.wmax())
                .collect(),
            SpectralResponse::Band(_) => {
                let (lo, hi) = srf.support();
                self.wavelengths
                    .iter()
                    .copied()
                    .filter(|w| *w >= lo && *w <= hi)
                    .collect()
            }
        };
        MonoGrid { wavelengths }
    }

    /// Union of both grids.
    pub fn merge(&self, other: &MonoGrid) -> MonoGrid {
        let wavelengths = self
            .wavelengths
            .iter()
            .merge_by(other.wavelengths.iter(), |a, b| a <= b)
            .copied()
            .dedup()
            .collect();
        MonoGrid { wavelengths }
    }

    pub fn walk_indices(&self) -> impl Iterator<Item = SpectralIndex> + '_ {
        self.wavelengths.iter().map(|w| SpectralIndex::Mono { w: *w })
    }
}

impl Default for MonoGrid {
    /// Every nanometer of the default spectral range, both ends included.
    fn default() -> Self {
        let n =
            ((SPECTRAL_RANGE_MAX - SPECTRAL_RANGE_MIN) / DEFAULT_MONO_STEP).round() as usize + 1;
        MonoGrid {
            wavelengths: (0..n)
                .map(|i| SPECTRAL_RANGE_MIN + i as f64 * DEFAULT_MONO_STEP)
                .collect(),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// CKD grid
// -------------------------------------------------------------------------------------------------

/// Contiguous spectral bins.
#[derive(Debug, Clone, PartialEq)]
pub struct CkdGrid {
    wmins: Vec<Nanometer>,
    wmaxs: Vec<Nanometer>,
    wcenters: Vec<Nanometer>,
}

impl CkdGrid {
    /// Build a CKD grid from bin bounds, reconciling adjacent bounds.
    ///
    /// Arguments
    /// -----------------
    /// * `wmins`, `wmaxs`: lower and upper bin bounds (nm), `wmins[i] < wmaxs[i]`.
    /// * `wcenters`: bin centres; defaults to the midpoints of the reconciled
    ///   bounds. Explicit centres are kept as given.
    /// * `fix`: how to resolve a mismatch between adjacent bounds.
    /// * `epsilon`: largest mismatch that can be resolved (nm).
    ///
    /// Return
    /// ----------
    /// * The grid, with bins sorted by ascending lower bound and
    ///   `wmaxs[i] == wmins[i + 1]` for every adjacent pair.
    ///
    /// Errors
    /// ----------
    /// * [`CkdkitError::InvalidArgument`] for mismatched lengths or empty bins,
    /// * [`CkdkitError::BinBoundMismatch`] when a mismatch exceeds `epsilon`, or
    ///   is nonzero with [`FixBounds::Raise`].
    pub fn new(
        wmins: &[Nanometer],
        wmaxs: &[Nanometer],
        wcenters: Option<&[Nanometer]>,
        fix: FixBounds,
        epsilon: Nanometer,
    ) -> Result<Self, CkdkitError> {
        if wmins.len() != wmaxs.len() || wcenters.is_some_and(|c| c.len() != wmins.len()) {
            return Err(CkdkitError::InvalidArgument(format!(
                "bin bounds and centres must have the same length \
                 ({} lower bounds, {} upper bounds)",
                wmins.len(),
                wmaxs.len()
            )));
        }
        if let Some(i) = (0..wmins.len()).find(|i| !(wmins[*i] < wmaxs[*i])) {
            return Err(CkdkitError::InvalidArgument(format!(
                "bin {i} is empty: [{}, {}]",
                wmins[i], wmaxs[i]
            )));
        }

        let order: Vec<usize> = (0..wmins.len())
            .sorted_by(|a, b| wmins[*a].total_cmp(&wmins[*b]))
            .collect();
        let mut lo: Vec<f64> = order.iter().map(|i| wmins[*i]).collect();
        let mut hi: Vec<f64> = order.iter().map(|i| wmaxs[*i]).collect();

        for i in 0..lo.len().saturating_sub(1) {
            let delta = lo[i + 1] - hi[i];
            if delta == 0.0 {
                continue;
            }
            if delta.abs() > epsilon || fix == FixBounds::Raise {
                return Err(CkdkitError::BinBoundMismatch {
                    index: i,
                    upper: hi[i],
                    lower: lo[i + 1],
                    epsilon,
                });
            }
            match fix {
                FixBounds::KeepMin => hi[i] = lo[i + 1],
                FixBounds::KeepMax => lo[i + 1] = hi[i],
                FixBounds::Raise => {}
            }
        }

        let wcenters = match wcenters {
            Some(centers) => order.iter().map(|i| centers[*i]).collect(),
            None => lo.iter().zip(&hi).map(|(a, b)| 0.5 * (a + b)).collect(),
        };
        Ok(CkdGrid {
            wmins: lo,
            wmaxs: hi,
            wcenters,
        })
    }

    /// Grid with exact bounds and midpoint centres.
    pub fn from_bounds(wmins: &[Nanometer], wmaxs: &[Nanometer]) -> Result<Self, CkdkitError> {
        Self::new(wmins, wmaxs, None, FixBounds::Raise, 0.0)
    }

    /// Bins of width `step` centred on `start + k step`, up to and including `stop`.
    ///
    /// `stop` is padded by a tenth of a step so that a centre landing on it is kept.
    pub fn arange(start: Nanometer, stop: Nanometer, step: Nanometer) -> Result<Self, CkdkitError> {
        let n = step_count(start, stop + 0.1 * step, step)?;
        Ok(Self::centred(start, step, n))
    }

    fn centred(start: Nanometer, step: Nanometer, n: usize) -> Self {
        let wcenters: Vec<f64> = (0..n).map(|k| start + k as f64 * step).collect();
        CkdGrid {
            wmins: wcenters.iter().map(|c| c - 0.5 * step).collect(),
            wmaxs: wcenters.iter().map(|c| c + 0.5 * step).collect(),
            wcenters,
        }
    }

    /// Bins bounded by consecutive entries of `nodes`.
    pub fn from_nodes(nodes: &[Nanometer]) -> Result<Self, CkdkitError> {
        if nodes.len() < 2 {
            return Err(CkdkitError::InvalidArgument(format!(
                "at least two nodes are needed to define a bin, got {}",
                nodes.len()
            )));
        }
        let nodes: Vec<f64> = nodes.iter().copied().sorted_by(f64::total_cmp).collect();
        let (wmins, wmaxs): (Vec<f64>, Vec<f64>) =
            nodes.iter().tuple_windows().map(|(a, b)| (*a, *b)).unzip();
        Self::from_bounds(&wmins, &wmaxs)
    }

    pub fn from_bin_set(
        bins: &BinSet,
        fix: FixBounds,
        epsilon: Nanometer,
    ) -> Result<Self, CkdkitError> {
        Self::new(&bins.wmins(), &bins.wmaxs(), None, fix, epsilon)
    }

    /// Bins of the database's spectral coverage, centred on the dataset
    /// spectral coordinates.
    pub fn from_absorption_database(
        db: &AbsorptionDatabase,
        fix: FixBounds,
        epsilon: Nanometer,
    ) -> Result<Self, CkdkitError> {
        check_mode(db, SpectralMode::Ckd)?;
        let rows = db.spectral_coverage().rows();
        let mut wmins = Vec::with_capacity(rows.len());
        let mut wmaxs = Vec::with_capacity(rows.len());
        let mut wcenters = Vec::with_capacity(rows.len());
        for row in rows {
            match (row.wbound_lower, row.wbound_upper) {
                (Some(lower), Some(upper)) => {
                    wmins.push(lower);
                    wmaxs.push(upper);
                    wcenters.push(row.wavelength);
                }
                _ => {
                    return Err(CkdkitError::SchemaMismatch(format!(
                        "spectral coverage of '{}' has no bin bounds at {} nm",
                        row.filename, row.wavelength
                    )))
                }
            }
        }
        Self::new(&wmins, &wmaxs, Some(&wcenters), fix, epsilon)
    }

    pub fn wmins(&self) -> &[Nanometer] {
        &self.wmins
    }

    pub fn wmaxs(&self) -> &[Nanometer] {
        &self.wmaxs
    }

    pub fn wcenters(&self) -> &[Nanometer] {
        &self.wcenters
    }

    pub fn len(&self) -> usize {
        self.wmins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wmins.is_empty()
    }

    fn subset(&self, indices: &[usize]) -> CkdGrid {
        CkdGrid {
            wmins: indices.iter().map(|i| self.wmins[*i]).collect(),
            wmaxs: indices.iter().map(|i| self.wmaxs[*i]).collect(),
            wcenters: indices.iter().map(|i| self.wcenters[*i]).collect(),
        }
    }

    pub fn select(&self, srf: &SpectralResponse) -> CkdGrid {
        self.subset(&select_bins(&self.wmins, &self.wmaxs, srf))
    }

    /// Union of the bins of both grids, duplicates removed.
    ///
    /// The result may have gaps but its bins must not overlap.
    pub fn merge(&self, other: &CkdGrid) -> Result<CkdGrid, CkdkitError> {
        let bins: Vec<(f64, f64, f64)> = self
            .bins()
            .chain(other.bins())
            .sorted_by_key(|(lo, hi, c)| (OrderedFloat(*lo), OrderedFloat(*hi), OrderedFloat(*c)))
            .dedup()
            .collect();
        let overlap = bins.iter().tuple_windows().find(|(a, b)| b.0 < a.1);
        if let Some(((_, hi, _), (lo, _, _))) = overlap {
            return Err(CkdkitError::InvalidArgument(format!(
                "cannot merge overlapping bins: \
                 bin ending at {hi} nm overlaps bin starting at {lo} nm"
            )));
        }
        Ok(CkdGrid {
            wmins: bins.iter().map(|b| b.0).collect(),
            wmaxs: bins.iter().map(|b| b.1).collect(),
            wcenters: bins.iter().map(|b| b.2).collect(),
        })
    }

    fn bins(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.wmins
            .iter()
            .zip(&self.wmaxs)
            .zip(&self.wcenters)
            .map(|((lo, hi), c)| (*lo, *hi, *c))
    }

    /// Quadrature rule of each bin.
    ///
    /// Fixed policies need no database. Other policies look up the error
    /// table of the dataset covering each bin centre.
    pub fn bin_quads(
        &self,
        policy: &QuadSizingPolicy,
        db: Option<&mut AbsorptionDatabase>,
    ) -> Result<Vec<Quad>, CkdkitError> {
        if !policy.requires_error_table() {
            let quad = policy.make_quad(None, QuadType::GaussLegendre)?;
            return Ok(vec![quad; self.len()]);
        }
        let db = db.ok_or_else(|| {
            CkdkitError::InvalidArgument(format!(
                "quadrature policy {policy:?} requires an absorption database"
            ))
        })?;
        self.wcenters
            .iter()
            .map(|wcenter| {
                let (table, kind) = db.error_table(*wcenter)?;
                policy.make_quad(Some(&table), kind)
            })
            .collect()
    }

    /// Bins of the grid with their quadrature rules.
    pub fn bin_set(
        &self,
        policy: &QuadSizingPolicy,
        db: Option<&mut AbsorptionDatabase>,
    ) -> Result<BinSet, CkdkitError> {
        let quads = self.bin_quads(policy, db)?;
        let bins = self
            .bins()
            .zip(quads)
            .map(|((lo, hi, _), quad)| Bin::new(lo, hi, quad))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BinSet::new(bins))
    }

    /// Spectral indices of the grid: one per quadrature node of each bin.
    ///
    /// Indices are keyed on the grid's bin centres, which may differ from the
    /// bin midpoints when the grid comes from a database.
    pub fn walk_indices(
        &self,
        policy: &QuadSizingPolicy,
        db: Option<&mut AbsorptionDatabase>,
    ) -> Result<Vec<SpectralIndex>, CkdkitError> {
        let quads = self.bin_quads(policy, db)?;
        let indices: Vec<SpectralIndex> = self
            .wcenters
            .iter()
            .zip(&quads)
            .flat_map(|(w, quad)| {
                quad.eval_nodes(Some((0.0, 1.0)))
                    .into_iter()
                    .map(move |g| SpectralIndex::Ckd { w: *w, g })
            })
            .collect();
        debug!("Walked {} bins, {} spectral indices", self.len(), indices.len());
        Ok(indices)
    }
}

impl Default for CkdGrid {
    /// 10 nm bins centred on 280, 290, ..., 2400 nm.
    fn default() -> Self {
        let n =
            ((SPECTRAL_RANGE_MAX - SPECTRAL_RANGE_MIN) / DEFAULT_BIN_WIDTH).round() as usize + 1;
        Self::centred(SPECTRAL_RANGE_MIN, DEFAULT_BIN_WIDTH, n)
    }
}

// -------------------------------------------------------------------------------------------------
// Mode dispatch
// -------------------------------------------------------------------------------------------------

fn check_mode(db: &AbsorptionDatabase, expected: SpectralMode) -> Result<(), CkdkitError> {
    if db.mode() == expected {
        Ok(())
    } else {
        Err(CkdkitError::SpectralModeMismatch {
            expected: expected.to_string(),
            actual: db.mode().to_string(),
        })
    }
}

/// A spectral grid in either mode.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralGrid {
    Mono(MonoGrid),
    Ckd(CkdGrid),
}

impl SpectralGrid {
    /// Default grid of a mode, see [`MonoGrid::default`] and [`CkdGrid::default`].
    pub fn default_for(mode: SpectralMode) -> Self {
        match mode {
            SpectralMode::Mono => SpectralGrid::Mono(MonoGrid::default()),
            SpectralMode::Ckd => SpectralGrid::Ckd(CkdGrid::default()),
        }
    }

    pub fn from_bin_set(
        bins: &BinSet,
        fix: FixBounds,
        epsilon: Nanometer,
    ) -> Result<Self, CkdkitError> {
        Ok(SpectralGrid::Ckd(CkdGrid::from_bin_set(bins, fix, epsilon)?))
    }

    /// Grid covering the database, in the database's spectral mode.
    pub fn from_absorption_database(
        db: &AbsorptionDatabase,
        fix: FixBounds,
        epsilon: Nanometer,
    ) -> Result<Self, CkdkitError> {
        Ok(match db.mode() {
            SpectralMode::Mono => SpectralGrid::Mono(MonoGrid::from_absorption_database(db)?),
            SpectralMode::Ckd => {
                SpectralGrid::Ckd(CkdGrid::from_absorption_database(db, fix, epsilon)?)
            }
        })
    }

    pub fn mode(&self) -> SpectralMode {
        match self {
            SpectralGrid::Mono(_) => SpectralMode::Mono,
            SpectralGrid::Ckd(_) => SpectralMode::Ckd,
        }
    }

    /// Number of wavelengths (mono) or bins (ckd).
    pub fn len(&self) -> usize {
        match self {
            SpectralGrid::Mono(grid) => grid.len(),
            SpectralGrid::Ckd(grid) => grid.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wavelengths (mono) or bin centres (ckd).
    pub fn wavelengths(&self) -> &[Nanometer] {
        match self {
            SpectralGrid::Mono(grid) => grid.wavelengths(),
            SpectralGrid::Ckd(grid) => grid.wcenters(),
        }
    }

    pub fn select(&self, srf: &SpectralResponse) -> SpectralGrid {
        match self {
            SpectralGrid::Mono(grid) => SpectralGrid::Mono(grid.select(srf)),
            SpectralGrid::Ckd(grid) => SpectralGrid::Ckd(grid.select(srf)),
        }
    }

    pub fn merge(&self, other: &SpectralGrid) -> Result<SpectralGrid, CkdkitError> {
        match (self, other) {
            (SpectralGrid::Mono(a), SpectralGrid::Mono(b)) => Ok(SpectralGrid::Mono(a.merge(b))),
            (SpectralGrid::Ckd(a), SpectralGrid::Ckd(b)) => Ok(SpectralGrid::Ckd(a.merge(b)?)),
            (a, b) => Err(CkdkitError::SpectralModeMismatch {
                expected: a.mode().to_string(),
                actual: b.mode().to_string(),
            }),
        }
    }

    /// Spectral indices of the grid. The policy and database are only used in
    /// CKD mode.
    pub fn walk_indices(
        &self,
        policy: &QuadSizingPolicy,
        db: Option<&mut AbsorptionDatabase>,
    ) -> Result<Vec<SpectralIndex>, CkdkitError> {
        match self {
            SpectralGrid::Mono(grid) => Ok(grid.walk_indices().collect()),
            SpectralGrid::Ckd(grid) => grid.walk_indices(policy, db),
        }
    }
}

impl From<MonoGrid> for SpectralGrid {
    fn from(grid: MonoGrid) -> Self {
        SpectralGrid::Mono(grid)
    }
}

impl From<CkdGrid> for SpectralGrid {
    fn from(grid: CkdGrid) -> Self {
        SpectralGrid::Ckd(grid)
    }
}

#[cfg(test)]
mod test_grid {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reconcile_keep_min() {
        let grid = CkdGrid::new(
            &[400.0, 410.0],
            &[409.999999998, 420.0],
            None,
            FixBounds::KeepMin,
            1e-6,
        )
        .unwrap();
        assert_eq!(grid.wmaxs()[0], 410.0);
        assert_eq!(grid.wmins()[1], 410.0);
        assert_relative_eq!(grid.wcenters()[0], 405.0);
    }

    #[test]
    fn test_reconcile_keep_max() {
        let grid = CkdGrid::new(
            &[400.0, 410.000000001],
            &[410.0, 420.0],
            None,
            FixBounds::KeepMax,
            1e-6,
        )
        .unwrap();
        assert_eq!(grid.wmins()[1], 410.0);
        assert_eq!(grid.wmaxs()[0], 410.0);
    }

    #[test]
    fn test_reconcile_errors() {
        let result =
            CkdGrid::new(&[400.0, 410.0], &[409.99, 420.0], None, FixBounds::KeepMin, 1e-6);
        assert!(matches!(
            result,
            Err(CkdkitError::BinBoundMismatch { index: 0, .. })
        ));

        let result = CkdGrid::new(
            &[400.0, 410.0],
            &[409.999999998, 420.0],
            None,
            FixBounds::Raise,
            1e-6,
        );
        assert!(matches!(result, Err(CkdkitError::BinBoundMismatch { .. })));

        // Overlaps count as mismatches too
        let result = CkdGrid::new(&[400.0, 409.0], &[410.0, 420.0], None, FixBounds::KeepMin, 1e-6);
        assert!(matches!(result, Err(CkdkitError::BinBoundMismatch { .. })));

        assert!(CkdGrid::new(&[400.0], &[400.0], None, FixBounds::KeepMin, 1e-6).is_err());
        assert!(CkdGrid::new(&[400.0], &[410.0, 420.0], None, FixBounds::KeepMin, 1e-6).is_err());
    }

    #[test]
    fn test_explicit_centres_and_sorting() {
        let grid = CkdGrid::new(
            &[410.0, 400.0],
            &[420.0, 410.0],
            Some(&[414.0, 404.0]),
            FixBounds::KeepMin,
            1e-6,
        )
        .unwrap();
        assert_eq!(grid.wmins(), &[400.0, 410.0]);
        assert_eq!(grid.wcenters(), &[404.0, 414.0]);
    }

    #[test]
    fn test_arange_and_default() {
        let grid = CkdGrid::arange(500.0, 610.0, 10.0).unwrap();
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.wcenters()[0], 500.0);
        assert_eq!(grid.wmins()[0], 495.0);
        assert_eq!(grid.wcenters()[11], 610.0);
        assert_eq!(grid.wmaxs()[11], 615.0);

        // Off-lattice stop is not reached
        let grid = CkdGrid::arange(500.0, 615.0, 10.0).unwrap();
        assert_eq!(grid.wcenters().last(), Some(&610.0));

        // Degenerate range yields a single bin
        let grid = CkdGrid::arange(550.0, 550.0, 10.0).unwrap();
        assert_eq!(grid.wcenters(), &[550.0]);
        assert!(CkdGrid::arange(560.0, 550.0, 10.0).is_err());

        let grid = CkdGrid::default();
        assert_eq!(grid.len(), 213);
        assert_eq!(grid.wcenters()[0], 280.0);
        assert_eq!(grid.wcenters()[212], 2400.0);

        let grid = MonoGrid::default();
        assert_eq!(grid.len(), 2121);
        assert_eq!(grid.wavelengths()[2120], 2400.0);
    }

    #[test]
    fn test_from_nodes() {
        let grid = CkdGrid::from_nodes(&[400.0, 420.0, 410.0]).unwrap();
        assert_eq!(grid.wmins(), &[400.0, 410.0]);
        assert_eq!(grid.wmaxs(), &[410.0, 420.0]);
        assert!(CkdGrid::from_nodes(&[400.0]).is_err());
    }

    #[test]
    fn test_select_delta() {
        let grid = CkdGrid::arange(500.0, 610.0, 10.0).unwrap();

        let srf = SpectralResponse::delta(&[550.0, 552.0]).unwrap();
        assert_eq!(grid.select(&srf).wcenters(), &[550.0]);

        // Shared boundary selects the lower bin
        let srf = SpectralResponse::delta(&[555.0]).unwrap();
        assert_eq!(grid.select(&srf).wcenters(), &[550.0]);

        // Lower end of the first bin is closed
        let srf = SpectralResponse::delta(&[495.0]).unwrap();
        assert_eq!(grid.select(&srf).wcenters(), &[500.0]);

        // Outside coverage selects nothing
        let srf = SpectralResponse::delta(&[400.0, 700.0]).unwrap();
        assert!(grid.select(&srf).is_empty());

        let mono = MonoGrid::new(&[500.0, 510.0]).unwrap();
        let srf = SpectralResponse::delta(&[550.0]).unwrap();
        assert_eq!(mono.select(&srf).wavelengths(), &[550.0]);
    }

    #[test]
    fn test_select_uniform() {
        let grid = CkdGrid::arange(500.0, 610.0, 10.0).unwrap();
        let srf = SpectralResponse::uniform(505.0, 595.0, 1.0).unwrap();
        let selected = grid.select(&srf);
        let expected: Vec<f64> = (1..=9).map(|k| 500.0 + 10.0 * k as f64).collect();
        assert_eq!(selected.wcenters(), expected.as_slice());

        let mono = MonoGrid::new(&[500.0, 505.0, 550.0, 600.0]).unwrap();
        assert_eq!(mono.select(&srf).wavelengths(), &[505.0, 550.0]);
    }

    #[test]
    fn test_select_band() {
        let grid = CkdGrid::arange(500.0, 610.0, 10.0).unwrap();
        let srf = SpectralResponse::band(
            vec![500.0, 515.0, 525.0, 535.0, 545.0, 555.0, 565.0, 575.0, 585.0, 595.0],
            vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0, 0.5, 0.0],
        )
        .unwrap();
        let selected = grid.select(&srf);
        let expected: Vec<f64> = (3..=9).map(|k| 500.0 + 10.0 * k as f64).collect();
        assert_eq!(selected.wcenters(), expected.as_slice());

        // Mono keeps everything within the support, zero-valued ends included
        let mono = MonoGrid::new(&[510.0, 525.0, 530.0, 590.0, 595.0, 600.0]).unwrap();
        assert_eq!(mono.select(&srf).wavelengths(), &[525.0, 530.0, 590.0, 595.0]);

        // Interior zero between two lobes does not split the selection
        let srf = SpectralResponse::band(
            vec![400.0, 410.0, 420.0, 430.0, 440.0],
            vec![0.0, 1.0, 0.0, 1.0, 0.0],
        )
        .unwrap();
        let mono = MonoGrid::new(&[400.0, 410.0, 420.0, 430.0, 440.0]).unwrap();
        assert_eq!(
            mono.select(&srf).wavelengths(),
            &[400.0, 410.0, 420.0, 430.0, 440.0]
        );
    }

    #[test]
    fn test_merge() {
        let a = CkdGrid::arange(500.0, 530.0, 10.0).unwrap();
        let b = CkdGrid::arange(520.0, 550.0, 10.0).unwrap();
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.wcenters(), &[500.0, 510.0, 520.0, 530.0, 540.0, 550.0]);

        let shifted = CkdGrid::arange(505.0, 515.0, 10.0).unwrap();
        assert!(a.merge(&shifted).is_err());

        let a = MonoGrid::new(&[500.0, 510.0]).unwrap();
        let b = MonoGrid::new(&[505.0, 510.0]).unwrap();
        assert_eq!(a.merge(&b).wavelengths(), &[500.0, 505.0, 510.0]);

        let mixed = SpectralGrid::from(a).merge(&SpectralGrid::Ckd(merged));
        assert!(matches!(mixed, Err(CkdkitError::SpectralModeMismatch { .. })));
    }

    #[test]
    fn test_walk_indices_fixed() {
        let grid = SpectralGrid::from(CkdGrid::arange(500.0, 510.0, 10.0).unwrap());
        let policy = QuadSizingPolicy::Fixed {
            n: 2,
            kind: QuadType::GaussLobatto,
        };
        let indices = grid.walk_indices(&policy, None).unwrap();
        assert_eq!(
            indices,
            vec![
                SpectralIndex::Ckd { w: 500.0, g: 0.0 },
                SpectralIndex::Ckd { w: 500.0, g: 1.0 },
                SpectralIndex::Ckd { w: 510.0, g: 0.0 },
                SpectralIndex::Ckd { w: 510.0, g: 1.0 },
            ]
        );

        let policy = QuadSizingPolicy::MinimizeError { n_max: None };
        assert!(grid.walk_indices(&policy, None).is_err());

        let grid = SpectralGrid::from(MonoGrid::new(&[550.0, 500.0]).unwrap());
        let indices = grid.walk_indices(&policy, None).unwrap();
        assert_eq!(
            indices,
            vec![SpectralIndex::Mono { w: 500.0 }, SpectralIndex::Mono { w: 550.0 }]
        );
    }

    #[test]
    fn test_bin_set_round_trip() {
        let bins = BinSet::arange(400.0, 420.0, 10.0, Quad::default()).unwrap();
        let grid = CkdGrid::from_bin_set(&bins, FixBounds::KeepMin, 1e-6).unwrap();
        assert_eq!(grid.wcenters(), &[405.0, 415.0]);
        let rebuilt = grid.bin_set(&QuadSizingPolicy::default(), None).unwrap();
        assert_eq!(rebuilt.wmins(), bins.wmins());
        assert_eq!(rebuilt.wmaxs(), bins.wmaxs());
        assert!(rebuilt.bins().iter().all(|b| b.quad().len() == 2));
    }
}
