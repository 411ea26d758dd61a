//! # Database index files
//!
//! An absorption database directory carries two tables describing its data
//! files, both rebuilt from the datasets when missing:
//!
//! * `index.csv`, the **file index**: one row per file with the spectral range
//!   it covers,
//!
//!   ```text
//!   filename,wn_min [cm^-1],wn_max [cm^-1],wl_min [nm],wl_max [nm]
//!   ckd_000.nc,17857.14,20000.0,500.0,560.0
//!   ```
//!
//!   Column units are read from the header, so any spectral unit is accepted.
//!   The file index drives chunk lookup: the `wl_min` column of each file plus
//!   the `wl_max` of the last file form the chunk mesh that query wavelengths
//!   are digitized against.
//!
//! * `spectral.csv`, the **spectral coverage**: one row per spectral point of
//!   each file, with the bin bounds of CKD datasets (left empty for
//!   monochromatic ones).
//!
//!   ```text
//!   filename,wavelength [nm],wbound_lower [nm],wbound_upper [nm]
//!   ckd_000.nc,505.0,500.0,510.0
//!   ```

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::absorption::schema;
use crate::ckdkit_errors::CkdkitError;
use crate::constants::{Nanometer, Wavenumber, DATASET_EXTENSION, NM_CM_INV};
use crate::netcdf::Dataset;
use crate::spectral::index::SpectralMode;
use crate::units::SpectralUnit;

const FILENAME_COLUMN: &str = "filename";

/// Header of the index columns, e.g. `wl_min [nm]`
const COLUMN_PATTERN: &str = r"^(?P<coord>wl|wn)_(?P<minmax>min|max)\s*\[(?P<units>[^\]]+)\]$";

// -------------------------------------------------------------------------------------------------
// File index
// -------------------------------------------------------------------------------------------------

/// Spectral range of one data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
    pub filename: String,
    #[serde(rename = "wn_min [cm^-1]")]
    pub wn_min: Wavenumber,
    #[serde(rename = "wn_max [cm^-1]")]
    pub wn_max: Wavenumber,
    #[serde(rename = "wl_min [nm]")]
    pub wl_min: Nanometer,
    #[serde(rename = "wl_max [nm]")]
    pub wl_max: Nanometer,
}

impl IndexRow {
    /// Row covering the wavelength range `[wl_min, wl_max]`.
    pub fn from_wavelengths(filename: &str, wl_min: Nanometer, wl_max: Nanometer) -> Self {
        IndexRow {
            filename: filename.to_string(),
            wn_min: NM_CM_INV / wl_max,
            wn_max: NM_CM_INV / wl_min,
            wl_min,
            wl_max,
        }
    }
}

/// Spectral coordinate used for chunk lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralLookupMode {
    /// Query values are wavelengths in nm
    Wavelength,
    /// Query values are wavenumbers in cm^-1
    Wavenumber,
}

/// File index, sorted by ascending wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct FileIndex {
    rows: Vec<IndexRow>,
    /// `wl_min` of every file, then `wl_max` of the last one
    mesh: Vec<Nanometer>,
}

impl FileIndex {
    /// Validate `rows`: the index must be non-empty and strictly sorted by
    /// ascending `wl_min`.
    pub fn new(rows: Vec<IndexRow>) -> Result<Self, CkdkitError> {
        let Some(last) = rows.last() else {
            return Err(CkdkitError::EmptyIndex("no data file indexed".into()));
        };
        if let Some((a, b)) = rows.iter().tuple_windows().find(|(a, b)| !(a.wl_min < b.wl_min)) {
            return Err(CkdkitError::UnsortedIndex(format!(
                "'{}' (wl_min = {}) comes before '{}' (wl_min = {})",
                a.filename, a.wl_min, b.filename, b.wl_min
            )));
        }
        let mesh = rows
            .iter()
            .map(|row| row.wl_min)
            .chain(std::iter::once(last.wl_max))
            .collect();
        Ok(FileIndex { rows, mesh })
    }

    pub fn rows(&self) -> &[IndexRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.filename.as_str())
    }

    /// Global wavelength coverage `(min, max)` in nm.
    pub fn wavelength_range(&self) -> (Nanometer, Nanometer) {
        (self.mesh[0], self.mesh[self.mesh.len() - 1])
    }

    /// Global wavenumber coverage `(min, max)` in cm^-1.
    pub fn wavenumber_range(&self) -> (Wavenumber, Wavenumber) {
        let wn_min = self.rows.iter().map(|r| r.wn_min).fold(f64::INFINITY, f64::min);
        let wn_max = self.rows.iter().map(|r| r.wn_max).fold(f64::NEG_INFINITY, f64::max);
        (wn_min, wn_max)
    }

    /// Position of each query value in the file index.
    ///
    /// Arguments
    /// -----------------
    /// * `values`: wavelengths (nm) or wavenumbers (cm^-1), depending on `mode`.
    /// * `mode`: unit of `values`.
    ///
    /// Return
    /// ----------
    /// * One row index per value. Files cover half-open ranges
    ///   `[wl_min, next wl_min)`; the upper bound of the last file maps to the
    ///   last file.
    ///
    /// Errors
    /// ----------
    /// * [`CkdkitError::OutOfBoundsSpectralCoordinate`] if a value lies outside
    ///   the global coverage.
    pub fn lookup(
        &self,
        values: &[f64],
        mode: SpectralLookupMode,
    ) -> Result<Vec<usize>, CkdkitError> {
        let (min, max, unit) = match mode {
            SpectralLookupMode::Wavelength => {
                let (min, max) = self.wavelength_range();
                (min, max, "nm")
            }
            SpectralLookupMode::Wavenumber => {
                let (min, max) = self.wavenumber_range();
                (min, max, "cm^-1")
            }
        };
        values
            .iter()
            .map(|value| {
                if !(*value >= min && *value <= max) {
                    return Err(CkdkitError::OutOfBoundsSpectralCoordinate {
                        value: *value,
                        min,
                        max,
                        unit: unit.to_string(),
                    });
                }
                let wl = match mode {
                    SpectralLookupMode::Wavelength => *value,
                    SpectralLookupMode::Wavenumber => NM_CM_INV / value,
                };
                let bucket = self.mesh.partition_point(|node| *node <= wl);
                Ok(bucket.saturating_sub(1).min(self.rows.len() - 1))
            })
            .collect()
    }

    /// Read an index file, converting columns to nm and cm^-1.
    pub fn read_csv(path: &Utf8Path) -> Result<Vec<IndexRow>, CkdkitError> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let pattern = Regex::new(COLUMN_PATTERN)
            .map_err(|e| CkdkitError::InvalidArgument(format!("index column pattern: {e}")))?;

        let mut filename_col = None;
        let mut columns = Vec::new();
        for (k, header) in headers.iter().enumerate() {
            let header = header.trim();
            if header == FILENAME_COLUMN {
                filename_col = Some(k);
                continue;
            }
            let captures = pattern.captures(header).ok_or_else(|| {
                CkdkitError::SchemaMismatch(format!("{path}: unexpected index column '{header}'"))
            })?;
            let unit: SpectralUnit = captures["units"].parse()?;
            let coord = captures["coord"].to_string();
            if (coord == "wn") != unit.is_wavenumber() {
                return Err(CkdkitError::InvalidUnits(format!(
                    "{path}: column '{header}' has inconsistent units"
                )));
            }
            columns.push((k, format!("{coord}_{}", &captures["minmax"]), unit));
        }
        let filename_col = filename_col
            .ok_or_else(|| CkdkitError::SchemaMismatch(format!("{path}: no 'filename' column")))?;
        for required in ["wl_min", "wl_max", "wn_min", "wn_max"] {
            if !columns.iter().any(|(_, name, _)| name == required) {
                return Err(CkdkitError::SchemaMismatch(format!(
                    "{path}: missing index column '{required}'"
                )));
            }
        }

        reader
            .records()
            .map(|record| {
                let record = record?;
                let mut row = IndexRow {
                    filename: record.get(filename_col).unwrap_or_default().trim().to_string(),
                    wn_min: f64::NAN,
                    wn_max: f64::NAN,
                    wl_min: f64::NAN,
                    wl_max: f64::NAN,
                };
                for (k, name, unit) in &columns {
                    let raw = record.get(*k).unwrap_or_default().trim();
                    let value: f64 = raw.parse().map_err(|_| {
                        CkdkitError::SchemaMismatch(format!(
                            "{path}: invalid value '{raw}' in column '{name}'"
                        ))
                    })?;
                    match name.as_str() {
                        "wl_min" => row.wl_min = unit.to_nm(value),
                        "wl_max" => row.wl_max = unit.to_nm(value),
                        "wn_min" => row.wn_min = unit.to_cm_inv(value),
                        _ => row.wn_max = unit.to_cm_inv(value),
                    }
                }
                Ok(row)
            })
            .collect()
    }

    pub fn write_csv(rows: &[IndexRow], path: &Utf8Path) -> Result<(), CkdkitError> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
// Spectral coverage
// -------------------------------------------------------------------------------------------------

/// One spectral point (or bin) of a data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRow {
    pub filename: String,
    #[serde(rename = "wavelength [nm]")]
    pub wavelength: Nanometer,
    #[serde(rename = "wbound_lower [nm]")]
    pub wbound_lower: Option<Nanometer>,
    #[serde(rename = "wbound_upper [nm]")]
    pub wbound_upper: Option<Nanometer>,
}

/// Spectral coverage table, sorted by ascending wavelength.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralCoverage {
    rows: Vec<CoverageRow>,
}

impl SpectralCoverage {
    pub fn new(mut rows: Vec<CoverageRow>) -> Self {
        rows.sort_by(|a, b| {
            a.wavelength
                .total_cmp(&b.wavelength)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        SpectralCoverage { rows }
    }

    pub fn rows(&self) -> &[CoverageRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one data file.
    pub fn file_rows<'a>(
        &'a self,
        filename: &'a str,
    ) -> impl Iterator<Item = &'a CoverageRow> + 'a {
        self.rows.iter().filter(move |row| row.filename == filename)
    }

    pub fn read_csv(path: &Utf8Path) -> Result<Self, CkdkitError> {
        let mut reader = csv::Reader::from_path(path)?;
        let rows = reader
            .deserialize::<CoverageRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rows))
    }

    pub fn write_csv(&self, path: &Utf8Path) -> Result<(), CkdkitError> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
// Building from data files
// -------------------------------------------------------------------------------------------------

/// Data files of a database directory, sorted by name.
pub fn list_data_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, CkdkitError> {
    let mut files = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension() == Some(DATASET_EXTENSION) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Utf8Path) -> Result<String, CkdkitError> {
    path.file_name()
        .map(str::to_string)
        .ok_or_else(|| CkdkitError::InvalidArgument(format!("'{path}' has no file name")))
}

/// Spectral range of a data file: the extent of `w` (mono) or of the bin
/// bounds (ckd).
fn file_range(ds: &Dataset, mode: SpectralMode) -> Result<(Nanometer, Nanometer), CkdkitError> {
    let values: Vec<f64> = match mode {
        SpectralMode::Mono => {
            schema::check_common(ds)?;
            schema::w_nm(ds)?
        }
        SpectralMode::Ckd => {
            schema::check_ckd(ds)?;
            schema::bin_bounds_nm(ds)?
                .into_iter()
                .flat_map(|(lo, hi)| [lo, hi])
                .collect()
        }
    };
    match values.iter().copied().minmax_by(f64::total_cmp).into_option() {
        Some((min, max)) => Ok((min, max)),
        None => Err(CkdkitError::SchemaMismatch(format!(
            "{}: empty spectral coordinate",
            ds.path()
        ))),
    }
}

/// Index rows of `files`, sorted by ascending `wl_min`.
pub fn make_index(files: &[Utf8PathBuf], mode: SpectralMode) -> Result<Vec<IndexRow>, CkdkitError> {
    let mut rows = Vec::with_capacity(files.len());
    for path in files {
        let ds = Dataset::open_lazy(path)?;
        let (wl_min, wl_max) = file_range(&ds, mode)?;
        rows.push(IndexRow::from_wavelengths(&file_name(path)?, wl_min, wl_max));
    }
    rows.sort_by(|a, b| a.wl_min.total_cmp(&b.wl_min));
    Ok(rows)
}

/// Spectral coverage of `files`.
pub fn make_spectral_coverage(
    files: &[Utf8PathBuf],
    mode: SpectralMode,
) -> Result<SpectralCoverage, CkdkitError> {
    let mut rows = Vec::new();
    for path in files {
        let ds = Dataset::open_lazy(path)?;
        let filename = file_name(path)?;
        let w = schema::w_nm(&ds)?;
        match mode {
            SpectralMode::Mono => rows.extend(w.into_iter().map(|wavelength| CoverageRow {
                filename: filename.clone(),
                wavelength,
                wbound_lower: None,
                wbound_upper: None,
            })),
            SpectralMode::Ckd => {
                schema::check_ckd(&ds)?;
                let bounds = schema::bin_bounds_nm(&ds)?;
                rows.extend(w.into_iter().zip(bounds).map(|(wavelength, (lo, hi))| CoverageRow {
                    filename: filename.clone(),
                    wavelength,
                    wbound_lower: Some(lo),
                    wbound_upper: Some(hi),
                }))
            }
        }
    }
    Ok(SpectralCoverage::new(rows))
}

/// Read `path`, or build the table with `make` and write it to `path` when the
/// file is missing and `fix` is set.
pub(crate) fn load_or_build<T>(
    path: &Utf8Path,
    fix: bool,
    read: impl FnOnce(&Utf8Path) -> Result<T, CkdkitError>,
    make: impl FnOnce() -> Result<T, CkdkitError>,
    write: impl FnOnce(&T, &Utf8Path) -> Result<(), CkdkitError>,
) -> Result<T, CkdkitError> {
    if path.is_file() {
        debug!("Loading index file '{path}'");
        return read(path);
    }
    if !fix {
        return Err(CkdkitError::MissingIndexFile(path.to_string()));
    }
    warn!("Could not find index file '{path}', building it");
    let table = make()?;
    write(&table, path)?;
    Ok(table)
}
