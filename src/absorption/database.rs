//! # Absorption databases
//!
//! An [`AbsorptionDatabase`] is a directory of absorption datasets (one
//! NetCDF file per spectral chunk) together with its index tables, see
//! [`crate::absorption::index`]. It answers three kinds of queries:
//!
//! * **chunk lookup**: which file covers a wavelength or wavenumber
//!   ([`AbsorptionDatabase::lookup_filenames`]);
//! * **evaluation**: absorption coefficient at spectral coordinates for a
//!   thermophysical profile ([`AbsorptionDatabase::eval_sigma_a_mono`],
//!   [`AbsorptionDatabase::eval_sigma_a_ckd`], [`AbsorptionDatabase::eval_sigma_a`]);
//! * **quadrature error tables** of CKD datasets
//!   ([`AbsorptionDatabase::error_table`]).
//!
//! Loaded datasets are kept in a bounded LRU cache. Every method that can load a
//! dataset therefore takes `&mut self`; sharing a database between threads
//! requires an external lock.
//!
//! ## Construction
//!
//! ```rust,no_run
//! use ckdkit::absorption::{AbsorptionDatabase, DatabaseOptions};
//! use ckdkit::spectral::index::SpectralMode;
//!
//! let db = AbsorptionDatabase::from_directory(
//!     "path/to/monotropa",
//!     SpectralMode::Ckd,
//!     DatabaseOptions::default(),
//! )
//! .unwrap();
//! println!("{db}");
//!
//! // Equivalent, from the data root
//! let db = AbsorptionDatabase::from_name("monotropa", None).unwrap();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ahash::RandomState;
use camino::{Utf8Path, Utf8PathBuf};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};
use log::debug;
use ndarray::{Array1, Array2, Ix2};
use serde::{Deserialize, Serialize};

use crate::absorption::cache::{CacheStats, DatasetCache};
use crate::absorption::error_handling::ErrorHandlingConfiguration;
use crate::absorption::index::{
    list_data_files, load_or_build, make_index, make_spectral_coverage, FileIndex, SpectralCoverage,
    SpectralLookupMode,
};
use crate::absorption::thermoprops::ThermoProfile;
use crate::absorption::{interp, registry, schema};
use crate::ckdkit_errors::CkdkitError;
use crate::constants::{
    Nanometer, DEFAULT_CACHE_SIZE, INDEX_FILENAME, METADATA_FILENAME, SPECTRAL_COVERAGE_FILENAME,
};
use crate::labeled_array::{nearest, LabeledArray};
use crate::netcdf::Dataset;
use crate::quad::QuadType;
use crate::spectral::index::{SpectralIndex, SpectralMode};
use crate::spectral::quad_policy::ErrorTable;

/// Construction options of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Keep datasets open and read variables on demand
    pub lazy: bool,
    /// Build missing index files instead of failing
    pub fix: bool,
    /// Number of datasets kept in the cache
    pub cache_size: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        DatabaseOptions {
            lazy: false,
            fix: true,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

/// Serialized description of a database.
///
/// ```json
/// {"construct": "from_name", "name": "monotropa"}
/// {"construct": "from_directory", "path": "/data/komodo", "mode": "mono", "options": {"lazy": true}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "construct", rename_all = "snake_case")]
pub enum DatabaseSpec {
    FromName {
        name: String,
        #[serde(default)]
        lazy: Option<bool>,
    },
    FromDirectory {
        path: Utf8PathBuf,
        mode: SpectralMode,
        #[serde(default)]
        options: DatabaseOptions,
    },
}

/// A directory-backed collection of absorption datasets.
pub struct AbsorptionDatabase {
    dir_path: Utf8PathBuf,
    mode: SpectralMode,
    index: FileIndex,
    coverage: SpectralCoverage,
    metadata: serde_json::Map<String, serde_json::Value>,
    lazy: bool,
    cache: DatasetCache,
}

impl fmt::Debug for AbsorptionDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbsorptionDatabase")
            .field("dir_path", &self.dir_path)
            .field("mode", &self.mode)
            .field("files", &self.index.len())
            .field("lazy", &self.lazy)
            .field("cache", &self.cache)
            .finish()
    }
}

impl AbsorptionDatabase {
    /// Open a database directory.
    ///
    /// Arguments
    /// -----------------
    /// * `dir_path`: database root, holding the `*.nc` data files and the
    ///   index files.
    /// * `mode`: spectral mode of the data files.
    /// * `options`: access mode, index rebuild switch and cache capacity.
    ///
    /// Return
    /// ----------
    /// * The database. Missing index files are rebuilt from the data files and
    ///   written to `dir_path` when `options.fix` is set.
    ///
    /// Errors
    /// ----------
    /// * [`CkdkitError::InvalidDirectory`] if `dir_path` is not a directory,
    /// * [`CkdkitError::MissingIndexFile`] if an index file is missing and
    ///   `options.fix` is unset,
    /// * [`CkdkitError::EmptyIndex`] / [`CkdkitError::UnsortedIndex`] for an
    ///   invalid file index.
    pub fn from_directory(
        dir_path: impl AsRef<Utf8Path>,
        mode: SpectralMode,
        options: DatabaseOptions,
    ) -> Result<Self, CkdkitError> {
        let dir_path = dir_path.as_ref();
        if !dir_path.is_dir() {
            return Err(CkdkitError::InvalidDirectory(dir_path.to_string()));
        }
        let cache = DatasetCache::new(options.cache_size)?;

        let metadata_path = dir_path.join(METADATA_FILENAME);
        let metadata = if metadata_path.is_file() {
            serde_json::from_str(&std::fs::read_to_string(&metadata_path)?)?
        } else {
            serde_json::Map::new()
        };

        let mut files = None;
        let mut data_files = || -> Result<Vec<Utf8PathBuf>, CkdkitError> {
            if files.is_none() {
                files = Some(list_data_files(dir_path)?);
            }
            Ok(files.clone().unwrap_or_default())
        };

        let mut rows = load_or_build(
            &dir_path.join(INDEX_FILENAME),
            options.fix,
            FileIndex::read_csv,
            || make_index(&data_files()?, mode),
            |rows, path| FileIndex::write_csv(rows, path),
        )?;
        rows.sort_by(|a, b| a.wl_min.total_cmp(&b.wl_min));
        let index = FileIndex::new(rows)?;

        let coverage = load_or_build(
            &dir_path.join(SPECTRAL_COVERAGE_FILENAME),
            options.fix,
            SpectralCoverage::read_csv,
            || make_spectral_coverage(&data_files()?, mode),
            SpectralCoverage::write_csv,
        )?;

        debug!(
            "Opened {mode} absorption database '{dir_path}' ({} files)",
            index.len()
        );
        Ok(AbsorptionDatabase {
            dir_path: dir_path.to_path_buf(),
            mode,
            index,
            coverage,
            metadata,
            lazy: options.lazy,
            cache,
        })
    }

    /// Open a known database from the data root, see [`registry`].
    ///
    /// `lazy` overrides the database's default access mode.
    pub fn from_name(name: &str, lazy: Option<bool>) -> Result<Self, CkdkitError> {
        let known = registry::known_database(name)?;
        let options = DatabaseOptions {
            lazy: lazy.unwrap_or(known.lazy),
            ..DatabaseOptions::default()
        };
        Self::from_directory(known.dir_path()?, known.mode, options)
    }

    pub fn from_spec(spec: &DatabaseSpec) -> Result<Self, CkdkitError> {
        match spec {
            DatabaseSpec::FromName { name, lazy } => Self::from_name(name, *lazy),
            DatabaseSpec::FromDirectory {
                path,
                mode,
                options,
            } => Self::from_directory(path, *mode, *options),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CkdkitError> {
        Self::from_spec(&serde_json::from_str(json)?)
    }

    /// Default database of a spectral mode (`komodo` or `monotropa`).
    pub fn default_for(mode: SpectralMode) -> Result<Self, CkdkitError> {
        Self::from_name(registry::default_database_name(mode), None)
    }

    pub fn dir_path(&self) -> &Utf8Path {
        &self.dir_path
    }

    pub fn mode(&self) -> SpectralMode {
        self.mode
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    pub fn spectral_coverage(&self) -> &SpectralCoverage {
        &self.coverage
    }

    // ---------------------------------------------------------------------------------------------
    // Chunk lookup and cache
    // ---------------------------------------------------------------------------------------------

    /// Names of the files covering each of `values`, relative to the database root.
    pub fn lookup_filenames(
        &self,
        values: &[f64],
        mode: SpectralLookupMode,
    ) -> Result<Vec<String>, CkdkitError> {
        let rows = self.index.rows();
        Ok(self
            .index
            .lookup(values, mode)?
            .into_iter()
            .map(|i| rows[i].filename.clone())
            .collect())
    }

    /// Load a dataset through the cache.
    pub fn load_dataset(&mut self, filename: &str) -> Result<Arc<Dataset>, CkdkitError> {
        let path = self.dir_path.join(filename);
        let lazy = self.lazy;
        self.cache
            .get_or_try_insert(filename, || Dataset::open(&path, lazy))
    }

    /// Datasets covering each of `values`.
    pub fn lookup_datasets(
        &mut self,
        values: &[f64],
        mode: SpectralLookupMode,
    ) -> Result<Vec<Arc<Dataset>>, CkdkitError> {
        self.lookup_filenames(values, mode)?
            .iter()
            .map(|filename| self.load_dataset(filename))
            .collect()
    }

    pub fn cache_clear(&mut self) {
        self.cache.clear();
    }

    /// Release the file handles of lazily loaded datasets. Index tables and
    /// cache entries are kept.
    pub fn cache_close(&mut self) {
        self.cache.close_all();
    }

    /// Replace the cache with an empty one of the given capacity.
    pub fn cache_reset(&mut self, capacity: usize) -> Result<(), CkdkitError> {
        self.cache = DatasetCache::new(capacity)?;
        Ok(())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn is_cached(&self, filename: &str) -> bool {
        self.cache.contains(filename)
    }

    // ---------------------------------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------------------------------

    fn check_mode(&self, expected: SpectralMode) -> Result<(), CkdkitError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(CkdkitError::SpectralModeMismatch {
                expected: expected.to_string(),
                actual: self.mode.to_string(),
            })
        }
    }

    /// Evaluate `eval` file by file and gather the `(w, z)` results.
    fn eval_by_file<F>(
        &mut self,
        w: &[Nanometer],
        n_z: usize,
        mut eval: F,
    ) -> Result<Array2<f64>, CkdkitError>
    where
        F: FnMut(&Dataset, &[Nanometer]) -> Result<LabeledArray, CkdkitError>,
    {
        let filenames = self.lookup_filenames(w, SpectralLookupMode::Wavelength)?;
        let mut groups: HashMap<&str, Vec<usize>, RandomState> = HashMap::default();
        let mut order = Vec::new();
        for (i, filename) in filenames.iter().enumerate() {
            groups
                .entry(filename.as_str())
                .or_insert_with(|| {
                    order.push(filename.as_str());
                    Vec::new()
                })
                .push(i);
        }

        let mut out = Array2::zeros((w.len(), n_z));
        for filename in order {
            let indices = &groups[filename];
            let ds = self.load_dataset(filename)?;
            let w_file: Vec<f64> = indices.iter().map(|i| w[*i]).collect();
            let block = eval(ds.as_ref(), &w_file)?
                .into_data()
                .into_dimensionality::<Ix2>()
                .map_err(|e| CkdkitError::SchemaMismatch(format!("{}: {e}", ds.path())))?;
            for (k, i) in indices.iter().enumerate() {
                out.row_mut(*i).assign(&block.row(k));
            }
        }
        Ok(out)
    }

    /// Absorption coefficient at wavelengths `w` (nm) for a monochromatic database.
    ///
    /// Arguments
    /// -----------------
    /// * `w`: wavelengths (nm), within the database coverage.
    /// * `profile`: thermophysical profile with `n_z` layers.
    /// * `config`: interpolation error handling; defaults to
    ///   [`ErrorHandlingConfiguration::default`].
    ///
    /// Return
    /// ----------
    /// * A `(w.len(), n_z)` array in the units of the datasets' `sigma_a`.
    pub fn eval_sigma_a_mono(
        &mut self,
        w: &[Nanometer],
        profile: &ThermoProfile,
        config: Option<&ErrorHandlingConfiguration>,
    ) -> Result<Array2<f64>, CkdkitError> {
        self.check_mode(SpectralMode::Mono)?;
        let config = config.copied().unwrap_or_default();
        self.eval_by_file(w, profile.n_layers(), |ds, w| interp::eval_mono(ds, w, profile, &config))
    }

    /// Absorption coefficient of the bins nearest to `w` (nm) at cumulative
    /// probability `g`, for a CKD database.
    ///
    /// Same layout as [`Self::eval_sigma_a_mono`]; `g` outside the tabulated
    /// range is always an error.
    pub fn eval_sigma_a_ckd(
        &mut self,
        w: &[Nanometer],
        g: f64,
        profile: &ThermoProfile,
        config: Option<&ErrorHandlingConfiguration>,
    ) -> Result<Array2<f64>, CkdkitError> {
        self.check_mode(SpectralMode::Ckd)?;
        let config = config.copied().unwrap_or_default();
        self.eval_by_file(w, profile.n_layers(), |ds, w| {
            interp::eval_ckd(ds, w, g, profile, &config)
        })
    }

    /// Absorption coefficient profile at one spectral index.
    pub fn eval_sigma_a(
        &mut self,
        index: &SpectralIndex,
        profile: &ThermoProfile,
        config: Option<&ErrorHandlingConfiguration>,
    ) -> Result<Array1<f64>, CkdkitError> {
        let values = match *index {
            SpectralIndex::Mono { w } => self.eval_sigma_a_mono(&[w], profile, config)?,
            SpectralIndex::Ckd { w, g } => self.eval_sigma_a_ckd(&[w], g, profile, config)?,
        };
        Ok(values.row(0).to_owned())
    }

    /// Quadrature error table of the CKD bin nearest to `wcenter` (nm), with the
    /// quadrature family it was computed for.
    pub fn error_table(
        &mut self,
        wcenter: Nanometer,
    ) -> Result<(ErrorTable, QuadType), CkdkitError> {
        self.check_mode(SpectralMode::Ckd)?;
        let filename = self
            .lookup_filenames(&[wcenter], SpectralLookupMode::Wavelength)?
            .into_iter()
            .next()
            .ok_or_else(|| CkdkitError::InvalidArgument(format!("no file covers {wcenter} nm")))?;
        let ds = self.load_dataset(&filename)?;
        let kind = schema::error_table_kind(&ds)?;
        let tables = schema::error_tables(&ds)?.ok_or_else(|| {
            CkdkitError::SchemaMismatch(format!("{}: no quadrature error table", ds.path()))
        })?;
        let w = schema::w_nm(&ds)?;
        let table = nearest(&w, wcenter)
            .and_then(|i| tables.for_bin(i))
            .cloned()
            .ok_or_else(|| {
                let path = ds.path();
                CkdkitError::SchemaMismatch(format!("{path}: no error table for {wcenter} nm"))
            })?;
        Ok((table, kind))
    }
}

impl fmt::Display for AbsorptionDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "AbsorptionDatabase ({}) {}", self.mode, self.dir_path)?;
        writeln!(f, "Access mode: {}", if self.lazy { "lazy" } else { "eager" })?;

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("filename"),
            Cell::new("wn_min [cm^-1]"),
            Cell::new("wn_max [cm^-1]"),
            Cell::new("wl_min [nm]"),
            Cell::new("wl_max [nm]"),
        ]);
        for row in self.index.rows() {
            table.add_row(Row::from(vec![
                Cell::new(&row.filename),
                Cell::new(format!("{:.3}", row.wn_min)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.3}", row.wn_max)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.3}", row.wl_min)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.3}", row.wl_max)).set_alignment(CellAlignment::Right),
            ]));
        }
        write!(f, "{table}")
    }
}

#[cfg(test)]
mod test_database {
    use super::*;

    #[test]
    fn test_options_and_spec() {
        let options: DatabaseOptions = serde_json::from_str(r#"{"lazy": true}"#).unwrap();
        assert!(options.lazy);
        assert!(options.fix);
        assert_eq!(options.cache_size, DEFAULT_CACHE_SIZE);

        let spec: DatabaseSpec =
            serde_json::from_str(r#"{"construct": "from_name", "name": "komodo"}"#).unwrap();
        assert_eq!(
            spec,
            DatabaseSpec::FromName {
                name: "komodo".into(),
                lazy: None
            }
        );

        let spec: DatabaseSpec = serde_json::from_str(
            r#"{"construct": "from_directory", "path": "/data/db", "mode": "ckd", "options": {"cache_size": 2}}"#,
        )
        .unwrap();
        match spec {
            DatabaseSpec::FromDirectory { path, mode, options } => {
                assert_eq!(path, Utf8PathBuf::from("/data/db"));
                assert_eq!(mode, SpectralMode::Ckd);
                assert_eq!(options.cache_size, 2);
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn test_invalid_directory() {
        let result = AbsorptionDatabase::from_directory(
            "/definitely/not/a/directory",
            SpectralMode::Mono,
            DatabaseOptions::default(),
        );
        assert!(matches!(result, Err(CkdkitError::InvalidDirectory(_))));

        let result = AbsorptionDatabase::from_json(r#"{"construct": "from_name", "name": "nope"}"#);
        assert!(matches!(result, Err(CkdkitError::UnknownDatabaseName(_))));
    }
}
