mod common;

use approx::assert_relative_eq;
use ckdkit::absorption::{
    AbsorptionDatabase, CacheStats, DatabaseOptions, ErrorHandlingAction,
    ErrorHandlingConfiguration, SpectralLookupMode, ThermoProfile,
};
use ckdkit::ckdkit_errors::CkdkitError;
use ckdkit::constants::{INDEX_FILENAME, SPECTRAL_COVERAGE_FILENAME};
use ckdkit::quad::QuadType;
use ckdkit::spectral::{SpectralIndex, SpectralMode};

use crate::common::{ckd_database_dir, mono_database_dir, profile, sigma_ckd, sigma_mono};

#[test]
fn test_index_files_are_built_on_demand() {
    let (_dir, path) = mono_database_dir();

    let strict = DatabaseOptions {
        fix: false,
        ..DatabaseOptions::default()
    };
    let result = AbsorptionDatabase::from_directory(&path, SpectralMode::Mono, strict);
    assert!(matches!(result, Err(CkdkitError::MissingIndexFile(_))));

    let db =
        AbsorptionDatabase::from_directory(&path, SpectralMode::Mono, DatabaseOptions::default())
            .unwrap();
    assert!(path.join(INDEX_FILENAME).is_file());
    assert!(path.join(SPECTRAL_COVERAGE_FILENAME).is_file());
    assert_eq!(
        db.index().filenames().collect::<Vec<_>>(),
        vec!["mono_500_600.nc", "mono_600_700.nc"]
    );
    assert_eq!(db.index().wavelength_range(), (500.0, 700.0));
    // 11 points per file
    assert_eq!(db.spectral_coverage().len(), 22);

    // Written index files are read back as is
    let reopened = AbsorptionDatabase::from_directory(&path, SpectralMode::Mono, strict).unwrap();
    assert_eq!(reopened.index(), db.index());
    assert_eq!(reopened.spectral_coverage(), db.spectral_coverage());
}

#[test]
fn test_metadata_and_display() {
    let (_dir, path) = ckd_database_dir();
    std::fs::write(path.join("metadata.json"), r#"{"name": "fixture", "version": 2}"#).unwrap();

    let db =
        AbsorptionDatabase::from_directory(&path, SpectralMode::Ckd, DatabaseOptions::default())
            .unwrap();
    assert_eq!(db.metadata()["name"], "fixture");
    assert_eq!(db.mode(), SpectralMode::Ckd);
    assert!(!db.is_lazy());

    let repr = db.to_string();
    assert!(repr.contains("ckd_500_550.nc"));
    assert!(repr.contains("ckd_550_600.nc"));
}

#[test]
fn test_from_json() {
    let (_dir, path) = ckd_database_dir();
    let json = format!(
        r#"{{"construct": "from_directory", "path": "{path}", "mode": "ckd", "options": {{"lazy": true, "cache_size": 1}}}}"#
    );
    let mut db = AbsorptionDatabase::from_json(&json).unwrap();
    assert!(db.is_lazy());
    assert_eq!(db.dir_path(), path.as_path());

    let sigma = db.eval_sigma_a_ckd(&[505.0], 0.5, &profile(), None).unwrap();
    assert_relative_eq!(sigma[[0, 0]], sigma_ckd(505.0, 0.5, 100_000.0, 300.0), epsilon = 1e-9);
    db.cache_close();
    // Closed lazy datasets reopen on the next read
    let sigma = db.eval_sigma_a_ckd(&[505.0], 0.5, &profile(), None).unwrap();
    assert_relative_eq!(sigma[[0, 1]], sigma_ckd(505.0, 0.5, 80_000.0, 260.0), epsilon = 1e-9);
}

#[test]
fn test_chunk_lookup() {
    let (_dir, path) = mono_database_dir();
    let db =
        AbsorptionDatabase::from_directory(&path, SpectralMode::Mono, DatabaseOptions::default())
            .unwrap();

    let filenames = db
        .lookup_filenames(&[500.0, 599.9, 600.0, 700.0], SpectralLookupMode::Wavelength)
        .unwrap();
    assert_eq!(
        filenames,
        vec!["mono_500_600.nc", "mono_500_600.nc", "mono_600_700.nc", "mono_600_700.nc"]
    );

    let filenames = db
        .lookup_filenames(&[1e7 / 650.0, 1e7 / 550.0], SpectralLookupMode::Wavenumber)
        .unwrap();
    assert_eq!(filenames, vec!["mono_600_700.nc", "mono_500_600.nc"]);

    let err = db
        .lookup_filenames(&[550.0, 499.0], SpectralLookupMode::Wavelength)
        .unwrap_err();
    assert!(matches!(
        err,
        CkdkitError::OutOfBoundsSpectralCoordinate { value, .. } if value == 499.0
    ));
    let err = db
        .lookup_filenames(&[1e7 / 450.0], SpectralLookupMode::Wavenumber)
        .unwrap_err();
    assert!(matches!(
        err,
        CkdkitError::OutOfBoundsSpectralCoordinate { ref unit, .. } if unit == "cm^-1"
    ));
}

#[test]
fn test_eval_mono() {
    let (_dir, path) = mono_database_dir();
    let mut db =
        AbsorptionDatabase::from_directory(&path, SpectralMode::Mono, DatabaseOptions::default())
            .unwrap();
    let profile = profile();

    let w = [695.0, 505.0, 600.0, 512.5];
    let sigma = db.eval_sigma_a_mono(&w, &profile, None).unwrap();
    assert_eq!(sigma.shape(), &[4, 3]);
    for (i, wi) in w.iter().enumerate() {
        for (j, (p, t)) in profile.p().iter().zip(profile.t()).enumerate() {
            assert_relative_eq!(sigma[[i, j]], sigma_mono(*wi, *p, *t), epsilon = 1e-9);
        }
    }

    let column = db.eval_sigma_a(&SpectralIndex::Mono { w: 650.0 }, &profile, None).unwrap();
    assert_eq!(column.len(), 3);
    assert_relative_eq!(column[2], sigma_mono(650.0, 60_000.0, 220.0), epsilon = 1e-9);

    let err = db.eval_sigma_a_mono(&[710.0], &profile, None).unwrap_err();
    assert!(matches!(err, CkdkitError::OutOfBoundsSpectralCoordinate { .. }));

    let err = db.eval_sigma_a_ckd(&[550.0], 0.5, &profile, None).unwrap_err();
    match err {
        CkdkitError::SpectralModeMismatch { expected, actual } => {
            assert_eq!(expected, "ckd");
            assert_eq!(actual, "mono");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_eval_error_handling() {
    let (_dir, path) = mono_database_dir();
    let mut db =
        AbsorptionDatabase::from_directory(&path, SpectralMode::Mono, DatabaseOptions::default())
            .unwrap();
    let cold =
        ThermoProfile::new(vec![0.0, 1000.0], vec![100_000.0, 90_000.0], vec![250.0, 150.0])
            .unwrap();

    // Temperature bounds are ignored by default
    let sigma = db.eval_sigma_a_mono(&[550.0], &cold, None).unwrap();
    assert_relative_eq!(sigma[[0, 0]], sigma_mono(550.0, 100_000.0, 250.0), epsilon = 1e-9);
    assert_eq!(sigma[[0, 1]], 0.0);

    let mut config = ErrorHandlingConfiguration::default();
    config.t.bounds = ErrorHandlingAction::Raise;
    let err = db.eval_sigma_a_mono(&[550.0], &cold, Some(&config)).unwrap_err();
    assert!(matches!(
        err,
        CkdkitError::InterpolationOutOfBounds { ref dimension, .. } if dimension == "t"
    ));

    // Species the datasets do not tabulate play no part in the lookup
    let humid = cold.clone().with_concentration("H2O", vec![0.01, 0.02]).unwrap();
    let mut config = ErrorHandlingConfiguration::default();
    config.x.missing = ErrorHandlingAction::Raise;
    let with_h2o = db.eval_sigma_a_mono(&[550.0], &humid, Some(&config)).unwrap();
    assert_eq!(with_h2o, sigma);
}

#[test]
fn test_cache() {
    let (_dir, path) = mono_database_dir();
    let options = DatabaseOptions {
        cache_size: 1,
        ..DatabaseOptions::default()
    };
    let mut db = AbsorptionDatabase::from_directory(&path, SpectralMode::Mono, options).unwrap();

    db.eval_sigma_a_mono(&[505.0, 605.0, 510.0], &profile(), None).unwrap();
    assert_eq!(
        db.cache_stats(),
        CacheStats {
            hits: 0,
            loads: 2,
            evictions: 1
        }
    );
    assert!(!db.is_cached("mono_500_600.nc"));
    assert!(db.is_cached("mono_600_700.nc"));

    db.eval_sigma_a_mono(&[650.0], &profile(), None).unwrap();
    assert_eq!(db.cache_stats().hits, 1);

    db.cache_clear();
    assert!(!db.is_cached("mono_600_700.nc"));
    db.cache_reset(4).unwrap();
    assert_eq!(db.cache_stats(), CacheStats::default());
    assert!(db.cache_reset(0).is_err());
}

#[test]
fn test_eval_ckd() {
    let (_dir, path) = ckd_database_dir();
    let mut db =
        AbsorptionDatabase::from_directory(&path, SpectralMode::Ckd, DatabaseOptions::default())
            .unwrap();
    let profile = profile();

    // 557 nm falls in the bin centred on 555 nm
    let sigma = db.eval_sigma_a_ckd(&[505.0, 557.0], 0.25, &profile, None).unwrap();
    assert_eq!(sigma.shape(), &[2, 3]);
    assert_relative_eq!(sigma[[0, 0]], sigma_ckd(505.0, 0.25, 100_000.0, 300.0), epsilon = 1e-9);
    assert_relative_eq!(sigma[[1, 2]], sigma_ckd(555.0, 0.25, 60_000.0, 220.0), epsilon = 1e-9);

    let column = db
        .eval_sigma_a(&SpectralIndex::Ckd { w: 545.0, g: 1.0 }, &profile, None)
        .unwrap();
    assert_relative_eq!(column[1], sigma_ckd(545.0, 1.0, 80_000.0, 260.0), epsilon = 1e-9);

    let err = db.eval_sigma_a_ckd(&[505.0], 1.5, &profile, None).unwrap_err();
    assert!(matches!(
        err,
        CkdkitError::InterpolationOutOfBounds { ref dimension, .. } if dimension == "g"
    ));

    let err = db.eval_sigma_a_mono(&[505.0], &profile, None).unwrap_err();
    assert!(matches!(err, CkdkitError::SpectralModeMismatch { .. }));
}

#[test]
fn test_error_tables() {
    let (_dir, path) = ckd_database_dir();
    let mut db =
        AbsorptionDatabase::from_directory(&path, SpectralMode::Ckd, DatabaseOptions::default())
            .unwrap();

    let (table, kind) = db.error_table(515.0).unwrap();
    assert_eq!(kind, QuadType::GaussLegendre);
    assert_eq!(table.entries(), &[(1, 0.1), (2, 0.01), (4, 0.02)]);

    let (table, _) = db.error_table(575.0).unwrap();
    assert_eq!(table.entries(), &[(1, 0.1), (2, 0.05), (4, 0.001)]);

    assert!(matches!(
        db.error_table(620.0),
        Err(CkdkitError::OutOfBoundsSpectralCoordinate { .. })
    ));
}
