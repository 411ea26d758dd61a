#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use ckdkit::absorption::ThermoProfile;
use ckdkit::netcdf::DatasetBuilder;
use tempfile::TempDir;

pub const MONO_FILES: [(&str, f64, f64); 2] = [
    ("mono_500_600.nc", 500.0, 600.0),
    ("mono_600_700.nc", 600.0, 700.0),
];

pub const CKD_FILES: [(&str, f64, f64); 2] = [
    ("ckd_500_550.nc", 500.0, 550.0),
    ("ckd_550_600.nc", 550.0, 600.0),
];

const PRESSURES: [f64; 2] = [50_000.0, 100_000.0];
const TEMPERATURES: [f64; 2] = [200.0, 300.0];

/// Analytic absorption coefficient of the monochromatic fixtures.
pub fn sigma_mono(w: f64, p: f64, t: f64) -> f64 {
    w + p / 1000.0 + t
}

/// Analytic absorption coefficient of the CKD fixtures, at a bin centre.
pub fn sigma_ckd(w: f64, g: f64, p: f64, t: f64) -> f64 {
    w + 100.0 * g + p / 1000.0 + t
}

pub fn profile() -> ThermoProfile {
    ThermoProfile::new(
        vec![0.0, 1000.0, 2000.0],
        vec![100_000.0, 80_000.0, 60_000.0],
        vec![300.0, 260.0, 220.0],
    )
    .unwrap()
}

fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8Path::from_path(dir.path()).unwrap().to_path_buf()
}

fn write_mono(path: &Utf8Path, wmin: f64, wmax: f64) {
    let n_w = ((wmax - wmin) / 10.0).round() as usize + 1;
    let w: Vec<f64> = (0..n_w).map(|i| wmin + 10.0 * i as f64).collect();
    let mut sigma = Vec::new();
    for wi in &w {
        for p in PRESSURES {
            for t in TEMPERATURES {
                sigma.push(sigma_mono(*wi, p, t));
            }
        }
    }
    DatasetBuilder::new()
        .dimension("w", n_w)
        .dimension("p", 2)
        .dimension("t", 2)
        .variable_f64("w", &["w"], w)
        .variable_attribute("w", "units", "nm")
        .variable_f64("p", &["p"], PRESSURES.to_vec())
        .variable_attribute("p", "units", "Pa")
        .variable_f64("t", &["t"], TEMPERATURES.to_vec())
        .variable_attribute("t", "units", "K")
        .variable_f64("sigma_a", &["w", "p", "t"], sigma)
        .variable_attribute("sigma_a", "units", "1/m")
        .write(path)
        .unwrap();
}

/// 10 nm bins with `g` in [0, 1]. The first file carries one error table for
/// all bins, the second one table per bin.
fn write_ckd(path: &Utf8Path, wmin: f64, wmax: f64, shared_error: bool) {
    let n_w = ((wmax - wmin) / 10.0).round() as usize;
    let lower: Vec<f64> = (0..n_w).map(|i| wmin + 10.0 * i as f64).collect();
    let upper: Vec<f64> = lower.iter().map(|w| w + 10.0).collect();
    let w: Vec<f64> = lower.iter().map(|w| w + 5.0).collect();
    let g = [0.0, 1.0];

    let mut sigma = Vec::new();
    for wi in &w {
        for gi in g {
            for p in PRESSURES {
                for t in TEMPERATURES {
                    sigma.push(sigma_ckd(*wi, gi, p, t));
                }
            }
        }
    }
    let mut wbounds = lower.clone();
    wbounds.extend(&upper);

    let builder = DatasetBuilder::new()
        .dimension("w", n_w)
        .dimension("g", 2)
        .dimension("p", 2)
        .dimension("t", 2)
        .dimension("wbv", 2)
        .dimension("ng", 3)
        .variable_f64("w", &["w"], w)
        .variable_attribute("w", "units", "nm")
        .variable_f64("g", &["g"], g.to_vec())
        .variable_f64("p", &["p"], PRESSURES.to_vec())
        .variable_attribute("p", "units", "Pa")
        .variable_f64("t", &["t"], TEMPERATURES.to_vec())
        .variable_attribute("t", "units", "K")
        .variable_f64("wbounds", &["wbv", "w"], wbounds)
        .variable_f64("sigma_a", &["w", "g", "p", "t"], sigma)
        .variable_f64("ng", &["ng"], vec![1.0, 2.0, 4.0])
        .variable_attribute("ng", "quadrature_type", "gauss_legendre");
    let builder = if shared_error {
        builder.variable_f64("error", &["ng"], vec![0.1, 0.01, 0.02])
    } else {
        let errors = (0..n_w).flat_map(|_| [0.1, 0.05, 0.001]).collect();
        builder.variable_f64("error", &["w", "ng"], errors)
    };
    builder.write(path).unwrap();
}

/// A monochromatic database directory without index files.
pub fn mono_database_dir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8_dir(&dir);
    for (filename, wmin, wmax) in MONO_FILES {
        write_mono(&path.join(filename), wmin, wmax);
    }
    (dir, path)
}

/// A CKD database directory without index files.
pub fn ckd_database_dir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = utf8_dir(&dir);
    for (i, (filename, wmin, wmax)) in CKD_FILES.into_iter().enumerate() {
        write_ckd(&path.join(filename), wmin, wmax, i == 0);
    }
    (dir, path)
}
