//! Well-known absorption databases.
//!
//! Known databases live under a common data root: `$CKDKIT_DATA_DIR` when set,
//! the platform data directory (`~/.local/share/ckdkit` on Linux) otherwise.

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::ckdkit_errors::CkdkitError;
use crate::constants::DATA_DIR_ENV;
use crate::spectral::index::SpectralMode;

/// Location and access mode of a known database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownDatabase {
    pub name: &'static str,
    pub mode: SpectralMode,
    /// Path relative to the data root
    pub path: &'static str,
    pub lazy: bool,
}

pub const KNOWN_DATABASES: [KnownDatabase; 6] = [
    KnownDatabase {
        name: "gecko",
        mode: SpectralMode::Mono,
        path: "absorption_mono/gecko",
        lazy: true,
    },
    KnownDatabase {
        name: "komodo",
        mode: SpectralMode::Mono,
        path: "absorption_mono/komodo",
        lazy: true,
    },
    KnownDatabase {
        name: "monotropa",
        mode: SpectralMode::Ckd,
        path: "absorption_ckd/monotropa",
        lazy: false,
    },
    KnownDatabase {
        name: "mycena",
        mode: SpectralMode::Ckd,
        path: "absorption_ckd/mycena",
        lazy: false,
    },
    KnownDatabase {
        name: "panellus",
        mode: SpectralMode::Ckd,
        path: "absorption_ckd/panellus",
        lazy: false,
    },
    KnownDatabase {
        name: "tuber",
        mode: SpectralMode::Ckd,
        path: "absorption_ckd/tuber",
        lazy: false,
    },
];

pub fn known_database(name: &str) -> Result<&'static KnownDatabase, CkdkitError> {
    KNOWN_DATABASES
        .iter()
        .find(|db| db.name == name)
        .ok_or_else(|| CkdkitError::UnknownDatabaseName(name.to_string()))
}

/// Name of the database used by default in each spectral mode.
pub fn default_database_name(mode: SpectralMode) -> &'static str {
    match mode {
        SpectralMode::Mono => "komodo",
        SpectralMode::Ckd => "monotropa",
    }
}

/// Root directory of the known databases.
pub fn data_root() -> Result<Utf8PathBuf, CkdkitError> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(Utf8PathBuf::from(dir));
    }
    let base_dir = BaseDirs::new()
        .ok_or_else(|| CkdkitError::InvalidDirectory("cannot find the home directory".into()))?;
    let data_dir = Utf8Path::from_path(base_dir.data_dir()).ok_or_else(|| {
        CkdkitError::InvalidDirectory(format!(
            "data directory {} is not valid UTF-8",
            base_dir.data_dir().display()
        ))
    })?;
    Ok(data_dir.join("ckdkit"))
}

impl KnownDatabase {
    pub fn dir_path(&self) -> Result<Utf8PathBuf, CkdkitError> {
        Ok(data_root()?.join(self.path))
    }
}
