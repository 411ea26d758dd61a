//! Spectral indices: the coordinates at which spectral quantities are evaluated.

use std::fmt;
use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::ckdkit_errors::CkdkitError;

/// Spectral mode of a computation: discrete wavelengths or correlated-k bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralMode {
    Mono,
    Ckd,
}

impl fmt::Display for SpectralMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectralMode::Mono => write!(f, "mono"),
            SpectralMode::Ckd => write!(f, "ckd"),
        }
    }
}

/// A point of the spectral dimension.
///
/// * `Mono { w }`: wavelength `w` in nm, `w > 0`.
/// * `Ckd { w, g }`: bin centre `w` in nm and cumulative probability `g ∈ [0, 1]`.
///
/// Equality and hashing go through [`SpectralIndex::as_hashable`], so indices can
/// key result maps.
#[derive(Debug, Clone, Copy)]
pub enum SpectralIndex {
    Mono { w: f64 },
    Ckd { w: f64, g: f64 },
}

/// Totally ordered key of a [`SpectralIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpectralKey {
    Mono(OrderedFloat<f64>),
    Ckd(OrderedFloat<f64>, OrderedFloat<f64>),
}

fn check_wavelength(w: f64) -> Result<(), CkdkitError> {
    if w.is_finite() && w > 0.0 {
        Ok(())
    } else {
        Err(CkdkitError::InvalidArgument(format!(
            "spectral index wavelength must be strictly positive, got {w}"
        )))
    }
}

impl SpectralIndex {
    pub fn mono(w: f64) -> Result<Self, CkdkitError> {
        check_wavelength(w)?;
        Ok(SpectralIndex::Mono { w })
    }

    pub fn ckd(w: f64, g: f64) -> Result<Self, CkdkitError> {
        check_wavelength(w)?;
        if !(0.0..=1.0).contains(&g) {
            return Err(CkdkitError::InvalidArgument(format!(
                "spectral index g must be in [0, 1], got {g}"
            )));
        }
        Ok(SpectralIndex::Ckd { w, g })
    }

    /// Build an index of the requested mode; `g` defaults to 0 in CKD mode and
    /// is ignored in monochromatic mode.
    pub fn new(mode: SpectralMode, w: f64, g: Option<f64>) -> Result<Self, CkdkitError> {
        match mode {
            SpectralMode::Mono => Self::mono(w),
            SpectralMode::Ckd => Self::ckd(w, g.unwrap_or(0.0)),
        }
    }

    pub fn mode(&self) -> SpectralMode {
        match self {
            SpectralIndex::Mono { .. } => SpectralMode::Mono,
            SpectralIndex::Ckd { .. } => SpectralMode::Ckd,
        }
    }

    pub fn w(&self) -> f64 {
        match self {
            SpectralIndex::Mono { w } | SpectralIndex::Ckd { w, .. } => *w,
        }
    }

    pub fn g(&self) -> Option<f64> {
        match self {
            SpectralIndex::Mono { .. } => None,
            SpectralIndex::Ckd { g, .. } => Some(*g),
        }
    }

    pub fn formatted_repr(&self) -> String {
        match self {
            SpectralIndex::Mono { w } => format!("{w} nm"),
            SpectralIndex::Ckd { w, g } => format!("{w} nm:{g:.3}"),
        }
    }

    pub fn as_hashable(&self) -> SpectralKey {
        match self {
            SpectralIndex::Mono { w } => SpectralKey::Mono(OrderedFloat(*w)),
            SpectralIndex::Ckd { w, g } => SpectralKey::Ckd(OrderedFloat(*w), OrderedFloat(*g)),
        }
    }
}

impl PartialEq for SpectralIndex {
    fn eq(&self, other: &Self) -> bool {
        self.as_hashable() == other.as_hashable()
    }
}

impl Eq for SpectralIndex {}

impl Hash for SpectralIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_hashable().hash(state);
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted_repr())
    }
}
