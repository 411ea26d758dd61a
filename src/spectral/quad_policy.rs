//! # Quadrature sizing policies
//!
//! CKD absorption datasets ship an **error table** for each bin: the error made
//! when integrating over `g` with `ng` quadrature nodes, for a range of `ng`.
//! A [`QuadSizingPolicy`] turns such a table into a node count.
//!
//! ## Policies
//!
//! * [`QuadSizingPolicy::Fixed`]: always `n` nodes of the given family.
//! * [`QuadSizingPolicy::MinimizeError`]: the smallest node count reaching the
//!   minimum tabulated error, capped at `n_max`.
//! * [`QuadSizingPolicy::ErrorThreshold`]: the smallest node count whose error is
//!   strictly below `threshold`, capped at `n_max`; `n_max` if none qualifies.
//!
//! When `n_max` is not set, it defaults to the largest tabulated node count.
//!
//! Policies deserialize from JSON with a `type` tag:
//!
//! ```rust
//! use ckdkit::spectral::quad_policy::QuadSizingPolicy;
//!
//! let policy: QuadSizingPolicy =
//!     serde_json::from_str(r#"{"type": "error_threshold", "threshold": 0.01}"#).unwrap();
//! assert_eq!(
//!     policy,
//!     QuadSizingPolicy::ErrorThreshold { threshold: 0.01, n_max: None }
//! );
//! ```

use serde::{Deserialize, Serialize};

use crate::ckdkit_errors::CkdkitError;
use crate::quad::{Quad, QuadType};

/// Node count → quadrature error, sorted by ascending node count.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorTable {
    entries: Vec<(usize, f64)>,
}

impl ErrorTable {
    pub fn new(ng: &[usize], errors: &[f64]) -> Result<Self, CkdkitError> {
        if ng.len() != errors.len() {
            return Err(CkdkitError::SchemaMismatch(format!(
                "error table has {} node counts but {} errors",
                ng.len(),
                errors.len()
            )));
        }
        Self::from_pairs(ng.iter().copied().zip(errors.iter().copied()))
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, f64)>) -> Result<Self, CkdkitError> {
        let mut entries: Vec<(usize, f64)> = pairs.into_iter().collect();
        if entries.is_empty() {
            return Err(CkdkitError::SchemaMismatch("error table is empty".into()));
        }
        if entries.iter().any(|(n, _)| *n == 0) {
            return Err(CkdkitError::SchemaMismatch(
                "error table node counts must be positive".into(),
            ));
        }
        entries.sort_by_key(|(n, _)| *n);
        Ok(ErrorTable { entries })
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn max_ng(&self) -> usize {
        self.entries.last().map_or(1, |(n, _)| *n)
    }
}

/// Strategy choosing the number of `g` quadrature nodes of a CKD bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuadSizingPolicy {
    Fixed {
        n: usize,
        #[serde(default)]
        kind: QuadType,
    },
    MinimizeError {
        #[serde(default)]
        n_max: Option<usize>,
    },
    ErrorThreshold {
        threshold: f64,
        #[serde(default)]
        n_max: Option<usize>,
    },
}

impl Default for QuadSizingPolicy {
    fn default() -> Self {
        QuadSizingPolicy::Fixed {
            n: 2,
            kind: QuadType::GaussLegendre,
        }
    }
}

impl QuadSizingPolicy {
    pub fn requires_error_table(&self) -> bool {
        !matches!(self, QuadSizingPolicy::Fixed { .. })
    }

    /// Number of nodes selected by the policy.
    ///
    /// Arguments
    /// -----------------
    /// * `table`: the error table of the bin; ignored by [`QuadSizingPolicy::Fixed`].
    ///
    /// Return
    /// ----------
    /// * The node count, or [`CkdkitError::InvalidArgument`] if the policy needs
    ///   a table and none was given.
    pub fn node_count(&self, table: Option<&ErrorTable>) -> Result<usize, CkdkitError> {
        match self {
            QuadSizingPolicy::Fixed { n, .. } => Ok(*n),
            QuadSizingPolicy::MinimizeError { n_max } => {
                let table = require_table(table)?;
                let n_max = n_max.unwrap_or_else(|| table.max_ng());
                let min_error = table
                    .entries
                    .iter()
                    .map(|(_, e)| *e)
                    .filter(|e| !e.is_nan())
                    .fold(f64::INFINITY, f64::min);
                let n = table
                    .entries
                    .iter()
                    .find(|(_, e)| *e == min_error)
                    .map_or(n_max, |(n, _)| *n);
                Ok(n.min(n_max))
            }
            QuadSizingPolicy::ErrorThreshold { threshold, n_max } => {
                let table = require_table(table)?;
                let n_max = n_max.unwrap_or_else(|| table.max_ng());
                let n = table
                    .entries
                    .iter()
                    .find(|(_, e)| *e < *threshold)
                    .map_or(n_max, |(n, _)| *n);
                Ok(n.min(n_max))
            }
        }
    }

    /// Build the quadrature rule selected by the policy.
    ///
    /// Non-fixed policies use `table_kind`, the family the error table was
    /// computed with.
    pub fn make_quad(
        &self,
        table: Option<&ErrorTable>,
        table_kind: QuadType,
    ) -> Result<Quad, CkdkitError> {
        let n = self.node_count(table)?;
        match self {
            QuadSizingPolicy::Fixed { kind, .. } => Quad::new(*kind, n),
            _ => Quad::new(table_kind, n),
        }
    }
}

fn require_table(table: Option<&ErrorTable>) -> Result<&ErrorTable, CkdkitError> {
    table.ok_or_else(|| {
        CkdkitError::InvalidArgument(
            "this quadrature sizing policy requires an error table".into(),
        )
    })
}

#[cfg(test)]
mod test_quad_policy {
    use super::*;

    fn table() -> ErrorTable {
        ErrorTable::new(&[4, 8, 16], &[0.1, 0.02, 0.021]).unwrap()
    }

    #[test]
    fn test_fixed() {
        let policy = QuadSizingPolicy::Fixed {
            n: 4,
            kind: QuadType::GaussLobatto,
        };
        assert_eq!(policy.node_count(None).unwrap(), 4);
        let quad = policy.make_quad(Some(&table()), QuadType::GaussLegendre).unwrap();
        assert_eq!(quad.kind(), QuadType::GaussLobatto);
        assert_eq!(quad.len(), 4);
    }

    #[test]
    fn test_minimize_error() {
        let policy = QuadSizingPolicy::MinimizeError { n_max: None };
        assert_eq!(policy.node_count(Some(&table())).unwrap(), 8);

        let policy = QuadSizingPolicy::MinimizeError { n_max: Some(6) };
        assert_eq!(policy.node_count(Some(&table())).unwrap(), 6);
    }

    #[test]
    fn test_error_threshold() {
        let policy = QuadSizingPolicy::ErrorThreshold {
            threshold: 0.05,
            n_max: None,
        };
        assert_eq!(policy.node_count(Some(&table())).unwrap(), 8);

        let policy = QuadSizingPolicy::ErrorThreshold {
            threshold: 0.5,
            n_max: Some(4),
        };
        assert_eq!(policy.node_count(Some(&table())).unwrap(), 4);

        let policy = QuadSizingPolicy::ErrorThreshold {
            threshold: 1e-6,
            n_max: None,
        };
        assert_eq!(policy.node_count(Some(&table())).unwrap(), 16);
    }

    #[test]
    fn test_missing_table() {
        let policy = QuadSizingPolicy::MinimizeError { n_max: None };
        assert!(matches!(
            policy.node_count(None),
            Err(CkdkitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_table_kind() {
        let policy = QuadSizingPolicy::MinimizeError { n_max: None };
        let quad = policy.make_quad(Some(&table()), QuadType::GaussLobatto).unwrap();
        assert_eq!(quad.kind(), QuadType::GaussLobatto);
        assert_eq!(quad.len(), 8);
    }

    #[test]
    fn test_deserialize() {
        let policy: QuadSizingPolicy =
            serde_json::from_str(r#"{"type": "fixed", "n": 8}"#).unwrap();
        assert_eq!(
            policy,
            QuadSizingPolicy::Fixed {
                n: 8,
                kind: QuadType::GaussLegendre
            }
        );
        let policy: QuadSizingPolicy =
            serde_json::from_str(r#"{"type": "minimize_error", "n_max": 16}"#).unwrap();
        assert_eq!(policy, QuadSizingPolicy::MinimizeError { n_max: Some(16) });
    }

    #[test]
    fn test_unsorted_table() {
        let table = ErrorTable::new(&[16, 4, 8], &[0.021, 0.1, 0.02]).unwrap();
        assert_eq!(table.entries()[0], (4, 0.1));
        assert_eq!(table.max_ng(), 16);
        assert!(ErrorTable::new(&[], &[]).is_err());
        assert!(ErrorTable::new(&[1, 2], &[0.1]).is_err());
    }
}
