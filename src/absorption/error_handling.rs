//! # Interpolation error handling
//!
//! Evaluating an absorption dataset against a thermophysical profile can run
//! into three kinds of issues, for each family of coordinates (`x`: species
//! concentrations, `p`: pressure, `t`: temperature):
//!
//! * **missing**: the coordinate exists on one side only (the dataset does not
//!   depend on pressure, the profile has no concentration for a tabulated
//!   species, ...);
//! * **scalar**: the profile requests a coordinate the dataset tabulates at a
//!   single value, which cannot be interpolated;
//! * **bounds**: the requested values fall outside the tabulated range.
//!
//! Issues are detected as [`InterpolationIssue`] values and resolved with
//! [`handle`] against the [`ErrorHandlingAction`] configured for their family
//! and kind: `raise` turns the issue into an error, `warn` logs it and
//! continues, `ignore` continues silently. Out-of-bounds values continue with
//! the policy's `fill_value`.
//!
//! ## Configuration
//!
//! ```json
//! {
//!     "x": {"missing": "ignore", "scalar": "ignore", "bounds": "raise"},
//!     "p": {"missing": "raise", "scalar": "raise", "bounds": "ignore"},
//!     "t": {"missing": "raise", "scalar": "raise", "bounds": "ignore"}
//! }
//! ```

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ckdkit_errors::CkdkitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandlingAction {
    Ignore,
    Warn,
    Raise,
}

/// Actions applied to one coordinate family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandlingPolicy {
    pub missing: ErrorHandlingAction,
    pub scalar: ErrorHandlingAction,
    pub bounds: ErrorHandlingAction,
    /// Value written where an out-of-bounds request is not raised
    #[serde(default)]
    pub fill_value: f64,
}

impl ErrorHandlingPolicy {
    pub fn new(
        missing: ErrorHandlingAction,
        scalar: ErrorHandlingAction,
        bounds: ErrorHandlingAction,
    ) -> Self {
        ErrorHandlingPolicy {
            missing,
            scalar,
            bounds,
            fill_value: 0.0,
        }
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }

    /// Action configured for the kind of `issue`.
    pub fn action_for(&self, issue: &InterpolationIssue) -> ErrorHandlingAction {
        match issue {
            InterpolationIssue::Missing { .. } => self.missing,
            InterpolationIssue::Scalar { .. } => self.scalar,
            InterpolationIssue::OutOfBounds { .. } => self.bounds,
        }
    }
}

/// Policies of the concentration, pressure and temperature coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandlingConfiguration {
    pub x: ErrorHandlingPolicy,
    pub p: ErrorHandlingPolicy,
    pub t: ErrorHandlingPolicy,
}

impl Default for ErrorHandlingConfiguration {
    fn default() -> Self {
        use ErrorHandlingAction::{Ignore, Raise};
        ErrorHandlingConfiguration {
            x: ErrorHandlingPolicy::new(Ignore, Ignore, Raise),
            p: ErrorHandlingPolicy::new(Raise, Raise, Ignore),
            t: ErrorHandlingPolicy::new(Raise, Raise, Ignore),
        }
    }
}

impl ErrorHandlingConfiguration {
    pub fn from_json(json: &str) -> Result<Self, CkdkitError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Policy of the family a dataset coordinate belongs to: `p`, `t`, or `x`
    /// for every `x_*` concentration.
    pub fn policy_for(&self, dimension: &str) -> &ErrorHandlingPolicy {
        match dimension {
            crate::constants::P => &self.p,
            crate::constants::T => &self.t,
            _ => &self.x,
        }
    }
}

/// An issue met while interpolating a dataset on a profile.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationIssue {
    Missing {
        dimension: String,
        detail: String,
    },
    Scalar {
        dimension: String,
    },
    OutOfBounds {
        dimension: String,
        requested_min: f64,
        requested_max: f64,
        min: f64,
        max: f64,
    },
}

impl InterpolationIssue {
    pub fn dimension(&self) -> &str {
        match self {
            InterpolationIssue::Missing { dimension, .. }
            | InterpolationIssue::Scalar { dimension }
            | InterpolationIssue::OutOfBounds { dimension, .. } => dimension,
        }
    }

    pub fn into_error(self) -> CkdkitError {
        match self {
            InterpolationIssue::Missing { dimension, detail } => {
                CkdkitError::MissingCoordinate(format!("'{dimension}': {detail}"))
            }
            InterpolationIssue::Scalar { dimension } => CkdkitError::ScalarCoordinate(dimension),
            InterpolationIssue::OutOfBounds {
                dimension,
                requested_min,
                requested_max,
                min,
                max,
            } => CkdkitError::InterpolationOutOfBounds {
                dimension,
                requested_min,
                requested_max,
                min,
                max,
            },
        }
    }
}

impl fmt::Display for InterpolationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpolationIssue::Missing { dimension, detail } => {
                write!(f, "missing coordinate '{dimension}': {detail}")
            }
            InterpolationIssue::Scalar { dimension } => {
                write!(f, "coordinate '{dimension}' is scalar and cannot be interpolated")
            }
            InterpolationIssue::OutOfBounds {
                dimension,
                requested_min,
                requested_max,
                min,
                max,
            } => write!(
                f,
                "requested '{dimension}' range [{requested_min}, {requested_max}] \
                 exceeds the dataset range [{min}, {max}]"
            ),
        }
    }
}

/// Resolve `issue` according to `action`.
///
/// Return
/// ----------
/// * `Ok(())` when the evaluation may continue, the issue turned into an
///   error with [`ErrorHandlingAction::Raise`].
pub fn handle(action: ErrorHandlingAction, issue: InterpolationIssue) -> Result<(), CkdkitError> {
    match action {
        ErrorHandlingAction::Ignore => Ok(()),
        ErrorHandlingAction::Warn => {
            warn!("{issue}");
            Ok(())
        }
        ErrorHandlingAction::Raise => Err(issue.into_error()),
    }
}

#[cfg(test)]
mod test_error_handling {
    use super::*;

    fn out_of_bounds() -> InterpolationIssue {
        InterpolationIssue::OutOfBounds {
            dimension: "t".into(),
            requested_min: 150.0,
            requested_max: 300.0,
            min: 200.0,
            max: 350.0,
        }
    }

    #[test]
    fn test_default_configuration() {
        let config = ErrorHandlingConfiguration::default();
        assert_eq!(config.x.bounds, ErrorHandlingAction::Raise);
        assert_eq!(config.x.missing, ErrorHandlingAction::Ignore);
        assert_eq!(config.p.missing, ErrorHandlingAction::Raise);
        assert_eq!(config.t.bounds, ErrorHandlingAction::Ignore);
        assert_eq!(config.t.fill_value, 0.0);
        assert_eq!(config.policy_for("x_H2O"), &config.x);
        assert_eq!(config.policy_for("p"), &config.p);
    }

    #[test]
    fn test_from_json() {
        let config = ErrorHandlingConfiguration::from_json(
            r#"{
                "x": {"missing": "ignore", "scalar": "ignore", "bounds": "raise"},
                "p": {"missing": "raise", "scalar": "raise", "bounds": "warn", "fill_value": -1.0},
                "t": {"missing": "raise", "scalar": "raise", "bounds": "ignore"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.p.bounds, ErrorHandlingAction::Warn);
        assert_eq!(config.p.fill_value, -1.0);

        assert!(ErrorHandlingConfiguration::from_json(r#"{"x": {}}"#).is_err());
    }

    #[test]
    fn test_handle() {
        assert!(handle(ErrorHandlingAction::Ignore, out_of_bounds()).is_ok());
        assert!(handle(ErrorHandlingAction::Warn, out_of_bounds()).is_ok());
        let err = handle(ErrorHandlingAction::Raise, out_of_bounds()).unwrap_err();
        assert!(matches!(
            err,
            CkdkitError::InterpolationOutOfBounds { ref dimension, .. } if dimension == "t"
        ));

        let err = handle(
            ErrorHandlingAction::Raise,
            InterpolationIssue::Scalar {
                dimension: "x_CO2".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err, CkdkitError::ScalarCoordinate("x_CO2".into()));
    }

    #[test]
    fn test_action_for() {
        let policy = ErrorHandlingConfiguration::default().p;
        assert_eq!(policy.action_for(&out_of_bounds()), ErrorHandlingAction::Ignore);
        assert_eq!(
            policy.action_for(&InterpolationIssue::Scalar {
                dimension: "p".into()
            }),
            ErrorHandlingAction::Raise
        );
    }
}
