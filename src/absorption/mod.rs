//! # Absorption data
//!
//! Access to absorption coefficient databases:
//!
//! * [`schema`]: conventions of the absorption datasets (variables, units, error tables),
//! * [`index`]: the on-disk index tables and the file lookup mesh,
//! * [`cache`]: the bounded cache of loaded datasets,
//! * [`thermoprops`]: thermophysical profiles the coefficients are evaluated for,
//! * [`error_handling`]: what to do when a profile falls outside a dataset,
//! * [`registry`]: databases known by name,
//! * [`database`]: the [`AbsorptionDatabase`] tying it all together.

pub mod cache;
pub mod database;
pub mod error_handling;
pub mod index;
pub(crate) mod interp;
pub mod registry;
pub mod schema;
pub mod thermoprops;

pub use cache::CacheStats;
pub use database::{AbsorptionDatabase, DatabaseOptions, DatabaseSpec};
pub use error_handling::{
    ErrorHandlingAction, ErrorHandlingConfiguration, ErrorHandlingPolicy, InterpolationIssue,
};
pub use index::{FileIndex, IndexRow, SpectralCoverage, SpectralLookupMode};
pub use thermoprops::ThermoProfile;
