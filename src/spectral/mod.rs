//! # Spectral discretization
//!
//! Everything related to the spectral dimension of a computation:
//!
//! * [`index`]: spectral indices and the spectral mode,
//! * [`response`]: spectral response functions,
//! * [`bin`]: CKD bins and bin sets,
//! * [`grid`]: monochromatic and CKD grids, selection and traversal,
//! * [`quad_policy`]: quadrature sizing from error tables,
//! * [`aggregate`]: folding CKD node results back into bin values.

pub mod aggregate;
pub mod bin;
pub mod grid;
pub mod index;
pub mod quad_policy;
pub mod response;

pub use bin::{Bin, BinSet};
pub use grid::{CkdGrid, FixBounds, MonoGrid, SpectralGrid};
pub use index::{SpectralIndex, SpectralMode};
pub use quad_policy::{ErrorTable, QuadSizingPolicy};
pub use response::SpectralResponse;
