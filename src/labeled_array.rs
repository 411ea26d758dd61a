//! # Arrays with named dimensions
//!
//! [`LabeledArray`] pairs an [`ndarray::ArrayD`] with one name per axis, which
//! is all the absorption lookup needs to select and interpolate along dataset
//! coordinates (`w`, `g`, `p`, `t`, `x_*`) without tracking axis positions by
//! hand.
//!
//! Interpolation is split in two steps:
//!
//! 1. [`bracket`] locates each requested coordinate value in the coordinate
//!    array and returns a [`Bracket`], which is either the pair of enclosing
//!    nodes with the linear weight, or [`Bracket::OutOfBounds`].
//! 2. [`LabeledArray::interp`] applies the brackets, writing a fill value where
//!    the request is out of bounds.
//!
//! Out-of-bounds requests are thus explicit values that the caller can inspect
//! (and report or reject) before the interpolation happens.

use ndarray::{ArrayD, Axis, IxDyn};

use crate::ckdkit_errors::CkdkitError;

/// Position of a value in a monotonic coordinate array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bracket {
    /// `value = coords[lo] * (1 - frac) + coords[hi] * frac`
    Inside { lo: usize, hi: usize, frac: f64 },
    OutOfBounds,
}

impl Bracket {
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Bracket::OutOfBounds)
    }
}

fn bracket_ascending(coords: &[f64], x: f64) -> Bracket {
    let n = coords.len();
    if x < coords[0] || x > coords[n - 1] {
        return Bracket::OutOfBounds;
    }
    // First node strictly above x
    let i = coords.partition_point(|c| *c <= x);
    if i == n {
        return Bracket::Inside {
            lo: n - 2,
            hi: n - 1,
            frac: 1.0,
        };
    }
    let (lo, hi) = (i - 1, i);
    Bracket::Inside {
        lo,
        hi,
        frac: (x - coords[lo]) / (coords[hi] - coords[lo]),
    }
}

/// Locate `x` in `coords`, which must be strictly monotonic (ascending or
/// descending).
pub fn bracket(coords: &[f64], x: f64) -> Bracket {
    let n = coords.len();
    if n == 0 || x.is_nan() {
        return Bracket::OutOfBounds;
    }
    if n == 1 {
        return if x == coords[0] {
            Bracket::Inside {
                lo: 0,
                hi: 0,
                frac: 0.0,
            }
        } else {
            Bracket::OutOfBounds
        };
    }
    if coords[0] <= coords[n - 1] {
        return bracket_ascending(coords, x);
    }
    let reversed: Vec<f64> = coords.iter().rev().copied().collect();
    match bracket_ascending(&reversed, x) {
        Bracket::Inside { lo, hi, frac } => Bracket::Inside {
            lo: n - 1 - hi,
            hi: n - 1 - lo,
            frac: 1.0 - frac,
        },
        Bracket::OutOfBounds => Bracket::OutOfBounds,
    }
}

/// Index of the coordinate closest to `x` (first one on ties).
pub fn nearest(coords: &[f64], x: f64) -> Option<usize> {
    coords
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - x).abs().total_cmp(&(*b - x).abs()))
        .map(|(i, _)| i)
}

/// Where the interpolated values go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpTarget<'a> {
    /// Replace the interpolated axis by a new axis with one entry per bracket.
    Replace(&'a str),
    /// Interpolate pointwise along an existing axis: entry `k` of that axis is
    /// interpolated with bracket `k`, and the interpolated axis disappears.
    Along(&'a str),
}

/// N-dimensional `f64` array with named axes.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArray {
    dims: Vec<String>,
    data: ArrayD<f64>,
}

impl LabeledArray {
    pub fn new(dims: Vec<String>, data: ArrayD<f64>) -> Result<Self, CkdkitError> {
        if dims.len() != data.ndim() {
            return Err(CkdkitError::SchemaMismatch(format!(
                "{} dimension names for an array of rank {}",
                dims.len(),
                data.ndim()
            )));
        }
        Ok(LabeledArray { dims, data })
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.axis_of(dim).is_some()
    }

    pub fn len_of(&self, dim: &str) -> Option<usize> {
        self.axis_of(dim).map(|a| self.data.len_of(Axis(a)))
    }

    fn require_axis(&self, dim: &str) -> Result<usize, CkdkitError> {
        self.axis_of(dim).ok_or_else(|| {
            CkdkitError::MissingCoordinate(format!(
                "dimension '{dim}' not found in array with dimensions {:?}",
                self.dims
            ))
        })
    }

    /// Select one entry along `dim`, dropping the dimension.
    pub fn isel(&self, dim: &str, index: usize) -> Result<Self, CkdkitError> {
        let axis = self.require_axis(dim)?;
        if index >= self.data.len_of(Axis(axis)) {
            return Err(CkdkitError::InvalidArgument(format!(
                "index {index} out of range for dimension '{dim}' of length {}",
                self.data.len_of(Axis(axis))
            )));
        }
        let mut dims = self.dims.clone();
        dims.remove(axis);
        Ok(LabeledArray {
            dims,
            data: self.data.index_axis(Axis(axis), index).to_owned(),
        })
    }

    /// Select several entries along `dim`, keeping the dimension.
    pub fn take(&self, dim: &str, indices: &[usize]) -> Result<Self, CkdkitError> {
        let axis = self.require_axis(dim)?;
        let len = self.data.len_of(Axis(axis));
        if let Some(i) = indices.iter().find(|i| **i >= len) {
            return Err(CkdkitError::InvalidArgument(format!(
                "index {i} out of range for dimension '{dim}' of length {len}"
            )));
        }
        Ok(LabeledArray {
            dims: self.dims.clone(),
            data: self.data.select(Axis(axis), indices),
        })
    }

    /// Linear interpolation along `dim`.
    ///
    /// Arguments
    /// -----------------
    /// * `dim`: the interpolated dimension.
    /// * `brackets`: one [`Bracket`] per requested value, computed with
    ///   [`bracket`] against the coordinate of `dim`.
    /// * `fill`: value written for out-of-bounds brackets.
    /// * `target`: layout of the result, see [`InterpTarget`].
    ///
    /// Return
    /// ----------
    /// * The interpolated array, or an error if a dimension is missing or the
    ///   number of brackets does not match the length of the `Along` axis.
    pub fn interp(
        &self,
        dim: &str,
        brackets: &[Bracket],
        fill: f64,
        target: InterpTarget<'_>,
    ) -> Result<Self, CkdkitError> {
        let a = self.require_axis(dim)?;
        match target {
            InterpTarget::Replace(new_dim) => {
                let mut shape = self.data.shape().to_vec();
                shape[a] = brackets.len();
                let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
                for (k, b) in brackets.iter().enumerate() {
                    let mut lane = out.index_axis_mut(Axis(a), k);
                    match *b {
                        Bracket::Inside { lo, hi, frac } => {
                            let v_lo = self.data.index_axis(Axis(a), lo);
                            let v_hi = self.data.index_axis(Axis(a), hi);
                            lane.assign(&(&v_lo * (1.0 - frac) + &(&v_hi * frac)));
                        }
                        Bracket::OutOfBounds => lane.fill(fill),
                    }
                }
                let mut dims = self.dims.clone();
                dims[a] = new_dim.to_string();
                Ok(LabeledArray { dims, data: out })
            }
            InterpTarget::Along(along) => {
                let b = self.require_axis(along)?;
                if a == b {
                    return Err(CkdkitError::InvalidArgument(format!(
                        "cannot interpolate '{dim}' along itself"
                    )));
                }
                let n = self.data.len_of(Axis(b));
                if brackets.len() != n {
                    return Err(CkdkitError::SchemaMismatch(format!(
                        "{} interpolation points for dimension '{along}' of length {n}",
                        brackets.len()
                    )));
                }

                let mut shape = self.data.shape().to_vec();
                shape.remove(a);
                let b_out = if b > a { b - 1 } else { b };
                let a_in = if a > b { a - 1 } else { a };
                let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
                for (k, br) in brackets.iter().enumerate() {
                    let slice = self.data.index_axis(Axis(b), k);
                    let mut lane = out.index_axis_mut(Axis(b_out), k);
                    match *br {
                        Bracket::Inside { lo, hi, frac } => {
                            let v_lo = slice.index_axis(Axis(a_in), lo);
                            let v_hi = slice.index_axis(Axis(a_in), hi);
                            lane.assign(&(&v_lo * (1.0 - frac) + &(&v_hi * frac)));
                        }
                        Bracket::OutOfBounds => lane.fill(fill),
                    }
                }
                let mut dims = self.dims.clone();
                dims.remove(a);
                Ok(LabeledArray { dims, data: out })
            }
        }
    }

    /// Append a new trailing dimension of length `len`, repeating the data.
    pub fn broadcast_dim(&self, dim: &str, len: usize) -> Self {
        let mut shape = self.data.shape().to_vec();
        shape.push(len);
        let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
        let last = shape.len() - 1;
        for k in 0..len {
            out.index_axis_mut(Axis(last), k).assign(&self.data);
        }
        let mut dims = self.dims.clone();
        dims.push(dim.to_string());
        LabeledArray { dims, data: out }
    }

    /// Reorder the axes; `order` must name every dimension exactly once.
    pub fn transpose(&self, order: &[&str]) -> Result<Self, CkdkitError> {
        if order.len() != self.dims.len() {
            return Err(CkdkitError::SchemaMismatch(format!(
                "cannot transpose dimensions {:?} to {order:?}",
                self.dims
            )));
        }
        let axes = order
            .iter()
            .map(|d| self.require_axis(d))
            .collect::<Result<Vec<usize>, _>>()?;
        Ok(LabeledArray {
            dims: order.iter().map(|d| d.to_string()).collect(),
            data: self.data.clone().permuted_axes(IxDyn(&axes)),
        })
    }
}
