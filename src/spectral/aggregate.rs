//! Aggregation of per-node CKD results into bin-level quantities.
//!
//! Values evaluated at the quadrature nodes of a bin are integrated over
//! `g ∈ [0, 1]`: with reference weights `w_i` on `[-1, 1]` the scale factor
//! is `0.5`.
//!
//! * [`AggregationMode::Value`]: `Σ w_i · 0.5 · v[i, layer]`
//! * [`AggregationMode::Variance`]: `Σ (w_i · 0.5)² · v[i, layer]`
//!
//! Node values in variance mode are per-node variance contributions, hence the
//! squared weights.

use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::ckdkit_errors::CkdkitError;
use crate::quad::Quad;

/// Scale factor from the reference interval [-1, 1] to g ∈ [0, 1]
const G_SCALE: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    #[default]
    Value,
    Variance,
}

/// Fold node values back into one value per layer.
///
/// Arguments
/// -----------------
/// * `values`: per-node values, shape `(n_nodes, n_layers)`.
/// * `quad`: quadrature rule of the bin.
/// * `mode`: value or variance algebra.
///
/// Return
/// ----------
/// * One aggregated value per layer, or [`CkdkitError::SchemaMismatch`] if
///   the node count differs from the rule's.
pub fn aggregate(
    values: ArrayView2<'_, f64>,
    quad: &Quad,
    mode: AggregationMode,
) -> Result<Array1<f64>, CkdkitError> {
    if values.nrows() != quad.len() {
        return Err(CkdkitError::SchemaMismatch(format!(
            "{} node values for a {}",
            values.nrows(),
            quad.pretty_repr()
        )));
    }
    let factors: Array1<f64> = quad
        .weights()
        .iter()
        .map(|w| match mode {
            AggregationMode::Value => w * G_SCALE,
            AggregationMode::Variance => (w * G_SCALE).powi(2),
        })
        .collect();
    Ok(values
        .axis_iter(Axis(1))
        .map(|layer| layer.dot(&factors))
        .collect())
}

#[cfg(test)]
mod test_aggregate {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_constant_value() {
        for n in [1, 2, 5, 16] {
            let quad = Quad::gauss_legendre(n).unwrap();
            let values = Array2::from_elem((n, 3), 2.5);
            let result = aggregate(values.view(), &quad, AggregationMode::Value).unwrap();
            for v in result.iter() {
                assert_relative_eq!(*v, 2.5, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_constant_variance() {
        let quad = Quad::gauss_lobatto(4).unwrap();
        let values = Array2::from_elem((4, 2), 1.5);
        let result = aggregate(values.view(), &quad, AggregationMode::Variance).unwrap();
        let expected: f64 = quad.weights().iter().map(|w| (w * 0.5).powi(2)).sum::<f64>() * 1.5;
        assert_relative_eq!(result[0], expected, epsilon = 1e-12);
        assert!(result[1] < 1.5);
    }

    #[test]
    fn test_linear_in_g() {
        // ∫_0^1 g dg = 1/2
        let quad = Quad::gauss_legendre(3).unwrap();
        let g = quad.eval_nodes(Some((0.0, 1.0)));
        let values = Array2::from_shape_fn((3, 1), |(i, _)| g[i]);
        let result = aggregate(values.view(), &quad, AggregationMode::Value).unwrap();
        assert_relative_eq!(result[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_node_count_mismatch() {
        let quad = Quad::gauss_legendre(2).unwrap();
        let values = Array2::zeros((3, 1));
        let result = aggregate(values.view(), &quad, AggregationMode::Value);
        assert!(matches!(result, Err(CkdkitError::SchemaMismatch(_))));
    }
}
