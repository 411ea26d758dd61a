//! # Quadrature rules on the reference interval [-1, 1]
//!
//! A [`Quad`] is an immutable set of nodes and weights. Two families are
//! supported, selected with [`QuadType`]:
//!
//! * **Gauss-Legendre**: `n` interior nodes, exact for polynomials of degree
//!   up to `2n - 1`.
//! * **Gauss-Lobatto**: `n ≥ 2` nodes including both endpoints, exact for
//!   polynomials of degree up to `2n - 3`.
//!
//! ## Node computation
//!
//! Nodes are obtained with the Golub–Welsch method: they are the eigenvalues
//! of the symmetric tridiagonal Jacobi matrix of the relevant orthogonal
//! polynomial family (computed with [`nalgebra::SymmetricEigen`]). Each node is
//! then polished with a few Newton iterations against the Legendre recurrence
//! and the weights are taken from their closed forms:
//!
//! * Gauss-Legendre: `w_i = 2 / ((1 - x_i²) P'_n(x_i)²)`
//! * Gauss-Lobatto: `w_i = 2 / (n (n - 1) P_{n-1}(x_i)²)`, endpoints `2 / (n (n - 1))`
//!
//! ## Mapping to an interval
//!
//! [`Quad::eval_nodes`] maps nodes to `[a, b]` with `0.5 (a + b + (b - a) x)` and
//! [`Quad::integrate`] scales the weighted sum by `(b - a) / 2`.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::ckdkit_errors::CkdkitError;

/// Maximum number of Newton iterations used to polish a node
const NEWTON_MAX_ITER: usize = 10;

/// Quadrature family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuadType {
    #[default]
    GaussLegendre,
    GaussLobatto,
}

impl QuadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuadType::GaussLegendre => "gauss_legendre",
            QuadType::GaussLobatto => "gauss_lobatto",
        }
    }
}

impl FromStr for QuadType {
    type Err = CkdkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gauss_legendre" => Ok(QuadType::GaussLegendre),
            "gauss_lobatto" => Ok(QuadType::GaussLobatto),
            other => Err(CkdkitError::UnknownQuadratureType(other.to_string())),
        }
    }
}

impl fmt::Display for QuadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quadrature rule on [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    kind: QuadType,
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl Quad {
    /// Build the `n`-point rule of the requested family.
    ///
    /// Arguments
    /// -----------------
    /// * `kind`: quadrature family.
    /// * `n`: number of nodes (`≥ 1` for Gauss-Legendre, `≥ 2` for Gauss-Lobatto).
    ///
    /// Return
    /// ----------
    /// * The rule, or [`CkdkitError::InvalidArgument`] if `n` is too small.
    pub fn new(kind: QuadType, n: usize) -> Result<Self, CkdkitError> {
        let (nodes, weights) = match kind {
            QuadType::GaussLegendre => gauss_legendre_rule(n)?,
            QuadType::GaussLobatto => gauss_lobatto_rule(n)?,
        };
        Ok(Quad {
            kind,
            nodes,
            weights,
        })
    }

    pub fn gauss_legendre(n: usize) -> Result<Self, CkdkitError> {
        Self::new(QuadType::GaussLegendre, n)
    }

    pub fn gauss_lobatto(n: usize) -> Result<Self, CkdkitError> {
        Self::new(QuadType::GaussLobatto, n)
    }

    /// Wrap externally computed nodes and weights.
    pub fn from_nodes_weights(
        kind: QuadType,
        nodes: Vec<f64>,
        weights: Vec<f64>,
    ) -> Result<Self, CkdkitError> {
        if nodes.len() != weights.len() {
            return Err(CkdkitError::SchemaMismatch(format!(
                "quadrature has {} nodes but {} weights",
                nodes.len(),
                weights.len()
            )));
        }
        if nodes.is_empty() {
            return Err(CkdkitError::InvalidArgument(
                "quadrature rule must have at least one node".into(),
            ));
        }
        Ok(Quad {
            kind,
            nodes,
            weights,
        })
    }

    pub fn kind(&self) -> QuadType {
        self.kind
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes mapped to `interval`, or the raw nodes if `interval` is `None`.
    pub fn eval_nodes(&self, interval: Option<(f64, f64)>) -> Vec<f64> {
        match interval {
            None => self.nodes.clone(),
            Some((a, b)) => self
                .nodes
                .iter()
                .map(|x| 0.5 * (a + b + (b - a) * x))
                .collect(),
        }
    }

    /// Weighted sum of `values` sampled at the nodes.
    ///
    /// Arguments
    /// -----------------
    /// * `values`: function values at [`Quad::eval_nodes`], one per node.
    /// * `interval`: integration interval; `None` integrates over [-1, 1].
    ///
    /// Return
    /// ----------
    /// * The approximated integral, or [`CkdkitError::SchemaMismatch`] if the
    ///   number of values differs from the number of nodes.
    pub fn integrate(
        &self,
        values: &[f64],
        interval: Option<(f64, f64)>,
    ) -> Result<f64, CkdkitError> {
        if values.len() != self.weights.len() {
            return Err(CkdkitError::SchemaMismatch(format!(
                "expected {} values for a {}-point quadrature, got {}",
                self.weights.len(),
                self.weights.len(),
                values.len()
            )));
        }
        let sum: f64 = self.weights.iter().zip(values).map(|(w, v)| w * v).sum();
        Ok(match interval {
            None => sum,
            Some((a, b)) => 0.5 * (b - a) * sum,
        })
    }

    pub fn pretty_repr(&self) -> String {
        format!("{} [{}]", self.kind, self.len())
    }
}

impl Default for Quad {
    /// Two-point Gauss-Legendre rule.
    fn default() -> Self {
        let x = 1.0 / 3f64.sqrt();
        Quad {
            kind: QuadType::GaussLegendre,
            nodes: vec![-x, x],
            weights: vec![1.0, 1.0],
        }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty_repr())
    }
}

// -------------------------------------------------------------------------------------------------
// Legendre polynomials
// -------------------------------------------------------------------------------------------------

/// Evaluate `(P_n(x), P_{n-1}(x))` with the three-term recurrence.
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }
    let mut p_prev = 1.0;
    let mut p = x;
    for k in 1..n {
        let k = k as f64;
        let p_next = ((2.0 * k + 1.0) * x * p - k * p_prev) / (k + 1.0);
        p_prev = p;
        p = p_next;
    }
    (p, p_prev)
}

/// `P_n'(x)` for `|x| < 1`.
fn legendre_derivative(n: usize, x: f64) -> f64 {
    let (p, p_prev) = legendre_pair(n, x);
    n as f64 * (x * p - p_prev) / (x * x - 1.0)
}

/// `P_n''(x)` for `|x| < 1`, from the Legendre differential equation.
fn legendre_second_derivative(n: usize, x: f64) -> f64 {
    let (p, _) = legendre_pair(n, x);
    let dp = legendre_derivative(n, x);
    let nf = n as f64;
    (2.0 * x * dp - nf * (nf + 1.0) * p) / (1.0 - x * x)
}

/// Eigenvalues of the symmetric tridiagonal matrix with zero diagonal and the
/// given off-diagonal, sorted ascending.
fn tridiagonal_eigenvalues(off_diagonal: &[f64]) -> Vec<f64> {
    let m = off_diagonal.len() + 1;
    let mut jacobi = DMatrix::<f64>::zeros(m, m);
    for (k, b) in off_diagonal.iter().enumerate() {
        jacobi[(k, k + 1)] = *b;
        jacobi[(k + 1, k)] = *b;
    }
    let mut eigenvalues: Vec<f64> =
        SymmetricEigen::new(jacobi).eigenvalues.iter().copied().collect();
    eigenvalues.sort_by(f64::total_cmp);
    eigenvalues
}

/// Enforce the symmetry of a rule about the origin.
fn symmetrize(nodes: &mut [f64], weights: &mut [f64]) {
    let n = nodes.len();
    for i in 0..n / 2 {
        let j = n - 1 - i;
        let x = 0.5 * (nodes[j] - nodes[i]);
        nodes[i] = -x;
        nodes[j] = x;
        let w = 0.5 * (weights[i] + weights[j]);
        weights[i] = w;
        weights[j] = w;
    }
    if n % 2 == 1 {
        nodes[n / 2] = 0.0;
    }
}

fn gauss_legendre_rule(n: usize) -> Result<(Vec<f64>, Vec<f64>), CkdkitError> {
    if n == 0 {
        return Err(CkdkitError::InvalidArgument(
            "Gauss-Legendre quadrature requires at least 1 node".into(),
        ));
    }

    let off_diagonal: Vec<f64> = (1..n)
        .map(|k| {
            let k = k as f64;
            k / (4.0 * k * k - 1.0).sqrt()
        })
        .collect();
    let mut nodes = tridiagonal_eigenvalues(&off_diagonal);

    for x in nodes.iter_mut() {
        for _ in 0..NEWTON_MAX_ITER {
            let (p, _) = legendre_pair(n, *x);
            let dx = p / legendre_derivative(n, *x);
            *x -= dx;
            if dx.abs() < 1e-16 {
                break;
            }
        }
    }

    let mut weights: Vec<f64> = nodes
        .iter()
        .map(|&x| {
            let dp = legendre_derivative(n, x);
            2.0 / ((1.0 - x * x) * dp * dp)
        })
        .collect();
    symmetrize(&mut nodes, &mut weights);
    Ok((nodes, weights))
}

fn gauss_lobatto_rule(n: usize) -> Result<(Vec<f64>, Vec<f64>), CkdkitError> {
    if n < 2 {
        return Err(CkdkitError::InvalidArgument(format!(
            "Gauss-Lobatto quadrature requires at least 2 nodes, got {n}"
        )));
    }

    // Interior nodes are the roots of P'_{n-1}, i.e. the Gauss-Jacobi(1, 1) nodes.
    let m = n - 2;
    let mut interior = if m == 0 {
        Vec::new()
    } else {
        let off_diagonal: Vec<f64> = (1..m)
            .map(|k| {
                let k = k as f64;
                (k * (k + 2.0) / ((2.0 * k + 1.0) * (2.0 * k + 3.0))).sqrt()
            })
            .collect();
        tridiagonal_eigenvalues(&off_diagonal)
    };

    for x in interior.iter_mut() {
        for _ in 0..NEWTON_MAX_ITER {
            let dx = legendre_derivative(n - 1, *x) / legendre_second_derivative(n - 1, *x);
            *x -= dx;
            if dx.abs() < 1e-16 {
                break;
            }
        }
    }

    let scale = 2.0 / (n * (n - 1)) as f64;
    let mut nodes = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);
    nodes.push(-1.0);
    weights.push(scale);
    for x in interior {
        let (p, _) = legendre_pair(n - 1, x);
        nodes.push(x);
        weights.push(scale / (p * p));
    }
    nodes.push(1.0);
    weights.push(scale);
    symmetrize(&mut nodes, &mut weights);
    Ok((nodes, weights))
}

#[cfg(test)]
mod test_quad {
    use super::*;
    use approx::assert_relative_eq;

    fn monomial_integral(degree: i32) -> f64 {
        // ∫_{-1}^{1} x^d dx
        if degree % 2 == 1 {
            0.0
        } else {
            2.0 / (degree as f64 + 1.0)
        }
    }

    #[test]
    fn test_gauss_legendre_exactness() {
        for n in 1..=12 {
            let quad = Quad::gauss_legendre(n).unwrap();
            for degree in 0..=(2 * n as i32 - 1) {
                let values: Vec<f64> = quad.nodes().iter().map(|x| x.powi(degree)).collect();
                let integral = quad.integrate(&values, None).unwrap();
                assert_relative_eq!(integral, monomial_integral(degree), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_gauss_lobatto_exactness() {
        for n in 2..=10 {
            let quad = Quad::gauss_lobatto(n).unwrap();
            assert_eq!(quad.nodes()[0], -1.0);
            assert_eq!(quad.nodes()[n - 1], 1.0);
            for degree in 0..=(2 * n as i32 - 3) {
                let values: Vec<f64> = quad.nodes().iter().map(|x| x.powi(degree)).collect();
                let integral = quad.integrate(&values, None).unwrap();
                assert_relative_eq!(integral, monomial_integral(degree), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_known_rules() {
        let gl2 = Quad::gauss_legendre(2).unwrap();
        let x = 1.0 / 3f64.sqrt();
        assert_relative_eq!(gl2.nodes()[0], -x, epsilon = 1e-15);
        assert_relative_eq!(gl2.nodes()[1], x, epsilon = 1e-15);
        assert_relative_eq!(gl2.weights()[0], 1.0, epsilon = 1e-15);

        assert_eq!(Quad::default().kind(), QuadType::GaussLegendre);
        assert_relative_eq!(Quad::default().nodes()[1], gl2.nodes()[1], epsilon = 1e-15);

        let gl1 = Quad::gauss_legendre(1).unwrap();
        assert_eq!(gl1.nodes(), &[0.0]);
        assert_relative_eq!(gl1.weights()[0], 2.0, epsilon = 1e-15);

        let lob3 = Quad::gauss_lobatto(3).unwrap();
        assert_eq!(lob3.nodes(), &[-1.0, 0.0, 1.0]);
        assert_relative_eq!(lob3.weights()[0], 1.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(lob3.weights()[1], 4.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(matches!(
            Quad::gauss_legendre(0),
            Err(CkdkitError::InvalidArgument(_))
        ));
        assert!(matches!(
            Quad::gauss_lobatto(1),
            Err(CkdkitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_eval_nodes_and_integrate_on_interval() {
        let quad = Quad::gauss_legendre(3).unwrap();
        let nodes = quad.eval_nodes(Some((0.0, 1.0)));
        assert!(nodes.iter().all(|x| (0.0..=1.0).contains(x)));
        assert_relative_eq!(nodes[1], 0.5, epsilon = 1e-15);

        // ∫_0^2 x^2 dx = 8/3
        let nodes = quad.eval_nodes(Some((0.0, 2.0)));
        let values: Vec<f64> = nodes.iter().map(|x| x * x).collect();
        assert_relative_eq!(
            quad.integrate(&values, Some((0.0, 2.0))).unwrap(),
            8.0 / 3.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_size_mismatch() {
        let quad = Quad::gauss_legendre(4).unwrap();
        assert!(matches!(
            quad.integrate(&[1.0, 2.0], None),
            Err(CkdkitError::SchemaMismatch(_))
        ));
        assert!(matches!(
            Quad::from_nodes_weights(QuadType::GaussLegendre, vec![0.0, 1.0], vec![1.0]),
            Err(CkdkitError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_quad_type_parse() {
        assert_eq!(
            "gauss_lobatto".parse::<QuadType>().unwrap(),
            QuadType::GaussLobatto
        );
        assert_eq!(
            "simpson".parse::<QuadType>(),
            Err(CkdkitError::UnknownQuadratureType("simpson".into()))
        );
        assert_eq!(Quad::gauss_legendre(4).unwrap().pretty_repr(), "gauss_legendre [4]");
    }
}
