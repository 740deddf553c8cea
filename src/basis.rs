//! Monomial basis in normalized time and its differential operators.

use nalgebra::{DMatrix, RowDVector};

use crate::error::TrajError;

/// Highest derivative order handled anywhere in the crate (snap).
pub const MAX_DERIV: usize = 4;

/// Precomputed differential operator matrices for one polynomial order.
///
/// With coefficients ordered highest degree first, `d(k)` maps the coefficients
/// of a polynomial to the coefficients of its k-th derivative in the same
/// basis. Equivalently, `[τⁿ, …, τ, 1] · d(k)` is the row that evaluates the
/// k-th derivative at τ when dotted with the original coefficients; both views
/// are used during assembly.
#[derive(Debug, Clone)]
pub struct DiffOps {
    order: usize,
    d: Vec<DMatrix<f64>>,
}

impl DiffOps {
    /// Build `D[0..=4]` for polynomials of the given order.
    pub fn new(order: usize) -> Self {
        let n = order;
        let mut d1 = DMatrix::zeros(n + 1, n + 1);
        for i in 0..n {
            // d/dτ τ^{n-i} = (n-i) τ^{n-i-1}: the factor lands one slot lower
            d1[(i + 1, i)] = (n - i) as f64;
        }

        let mut d = Vec::with_capacity(MAX_DERIV + 1);
        d.push(DMatrix::identity(n + 1, n + 1));
        for k in 1..=MAX_DERIV {
            let next = &d[k - 1] * &d1;
            d.push(next);
        }
        Self { order, d }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// The operator for the k-th derivative, or `DerivativeUnsupported` for k > 4.
    pub fn d(&self, k: usize) -> Result<&DMatrix<f64>, TrajError> {
        self.d.get(k).ok_or(TrajError::DerivativeUnsupported(k))
    }

    /// All operators, index = derivative order.
    pub(crate) fn all(&self) -> &[DMatrix<f64>] {
        &self.d
    }

    /// Row vector `[τⁿ, …, τ, 1] · D[k]`.
    pub fn basis_row(&self, tau: f64, k: usize) -> Result<RowDVector<f64>, TrajError> {
        Ok(powers_desc(tau, self.order) * self.d(k)?)
    }

    /// Stacked basis rows for several sample points, one row per sample.
    pub fn basis_block(&self, taus: &[f64], k: usize) -> Result<DMatrix<f64>, TrajError> {
        let d = self.d(k)?;
        let mut block = DMatrix::zeros(taus.len(), self.order + 1);
        for (i, &tau) in taus.iter().enumerate() {
            block.row_mut(i).copy_from(&(powers_desc(tau, self.order) * d));
        }
        Ok(block)
    }
}

/// Monomial powers of `tau`, highest degree first.
pub(crate) fn powers_desc(tau: f64, order: usize) -> RowDVector<f64> {
    RowDVector::from_iterator(order + 1, (0..=order).map(|c| tau.powi((order - c) as i32)))
}
