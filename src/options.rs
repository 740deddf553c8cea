//! Generator configuration.

use crate::basis::MAX_DERIV;
use crate::error::TrajError;

/// Options controlling the polynomial order, the minimized objective and the
/// solver behaviour.
///
/// `ndim` and `minderiv` have no sensible defaults and are passed to
/// [`TrajectoryOptions::new`]; every other field starts from its default and
/// can be overwritten in place before the generator is built.
#[derive(Debug, Clone)]
pub struct TrajectoryOptions {
    /// Polynomial order per segment.
    pub order: usize,
    /// Number of trajectory dimensions.
    pub ndim: usize,
    /// Per-dimension derivative order whose squared magnitude is minimized
    /// (0 = position, 2 = acceleration, 4 = snap).
    pub minderiv: Vec<usize>,
    /// Per-dimension continuity order at interior waypoints.
    /// `None` means "same as `minderiv`".
    pub contderiv: Option<Vec<usize>>,
    /// Sample count per segment when expanding inequality bounds.
    /// `None` means `2 * (order + 1)`.
    pub constraints_per_seg: Option<usize>,
    /// Force the numerical QP path. `None` means "numerical exactly when
    /// bounds are supplied".
    pub numerical: Option<bool>,
    /// Convergence tolerance handed to the numerical backend.
    pub convergetol: f64,
    /// Iteration cap for the numerical backend.
    pub max_iter: u32,
    /// Optional wall-clock limit for the numerical backend, in seconds.
    pub time_limit: Option<f64>,
    /// Let the numerical backend print its progress.
    pub verbose: bool,
}

impl TrajectoryOptions {
    pub fn new(ndim: usize, minderiv: Vec<usize>) -> Self {
        Self {
            order: 12,
            ndim,
            minderiv,
            contderiv: None,
            constraints_per_seg: None,
            numerical: None,
            convergetol: 1e-8,
            max_iter: 200,
            time_limit: None,
            verbose: true,
        }
    }

    /// Check the configuration before any assembly happens.
    pub fn validate(&self) -> Result<(), TrajError> {
        if self.ndim == 0 {
            return Err(TrajError::ConfigMissing("ndim"));
        }
        if self.minderiv.is_empty() {
            return Err(TrajError::ConfigMissing("minderiv"));
        }
        if self.minderiv.len() != self.ndim {
            return Err(TrajError::ShapeMismatch(format!(
                "minderiv has {} entries but ndim is {}",
                self.minderiv.len(),
                self.ndim
            )));
        }
        for &m in &self.minderiv {
            if m > MAX_DERIV {
                return Err(TrajError::DerivativeUnsupported(m));
            }
        }
        if let Some(cd) = &self.contderiv {
            if cd.len() != self.minderiv.len() {
                return Err(TrajError::ShapeMismatch(format!(
                    "contderiv has {} entries but minderiv has {}",
                    cd.len(),
                    self.minderiv.len()
                )));
            }
            for &k in cd {
                if k > MAX_DERIV {
                    return Err(TrajError::DerivativeUnsupported(k));
                }
            }
        }
        Ok(())
    }

    /// Continuity orders with the `minderiv` default applied.
    pub(crate) fn contderiv(&self) -> &[usize] {
        self.contderiv.as_deref().unwrap_or(&self.minderiv)
    }

    pub(crate) fn constraints_per_seg(&self) -> usize {
        self.constraints_per_seg.unwrap_or(2 * (self.order + 1))
    }

    /// Single-dimension copy for the decoupled solve path.
    pub(crate) fn for_dimension(&self, j: usize) -> Self {
        Self {
            ndim: 1,
            minderiv: vec![self.minderiv[j]],
            contderiv: self.contderiv.as_ref().map(|cd| vec![cd[j]]),
            ..self.clone()
        }
    }
}
