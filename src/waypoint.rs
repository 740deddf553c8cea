//! Waypoints and derivative bounds.

use nalgebra::DVector;

use crate::basis::MAX_DERIV;

/// A time-stamped boundary condition.
///
/// Each derivative slot holds one value per dimension. A `None` slot leaves the
/// whole derivative free at this waypoint; a NaN entry inside a slot leaves a
/// single dimension free.
///
/// # Examples
///
/// ```
/// use polytraj::Waypoint;
/// // pin position and velocity in x, leave y velocity free
/// let wp = Waypoint::new(0.5)
///     .with_pos(&[1.0, 2.0])
///     .with_vel(&[0.0, f64::NAN]);
/// assert_eq!(wp.time, 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct Waypoint {
    pub time: f64,
    pub pos: Option<DVector<f64>>,
    pub vel: Option<DVector<f64>>,
    pub acc: Option<DVector<f64>>,
    pub jerk: Option<DVector<f64>>,
    pub snap: Option<DVector<f64>>,
}

impl Waypoint {
    /// A waypoint at `time` with every derivative left free.
    pub fn new(time: f64) -> Self {
        Self {
            time,
            pos: None,
            vel: None,
            acc: None,
            jerk: None,
            snap: None,
        }
    }

    pub fn with_pos(mut self, values: &[f64]) -> Self {
        self.pos = Some(DVector::from_column_slice(values));
        self
    }

    pub fn with_vel(mut self, values: &[f64]) -> Self {
        self.vel = Some(DVector::from_column_slice(values));
        self
    }

    pub fn with_acc(mut self, values: &[f64]) -> Self {
        self.acc = Some(DVector::from_column_slice(values));
        self
    }

    pub fn with_jerk(mut self, values: &[f64]) -> Self {
        self.jerk = Some(DVector::from_column_slice(values));
        self
    }

    pub fn with_snap(mut self, values: &[f64]) -> Self {
        self.snap = Some(DVector::from_column_slice(values));
        self
    }

    /// The constrained values for derivative order `k`, if any.
    pub fn derivative(&self, k: usize) -> Option<&DVector<f64>> {
        match k {
            0 => self.pos.as_ref(),
            1 => self.vel.as_ref(),
            2 => self.acc.as_ref(),
            3 => self.jerk.as_ref(),
            4 => self.snap.as_ref(),
            _ => None,
        }
    }

    /// Projection onto a single dimension, for the decoupled solve path.
    pub(crate) fn for_dimension(&self, j: usize) -> Waypoint {
        let slice = |v: &Option<DVector<f64>>| v.as_ref().map(|v| DVector::from_element(1, v[j]));
        Waypoint {
            time: self.time,
            pos: slice(&self.pos),
            vel: slice(&self.vel),
            acc: slice(&self.acc),
            jerk: slice(&self.jerk),
            snap: slice(&self.snap),
        }
    }
}

/// Which side of an affine bound a [`Bound`] constrains.
///
/// `OneNorm` and `InfNorm` are reserved slots in the taxonomy: they validate
/// like any other bound but emit no constraint rows yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Lower,
    Upper,
    OneNorm,
    InfNorm,
}

/// The time range a bound applies to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSpan {
    /// The whole trajectory.
    All,
    /// A single instant.
    At(f64),
    /// A closed interval.
    Between(f64, f64),
}

/// An inequality bound on one derivative over a time range.
///
/// The bound is sampled over the segments its time range touches; a NaN entry
/// in `arg` skips that dimension.
#[derive(Debug, Clone)]
pub struct Bound {
    pub kind: BoundKind,
    pub derivative: usize,
    /// One entry per dimension.
    pub arg: DVector<f64>,
    pub time: TimeSpan,
}

impl Bound {
    pub fn upper(derivative: usize, arg: &[f64], time: TimeSpan) -> Self {
        Self {
            kind: BoundKind::Upper,
            derivative,
            arg: DVector::from_column_slice(arg),
            time,
        }
    }

    pub fn lower(derivative: usize, arg: &[f64], time: TimeSpan) -> Self {
        Self {
            kind: BoundKind::Lower,
            derivative,
            arg: DVector::from_column_slice(arg),
            time,
        }
    }

    /// True for plain lower/upper bounds, which constrain each dimension on
    /// its own and therefore keep a multi-dimension problem decoupled.
    pub(crate) fn axis_aligned(&self) -> bool {
        matches!(self.kind, BoundKind::Lower | BoundKind::Upper)
    }

    /// Projection onto a single dimension, for the decoupled solve path.
    pub(crate) fn for_dimension(&self, j: usize) -> Bound {
        Bound {
            kind: self.kind,
            derivative: self.derivative,
            arg: DVector::from_element(1, self.arg[j]),
            time: self.time,
        }
    }

    /// Derivative orders above [`MAX_DERIV`] can never be bounded.
    pub(crate) fn validate_derivative(&self) -> Result<(), crate::error::TrajError> {
        if self.derivative > MAX_DERIV {
            return Err(crate::error::TrajError::DerivativeUnsupported(self.derivative));
        }
        Ok(())
    }
}
