use thiserror::Error;

/// Errors surfaced while validating inputs, assembling the QP or setting up a solve.
///
/// Solver-quality problems (a singular KKT system, a non-optimal backend exit)
/// are not errors: the former falls back to the numerical path, the latter is
/// reported through the exit flag. Both emit a `log::warn!`.
#[derive(Debug, Error)]
pub enum TrajError {
    /// A required option was left empty.
    #[error("missing required option `{0}`")]
    ConfigMissing(&'static str),

    /// Two related inputs disagree about the number of dimensions.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Waypoint times must be strictly increasing.
    #[error("waypoint time at index {index} does not increase")]
    NonMonotonicTime { index: usize },

    /// Derivatives beyond snap are not supported anywhere in the crate.
    #[error("derivative order {0} exceeds the supported maximum of 4")]
    DerivativeUnsupported(usize),

    /// A bound refers to times outside the trajectory.
    #[error("bound interval [{t0}, {t1}] lies outside the trajectory time range")]
    OutOfRange { t0: f64, t1: f64 },

    /// A trajectory needs at least one segment.
    #[error("at least two waypoints are required, got {0}")]
    TooFewWaypoints(usize),

    /// The numerical backend could not be set up for this problem.
    #[error("QP solver failed: {0}")]
    SolverFailed(String),
}
