//! The generated trajectory: per-segment coefficient tensors plus
//! physical-time evaluation.

use nalgebra::{DMatrix, DVector};

use crate::basis::{powers_desc, DiffOps, MAX_DERIV};
use crate::error::TrajError;
use crate::problem::block_start;

/// Piecewise polynomial in normalized time with per-segment durations.
///
/// For each derivative order k in `0..=4` and each segment, the trajectory
/// stores an `(order+1) × ndim` coefficient block, highest degree first.
/// Derivative blocks are taken in normalized time; evaluation divides by
/// `durationᵏ` to return physical-time values.
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// `coeffs[deriv][seg]`, each `(order+1) × ndim`.
    coeffs: Vec<Vec<DMatrix<f64>>>,
    durations: Vec<f64>,
    keytimes: Vec<f64>,
}

impl Trajectory {
    /// Package a flat decision vector into per-segment blocks and precompute
    /// the derivative tensors `D[k] · poly`.
    pub(crate) fn from_solution(
        x: &DVector<f64>,
        ndim: usize,
        nseg: usize,
        keytimes: Vec<f64>,
        ops: &DiffOps,
    ) -> Self {
        let n = ops.order();
        let mut primary = Vec::with_capacity(nseg);
        for s in 0..nseg {
            let mut block = DMatrix::zeros(n + 1, ndim);
            for j in 0..ndim {
                let c0 = block_start(j, s, ndim, n);
                for c in 0..=n {
                    block[(c, j)] = x[c0 + c];
                }
            }
            primary.push(block);
        }

        let mut coeffs = vec![primary];
        for k in 1..=MAX_DERIV {
            let dk = &ops.all()[k];
            let blocks = coeffs[0].iter().map(|c0| dk * c0).collect();
            coeffs.push(blocks);
        }

        let durations = keytimes.windows(2).map(|w| w[1] - w[0]).collect();
        Self { coeffs, durations, keytimes }
    }

    /// Stack single-dimension trajectories over the same keytimes side by side.
    pub(crate) fn concatenate(parts: &[Trajectory]) -> Trajectory {
        let nseg = parts[0].segments();
        let n = parts[0].order();
        let d = parts.len();

        let mut coeffs = Vec::with_capacity(MAX_DERIV + 1);
        for k in 0..=MAX_DERIV {
            let mut per_seg = Vec::with_capacity(nseg);
            for s in 0..nseg {
                let mut block = DMatrix::zeros(n + 1, d);
                for (j, part) in parts.iter().enumerate() {
                    block.column_mut(j).copy_from(&part.coeffs[k][s].column(0));
                }
                per_seg.push(block);
            }
            coeffs.push(per_seg);
        }

        Trajectory {
            coeffs,
            durations: parts[0].durations.clone(),
            keytimes: parts[0].keytimes.clone(),
        }
    }

    pub fn order(&self) -> usize {
        self.coeffs[0][0].nrows() - 1
    }

    pub fn ndim(&self) -> usize {
        self.coeffs[0][0].ncols()
    }

    pub fn segments(&self) -> usize {
        self.coeffs[0].len()
    }

    pub fn durations(&self) -> &[f64] {
        &self.durations
    }

    pub fn keytimes(&self) -> &[f64] {
        &self.keytimes
    }

    /// Normalized-time coefficients of the `deriv`-th derivative on `seg`,
    /// one column per dimension, highest degree first.
    pub fn coefficients(&self, seg: usize, deriv: usize) -> &DMatrix<f64> {
        &self.coeffs[deriv][seg]
    }

    /// The segment a query time falls into. Queries on an interior knot
    /// resolve to the segment ending there; queries outside the trajectory
    /// clamp to the first or last segment.
    fn segment_index(&self, t: f64) -> usize {
        let nseg = self.segments();
        if t <= self.keytimes[0] {
            return 0;
        }
        if t >= self.keytimes[nseg] {
            return nseg - 1;
        }
        let mut idx = nseg - 1;
        for s in 0..nseg {
            if t <= self.keytimes[s + 1] {
                idx = s;
                break;
            }
        }
        idx
    }

    fn eval(&self, t: f64, deriv: usize) -> DVector<f64> {
        let s = self.segment_index(t);
        let t = t.clamp(self.keytimes[0], self.keytimes[self.segments()]);
        let dt = self.durations[s];
        let tau = (t - self.keytimes[s]) / dt;
        let row = powers_desc(tau, self.order()) * &self.coeffs[deriv][s];
        DVector::from_iterator(self.ndim(), row.iter().copied()) / dt.powi(deriv as i32)
    }

    /// Value of the `deriv`-th physical-time derivative at time `t`.
    ///
    /// Times outside the trajectory clamp to the nearest endpoint, so the
    /// result is always well defined.
    pub fn value(&self, t: f64, deriv: usize) -> Result<DVector<f64>, TrajError> {
        if deriv > MAX_DERIV {
            return Err(TrajError::DerivativeUnsupported(deriv));
        }
        Ok(self.eval(t, deriv))
    }

    /// Convenience accessor for the position at time `t`.
    pub fn position(&self, t: f64) -> DVector<f64> {
        self.eval(t, 0)
    }

    /// Convenience accessor for the velocity at time `t`.
    pub fn velocity(&self, t: f64) -> DVector<f64> {
        self.eval(t, 1)
    }

    /// Convenience accessor for the acceleration at time `t`.
    pub fn acceleration(&self, t: f64) -> DVector<f64> {
        self.eval(t, 2)
    }

    /// Convenience accessor for the jerk at time `t`.
    pub fn jerk(&self, t: f64) -> DVector<f64> {
        self.eval(t, 3)
    }

    /// Convenience accessor for the snap at time `t`.
    pub fn snap(&self, t: f64) -> DVector<f64> {
        self.eval(t, 4)
    }

    /// Sample the `deriv`-th derivative over `[start, end]` with the given
    /// step, returning `(t, value)` pairs.
    ///
    /// Panics if `end <= start` or `step <= 0`.
    pub fn values(
        &self,
        start: f64,
        end: f64,
        step: f64,
        deriv: usize,
    ) -> Result<Vec<(f64, DVector<f64>)>, TrajError> {
        if end <= start {
            panic!("End must not be before start");
        }
        if step <= 0.0 {
            panic!("Step must be positive");
        }

        let mut samples = Vec::new();
        let mut t = start;
        loop {
            samples.push((t, self.value(t, deriv)?));
            t += step;
            if t > end {
                break;
            }
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert::close;

    /// p(τ) = τ² + 2τ + 3 over a single duration-2 segment.
    fn quadratic() -> Trajectory {
        let ops = DiffOps::new(2);
        let x = DVector::from_column_slice(&[1.0, 2.0, 3.0]);
        Trajectory::from_solution(&x, 1, 1, vec![0.0, 2.0], &ops)
    }

    #[test]
    fn derivative_tensors_follow_the_operators() {
        let traj = quadratic();
        let d1 = traj.coefficients(0, 1);
        close(d1[(0, 0)], 0.0, 1e-12);
        close(d1[(1, 0)], 2.0, 1e-12);
        close(d1[(2, 0)], 2.0, 1e-12);

        let d2 = traj.coefficients(0, 2);
        close(d2[(2, 0)], 2.0, 1e-12);
        close(d2.column(0).sum(), 2.0, 1e-12);

        // third derivative of a quadratic vanishes
        close(traj.coefficients(0, 3).column(0).sum(), 0.0, 1e-12);
    }

    #[test]
    fn evaluation_rescales_into_physical_time() {
        let traj = quadratic();
        // τ = 0.5 at t = 1
        close(traj.position(1.0)[0], 4.25, 1e-12);
        close(traj.velocity(1.0)[0], 1.5, 1e-12);
        close(traj.acceleration(1.0)[0], 0.5, 1e-12);
    }

    #[test]
    fn queries_outside_the_range_clamp() {
        let traj = quadratic();
        close(traj.position(-1.0)[0], 3.0, 1e-12);
        close(traj.position(5.0)[0], 6.0, 1e-12);
    }

    #[test]
    fn knot_queries_use_the_left_segment() {
        let ops = DiffOps::new(1);
        // two linear segments with different slopes sharing the knot value
        let x = DVector::from_column_slice(&[1.0, 0.0, 2.0, 1.0]);
        let traj = Trajectory::from_solution(&x, 1, 2, vec![0.0, 1.0, 2.0], &ops);
        assert_eq!(traj.segment_index(1.0), 0);
        close(traj.position(1.0)[0], 1.0, 1e-12);
        close(traj.velocity(1.5)[0], 2.0, 1e-12);
    }

    #[test]
    fn derivatives_past_snap_are_rejected() {
        let traj = quadratic();
        assert!(matches!(
            traj.value(0.5, 5),
            Err(TrajError::DerivativeUnsupported(5))
        ));
    }

    #[test]
    fn sampling_covers_the_range() {
        let traj = quadratic();
        let samples = traj.values(0.0, 2.0, 0.5, 0).unwrap();
        assert_eq!(samples.len(), 5);
        close(samples[0].0, 0.0, 1e-12);
        close(samples[4].0, 2.0, 1e-12);
    }

    #[test]
    #[should_panic]
    fn sampling_rejects_a_reversed_range() {
        let traj = quadratic();
        let _ = traj.values(2.0, 1.0, 0.5, 0);
    }

    #[test]
    #[should_panic]
    fn sampling_rejects_a_bad_step() {
        let traj = quadratic();
        let _ = traj.values(0.0, 2.0, -0.5, 0);
    }
}
