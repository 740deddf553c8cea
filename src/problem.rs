//! Assembly of the quadratic program from waypoints, continuity requirements
//! and derivative bounds.
//!
//! The decision vector flattens all polynomial coefficients: dimensions are
//! interleaved within each segment, so the block for `(dim j, segment s)`
//! starts at column `(j + ndim * s) * (order + 1)` and two consecutive
//! segments of the same dimension sit `ndim * (order + 1)` columns apart.

use nalgebra::{DMatrix, DVector};

use crate::basis::{DiffOps, MAX_DERIV};
use crate::error::TrajError;
use crate::options::TrajectoryOptions;
use crate::waypoint::{Bound, BoundKind, TimeSpan, Waypoint};

/// Assembled QP: minimize `xᵀ H x` subject to `Aeq x = beq`, `Aineq x ≤ bineq`.
///
/// Equality rows stack the waypoint constraints first, then the interior-knot
/// continuity rows.
#[derive(Debug, Clone)]
pub struct Problem {
    pub h: DMatrix<f64>,
    pub a_eq: DMatrix<f64>,
    pub b_eq: DVector<f64>,
    pub a_ineq: DMatrix<f64>,
    pub b_ineq: DVector<f64>,
}

/// First column of the coefficient block for `(dim, seg)`.
pub(crate) fn block_start(dim: usize, seg: usize, ndim: usize, order: usize) -> usize {
    (dim + ndim * seg) * (order + 1)
}

impl Problem {
    /// Assemble H, (Aeq, beq) and (Aineq, bineq) for the given inputs.
    ///
    /// Inputs are expected to be validated (strictly increasing times, vector
    /// lengths matching `ndim`); shape problems found during assembly still
    /// surface as [`TrajError::ShapeMismatch`].
    pub fn assemble(
        waypoints: &[Waypoint],
        bounds: &[Bound],
        options: &TrajectoryOptions,
        ops: &DiffOps,
    ) -> Result<Problem, TrajError> {
        let keytimes: Vec<f64> = waypoints.iter().map(|w| w.time).collect();
        let durations: Vec<f64> = keytimes.windows(2).map(|w| w[1] - w[0]).collect();

        let h = build_cost(options, ops, durations.len())?;
        let (e, b_e) = build_equalities(waypoints, &durations, options, ops)?;
        let (c, b_c) = build_continuity(&durations, options, ops)?;
        let (a_ineq, b_ineq) = build_inequalities(bounds, &keytimes, &durations, options, ops)?;

        let rows = e.nrows() + c.nrows();
        let mut a_eq = DMatrix::zeros(rows, e.ncols());
        a_eq.view_mut((0, 0), (e.nrows(), e.ncols())).copy_from(&e);
        a_eq.view_mut((e.nrows(), 0), (c.nrows(), c.ncols())).copy_from(&c);
        let mut b_eq = DVector::zeros(rows);
        b_eq.rows_mut(0, b_e.nrows()).copy_from(&b_e);
        b_eq.rows_mut(b_e.nrows(), b_c.nrows()).copy_from(&b_c);

        Ok(Problem { h, a_eq, b_eq, a_ineq, b_ineq })
    }

    /// Length of the decision vector, `ndim * nseg * (order + 1)`.
    pub fn num_vars(&self) -> usize {
        self.h.nrows()
    }
}

/// Block-diagonal Hessian: one `∫₀¹ (dᵐp/dτᵐ)² dτ` block per (segment,
/// dimension), taken in normalized time. Segment durations do not enter the
/// objective; the constraints already transport physical targets into
/// normalized space.
fn build_cost(
    options: &TrajectoryOptions,
    ops: &DiffOps,
    nseg: usize,
) -> Result<DMatrix<f64>, TrajError> {
    let n = options.order;
    let d = options.ndim;
    let nvar = d * nseg * (n + 1);

    let mut h = DMatrix::zeros(nvar, nvar);
    for j in 0..d {
        let block = min_deriv_block(ops, options.minderiv[j])?;
        for s in 0..nseg {
            let c0 = block_start(j, s, d, n);
            h.view_mut((c0, c0), (n + 1, n + 1)).copy_from(&block);
        }
    }
    Ok(h)
}

/// One Hessian block: the Gram matrix of the m-th derivative of the monomial
/// basis on [0, 1]. The column sums of `D[m]` give the scalar factor the
/// derivative applies to each monomial; entries whose summed exponent drops
/// below zero come from vanished derivatives and stay zero.
fn min_deriv_block(ops: &DiffOps, m: usize) -> Result<DMatrix<f64>, TrajError> {
    let n = ops.order();
    let dm = ops.d(m)?;
    let c: Vec<f64> = (0..=n).map(|i| dm.column(i).sum()).collect();

    let mut block = DMatrix::zeros(n + 1, n + 1);
    for i in 0..=n {
        for j in 0..=n {
            let p = (n - i) as i64 + (n - j) as i64 - 2 * m as i64;
            if p >= 0 {
                block[(i, j)] = c[i] * c[j] / (p as f64 + 1.0);
            }
        }
    }
    Ok(block)
}

/// Waypoint constraint rows. A waypoint attaches to the opening (τ = 0) of its
/// segment, except the terminal waypoint which attaches to the last segment at
/// τ = 1. Targets are physical-time derivatives, so the right-hand side picks
/// up `dtᵏ` when moved into normalized time.
fn build_equalities(
    waypoints: &[Waypoint],
    durations: &[f64],
    options: &TrajectoryOptions,
    ops: &DiffOps,
) -> Result<(DMatrix<f64>, DVector<f64>), TrajError> {
    let n = options.order;
    let d = options.ndim;
    let contderiv = options.contderiv();
    let nseg = durations.len();
    let nvar = d * nseg * (n + 1);

    let mut rows = 0;
    for wp in waypoints {
        for k in 0..=MAX_DERIV {
            let Some(vals) = wp.derivative(k) else { continue };
            if vals.len() != d {
                return Err(TrajError::ShapeMismatch(format!(
                    "waypoint derivative {k} has {} entries, expected {d}",
                    vals.len()
                )));
            }
            rows += (0..d)
                .filter(|&j| vals[j].is_finite() && k <= contderiv[j])
                .count();
        }
    }

    let mut e = DMatrix::zeros(rows, nvar);
    let mut b = DVector::zeros(rows);
    let mut row = 0;
    for (pt, wp) in waypoints.iter().enumerate() {
        let seg = pt.min(nseg - 1);
        let tau = (pt - seg) as f64;
        let dt = durations[seg];
        for k in 0..=MAX_DERIV {
            let Some(vals) = wp.derivative(k) else { continue };
            let basis = ops.basis_row(tau, k)?;
            for j in 0..d {
                if !vals[j].is_finite() || k > contderiv[j] {
                    continue;
                }
                let c0 = block_start(j, seg, d, n);
                e.view_mut((row, c0), (1, n + 1)).copy_from(&basis);
                b[row] = vals[j] * dt.powi(k as i32);
                row += 1;
            }
        }
    }
    debug_assert_eq!(row, rows);
    Ok((e, b))
}

/// Interior-knot continuity rows. Each side is evaluated in its own segment's
/// normalized time and divided by `dtᵏ`, which equates the physical-time
/// derivatives across the knot despite the distinct timescales.
fn build_continuity(
    durations: &[f64],
    options: &TrajectoryOptions,
    ops: &DiffOps,
) -> Result<(DMatrix<f64>, DVector<f64>), TrajError> {
    let n = options.order;
    let d = options.ndim;
    let contderiv = options.contderiv();
    let nseg = durations.len();
    let nvar = d * nseg * (n + 1);

    let per_knot: usize = contderiv.iter().map(|&k| k + 1).sum();
    let rows = nseg.saturating_sub(1) * per_knot;
    let kmax = contderiv.iter().copied().max().unwrap_or(0);

    let mut c = DMatrix::zeros(rows, nvar);
    let b = DVector::zeros(rows);
    let mut row = 0;
    for i in 1..nseg {
        let dt1 = durations[i - 1];
        let dt2 = durations[i];
        for k in 0..=kmax {
            let b_end = ops.basis_row(1.0, k)? / dt1.powi(k as i32);
            let b_start_neg = -(ops.basis_row(0.0, k)? / dt2.powi(k as i32));
            for j in 0..d {
                if k > contderiv[j] {
                    continue;
                }
                c.view_mut((row, block_start(j, i - 1, d, n)), (1, n + 1))
                    .copy_from(&b_end);
                c.view_mut((row, block_start(j, i, d, n)), (1, n + 1))
                    .copy_from(&b_start_neg);
                row += 1;
            }
        }
    }
    debug_assert_eq!(row, rows);
    Ok((c, b))
}

/// A bound reduced to a single segment with its sample times resolved.
struct SegBound {
    kind: BoundKind,
    derivative: usize,
    arg: DVector<f64>,
    seg: usize,
    times: Vec<f64>,
}

/// Greatest segment index whose opening time is at or before `t`.
fn seg_at(keytimes: &[f64], t: f64) -> usize {
    let nseg = keytimes.len() - 1;
    let mut s = 0;
    for i in 0..nseg {
        if keytimes[i] <= t {
            s = i;
        }
    }
    s
}

/// Greatest segment index whose opening time is strictly before `t`.
fn seg_before(keytimes: &[f64], t: f64) -> usize {
    let nseg = keytimes.len() - 1;
    let mut s = 0;
    for i in 0..nseg {
        if keytimes[i] < t {
            s = i;
        }
    }
    s
}

/// Samples from `t0` towards `t1` by `step`, inclusive only where the step
/// lands exactly. A collapsed interval yields the single instant.
fn sample_times(t0: f64, t1: f64, step: f64) -> Vec<f64> {
    if t1 <= t0 {
        return vec![t0];
    }
    let count = ((t1 - t0) / step + 1e-9).floor() as usize;
    (0..=count).map(|i| t0 + i as f64 * step).collect()
}

/// Stage A: resolve time spans, split multi-segment bounds at the knots they
/// cross (the tail is appended to the worklist and re-processed) and sample
/// each single-segment piece at the segment's sampling step.
fn split_bounds(
    bounds: &[Bound],
    keytimes: &[f64],
    options: &TrajectoryOptions,
) -> Result<Vec<SegBound>, TrajError> {
    let d = options.ndim;
    let cps = options.constraints_per_seg();
    let nseg = keytimes.len() - 1;
    let t_lo = keytimes[0];
    let t_hi = keytimes[nseg];

    let mut work: Vec<(BoundKind, usize, DVector<f64>, f64, f64)> = Vec::new();
    for b in bounds {
        b.validate_derivative()?;
        if b.arg.len() != d {
            return Err(TrajError::ShapeMismatch(format!(
                "bound arg has {} entries, expected {d}",
                b.arg.len()
            )));
        }
        // norm bounds are reserved and emit nothing yet
        if !b.axis_aligned() {
            continue;
        }
        let (t0, t1) = match b.time {
            TimeSpan::All => (t_lo, t_hi),
            TimeSpan::At(t) => (t, t),
            TimeSpan::Between(a, z) => (a, z),
        };
        work.push((b.kind, b.derivative, b.arg.clone(), t0, t1));
    }

    let mut out = Vec::new();
    let mut idx = 0;
    while idx < work.len() {
        let (kind, derivative, arg, t0, mut t1) = work[idx].clone();
        idx += 1;
        if t0 > t1 || t0 < t_lo || t1 > t_hi {
            return Err(TrajError::OutOfRange { t0, t1 });
        }

        let start_seg = seg_at(keytimes, t0);
        let end_seg = if t1 >= t_hi { nseg - 1 } else { seg_before(keytimes, t1) };
        if end_seg > start_seg {
            let cut = keytimes[start_seg + 1];
            work.push((kind, derivative, arg.clone(), cut, t1));
            t1 = cut;
        }

        let step = (keytimes[start_seg + 1] - keytimes[start_seg]) / cps as f64;
        out.push(SegBound {
            kind,
            derivative,
            arg,
            seg: start_seg,
            times: sample_times(t0, t1, step),
        });
    }
    Ok(out)
}

/// Stage B: emit sampled rows. The basis block is taken at the raw offsets
/// `t − keytimes[seg]` and each column is then scaled by the segment duration
/// raised to minus its monomial power, which carries both the normalization
/// and the derivative's timescale in one factor.
fn build_inequalities(
    bounds: &[Bound],
    keytimes: &[f64],
    durations: &[f64],
    options: &TrajectoryOptions,
    ops: &DiffOps,
) -> Result<(DMatrix<f64>, DVector<f64>), TrajError> {
    let n = options.order;
    let d = options.ndim;
    let nseg = durations.len();
    let nvar = d * nseg * (n + 1);

    let seg_bounds = split_bounds(bounds, keytimes, options)?;

    let rows: usize = seg_bounds
        .iter()
        .map(|sb| sb.times.len() * sb.arg.iter().filter(|a| a.is_finite()).count())
        .sum();
    let mut a = DMatrix::zeros(rows, nvar);
    let mut b = DVector::zeros(rows);

    let mut row = 0;
    for sb in &seg_bounds {
        let t_open = keytimes[sb.seg];
        let taus: Vec<f64> = sb.times.iter().map(|t| t - t_open).collect();
        let mut block = ops.basis_block(&taus, sb.derivative)?;
        let dt = durations[sb.seg];
        for c in 0..=n {
            let scale = dt.powi(-((n - c) as i32));
            for r in 0..block.nrows() {
                block[(r, c)] *= scale;
            }
        }

        let sign = if sb.kind == BoundKind::Upper { 1.0 } else { -1.0 };
        let signed = &block * sign;
        let m = sb.times.len();
        for j in 0..d {
            let val = sb.arg[j];
            if !val.is_finite() {
                continue;
            }
            let c0 = block_start(j, sb.seg, d, n);
            a.view_mut((row, c0), (m, n + 1)).copy_from(&signed);
            for i in 0..m {
                b[row + i] = sign * val;
            }
            row += m;
        }
    }
    debug_assert_eq!(row, rows);
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use assert::close;

    fn options(ndim: usize, order: usize, minderiv: Vec<usize>) -> TrajectoryOptions {
        let mut options = TrajectoryOptions::new(ndim, minderiv);
        options.order = order;
        options
    }

    #[test]
    fn block_columns_interleave_dimensions() {
        assert_eq!(block_start(0, 0, 2, 3), 0);
        assert_eq!(block_start(1, 0, 2, 3), 4);
        assert_eq!(block_start(0, 1, 2, 3), 8);
        assert_eq!(block_start(1, 2, 2, 3), 20);
    }

    #[test]
    fn equality_rows_count_finite_entries_only() {
        let options = options(2, 3, vec![2, 2]);
        let ops = DiffOps::new(3);
        let waypoints = vec![
            Waypoint::new(0.0).with_pos(&[0.0, 0.0]).with_vel(&[0.0, f64::NAN]),
            Waypoint::new(1.0).with_pos(&[1.0, f64::NAN]),
            Waypoint::new(2.0).with_pos(&[2.0, 2.0]).with_acc(&[f64::NAN, 0.0]),
        ];
        let problem = Problem::assemble(&waypoints, &[], &options, &ops).unwrap();

        // 7 waypoint rows plus one knot of (2+1) + (2+1) continuity rows
        assert_eq!(problem.a_eq.nrows(), 7 + 6);
        assert_eq!(problem.num_vars(), 2 * 2 * 4);
        assert_eq!(problem.a_ineq.nrows(), 0);
    }

    #[test]
    fn equality_rows_skip_derivatives_past_continuity_order() {
        let options = options(1, 3, vec![1]);
        let ops = DiffOps::new(3);
        let waypoints = vec![
            Waypoint::new(0.0).with_pos(&[0.0]).with_acc(&[1.0]),
            Waypoint::new(1.0).with_pos(&[1.0]),
        ];
        let problem = Problem::assemble(&waypoints, &[], &options, &ops).unwrap();

        // the acceleration row is dropped because contderiv defaults to 1
        assert_eq!(problem.a_eq.nrows(), 2);
    }

    #[test]
    fn equality_targets_are_scaled_into_normalized_time() {
        let mut options = options(1, 2, vec![1]);
        options.contderiv = Some(vec![1]);
        let ops = DiffOps::new(2);
        let waypoints = vec![
            Waypoint::new(0.0).with_vel(&[3.0]),
            Waypoint::new(2.0).with_pos(&[1.0]),
        ];
        let problem = Problem::assemble(&waypoints, &[], &options, &ops).unwrap();

        // velocity row at τ = 0: [0, 1, 0], target 3 · dt
        let vel_row = problem.a_eq.row(0);
        close(vel_row[0], 0.0, 1e-12);
        close(vel_row[1], 1.0, 1e-12);
        close(vel_row[2], 0.0, 1e-12);
        close(problem.b_eq[0], 6.0, 1e-12);

        // terminal position attaches at τ = 1 of the last segment
        let pos_row = problem.a_eq.row(1);
        close(pos_row[0], 1.0, 1e-12);
        close(pos_row[1], 1.0, 1e-12);
        close(pos_row[2], 1.0, 1e-12);
        close(problem.b_eq[1], 1.0, 1e-12);
    }

    #[test]
    fn continuity_rows_balance_both_timescales() {
        let mut options = options(1, 2, vec![1]);
        options.contderiv = Some(vec![1]);
        let ops = DiffOps::new(2);
        let waypoints = vec![
            Waypoint::new(0.0),
            Waypoint::new(1.0),
            Waypoint::new(3.0),
        ];
        let problem = Problem::assemble(&waypoints, &[], &options, &ops).unwrap();
        assert_eq!(problem.a_eq.nrows(), 2);

        // value continuity: basis at τ = 1 of segment 0 minus basis at τ = 0 of segment 1
        let k0 = problem.a_eq.row(0);
        for (c, want) in [1.0, 1.0, 1.0, 0.0, 0.0, -1.0].iter().enumerate() {
            close(k0[c], *want, 1e-12);
        }

        // first-derivative continuity with dt1 = 1, dt2 = 2
        let k1 = problem.a_eq.row(1);
        for (c, want) in [2.0, 1.0, 0.0, 0.0, -0.5, 0.0].iter().enumerate() {
            close(k1[c], *want, 1e-12);
        }

        close(problem.b_eq[0], 0.0, 1e-12);
        close(problem.b_eq[1], 0.0, 1e-12);
    }

    #[test]
    fn hessian_matches_hand_integral_for_min_acceleration() {
        let options = options(1, 3, vec![2]);
        let ops = DiffOps::new(3);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(1.0)];
        let problem = Problem::assemble(&waypoints, &[], &options, &ops).unwrap();

        // ∫₀¹ (6aτ + 2b)² dτ = 12a² + 12ab + 4b²
        let expected = DMatrix::from_row_slice(
            4,
            4,
            &[
                12.0, 6.0, 0.0, 0.0,
                6.0, 4.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0,
            ],
        );
        assert_relative_eq!(expected, problem.h, epsilon = 1e-12);
    }

    #[test]
    fn hessian_order_zero_is_the_moment_matrix() {
        let options = options(1, 1, vec![0]);
        let ops = DiffOps::new(1);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(1.0)];
        let problem = Problem::assemble(&waypoints, &[], &options, &ops).unwrap();

        let expected = DMatrix::from_row_slice(2, 2, &[1.0 / 3.0, 0.5, 0.5, 1.0]);
        assert_relative_eq!(expected, problem.h, epsilon = 1e-12);
    }

    #[test]
    fn hessian_is_block_diagonal_and_positive_semidefinite() {
        let mut options = options(2, 3, vec![2, 1]);
        options.contderiv = Some(vec![2, 1]);
        let ops = DiffOps::new(3);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(1.5), Waypoint::new(2.0)];
        let problem = Problem::assemble(&waypoints, &[], &options, &ops).unwrap();

        let h = &problem.h;
        assert_relative_eq!(h.transpose(), h.clone(), epsilon = 1e-12);
        for i in 0..h.nrows() {
            for j in 0..h.ncols() {
                if i / 4 != j / 4 {
                    assert_eq!(h[(i, j)], 0.0);
                }
            }
        }
        let eig = h.clone().symmetric_eigen();
        assert!(eig.eigenvalues.iter().all(|&v| v > -1e-10));
    }

    #[test]
    fn hessian_ignores_segment_durations() {
        let options2 = options(1, 3, vec![2]);
        let ops = DiffOps::new(3);
        let short = vec![Waypoint::new(0.0), Waypoint::new(1.0)];
        let long = vec![Waypoint::new(0.0), Waypoint::new(10.0)];
        let h_short = Problem::assemble(&short, &[], &options2, &ops).unwrap().h;
        let h_long = Problem::assemble(&long, &[], &options2, &ops).unwrap().h;
        assert_relative_eq!(h_short, h_long, epsilon = 1e-12);
    }

    #[test]
    fn full_range_bound_splits_and_samples_per_segment() {
        let mut options = options(1, 2, vec![1]);
        options.constraints_per_seg = Some(2);
        let ops = DiffOps::new(2);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(1.0), Waypoint::new(2.0)];
        let bounds = vec![Bound::upper(0, &[5.0], TimeSpan::All)];
        let problem = Problem::assemble(&waypoints, &bounds, &options, &ops).unwrap();

        // three samples on each of the two segments
        assert_eq!(problem.a_ineq.nrows(), 6);
        assert!(problem.b_ineq.iter().all(|&v| v == 5.0));

        // first segment rows live in the first block, split rows in the second
        for r in 0..3 {
            assert_eq!(problem.a_ineq.view((r, 3), (1, 3)).sum(), 0.0);
        }
        for r in 3..6 {
            assert_eq!(problem.a_ineq.view((r, 0), (1, 3)).sum(), 0.0);
        }
    }

    #[test]
    fn instant_bound_emits_single_row_per_finite_dimension() {
        let options = options(2, 1, vec![0, 0]);
        let ops = DiffOps::new(1);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(1.0)];
        let bounds = vec![Bound::upper(0, &[2.0, f64::NAN], TimeSpan::At(0.5))];
        let problem = Problem::assemble(&waypoints, &bounds, &options, &ops).unwrap();

        assert_eq!(problem.a_ineq.nrows(), 1);
        close(problem.a_ineq[(0, 0)], 0.5, 1e-12);
        close(problem.a_ineq[(0, 1)], 1.0, 1e-12);
        close(problem.a_ineq[(0, 2)], 0.0, 1e-12);
        close(problem.b_ineq[0], 2.0, 1e-12);
    }

    #[test]
    fn lower_bounds_flip_the_sign() {
        let options = options(1, 1, vec![0]);
        let ops = DiffOps::new(1);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(1.0)];
        let bounds = vec![Bound::lower(0, &[1.0], TimeSpan::At(0.5))];
        let problem = Problem::assemble(&waypoints, &bounds, &options, &ops).unwrap();

        close(problem.a_ineq[(0, 0)], -0.5, 1e-12);
        close(problem.a_ineq[(0, 1)], -1.0, 1e-12);
        close(problem.b_ineq[0], -1.0, 1e-12);
    }

    #[test]
    fn bound_rows_use_per_power_duration_scaling() {
        // On a duration-2 segment the velocity row sampled at t = 1 must come
        // out as the per-power column scaling of the raw offset basis. For a
        // first derivative that equals the hand-derived physical row
        // (n-c) τ^{n-c-1} / dt at τ = 0.5, which pins the behavior down for
        // unequal durations.
        let options = options(1, 3, vec![2]);
        let ops = DiffOps::new(3);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(2.0)];
        let bounds = vec![Bound::upper(1, &[1.0], TimeSpan::At(1.0))];
        let problem = Problem::assemble(&waypoints, &bounds, &options, &ops).unwrap();

        assert_eq!(problem.a_ineq.nrows(), 1);
        let row = problem.a_ineq.row(0);
        close(row[0], 3.0 * 0.25 / 2.0, 1e-12);
        close(row[1], 2.0 * 0.5 / 2.0, 1e-12);
        close(row[2], 1.0 / 2.0, 1e-12);
        close(row[3], 0.0, 1e-12);
    }

    #[test]
    fn bounds_outside_the_trajectory_are_rejected() {
        let options = options(1, 2, vec![1]);
        let ops = DiffOps::new(2);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(2.0)];

        let before = vec![Bound::upper(0, &[1.0], TimeSpan::Between(-0.5, 1.0))];
        assert!(matches!(
            Problem::assemble(&waypoints, &before, &options, &ops),
            Err(TrajError::OutOfRange { .. })
        ));

        let after = vec![Bound::upper(0, &[1.0], TimeSpan::Between(0.0, 3.0))];
        assert!(matches!(
            Problem::assemble(&waypoints, &after, &options, &ops),
            Err(TrajError::OutOfRange { .. })
        ));
    }

    #[test]
    fn norm_bounds_emit_no_rows() {
        let options = options(2, 2, vec![1, 1]);
        let ops = DiffOps::new(2);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(1.0)];
        let bounds = vec![Bound {
            kind: BoundKind::InfNorm,
            derivative: 1,
            arg: DVector::from_column_slice(&[1.0, 1.0]),
            time: TimeSpan::All,
        }];
        let problem = Problem::assemble(&waypoints, &bounds, &options, &ops).unwrap();
        assert_eq!(problem.a_ineq.nrows(), 0);
    }

    #[test]
    fn partial_interval_sampling_stops_at_the_end() {
        let mut options = options(1, 1, vec![0]);
        options.constraints_per_seg = Some(4);
        let ops = DiffOps::new(1);
        let waypoints = vec![Waypoint::new(0.0), Waypoint::new(1.0)];
        // step 0.25 from 0.3: samples at 0.3, 0.55, 0.8
        let bounds = vec![Bound::upper(0, &[1.0], TimeSpan::Between(0.3, 1.0))];
        let problem = Problem::assemble(&waypoints, &bounds, &options, &ops).unwrap();
        assert_eq!(problem.a_ineq.nrows(), 3);
        close(problem.a_ineq[(0, 0)], 0.3, 1e-9);
        close(problem.a_ineq[(2, 0)], 0.8, 1e-9);
    }
}
