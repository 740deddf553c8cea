//! QP solve paths: closed-form KKT elimination for equality-only problems and
//! the Clarabel interior-point backend for everything else.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{self, NonnegativeConeT, ZeroConeT},
};
use log::warn;
use nalgebra::{DMatrix, DVector};

use crate::error::TrajError;
use crate::problem::Problem;

/// Condition number above which the closed-form KKT solve is abandoned.
const KKT_COND_LIMIT: f64 = 1e8;

/// Options forwarded to a QP backend.
#[derive(Debug, Clone)]
pub struct QpOptions {
    pub convergetol: f64,
    pub max_iter: u32,
    pub verbose: bool,
    /// Wall-clock limit in seconds, if the backend supports one.
    pub time_limit: Option<f64>,
}

/// Outcome of a QP solve. `exitflag == 1` means optimal; any other value is a
/// backend diagnostic passed through unchanged.
#[derive(Debug, Clone)]
pub struct QpSolution {
    pub x: DVector<f64>,
    pub exitflag: i32,
}

/// A pluggable backend for the constrained quadratic program
/// `minimize xᵀHx  s.t.  Aeq x = beq,  Aineq x ≤ bineq`.
pub trait QpSolver {
    fn solve(&self, problem: &Problem, options: &QpOptions) -> Result<QpSolution, TrajError>;
}

/// Solve the equality-constrained program through its KKT saddle-point system
///
/// ```text
/// [ 2H   Aeqᵀ ] [ x ]   [  0  ]
/// [ Aeq   0   ] [ λ ] = [ beq ]
/// ```
///
/// Returns `None` when the system is singular or its condition number exceeds
/// [`KKT_COND_LIMIT`]; the caller then falls through to the numerical path.
pub(crate) fn solve_kkt(problem: &Problem) -> Option<DVector<f64>> {
    let nv = problem.num_vars();
    let ne = problem.a_eq.nrows();
    let size = nv + ne;

    let mut kkt = DMatrix::zeros(size, size);
    kkt.view_mut((0, 0), (nv, nv)).copy_from(&(2.0 * &problem.h));
    kkt.view_mut((0, nv), (nv, ne))
        .copy_from(&problem.a_eq.transpose());
    kkt.view_mut((nv, 0), (ne, nv)).copy_from(&problem.a_eq);

    let sv = kkt.singular_values();
    let smax = sv.max();
    let smin = sv.min();
    if smin <= f64::EPSILON * smax {
        warn!("KKT system is singular, falling back to the numerical path");
        return None;
    }
    let cond = smax / smin;
    if cond > KKT_COND_LIMIT {
        warn!("KKT system is ill-conditioned (cond {cond:.3e}), falling back to the numerical path");
        return None;
    }

    let mut rhs = DVector::zeros(size);
    rhs.rows_mut(nv, ne).copy_from(&problem.b_eq);
    let sol = kkt.lu().solve(&rhs)?;
    Some(sol.rows(0, nv).into_owned())
}

/// Route an assembled problem to the closed-form path when allowed and
/// possible, otherwise to the numerical backend.
pub(crate) fn dispatch(
    problem: &Problem,
    options: &QpOptions,
    want_numerical: bool,
    backend: &dyn QpSolver,
) -> Result<QpSolution, TrajError> {
    let has_ineq = problem.a_ineq.nrows() > 0;
    if !want_numerical && !has_ineq {
        if let Some(x) = solve_kkt(problem) {
            return Ok(QpSolution { x, exitflag: 1 });
        }
    }
    backend.solve(problem, options)
}

/// Interior-point backend on top of Clarabel.
///
/// Equalities are expressed as a zero cone and inequalities as a nonnegative
/// cone, stacked in that order.
#[derive(Debug, Default)]
pub struct ClarabelSolver;

impl QpSolver for ClarabelSolver {
    fn solve(&self, problem: &Problem, options: &QpOptions) -> Result<QpSolution, TrajError> {
        let nv = problem.num_vars();
        let ne = problem.a_eq.nrows();
        let ni = problem.a_ineq.nrows();

        // Clarabel minimizes (1/2)xᵀPx + qᵀx, so P = 2H
        let p = dmatrix_to_csc_upper_tri(&(2.0 * &problem.h));
        let q = vec![0.0; nv];

        let mut stacked = DMatrix::zeros(ne + ni, nv);
        stacked
            .view_mut((0, 0), (ne, nv))
            .copy_from(&problem.a_eq);
        stacked
            .view_mut((ne, 0), (ni, nv))
            .copy_from(&problem.a_ineq);
        let a = dmatrix_to_csc(&stacked);

        let mut b = Vec::with_capacity(ne + ni);
        b.extend(problem.b_eq.iter());
        b.extend(problem.b_ineq.iter());

        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if ne > 0 {
            cones.push(ZeroConeT(ne));
        }
        if ni > 0 {
            cones.push(NonnegativeConeT(ni));
        }

        let mut builder = DefaultSettingsBuilder::default();
        builder
            .max_iter(options.max_iter)
            .verbose(options.verbose)
            .tol_gap_abs(options.convergetol)
            .tol_gap_rel(options.convergetol)
            .tol_feas(options.convergetol);
        if let Some(limit) = options.time_limit {
            builder.time_limit(limit);
        }
        let settings = builder.build().expect("valid solver settings");

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings)
            .map_err(|e| TrajError::SolverFailed(format!("{e:?}")))?;
        solver.solve();

        let exitflag = status_code(&solver.solution.status);
        let x = DVector::from_column_slice(&solver.solution.x);
        Ok(QpSolution { x, exitflag })
    }
}

/// Map a Clarabel termination status onto this crate's numeric exit flags.
fn status_code(status: &SolverStatus) -> i32 {
    match status {
        SolverStatus::Solved => 1,
        SolverStatus::AlmostSolved => 2,
        SolverStatus::PrimalInfeasible => -2,
        SolverStatus::DualInfeasible => -3,
        SolverStatus::AlmostPrimalInfeasible => -4,
        SolverStatus::AlmostDualInfeasible => -5,
        SolverStatus::MaxIterations => -6,
        SolverStatus::MaxTime => -7,
        SolverStatus::NumericalError => -8,
        SolverStatus::InsufficientProgress => -9,
        _ => 0,
    }
}

/// Dense nalgebra matrix to Clarabel CSC, dropping explicit zeros.
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v != 0.0 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Upper triangle of a symmetric dense matrix in CSC form, as Clarabel expects
/// for the cost term.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..=j.min(nrows - 1) {
            let v = m[(i, j)];
            if v != 0.0 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert::close;

    fn qp_options() -> QpOptions {
        QpOptions {
            convergetol: 1e-8,
            max_iter: 200,
            verbose: false,
            time_limit: None,
        }
    }

    fn equality_problem(a_eq: DMatrix<f64>, b_eq: DVector<f64>) -> Problem {
        let nv = a_eq.ncols();
        Problem {
            h: DMatrix::identity(nv, nv),
            a_eq,
            b_eq,
            a_ineq: DMatrix::zeros(0, nv),
            b_ineq: DVector::zeros(0),
        }
    }

    #[test]
    fn kkt_solves_a_determined_system() {
        let problem = equality_problem(
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::from_column_slice(&[1.0]),
        );
        let x = solve_kkt(&problem).unwrap();
        close(x[0], 0.5, 1e-9);
        close(x[1], 0.5, 1e-9);
    }

    #[test]
    fn kkt_refuses_redundant_rows() {
        let problem = equality_problem(
            DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]),
            DVector::from_column_slice(&[1.0, 1.0]),
        );
        assert!(solve_kkt(&problem).is_none());
    }

    #[test]
    fn clarabel_matches_the_analytic_path() {
        let problem = equality_problem(
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::from_column_slice(&[1.0]),
        );
        let solution = ClarabelSolver.solve(&problem, &qp_options()).unwrap();
        assert_eq!(solution.exitflag, 1);
        close(solution.x[0], 0.5, 1e-6);
        close(solution.x[1], 0.5, 1e-6);
    }

    #[test]
    fn clarabel_honours_inequalities() {
        // minimize x² subject to x ≥ 1
        let problem = Problem {
            h: DMatrix::identity(1, 1),
            a_eq: DMatrix::zeros(0, 1),
            b_eq: DVector::zeros(0),
            a_ineq: DMatrix::from_row_slice(1, 1, &[-1.0]),
            b_ineq: DVector::from_column_slice(&[-1.0]),
        };
        let solution = ClarabelSolver.solve(&problem, &qp_options()).unwrap();
        assert_eq!(solution.exitflag, 1);
        close(solution.x[0], 1.0, 1e-6);
    }

    #[test]
    fn dispatch_prefers_the_analytic_path() {
        let problem = equality_problem(
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::from_column_slice(&[1.0]),
        );
        let solution = dispatch(&problem, &qp_options(), false, &ClarabelSolver).unwrap();
        assert_eq!(solution.exitflag, 1);
        close(solution.x[0], 0.5, 1e-9);
    }

    #[test]
    fn dispatch_falls_back_on_singular_systems() {
        let problem = equality_problem(
            DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]),
            DVector::from_column_slice(&[1.0, 1.0]),
        );
        let solution = dispatch(&problem, &qp_options(), false, &ClarabelSolver).unwrap();
        assert_eq!(solution.exitflag, 1);
        close(solution.x[0] + solution.x[1], 1.0, 1e-6);
    }
}
