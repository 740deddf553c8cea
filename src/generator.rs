//! Top-level generation: input validation, the coupled solve pipeline and the
//! per-dimension decoupling wrapper.

use log::{info, warn};
use nalgebra::DVector;

use crate::basis::{DiffOps, MAX_DERIV};
use crate::error::TrajError;
use crate::options::TrajectoryOptions;
use crate::problem::Problem;
use crate::solver::{dispatch, ClarabelSolver, QpOptions, QpSolver};
use crate::trajectory::Trajectory;
use crate::waypoint::{Bound, Waypoint};

/// Everything a solve produces: the trajectory, the assembled QPs and their
/// exit flags.
///
/// A coupled solve carries a single entry in `problems` and `exitflags`; a
/// decoupled solve carries one per dimension, in dimension order.
#[derive(Debug)]
pub struct GenerateResult {
    pub trajectory: Trajectory,
    pub problems: Vec<Problem>,
    pub exitflags: Vec<i32>,
}

/// Piecewise-polynomial trajectory generator.
///
/// Holds the validated options and the QP backend used whenever the
/// closed-form path does not apply.
///
/// # Examples
///
/// ```
/// use polytraj::{TrajectoryGenerator, TrajectoryOptions, Waypoint};
///
/// let mut options = TrajectoryOptions::new(1, vec![2]);
/// options.order = 5;
/// options.verbose = false;
/// let generator = TrajectoryGenerator::new(options).unwrap();
///
/// let waypoints = vec![
///     Waypoint::new(0.0).with_pos(&[0.0]).with_vel(&[0.0]),
///     Waypoint::new(1.0).with_pos(&[1.0]).with_vel(&[0.0]),
/// ];
/// let result = generator.generate(&waypoints, &[]).unwrap();
/// let mid = result.trajectory.position(0.5);
/// assert!((mid[0] - 0.5).abs() < 1e-6);
/// ```
pub struct TrajectoryGenerator {
    options: TrajectoryOptions,
    backend: Box<dyn QpSolver>,
}

impl TrajectoryGenerator {
    /// A generator with the default Clarabel backend.
    pub fn new(options: TrajectoryOptions) -> Result<Self, TrajError> {
        Self::with_backend(options, Box::new(ClarabelSolver))
    }

    /// A generator with a caller-supplied QP backend.
    pub fn with_backend(
        options: TrajectoryOptions,
        backend: Box<dyn QpSolver>,
    ) -> Result<Self, TrajError> {
        options.validate()?;
        Ok(Self { options, backend })
    }

    pub fn options(&self) -> &TrajectoryOptions {
        &self.options
    }

    /// Generate the trajectory through `waypoints` subject to `bounds`.
    ///
    /// Multi-dimension problems whose bounds are all plain lower/upper bounds
    /// split into one QP per dimension; anything else solves as one coupled
    /// QP. Solver-quality issues are reported through the exit flags, not as
    /// errors.
    pub fn generate(
        &self,
        waypoints: &[Waypoint],
        bounds: &[Bound],
    ) -> Result<GenerateResult, TrajError> {
        validate_inputs(waypoints, bounds, &self.options)?;
        info!(
            "generating trajectory through {} waypoints in {} dimensions",
            waypoints.len(),
            self.options.ndim
        );

        let decouple = self.options.ndim > 1 && bounds.iter().all(Bound::axis_aligned);
        let result = if decouple {
            self.solve_decoupled(waypoints, bounds)?
        } else {
            let (trajectory, problem, exitflag) =
                self.solve_one(waypoints, bounds, &self.options)?;
            GenerateResult {
                trajectory,
                problems: vec![problem],
                exitflags: vec![exitflag],
            }
        };

        info!(
            "finished generating trajectory over {} segments",
            waypoints.len() - 1
        );
        Ok(result)
    }

    /// Assemble, dispatch and package one QP.
    fn solve_one(
        &self,
        waypoints: &[Waypoint],
        bounds: &[Bound],
        options: &TrajectoryOptions,
    ) -> Result<(Trajectory, Problem, i32), TrajError> {
        let ops = DiffOps::new(options.order);
        let problem = Problem::assemble(waypoints, bounds, options, &ops)?;

        let want_numerical = options.numerical.unwrap_or(!bounds.is_empty());
        let qp_options = QpOptions {
            convergetol: options.convergetol,
            max_iter: options.max_iter,
            verbose: options.verbose,
            time_limit: options.time_limit,
        };
        let solution = dispatch(&problem, &qp_options, want_numerical, self.backend.as_ref())?;
        if solution.exitflag != 1 {
            warn!(
                "QP backend returned non-optimal exit flag {}",
                solution.exitflag
            );
        }

        let x = if solution.x.len() == problem.num_vars() {
            solution.x
        } else {
            warn!(
                "QP backend returned {} entries, expected {}; packaging zeros",
                solution.x.len(),
                problem.num_vars()
            );
            DVector::zeros(problem.num_vars())
        };

        let keytimes: Vec<f64> = waypoints.iter().map(|w| w.time).collect();
        let nseg = keytimes.len() - 1;
        let trajectory = Trajectory::from_solution(&x, options.ndim, nseg, keytimes, &ops);
        Ok((trajectory, problem, solution.exitflag))
    }

    /// Solve one single-dimension QP per dimension and concatenate.
    fn solve_decoupled(
        &self,
        waypoints: &[Waypoint],
        bounds: &[Bound],
    ) -> Result<GenerateResult, TrajError> {
        let d = self.options.ndim;
        let mut parts = Vec::with_capacity(d);
        let mut problems = Vec::with_capacity(d);
        let mut exitflags = Vec::with_capacity(d);

        for j in 0..d {
            let options_j = self.options.for_dimension(j);
            let waypoints_j: Vec<Waypoint> =
                waypoints.iter().map(|w| w.for_dimension(j)).collect();
            let bounds_j: Vec<Bound> = bounds.iter().map(|b| b.for_dimension(j)).collect();
            let (trajectory, problem, exitflag) =
                self.solve_one(&waypoints_j, &bounds_j, &options_j)?;
            parts.push(trajectory);
            problems.push(problem);
            exitflags.push(exitflag);
        }

        Ok(GenerateResult {
            trajectory: Trajectory::concatenate(&parts),
            problems,
            exitflags,
        })
    }
}

fn validate_inputs(
    waypoints: &[Waypoint],
    bounds: &[Bound],
    options: &TrajectoryOptions,
) -> Result<(), TrajError> {
    if waypoints.len() < 2 {
        return Err(TrajError::TooFewWaypoints(waypoints.len()));
    }
    for i in 0..waypoints.len() - 1 {
        if waypoints[i + 1].time <= waypoints[i].time {
            return Err(TrajError::NonMonotonicTime { index: i + 1 });
        }
    }
    for wp in waypoints {
        for k in 0..=MAX_DERIV {
            if let Some(vals) = wp.derivative(k) {
                if vals.len() != options.ndim {
                    return Err(TrajError::ShapeMismatch(format!(
                        "waypoint at t = {} has {} entries for derivative {k}, expected {}",
                        wp.time,
                        vals.len(),
                        options.ndim
                    )));
                }
            }
        }
    }
    for bound in bounds {
        bound.validate_derivative()?;
        if bound.arg.len() != options.ndim {
            return Err(TrajError::ShapeMismatch(format!(
                "bound arg has {} entries, expected {}",
                bound.arg.len(),
                options.ndim
            )));
        }
    }
    Ok(())
}
