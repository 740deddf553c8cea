/*!
# polytraj

**polytraj** generates piecewise-polynomial trajectories for multi-dimensional
kinematic systems (for example quadrotor flat outputs x, y, z, yaw) - given an
ordered list of waypoints with optional derivative constraints and optional
inequality bounds on derivatives over time intervals, the library assembles a
quadratic program whose solution is one fixed-order polynomial per segment per
dimension.

## Features
* equality constraints on position, velocity, acceleration, jerk and snap at
  every waypoint, with NaN marking individual dimensions as unconstrained
* continuity of derivatives up to a per-dimension order at interior waypoints
* minimization of the integral of a chosen squared derivative per dimension
* sampled upper/lower bounds on derivatives over arbitrary time intervals
* a closed-form KKT solve for unconstrained problems, with automatic fallback
  to an interior-point QP backend, and one independent QP per dimension
  whenever the bounds keep the dimensions decoupled

## Using **polytraj**
Simply add the following to your `Cargo.toml` file:

```ignore
[dependencies]
polytraj = "*"
```

and now you can generate and evaluate trajectories:

```
use polytraj::{Bound, TimeSpan, TrajectoryGenerator, TrajectoryOptions, Waypoint};

let mut options = TrajectoryOptions::new(2, vec![4, 4]);
options.order = 7;
options.verbose = false;
let generator = TrajectoryGenerator::new(options).unwrap();

// rest-to-rest motion through two waypoints in x and y
let waypoints = vec![
    Waypoint::new(0.0).with_pos(&[0.0, 0.0]).with_vel(&[0.0, 0.0]),
    Waypoint::new(2.0).with_pos(&[1.0, -1.0]).with_vel(&[0.0, 0.0]),
];

// keep both velocity components below 1.5 over the whole trajectory
let bounds = vec![Bound::upper(1, &[1.5, 1.5], TimeSpan::All)];

let result = generator.generate(&waypoints, &bounds).unwrap();

// use the individual values in real-time, perhaps to control a robot
let pos = result.trajectory.position(0.7);
let vel = result.trajectory.velocity(0.7);

// or sample a range of times, perhaps to plot
let path = result.trajectory.values(0.0, 2.0, 0.1, 0).unwrap();
```

## Formulation
Each segment is parametrized in normalized time τ ∈ [0, 1]. Waypoint targets
and continuity rows are rescaled by the segment durations so the stitched
polynomial matches the requested physical-time derivatives, while the
minimized objective is taken in normalized time. Unconstrained problems solve
through the KKT saddle-point system in closed form; bounded problems hand the
assembled QP to [Clarabel](https://clarabel.org) through the [`QpSolver`]
trait.
 */

mod basis;
mod error;
mod generator;
mod options;
mod problem;
mod solver;
mod trajectory;
mod waypoint;

pub use basis::{DiffOps, MAX_DERIV};
pub use error::TrajError;
pub use generator::{GenerateResult, TrajectoryGenerator};
pub use options::TrajectoryOptions;
pub use problem::Problem;
pub use solver::{ClarabelSolver, QpOptions, QpSolution, QpSolver};
pub use trajectory::Trajectory;
pub use waypoint::{Bound, BoundKind, TimeSpan, Waypoint};
